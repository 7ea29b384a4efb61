/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`session_token`]: Opaque session token generation with SHA-256 at rest
/// - [`middleware`]: Per-request session resolution into an [`middleware::AuthContext`]
/// - [`authorization`]: Role and ownership rules for task actions

pub mod authorization;
pub mod middleware;
pub mod password;
pub mod session_token;
