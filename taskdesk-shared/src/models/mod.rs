/// Database models for the task desk
///
/// Each model owns its table and exposes async CRUD functions over a
/// `SqlitePool`.
///
/// # Models
///
/// - `user`: Accounts and roles
/// - `task`: Tasks and their assignee sets
/// - `comment`: Append-only task comments
/// - `notification`: Per-user event records
/// - `session`: Login sessions keyed by token hash

pub mod comment;
pub mod notification;
pub mod session;
pub mod task;
pub mod user;
