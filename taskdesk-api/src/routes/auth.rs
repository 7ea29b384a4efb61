/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Create an account
/// - `POST /api/auth/login` - Verify credentials and open a session
/// - `POST /api/auth/logout` - Revoke the current session
/// - `GET /api/auth/me` - Current user
///
/// Sessions travel in the `taskdesk_session` cookie (`HttpOnly`,
/// `SameSite=Lax`). The same token is accepted as a bearer token.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, Json},
    routes::non_blank,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Extension,
};
use serde::{Deserialize, Serialize};
use taskdesk_shared::{
    auth::{
        middleware::{AuthContext, SessionToken, SESSION_COOKIE},
        password,
    },
    models::{
        session::Session,
        user::{CreateUser, Role, User},
    },
};
use tracing::{info, warn};
use validator::Validate;

/// Register request
///
/// Every field is required and must be non-blank.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,

    /// "Staff", "Manager" or "Admin"
    pub role: Option<String>,
}

/// Register fields once presence has been checked
#[derive(Debug, Validate)]
struct NewAccount {
    #[validate(length(min = 1, max = 64, message = "Invalid username"))]
    username: String,

    #[validate(email(message = "Invalid email"))]
    email: String,

    password: String,
    role: Role,
}

impl RegisterRequest {
    fn into_account(self) -> ApiResult<NewAccount> {
        let (Some(username), Some(email), Some(password), Some(role)) = (
            non_blank(self.username),
            non_blank(self.email),
            non_blank(self.password),
            non_blank(self.role),
        ) else {
            return Err(ApiError::bad_request("Missing fields"));
        };

        let role = role
            .trim()
            .parse::<Role>()
            .map_err(|_| ApiError::bad_request("Invalid role"))?;

        let account = NewAccount {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password,
            role,
        };

        account.validate().map_err(|e| {
            let message = e
                .field_errors()
                .values()
                .flat_map(|errors| errors.iter())
                .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "Missing fields".to_string());
            ApiError::BadRequest(message)
        })?;

        Ok(account)
    }
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Public view of an account
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// Builds the `Set-Cookie` value for a session token
fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_seconds
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "email": "alice@example.com",
///   "password": "pw",
///   "role": "Manager"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with `{"id", "username", "email", "role"}`.
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, invalid email or role
/// - `409 Conflict`: Username already taken
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let account = req.into_account()?;

    if User::find_by_username(&state.db, &account.username)
        .await?
        .is_some()
    {
        warn!(username = %account.username, "Registration with taken username");
        return Err(ApiError::Conflict("Username already taken".to_string()));
    }

    let password_hash = password::hash_password(&account.password)?;

    // A concurrent registration can still lose the race; the unique index
    // turns that into the same 409 via `From<sqlx::Error>`.
    let user = User::create(
        &state.db,
        CreateUser {
            username: account.username,
            email: account.email,
            password_hash,
            role: account.role,
        },
    )
    .await?;

    info!(user_id = user.id, role = %user.role, "Registered user");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Login endpoint
///
/// Verifies the password and opens a server-side session. The token is
/// returned only in the `Set-Cookie` header.
///
/// # Errors
///
/// - `400 Bad Request`: Missing username or password
/// - `401 Unauthorized`: Unknown user or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(username), Some(password)) = (non_blank(req.username), non_blank(req.password))
    else {
        return Err(ApiError::bad_request("Missing username or password"));
    };

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = User::find_by_username(&state.db, username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&password, &user.password_hash)? {
        warn!(user_id = user.id, "Login with wrong password");
        return Err(invalid());
    }

    let ttl = state.config.session_ttl();
    let (session, token) = Session::create(&state.db, user.id, ttl).await?;

    info!(user_id = user.id, session_id = session.id, "User logged in");

    let cookie = session_cookie(
        &token,
        ttl.num_seconds(),
        state.config.session.cookie_secure,
    );

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(UserResponse::from(user)),
    ))
}

/// Logout endpoint
///
/// Revokes the session the request authenticated with and clears the
/// cookie. Answers `204 No Content`.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
    token: Option<Extension<SessionToken>>,
) -> ApiResult<impl IntoResponse> {
    if let Some(Extension(SessionToken(token))) = token {
        Session::revoke(&state.db, &token).await?;
    }

    info!(user_id = auth.user_id, "User logged out");

    let cleared = session_cookie("", 0, state.config.session.cookie_secure);
    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, cleared)]),
    ))
}

/// Current user
///
/// # Errors
///
/// - `401 Unauthorized`: No session
/// - `404 Not Found`: The session's user no longer exists
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: &str, password: &str, role: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            role: Some(role.to_string()),
        }
    }

    fn message(result: ApiResult<NewAccount>) -> String {
        match result {
            Err(ApiError::BadRequest(msg)) => msg,
            other => panic!("Expected bad request, got {:?}", other.map(|a| a.username)),
        }
    }

    #[test]
    fn test_register_request_accepts_valid_account() {
        let account = request("alice", "alice@example.com", "pw", "Manager")
            .into_account()
            .unwrap();
        assert_eq!(account.username, "alice");
        assert_eq!(account.role, Role::Manager);
    }

    #[test]
    fn test_register_request_missing_fields() {
        let mut req = request("alice", "alice@example.com", "pw", "Staff");
        req.password = None;
        assert_eq!(message(req.into_account()), "Missing fields");

        let req = request("   ", "alice@example.com", "pw", "Staff");
        assert_eq!(message(req.into_account()), "Missing fields");
    }

    #[test]
    fn test_register_request_invalid_role_and_email() {
        let req = request("alice", "alice@example.com", "pw", "Owner");
        assert_eq!(message(req.into_account()), "Invalid role");

        let req = request("alice", "not-an-email", "pw", "Staff");
        assert_eq!(message(req.into_account()), "Invalid email");
    }

    #[test]
    fn test_session_cookie() {
        assert_eq!(
            session_cookie("tds_abc", 86400, false),
            "taskdesk_session=tds_abc; HttpOnly; Path=/; SameSite=Lax; Max-Age=86400"
        );
        assert!(session_cookie("", 0, true).ends_with("Max-Age=0; Secure"));
    }
}
