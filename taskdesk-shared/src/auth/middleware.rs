/// Session resolution for Axum
///
/// The resolution step runs on every request. It reads the session token
/// from the `taskdesk_session` cookie or an `Authorization: Bearer` header,
/// looks up a live session, and inserts an [`AuthContext`] into the request
/// extensions. Requests without a valid session pass through untouched so
/// public routes keep working; handlers that require a login take
/// `AuthContext` as an extractor, which rejects with 401.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use taskdesk_shared::auth::middleware::{resolve_session, AuthContext};
/// use sqlx::SqlitePool;
///
/// async fn me(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.username)
/// }
///
/// fn router(pool: SqlitePool) -> Router {
///     Router::new()
///         .route("/me", get(me))
///         .layer(middleware::from_fn_with_state(pool, resolve_session))
/// }
/// ```

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, error};

use super::session_token::is_well_formed;
use crate::models::{session::Session, user::Role};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "taskdesk_session";

/// Authenticated caller, resolved once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

/// Plaintext token the current request authenticated with
///
/// Inserted next to [`AuthContext`] so logout can revoke the session.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Error type for session authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable session on the request
    #[error("Not logged in")]
    MissingCredentials,

    /// Token present but unknown or expired
    #[error("Not logged in")]
    InvalidSession,

    /// Session lookup failed
    #[error("Session lookup failed: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::MissingCredentials | AuthError::InvalidSession => {
                (StatusCode::UNAUTHORIZED, "Not logged in")
            }
            AuthError::Database(e) => {
                error!(error = %e, "Session lookup failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

/// Pulls the session token out of the cookie or bearer header
///
/// The cookie wins when both are present.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string());

    from_cookie.filter(|t| !t.is_empty()).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Looks up the caller behind the request headers
///
/// # Errors
///
/// - `AuthError::MissingCredentials` when no token is present
/// - `AuthError::InvalidSession` when the token is malformed, unknown or expired
/// - `AuthError::Database` when the lookup fails
pub async fn authenticate(
    pool: &SqlitePool,
    headers: &HeaderMap,
) -> Result<(AuthContext, String), AuthError> {
    let token = extract_token(headers).ok_or(AuthError::MissingCredentials)?;

    if !is_well_formed(&token) {
        return Err(AuthError::InvalidSession);
    }

    let user = Session::resolve(pool, &token)
        .await?
        .ok_or(AuthError::InvalidSession)?;

    Ok((
        AuthContext {
            user_id: user.id,
            username: user.username,
            role: user.role,
        },
        token,
    ))
}

/// Session resolution middleware
///
/// Never rejects for missing or stale credentials; only a storage failure
/// short-circuits with 500.
pub async fn resolve_session(
    State(pool): State<SqlitePool>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&pool, req.headers()).await {
        Ok((context, token)) => {
            debug!(user_id = context.user_id, "Resolved session");
            req.extensions_mut().insert(context);
            req.extensions_mut().insert(SessionToken(token));
        }
        Err(AuthError::MissingCredentials) => {}
        Err(AuthError::InvalidSession) => debug!("Ignoring unknown or expired session token"),
        Err(e @ AuthError::Database(_)) => return e.into_response(),
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; taskdesk_session=tds_abc; other=1"),
        );

        assert_eq!(extract_token(&headers), Some("tds_abc".to_string()));
    }

    #[test]
    fn test_extract_token_from_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tds_xyz"));

        assert_eq!(extract_token(&headers), Some("tds_xyz".to_string()));
    }

    #[test]
    fn test_extract_token_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("taskdesk_session=tds_cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tds_header"));

        assert_eq!(extract_token(&headers), Some("tds_cookie".to_string()));
    }

    #[test]
    fn test_extract_token_missing() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        headers.insert(header::COOKIE, HeaderValue::from_static("taskdesk_session="));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn test_auth_error_into_response() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidSession.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Database(sqlx::Error::PoolClosed).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
