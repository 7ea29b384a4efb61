/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, logout and current user
/// - `users`: User summaries for assignee pickers
/// - `tasks`: Task CRUD and review lifecycle
/// - `comments`: Task comments
/// - `notifications`: Per-user notifications

use crate::error::{ApiError, ApiResult};

pub mod auth;
pub mod comments;
pub mod health;
pub mod notifications;
pub mod tasks;
pub mod users;

/// Parses a numeric path segment, reporting `message` on failure
///
/// Path ids are taken as strings so malformed ids produce the JSON error
/// body instead of Axum's plain-text path rejection.
pub(crate) fn parse_id(raw: &str, message: &str) -> ApiResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request(message))
}

/// Treats `None`, empty and whitespace-only strings alike
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", "Invalid task ID").unwrap(), 42);
        assert!(matches!(
            parse_id("abc", "Invalid task ID"),
            Err(ApiError::BadRequest(msg)) if msg == "Invalid task ID"
        ));
        assert!(parse_id("", "Invalid task ID").is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("x".to_string())), Some("x".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }
}
