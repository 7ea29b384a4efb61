/// Notification endpoints
///
/// - `GET /api/notifications` - Current user's notifications, newest first
/// - `PATCH /api/notifications/:id/read` - Mark one read
///
/// Both require a session. A notification belonging to someone else is
/// reported as not found.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, Json},
    routes::parse_id,
};
use axum::extract::{Path, State};
use serde_json::{json, Value};
use taskdesk_shared::{auth::middleware::AuthContext, models::notification::Notification};

pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(Notification::list_by_user(&state.db, auth.user_id).await?))
}

/// Mark a notification read
///
/// # Response
///
/// ```json
/// { "success": true }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid notification ID
/// - `404 Not Found`: Missing or owned by another user
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Invalid notification ID")?;

    if !Notification::mark_read(&state.db, id, auth.user_id).await? {
        tracing::warn!(notification_id = id, user_id = auth.user_id, "Mark-read miss");
        return Err(ApiError::not_found("Notification not found"));
    }

    Ok(Json(json!({ "success": true })))
}
