/// Task comment endpoints
///
/// - `GET /api/tasks/:id/comments` - Comments oldest first (public)
/// - `POST /api/tasks/:id/comments` - Add a comment (session)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, Json},
    routes::{non_blank, parse_id},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use taskdesk_shared::{
    auth::{
        authorization::{load_authorized, TaskAction},
        middleware::AuthContext,
    },
    lifecycle,
    models::{comment::Comment, task::Task},
};
use tracing::info;

/// Comment request
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: Option<String>,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    let task_id = parse_id(&id, "Invalid task ID")?;

    if Task::find_by_id(&state.db, task_id).await?.is_none() {
        return Err(ApiError::not_found("Task not found"));
    }

    Ok(Json(Comment::list_by_task(&state.db, task_id).await?))
}

/// Add a comment
///
/// Notifies the creator and assignees, except the author.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid task ID, missing text
/// - `404 Not Found`: Task not found
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    payload: Result<Json<CreateCommentRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let task_id = parse_id(&id, "Invalid task ID")?;
    let task = load_authorized(&state.db, &auth, task_id, TaskAction::Comment).await?;

    let Json(req) = payload?;
    let text = non_blank(req.text).ok_or_else(|| ApiError::bad_request("Missing text"))?;

    let comment = Comment::create(&state.db, task_id, auth.user_id, &text).await?;

    info!(task_id, comment_id = comment.id, user_id = auth.user_id, "Comment added");

    lifecycle::dispatch(&state.db, lifecycle::comment_added(&task, auth.user_id)).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}
