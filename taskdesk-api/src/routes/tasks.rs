/// Task endpoints
///
/// Handlers follow one pattern: parse the path id, load the task and apply
/// the permission rule for the action (missing task is 404 before any 403),
/// mutate the store, then dispatch the notifications the action produces.
///
/// # Endpoints
///
/// - `GET /api/tasks` - All tasks, newest first (`?assigneeId=` narrows)
/// - `GET /api/tasks/:id` - One task
/// - `POST /api/tasks` - Create (not Staff)
/// - `PUT /api/tasks/:id` - Full update (creator or Manager/Admin)
/// - `PATCH /api/tasks/:id/status` - Change status (any user)
/// - `PATCH /api/tasks/:id/submit` - Request review (Staff assignee)
/// - `PATCH /api/tasks/:id/approve` - Approve review (creator or Manager/Admin)
/// - `PATCH /api/tasks/:id/deny` - Deny review (creator or Manager/Admin)
/// - `DELETE /api/tasks/:id` - Delete (creator or Manager/Admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, Json},
    routes::{non_blank, parse_id},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use taskdesk_shared::{
    auth::{
        authorization::{load_authorized, require_task_creator_role, TaskAction},
        middleware::AuthContext,
    },
    lifecycle,
    models::{
        task::{resolve_assignees, CreateTask, Task, TaskStatus, DEFAULT_CATEGORY, DEFAULT_PRIORITY},
        user::User,
    },
};
use tracing::info;

const INVALID_TASK_ID: &str = "Invalid task ID";

/// Task as returned to clients
///
/// Adds the derived primary `assigneeId` next to the stored fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,

    pub assignee_id: Option<i64>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            assignee_id: task.primary_assignee(),
            task,
        }
    }
}

/// Query string for listing tasks
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub assignee_id: Option<String>,
}

/// Create request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<i64>,

    /// Unparseable values fall back to TODO
    pub status: Option<String>,

    pub due_at: Option<String>,
    pub assignee_id: Option<i64>,
    pub assignee_ids: Option<Vec<i64>>,

    /// Takes precedence over `assignee_id` when non-blank
    pub assignee_username: Option<String>,
}

/// Full update request
///
/// `title` and `category` replace only when non-blank, `priority` only when
/// non-zero, `status` and `pendingReview` only when present. Description,
/// due date and assignees always replace.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<i64>,
    pub status: Option<String>,
    pub due_at: Option<String>,
    pub pending_review: Option<bool>,
    pub assignee_id: Option<i64>,
    pub assignee_ids: Option<Vec<i64>>,
    pub assignee_username: Option<String>,
}

/// Status change request
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

/// Turns the requested assignee fields into a single id and a list
///
/// A non-blank username replaces `assignee_id`. Every referenced user must
/// exist.
async fn requested_assignees(
    pool: &SqlitePool,
    assignee_ids: Option<Vec<i64>>,
    assignee_id: Option<i64>,
    assignee_username: Option<String>,
) -> ApiResult<(Vec<i64>, Option<i64>)> {
    let assignee_id = match non_blank(assignee_username) {
        Some(username) => {
            let user = User::find_by_username(pool, username.trim())
                .await?
                .ok_or_else(|| ApiError::bad_request("Unknown assignee username"))?;
            Some(user.id)
        }
        None => assignee_id,
    };

    let assignee_ids = assignee_ids.unwrap_or_default();

    for id in assignee_ids.iter().chain(assignee_id.iter()) {
        if *id > 0 && User::find_by_id(pool, *id).await?.is_none() {
            return Err(ApiError::bad_request("Unknown assignee"));
        }
    }

    Ok((assignee_ids, assignee_id))
}

fn parse_status(raw: Option<String>) -> ApiResult<TaskStatus> {
    let raw = non_blank(raw).ok_or_else(|| ApiError::bad_request("Missing status"))?;
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid status"))
}

/// List tasks
///
/// Public. With `?assigneeId=` only tasks whose assignee set contains that
/// user are returned.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = match non_blank(query.assignee_id) {
        Some(raw) => {
            let user_id = parse_id(&raw, "Invalid assignee ID")?;
            Task::find_by_assignee(&state.db, user_id).await?
        }
        None => Task::find_all(&state.db).await?,
    };

    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// Get one task (public)
///
/// # Errors
///
/// - `400 Bad Request`: Non-numeric id
/// - `404 Not Found`: `{"error":"Task not found"}`
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskResponse>> {
    let id = parse_id(&id, INVALID_TASK_ID)?;

    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    Ok(Json(task.into()))
}

/// Create a task
///
/// The role check runs before the body is looked at, so Staff always get
/// 403.
///
/// # Endpoint
///
/// ```text
/// POST /api/tasks
///
/// {
///   "title": "Quarterly report",
///   "priority": 2,
///   "assigneeUsername": "bob"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing title, unknown assignee
/// - `401 Unauthorized`: No session
/// - `403 Forbidden`: Staff users cannot create tasks
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<CreateTaskRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    require_task_creator_role(&auth)?;
    let Json(req) = payload?;

    let title = non_blank(req.title).ok_or_else(|| ApiError::bad_request("Missing title"))?;

    let (assignee_ids, assignee_id) = requested_assignees(
        &state.db,
        req.assignee_ids,
        req.assignee_id,
        req.assignee_username,
    )
    .await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            title: title.trim().to_string(),
            description: Some(req.description.unwrap_or_default()),
            status: req
                .status
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or_default(),
            category: non_blank(req.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            priority: req.priority.filter(|p| *p > 0).unwrap_or(DEFAULT_PRIORITY),
            due_at: req.due_at,
            created_by: auth.user_id,
            assignee_id,
            assignee_ids,
            pending_review: false,
        },
    )
    .await?;

    info!(
        task_id = task.id,
        user_id = auth.user_id,
        assignees = ?task.assignee_ids,
        "Created task"
    );

    lifecycle::dispatch(&state.db, lifecycle::task_created(&task)).await?;

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// Full update
///
/// # Errors
///
/// - `400 Bad Request`: Invalid id or status, unknown assignee
/// - `403 Forbidden`: Neither creator nor Manager/Admin
/// - `404 Not Found`: Task not found
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, ApiError>,
) -> ApiResult<Json<TaskResponse>> {
    let id = parse_id(&id, INVALID_TASK_ID)?;
    let mut task = load_authorized(&state.db, &auth, id, TaskAction::Update).await?;
    let Json(req) = payload?;

    if let Some(title) = non_blank(req.title) {
        task.title = title.trim().to_string();
    }
    if let Some(category) = non_blank(req.category) {
        task.category = category;
    }
    if let Some(priority) = req.priority.filter(|p| *p != 0) {
        task.priority = priority;
    }
    if req.status.is_some() {
        task.status = parse_status(req.status)?;
    }
    if let Some(pending) = req.pending_review {
        task.pending_review = pending;
    }
    task.description = req.description;
    task.due_at = req.due_at;

    let (assignee_ids, assignee_id) = requested_assignees(
        &state.db,
        req.assignee_ids,
        req.assignee_id,
        req.assignee_username,
    )
    .await?;
    task.assignee_ids = resolve_assignees(&assignee_ids, assignee_id, task.created_by_user_id);

    let updated = Task::update(&state.db, &task)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    info!(task_id = id, user_id = auth.user_id, "Updated task");

    Ok(Json(updated.into()))
}

/// Change status
///
/// Open to any authenticated user. `completedAt` becomes now for DONE and
/// null otherwise.
pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, ApiError>,
) -> ApiResult<Json<TaskResponse>> {
    let id = parse_id(&id, INVALID_TASK_ID)?;
    load_authorized(&state.db, &auth, id, TaskAction::ChangeStatus).await?;
    let Json(req) = payload?;
    let status = parse_status(req.status)?;

    let task = Task::update_status(&state.db, id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    info!(task_id = id, user_id = auth.user_id, status = %status, "Changed task status");

    lifecycle::dispatch(&state.db, lifecycle::status_changed(&task, auth.user_id)).await?;

    Ok(Json(task.into()))
}

/// Submit for review
///
/// # Errors
///
/// - `400 Bad Request`: Task is already pending review
/// - `403 Forbidden`: Only assigned staff can submit tasks for review
pub async fn submit_for_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskResponse>> {
    let id = parse_id(&id, INVALID_TASK_ID)?;
    load_authorized(&state.db, &auth, id, TaskAction::SubmitForReview).await?;

    let task = Task::set_pending_review(&state.db, id, true)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    info!(task_id = id, user_id = auth.user_id, "Task submitted for review");

    lifecycle::dispatch(&state.db, lifecycle::review_requested(&task)).await?;

    Ok(Json(task.into()))
}

/// Approve a review
///
/// Forces DONE and clears the pending flag. Approving again is allowed and
/// notifies again.
pub async fn approve(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskResponse>> {
    let id = parse_id(&id, INVALID_TASK_ID)?;
    load_authorized(&state.db, &auth, id, TaskAction::Approve).await?;

    let task = Task::approve(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    info!(task_id = id, user_id = auth.user_id, "Task approved");

    lifecycle::dispatch(&state.db, lifecycle::task_approved(&task)).await?;

    Ok(Json(task.into()))
}

/// Deny a review
///
/// Clears the pending flag and leaves the status alone.
pub async fn deny(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskResponse>> {
    let id = parse_id(&id, INVALID_TASK_ID)?;
    load_authorized(&state.db, &auth, id, TaskAction::Deny).await?;

    let task = Task::set_pending_review(&state.db, id, false)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    info!(task_id = id, user_id = auth.user_id, "Task denied");

    lifecycle::dispatch(&state.db, lifecycle::task_denied(&task)).await?;

    Ok(Json(task.into()))
}

/// Delete a task with its comments; answers `204 No Content`
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, INVALID_TASK_ID)?;
    load_authorized(&state.db, &auth, id, TaskAction::Delete).await?;

    if !Task::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Task not found"));
    }

    info!(task_id = id, user_id = auth.user_id, "Deleted task");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_task_response_adds_primary_assignee() {
        let task = Task {
            id: 3,
            title: "Audit".to_string(),
            description: Some(String::new()),
            status: TaskStatus::Todo,
            category: "one-time".to_string(),
            priority: 3,
            created_by_user_id: 1,
            assignee_ids: vec![4, 5],
            pending_review: false,
            due_at: None,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(TaskResponse::from(task)).unwrap();
        assert_eq!(json["assigneeId"], 4);
        assert_eq!(json["assigneeIds"], serde_json::json!([4, 5]));
        assert_eq!(json["createdByUserId"], 1);
        assert_eq!(json["pendingReview"], false);
        assert_eq!(json["status"], "TODO");
        assert!(json["completedAt"].is_null());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(Some("DONE".to_string())).unwrap(), TaskStatus::Done);
        assert!(matches!(
            parse_status(None),
            Err(ApiError::BadRequest(msg)) if msg == "Missing status"
        ));
        assert!(matches!(
            parse_status(Some("done".to_string())),
            Err(ApiError::BadRequest(msg)) if msg == "Invalid status"
        ));
    }
}
