/// Role and ownership rules for task actions
///
/// # Permission Model
///
/// 1. **Creation**: any role except Staff may create tasks
/// 2. **Ownership**: the creator may update, approve, deny and delete a task
/// 3. **Override**: Manager and Admin bypass ownership for those actions
/// 4. **Review submission**: only a Staff member of the assignee set may
///    submit, and only while the task is not already pending review
///
/// Status changes and comments are open to any authenticated user.
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::auth::authorization::{load_authorized, TaskAction};
/// use taskdesk_shared::auth::middleware::AuthContext;
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool, auth: AuthContext) -> Result<(), Box<dyn std::error::Error>> {
/// let task = load_authorized(&pool, &auth, 42, TaskAction::Approve).await?;
/// println!("{} may approve {}", auth.username, task.title);
/// # Ok(())
/// # }
/// ```

use sqlx::SqlitePool;
use std::fmt;
use tracing::warn;

use super::middleware::AuthContext;
use crate::models::task::Task;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Actor lacks the role or ownership the action needs
    #[error("{0}")]
    Forbidden(&'static str),

    /// Submission attempted while a review is already pending
    #[error("Task is already pending review")]
    AlreadyPendingReview,

    /// Target task does not exist
    #[error("Task not found")]
    TaskNotFound,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Actions on an existing task that carry a permission rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Update,
    ChangeStatus,
    SubmitForReview,
    Approve,
    Deny,
    Delete,
    Comment,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskAction::Update => "update",
            TaskAction::ChangeStatus => "change-status",
            TaskAction::SubmitForReview => "submit",
            TaskAction::Approve => "approve",
            TaskAction::Deny => "deny",
            TaskAction::Delete => "delete",
            TaskAction::Comment => "comment",
        };
        f.write_str(name)
    }
}

/// Checks that the actor's role may create tasks
///
/// # Errors
///
/// Returns `AuthzError::Forbidden` for Staff.
pub fn require_task_creator_role(auth: &AuthContext) -> Result<(), AuthzError> {
    if !auth.role.can_create_tasks() {
        warn!(user_id = auth.user_id, "Staff user attempted to create a task");
        return Err(AuthzError::Forbidden("Staff users cannot create tasks"));
    }

    Ok(())
}

/// Checks the actor is the task's creator or a Manager/Admin
pub fn require_owner_or_manager(auth: &AuthContext, task: &Task) -> Result<(), AuthzError> {
    if task.created_by_user_id == auth.user_id || auth.role.is_manager() {
        return Ok(());
    }

    Err(AuthzError::Forbidden("Forbidden"))
}

/// Checks the actor may submit the task for review
///
/// # Errors
///
/// - `AuthzError::Forbidden` unless the actor is Staff and an assignee
/// - `AuthzError::AlreadyPendingReview` if a review is outstanding
pub fn require_submit(auth: &AuthContext, task: &Task) -> Result<(), AuthzError> {
    if auth.role.is_manager() || !task.has_assignee(auth.user_id) {
        return Err(AuthzError::Forbidden(
            "Only assigned staff can submit tasks for review",
        ));
    }

    if task.pending_review {
        return Err(AuthzError::AlreadyPendingReview);
    }

    Ok(())
}

/// Applies the rule for `action` to an already loaded task
pub fn authorize(auth: &AuthContext, task: &Task, action: TaskAction) -> Result<(), AuthzError> {
    let outcome = match action {
        TaskAction::Update | TaskAction::Approve | TaskAction::Deny | TaskAction::Delete => {
            require_owner_or_manager(auth, task)
        }
        TaskAction::SubmitForReview => require_submit(auth, task),
        TaskAction::ChangeStatus | TaskAction::Comment => Ok(()),
    };

    if let Err(ref e) = outcome {
        warn!(
            task_id = task.id,
            user_id = auth.user_id,
            action = %action,
            reason = %e,
            "Task action denied"
        );
    }

    outcome
}

/// Loads a task and applies the rule for `action`
///
/// A missing task is reported before any permission check, so callers can
/// tell not-found apart from forbidden.
pub async fn load_authorized(
    pool: &SqlitePool,
    auth: &AuthContext,
    task_id: i64,
    action: TaskAction,
) -> Result<Task, AuthzError> {
    let task = Task::find_by_id(pool, task_id)
        .await?
        .ok_or(AuthzError::TaskNotFound)?;

    authorize(auth, &task, action)?;

    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskStatus;
    use crate::models::user::Role;
    use chrono::Utc;

    fn actor(user_id: i64, role: Role) -> AuthContext {
        AuthContext {
            user_id,
            username: format!("user{}", user_id),
            role,
        }
    }

    fn task(creator: i64, assignees: Vec<i64>) -> Task {
        Task {
            id: 1,
            title: "Inventory".to_string(),
            description: None,
            status: TaskStatus::Todo,
            category: "one-time".to_string(),
            priority: 3,
            created_by_user_id: creator,
            assignee_ids: assignees,
            pending_review: false,
            due_at: None,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_staff_cannot_create_tasks() {
        assert!(matches!(
            require_task_creator_role(&actor(1, Role::Staff)),
            Err(AuthzError::Forbidden("Staff users cannot create tasks"))
        ));
        assert!(require_task_creator_role(&actor(1, Role::Manager)).is_ok());
        assert!(require_task_creator_role(&actor(1, Role::Admin)).is_ok());
    }

    #[test]
    fn test_owner_or_manager() {
        let t = task(1, vec![2]);

        assert!(require_owner_or_manager(&actor(1, Role::Staff), &t).is_ok());
        assert!(require_owner_or_manager(&actor(9, Role::Manager), &t).is_ok());
        assert!(require_owner_or_manager(&actor(9, Role::Admin), &t).is_ok());
        assert!(require_owner_or_manager(&actor(2, Role::Staff), &t).is_err());
    }

    #[test]
    fn test_submit_requires_staff_assignee() {
        let t = task(1, vec![2, 3]);

        assert!(require_submit(&actor(2, Role::Staff), &t).is_ok());
        assert!(require_submit(&actor(3, Role::Staff), &t).is_ok());
        assert!(require_submit(&actor(4, Role::Staff), &t).is_err());
        assert!(require_submit(&actor(1, Role::Manager), &task(1, vec![1])).is_err());
    }

    #[test]
    fn test_submit_rejects_pending_review() {
        let mut t = task(1, vec![2]);
        t.pending_review = true;

        assert!(matches!(
            require_submit(&actor(2, Role::Staff), &t),
            Err(AuthzError::AlreadyPendingReview)
        ));
    }

    #[test]
    fn test_open_actions() {
        let t = task(1, vec![2]);
        let stranger = actor(7, Role::Staff);

        assert!(authorize(&stranger, &t, TaskAction::ChangeStatus).is_ok());
        assert!(authorize(&stranger, &t, TaskAction::Comment).is_ok());
        assert!(authorize(&stranger, &t, TaskAction::Delete).is_err());
        assert!(authorize(&stranger, &t, TaskAction::Approve).is_err());
    }
}
