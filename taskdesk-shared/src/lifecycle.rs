/// Notification fan-out for task lifecycle events
///
/// Each function turns one lifecycle event into the notifications it
/// produces. Building drafts is pure; [`dispatch`] writes them.
///
/// "The assignee" means every member of the assignee set. Within one event a
/// recipient receives at most one notification. Repeating an action emits
/// again.
///
/// | Event | Recipients | Type |
/// |---|---|---|
/// | created | assignees other than the creator | assigned |
/// | status changed | assignees, plus the creator unless they acted | status-changed |
/// | submitted | creator | review-requested |
/// | approved | assignees | review-approved |
/// | denied | assignees | review-denied |
/// | commented | creator and assignees, minus the author | comment |
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::lifecycle;
/// use taskdesk_shared::models::task::Task;
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool, task: Task) -> Result<(), sqlx::Error> {
/// lifecycle::dispatch(&pool, lifecycle::task_approved(&task)).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::SqlitePool;
use tracing::info;

use crate::models::notification::{Notification, NotificationType};
use crate::models::task::Task;

/// Notification waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub user_id: i64,
    pub task_id: i64,
    pub kind: NotificationType,
    pub message: String,
}

/// Builds one draft per distinct, valid recipient, keeping first-seen order
fn fan_out(
    task: &Task,
    recipients: impl IntoIterator<Item = i64>,
    kind: NotificationType,
    message: String,
) -> Vec<NotificationDraft> {
    let mut seen = Vec::new();
    for user_id in recipients {
        if user_id > 0 && !seen.contains(&user_id) {
            seen.push(user_id);
        }
    }

    seen.into_iter()
        .map(|user_id| NotificationDraft {
            user_id,
            task_id: task.id,
            kind,
            message: message.clone(),
        })
        .collect()
}

pub fn task_created(task: &Task) -> Vec<NotificationDraft> {
    let creator = task.created_by_user_id;
    fan_out(
        task,
        task.assignee_ids.iter().copied().filter(|id| *id != creator),
        NotificationType::Assigned,
        format!("You have been assigned a new task: {}", task.title),
    )
}

pub fn status_changed(task: &Task, actor_id: i64) -> Vec<NotificationDraft> {
    let creator = Some(task.created_by_user_id).filter(|id| *id != actor_id);
    fan_out(
        task,
        task.assignee_ids.iter().copied().chain(creator),
        NotificationType::StatusChanged,
        format!("Task status changed to {}", task.status),
    )
}

pub fn review_requested(task: &Task) -> Vec<NotificationDraft> {
    fan_out(
        task,
        [task.created_by_user_id],
        NotificationType::ReviewRequested,
        format!("Task submitted for review: {}", task.title),
    )
}

pub fn task_approved(task: &Task) -> Vec<NotificationDraft> {
    fan_out(
        task,
        task.assignee_ids.iter().copied(),
        NotificationType::ReviewApproved,
        format!("Your submitted task was approved: {}", task.title),
    )
}

pub fn task_denied(task: &Task) -> Vec<NotificationDraft> {
    fan_out(
        task,
        task.assignee_ids.iter().copied(),
        NotificationType::ReviewDenied,
        format!("Your submitted task was not approved: {}", task.title),
    )
}

pub fn comment_added(task: &Task, author_id: i64) -> Vec<NotificationDraft> {
    fan_out(
        task,
        std::iter::once(task.created_by_user_id)
            .chain(task.assignee_ids.iter().copied())
            .filter(|id| *id != author_id),
        NotificationType::Comment,
        format!("New comment on task: {}", task.title),
    )
}

/// Writes the drafts in order
///
/// Stops at the first failure; notifications already written stay.
pub async fn dispatch(
    pool: &SqlitePool,
    drafts: Vec<NotificationDraft>,
) -> Result<Vec<Notification>, sqlx::Error> {
    let mut written = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let notification = Notification::create(
            pool,
            draft.user_id,
            draft.task_id,
            draft.kind,
            &draft.message,
        )
        .await?;
        written.push(notification);
    }

    if let Some(first) = written.first() {
        info!(
            task_id = first.task_id,
            kind = %first.kind,
            count = written.len(),
            "Dispatched notifications"
        );
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskStatus;
    use chrono::Utc;

    fn task(creator: i64, assignees: Vec<i64>) -> Task {
        Task {
            id: 5,
            title: "Restock shelves".to_string(),
            description: Some(String::new()),
            status: TaskStatus::InProgress,
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

    fn recipients(drafts: &[NotificationDraft]) -> Vec<i64> {
        drafts.iter().map(|d| d.user_id).collect()
    }

    #[test]
    fn test_task_created_skips_creator() {
        let drafts = task_created(&task(1, vec![2, 1, 3]));

        assert_eq!(recipients(&drafts), vec![2, 3]);
        assert!(drafts.iter().all(|d| d.kind == NotificationType::Assigned));
        assert_eq!(drafts[0].message, "You have been assigned a new task: Restock shelves");
    }

    #[test]
    fn test_self_assigned_creation_is_silent() {
        assert!(task_created(&task(1, vec![1])).is_empty());
    }

    #[test]
    fn test_status_changed_notifies_creator_unless_actor() {
        let t = task(1, vec![2]);

        assert_eq!(recipients(&status_changed(&t, 2)), vec![2, 1]);
        assert_eq!(recipients(&status_changed(&t, 1)), vec![2]);
        assert_eq!(
            status_changed(&t, 2)[0].message,
            "Task status changed to IN_PROGRESS"
        );
    }

    #[test]
    fn test_status_changed_dedupes_creator_assignee() {
        let t = task(1, vec![1]);
        assert_eq!(recipients(&status_changed(&t, 9)), vec![1]);
    }

    #[test]
    fn test_review_events() {
        let t = task(1, vec![2, 3]);

        let requested = review_requested(&t);
        assert_eq!(recipients(&requested), vec![1]);
        assert_eq!(requested[0].kind, NotificationType::ReviewRequested);

        let approved = task_approved(&t);
        assert_eq!(recipients(&approved), vec![2, 3]);
        assert_eq!(approved[0].message, "Your submitted task was approved: Restock shelves");

        let denied = task_denied(&t);
        assert_eq!(recipients(&denied), vec![2, 3]);
        assert_eq!(denied[0].kind, NotificationType::ReviewDenied);
    }

    #[test]
    fn test_comment_added_excludes_author() {
        let t = task(1, vec![2, 3]);

        assert_eq!(recipients(&comment_added(&t, 2)), vec![1, 3]);
        assert_eq!(recipients(&comment_added(&t, 1)), vec![2, 3]);
        assert_eq!(recipients(&comment_added(&t, 9)), vec![1, 2, 3]);
    }
}
