/// Notification model and database operations
///
/// Notifications are per-user event records that point at a task. They are
/// only ever written as a side effect of task and comment mutations, and are
/// never deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id         INTEGER PRIMARY KEY AUTOINCREMENT,
///     user_id    INTEGER NOT NULL REFERENCES users(id),
///     task_id    INTEGER NOT NULL,
///     type       TEXT    NOT NULL,
///     message    TEXT    NOT NULL,
///     is_read    INTEGER NOT NULL DEFAULT 0,
///     created_at TEXT    NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use tracing::debug;

/// Why a notification was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum NotificationType {
    Assigned,
    StatusChanged,
    ReviewRequested,
    ReviewApproved,
    ReviewDenied,
    Comment,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Assigned => "assigned",
            NotificationType::StatusChanged => "status-changed",
            NotificationType::ReviewRequested => "review-requested",
            NotificationType::ReviewApproved => "review-approved",
            NotificationType::ReviewDenied => "review-denied",
            NotificationType::Comment => "comment",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification addressed to one user
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,

    /// Recipient
    pub user_id: i64,

    pub task_id: i64,

    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: NotificationType,

    pub message: String,

    #[serde(rename = "read")]
    pub is_read: bool,

    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Records a new unread notification
    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        task_id: i64,
        kind: NotificationType,
        message: &str,
    ) -> Result<Self, sqlx::Error> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, task_id, type, message, is_read, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            RETURNING id, user_id, task_id, type, message, is_read, created_at
            "#,
        )
        .bind(user_id)
        .bind(task_id)
        .bind(kind)
        .bind(message)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        debug!(
            notification_id = notification.id,
            user_id,
            task_id,
            kind = %kind,
            "Created notification"
        );
        Ok(notification)
    }

    /// Finds a notification by ID
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, task_id, type, message, is_read, created_at
            FROM notifications
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists a user's notifications, newest first
    pub async fn list_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, task_id, type, message, is_read, created_at
            FROM notifications
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Marks a notification read if it belongs to `user_id`
    ///
    /// Returns false when the notification does not exist or belongs to
    /// someone else; nothing is changed in that case.
    pub async fn mark_read(pool: &SqlitePool, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_names() {
        assert_eq!(NotificationType::StatusChanged.as_str(), "status-changed");
        assert_eq!(
            serde_json::to_string(&NotificationType::ReviewDenied).unwrap(),
            "\"review-denied\""
        );
    }

    #[test]
    fn test_notification_json_shape() {
        let notification = Notification {
            id: 7,
            user_id: 2,
            task_id: 3,
            kind: NotificationType::Assigned,
            message: "You have been assigned a new task: Report".to_string(),
            is_read: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "assigned");
        assert_eq!(json["read"], false);
        assert_eq!(json["userId"], 2);
        assert_eq!(json["taskId"], 3);
    }
}
