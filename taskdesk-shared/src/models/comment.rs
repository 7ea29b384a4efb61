/// Comment model and database operations
///
/// Comments are append-only free text attached to a task. The server assigns
/// `created_at`; there is no edit operation.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     id         INTEGER PRIMARY KEY AUTOINCREMENT,
///     task_id    INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id    INTEGER NOT NULL REFERENCES users(id),
///     text       TEXT    NOT NULL,
///     created_at TEXT    NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

/// Comment on a task
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,

    /// Author
    pub user_id: i64,

    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Appends a comment to a task
    pub async fn create(
        pool: &SqlitePool,
        task_id: i64,
        user_id: i64,
        text: &str,
    ) -> Result<Self, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, user_id, text, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, task_id, user_id, text, created_at
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .bind(text)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        debug!(comment_id = comment.id, task_id, user_id, "Created comment");
        Ok(comment)
    }

    /// Lists the comments on a task, oldest first
    pub async fn list_by_task(pool: &SqlitePool, task_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, user_id, text, created_at
            FROM comments
            WHERE task_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Finds a comment by ID
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, task_id, user_id, text, created_at FROM comments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a comment; returns false if it did not exist
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
