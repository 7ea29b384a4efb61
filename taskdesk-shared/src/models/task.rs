/// Task model and database operations
///
/// Tasks move through `TODO → IN_PROGRESS → DONE`. Any status may follow any
/// other; the dedicated review actions live in [`crate::lifecycle`]. The
/// `pending_review` flag is independent of the status.
///
/// # Assignees
///
/// The assignee set is stored only in `task_assignees`, ordered by
/// `position`. The primary assignee is the first entry and is never
/// persisted separately.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id                 INTEGER PRIMARY KEY AUTOINCREMENT,
///     title              TEXT    NOT NULL,
///     description        TEXT,
///     status             TEXT    NOT NULL DEFAULT 'TODO',
///     category           TEXT    NOT NULL DEFAULT 'one-time',
///     priority           INTEGER NOT NULL DEFAULT 3,
///     created_by_user_id INTEGER NOT NULL REFERENCES users(id),
///     pending_review     INTEGER NOT NULL DEFAULT 0,
///     due_at             TEXT,
///     completed_at       TEXT,
///     created_at         TEXT    NOT NULL,
///     updated_at         TEXT    NOT NULL
/// );
///
/// CREATE TABLE task_assignees (
///     task_id  INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id  INTEGER NOT NULL,
///     position INTEGER NOT NULL,
///     PRIMARY KEY (task_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::models::task::{CreateTask, Task, TaskStatus};
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     title: "Quarterly report".to_string(),
///     created_by: 1,
///     assignee_id: Some(2),
///     ..CreateTask::default()
/// }).await?;
///
/// assert_eq!(task.primary_assignee(), Some(2));
///
/// Task::update_status(&pool, task.id, TaskStatus::Done).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Default category for new tasks
pub const DEFAULT_CATEGORY: &str = "one-time";

/// Default priority for new tasks (convention: 1 = highest, 5 = lowest)
pub const DEFAULT_PRIORITY: i64 = 3;

/// Task status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Not started
    #[default]
    Todo,

    /// Being worked on
    InProgress,

    /// Finished
    Done,
}

impl TaskStatus {
    /// Converts status to its stored name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }

    /// `completed_at` for a task entering this status
    ///
    /// DONE keeps an existing completion time (or stamps `now`); every other
    /// status clears it.
    pub fn completed_at(
        &self,
        previous: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match self {
            TaskStatus::Done => Some(previous.unwrap_or(now)),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status name is not one of the known statuses
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Task with its assignee set populated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub category: String,
    pub priority: i64,

    /// Creator; set once at creation
    pub created_by_user_id: i64,

    /// Ordered, de-duplicated assignee ids
    pub assignee_ids: Vec<i64>,

    /// Awaiting a manager/admin decision after a staff submission
    pub pending_review: bool,

    /// Free-form due date as supplied by the client
    pub due_at: Option<String>,

    /// Set only while status is DONE
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    category: String,
    priority: i64,
    created_by_user_id: i64,
    pending_review: bool,
    due_at: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskRow {
    fn into_task(self, assignee_ids: Vec<i64>) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description,
            status: self.status,
            category: self.category,
            priority: self.priority,
            created_by_user_id: self.created_by_user_id,
            assignee_ids,
            pending_review: self.pending_review,
            due_at: self.due_at,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.status, t.category, t.priority, \
     t.created_by_user_id, t.pending_review, t.due_at, t.completed_at, t.created_at, t.updated_at";

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub category: String,
    pub priority: i64,
    pub due_at: Option<String>,

    /// Creator; also the fallback assignee
    pub created_by: i64,

    /// Single-assignee field
    pub assignee_id: Option<i64>,

    /// Multi-assignee list; merged ahead of `assignee_id`
    pub assignee_ids: Vec<i64>,

    pub pending_review: bool,
}

impl Default for CreateTask {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            status: TaskStatus::Todo,
            category: DEFAULT_CATEGORY.to_string(),
            priority: DEFAULT_PRIORITY,
            due_at: None,
            created_by: 0,
            assignee_id: None,
            assignee_ids: Vec::new(),
            pending_review: false,
        }
    }
}

/// Resolves the stored assignee set
///
/// The multi-assignee list comes first, then the single assignee; ids that
/// are not positive are dropped and duplicates keep their first position.
/// An empty result falls back to the creator.
pub fn resolve_assignees(assignee_ids: &[i64], assignee_id: Option<i64>, creator: i64) -> Vec<i64> {
    let mut resolved: Vec<i64> = Vec::with_capacity(assignee_ids.len() + 1);

    for id in assignee_ids.iter().copied().chain(assignee_id) {
        if id > 0 && !resolved.contains(&id) {
            resolved.push(id);
        }
    }

    if resolved.is_empty() {
        resolved.push(creator);
    }

    resolved
}

impl Task {
    /// Primary assignee: the first member of the assignee set
    pub fn primary_assignee(&self) -> Option<i64> {
        self.assignee_ids.first().copied()
    }

    /// Whether `user_id` is in the assignee set
    pub fn has_assignee(&self, user_id: i64) -> bool {
        self.assignee_ids.contains(&user_id)
    }

    /// Creates a task and its assignee links in one transaction
    ///
    /// Returns the reloaded task with the resolved assignee set.
    pub async fn create(pool: &SqlitePool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let assignees = resolve_assignees(&data.assignee_ids, data.assignee_id, data.created_by);
        let now = Utc::now();

        let mut tx = pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tasks (title, description, status, category, priority,
                               created_by_user_id, pending_review, due_at,
                               completed_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.status)
        .bind(&data.category)
        .bind(data.priority)
        .bind(data.created_by)
        .bind(data.pending_review)
        .bind(&data.due_at)
        .bind(data.status.completed_at(None, now))
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        replace_assignees(&mut tx, id, &assignees).await?;

        tx.commit().await?;

        debug!(task_id = id, assignees = ?assignees, "Created task");

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Finds a task by ID with its assignee set
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let assignees: Vec<i64> = sqlx::query_scalar(
            "SELECT user_id FROM task_assignees WHERE task_id = ? ORDER BY position",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(Some(row.into_task(assignees)))
    }

    /// Lists all tasks, newest first
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks t ORDER BY t.created_at DESC, t.id DESC"
        ))
        .fetch_all(pool)
        .await?;

        let links: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT task_id, user_id FROM task_assignees ORDER BY task_id, position",
        )
        .fetch_all(pool)
        .await?;

        Ok(attach_assignees(rows, links))
    }

    /// Lists tasks whose assignee set contains `user_id`, newest first
    pub async fn find_by_assignee(
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks t
            JOIN task_assignees ta ON ta.task_id = t.id
            WHERE ta.user_id = ?
            ORDER BY t.created_at DESC, t.id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let links: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT task_id, user_id
            FROM task_assignees
            WHERE task_id IN (SELECT task_id FROM task_assignees WHERE user_id = ?)
            ORDER BY task_id, position
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(attach_assignees(rows, links))
    }

    /// Overwrites every mutable field of `task` and re-resolves its assignees
    ///
    /// `completed_at` follows the status: kept or stamped for DONE, cleared
    /// otherwise. Returns the reloaded task, or `None` if it no longer exists.
    pub async fn update(pool: &SqlitePool, task: &Task) -> Result<Option<Self>, sqlx::Error> {
        let assignees = resolve_assignees(&task.assignee_ids, None, task.created_by_user_id);
        let now = Utc::now();

        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = ?, description = ?, status = ?, category = ?, priority = ?,
                due_at = ?, pending_review = ?, completed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(&task.category)
        .bind(task.priority)
        .bind(&task.due_at)
        .bind(task.pending_review)
        .bind(task.status.completed_at(task.completed_at, now))
        .bind(now)
        .bind(task.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        replace_assignees(&mut tx, task.id, &assignees).await?;

        tx.commit().await?;

        debug!(task_id = task.id, status = %task.status, "Updated task");

        Self::find_by_id(pool, task.id).await
    }

    /// Sets only the status; `completed_at` becomes now for DONE, null otherwise
    pub async fn update_status(
        pool: &SqlitePool,
        id: i64,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE tasks SET status = ?, completed_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(status.completed_at(None, now))
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        debug!(task_id = id, status = %status, "Updated task status");

        Self::find_by_id(pool, id).await
    }

    /// Sets only the pending-review flag
    pub async fn set_pending_review(
        pool: &SqlitePool,
        id: i64,
        pending: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let result =
            sqlx::query("UPDATE tasks SET pending_review = ?, updated_at = ? WHERE id = ?")
                .bind(pending)
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        debug!(task_id = id, pending_review = pending, "Updated review flag");

        Self::find_by_id(pool, id).await
    }

    /// Clears pending review and forces DONE with a fresh completion time
    pub async fn approve(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET pending_review = 0, status = ?, completed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(TaskStatus::Done)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        debug!(task_id = id, "Approved task");

        Self::find_by_id(pool, id).await
    }

    /// Deletes a task with its comments and assignee links
    ///
    /// Returns false if the task did not exist. Notifications are kept.
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE task_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM task_assignees WHERE task_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(task_id = id, deleted = result.rows_affected() > 0, "Deleted task");

        Ok(result.rows_affected() > 0)
    }
}

async fn replace_assignees(
    conn: &mut SqliteConnection,
    task_id: i64,
    assignees: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM task_assignees WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut *conn)
        .await?;

    for (position, user_id) in assignees.iter().enumerate() {
        sqlx::query("INSERT INTO task_assignees (task_id, user_id, position) VALUES (?, ?, ?)")
            .bind(task_id)
            .bind(*user_id)
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

fn attach_assignees(rows: Vec<TaskRow>, links: Vec<(i64, i64)>) -> Vec<Task> {
    let mut by_task: HashMap<i64, Vec<i64>> = HashMap::new();
    for (task_id, user_id) in links {
        by_task.entry(task_id).or_default().push(user_id);
    }

    rows.into_iter()
        .map(|row| {
            let assignees = by_task.remove(&row.id).unwrap_or_default();
            row.into_task(assignees)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_resolve_assignees_merges_list_then_single() {
        assert_eq!(resolve_assignees(&[4, 2], Some(7), 1), vec![4, 2, 7]);
    }

    #[test]
    fn test_resolve_assignees_deduplicates_keeping_first_position() {
        assert_eq!(resolve_assignees(&[3, 5, 3], Some(5), 1), vec![3, 5]);
    }

    #[test]
    fn test_resolve_assignees_falls_back_to_creator() {
        assert_eq!(resolve_assignees(&[], None, 9), vec![9]);
        assert_eq!(resolve_assignees(&[0, -1], Some(0), 9), vec![9]);
    }

    #[test]
    fn test_status_parse_rejects_unknown_names() {
        assert_eq!("IN_PROGRESS".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert!("done".parse::<TaskStatus>().is_err());
        assert!("".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
    }

    #[test]
    fn test_completed_at_only_survives_done() {
        let now = Utc::now();
        let earlier = now - Duration::hours(2);

        assert_eq!(TaskStatus::Done.completed_at(None, now), Some(now));
        assert_eq!(TaskStatus::Done.completed_at(Some(earlier), now), Some(earlier));
        assert_eq!(TaskStatus::InProgress.completed_at(Some(earlier), now), None);
        assert_eq!(TaskStatus::Todo.completed_at(None, now), None);
    }

    #[test]
    fn test_primary_assignee_is_first_member() {
        let now = Utc::now();
        let task = TaskRow {
            id: 1,
            title: "t".to_string(),
            description: None,
            status: TaskStatus::Todo,
            category: DEFAULT_CATEGORY.to_string(),
            priority: DEFAULT_PRIORITY,
            created_by_user_id: 1,
            pending_review: false,
            due_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
        .into_task(vec![5, 3]);

        assert_eq!(task.primary_assignee(), Some(5));
        assert!(task.has_assignee(3));
        assert!(!task.has_assignee(1));
    }

    #[test]
    fn test_attach_assignees_preserves_row_order() {
        let now = Utc::now();
        let row = |id| TaskRow {
            id,
            title: format!("task {id}"),
            description: None,
            status: TaskStatus::Todo,
            category: DEFAULT_CATEGORY.to_string(),
            priority: DEFAULT_PRIORITY,
            created_by_user_id: 1,
            pending_review: false,
            due_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };

        let tasks = attach_assignees(vec![row(2), row(1)], vec![(1, 4), (2, 6), (2, 5)]);

        assert_eq!(tasks[0].id, 2);
        assert_eq!(tasks[0].assignee_ids, vec![6, 5]);
        assert_eq!(tasks[1].assignee_ids, vec![4]);
    }
}
