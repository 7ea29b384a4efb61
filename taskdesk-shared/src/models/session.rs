/// Login session model
///
/// A session binds an opaque bearer token to a user until `expires_at`.
/// Only the SHA-256 hash of the token is stored.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     id         INTEGER PRIMARY KEY AUTOINCREMENT,
///     user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token_hash TEXT    NOT NULL UNIQUE,
///     created_at TEXT    NOT NULL,
///     expires_at TEXT    NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::models::session::Session;
/// use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool) -> Result<(), sqlx::Error> {
/// let (_session, token) = Session::create(&pool, 1, chrono::Duration::hours(24)).await?;
/// let user = Session::resolve(&pool, &token).await?;
/// assert_eq!(user.map(|u| u.id), Some(1));
/// # Ok(())
/// # }
/// ```

use crate::auth::session_token::{generate_session_token, hash_session_token};
use crate::models::user::User;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::debug;

/// Stored session row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Opens a session for `user_id` lasting `ttl`
    ///
    /// # Returns
    ///
    /// The stored row and the plaintext token. The token is not recoverable
    /// afterwards.
    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        ttl: Duration,
    ) -> Result<(Self, String), sqlx::Error> {
        let (token, token_hash) = generate_session_token();
        let now = Utc::now();

        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, token_hash, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, user_id, token_hash, created_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(&token_hash)
        .bind(now)
        .bind(now + ttl)
        .fetch_one(pool)
        .await?;

        debug!(session_id = session.id, user_id, "Opened session");
        Ok((session, token))
    }

    /// Resolves a token to its user if the session exists and has not expired
    pub async fn resolve(pool: &SqlitePool, token: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.role, u.created_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = ? AND s.expires_at > ?
            "#,
        )
        .bind(hash_session_token(token))
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    /// Deletes the session for `token`; returns false if none matched
    pub async fn revoke(pool: &SqlitePool, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_session_token(token))
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every expired session
    pub async fn purge_expired(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
