//! Lightweight activity log backed by SQLite.
//!
//! Recording is best-effort: a failed insert is logged and swallowed so
//! that audit plumbing can never fail a user-facing request.

use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

/// One row of the activity feed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: i64,
    pub user_id: Option<String>,
    pub action: String,
    pub details: String,
    pub created_at: String,
}

/// Append-only audit trail of notable account events
#[derive(Clone)]
pub struct ActivityLog {
    pool: SqlitePool,
}

impl ActivityLog {
    pub async fn new(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS activity_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT,
                action TEXT NOT NULL,
                details TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Record an event; failures are logged, never surfaced.
    pub async fn record(&self, user_id: Option<&str>, action: &str, details: &str) {
        let result = sqlx::query(
            "INSERT INTO activity_log (user_id, action, details) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(action)
        .bind(details)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => debug!("Recorded activity: {}", action),
            Err(e) => warn!("Failed to record activity {}: {}", action, e),
        }
    }

    /// Most recent events, newest first
    pub async fn recent(&self, limit: i64) -> Result<Vec<ActivityEntry>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, user_id, action, details, created_at
             FROM activity_log ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ActivityEntry {
                id: row.get("id"),
                user_id: row.get("user_id"),
                action: row.get("action"),
                details: row.get("details"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
