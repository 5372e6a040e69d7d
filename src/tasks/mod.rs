//! Task service — the four operations (list, create, toggle, delete) as
//! single parameterized statements against the `tasks` table.

use anyhow::{Context as _, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::storage::with_timeout;

/// Confirmation payload returned by delete regardless of whether a row existed.
pub const DELETED_MESSAGE: &str = "Deleted successfully";

/// A task as surfaced at the API boundary.
///
/// `created_at` stays internal to the table — clients only ever see these
/// four fields, with `task_date` always in `YYYY-MM-DD` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    pub task_date: String,
}

#[derive(Clone)]
pub struct TaskService {
    pool: SqlitePool,
}

impl TaskService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All tasks, newest first. No pagination, no server-side filtering.
    pub async fn list(&self) -> Result<Vec<Task>> {
        with_timeout(async {
            let rows = sqlx::query_as::<_, Task>(
                "SELECT id, title, completed, task_date FROM tasks
                 ORDER BY created_at DESC, id DESC",
            )
            .fetch_all(&self.pool)
            .await
            .context("Fetching tasks")?;
            Ok(rows)
        })
        .await
    }

    /// Insert a new task with `completed = false` and return the created row.
    ///
    /// `date` is coerced to ISO form on ingress — anything that does not parse
    /// as a calendar date is rejected before the write.
    pub async fn create(&self, title: &str, date: &str) -> Result<Task> {
        let task_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("invalid task date: {date:?}"))?
            .format("%Y-%m-%d")
            .to_string();
        let now = Utc::now().to_rfc3339();

        with_timeout(async {
            let row = sqlx::query_as::<_, Task>(
                "INSERT INTO tasks (title, task_date, completed, created_at)
                 VALUES (?, ?, 0, ?)
                 RETURNING id, title, completed, task_date",
            )
            .bind(title)
            .bind(&task_date)
            .bind(&now)
            .fetch_one(&self.pool)
            .await
            .context("Inserting task")?;
            Ok(row)
        })
        .await
    }

    /// Flip `completed` for the row matching `id` and return the updated row.
    /// Returns `None` when no row matches — callers treat that as a no-op.
    pub async fn toggle(&self, id: i64) -> Result<Option<Task>> {
        with_timeout(async {
            let row = sqlx::query_as::<_, Task>(
                "UPDATE tasks SET completed = NOT completed WHERE id = ?
                 RETURNING id, title, completed, task_date",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Toggling task")?;
            Ok(row)
        })
        .await
    }

    /// Remove the row matching `id` unconditionally. Deleting an id that does
    /// not exist is not an error — the confirmation is the same either way.
    pub async fn delete(&self, id: i64) -> Result<()> {
        with_timeout(async {
            sqlx::query("DELETE FROM tasks WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .context("Deleting task")?;
            Ok(())
        })
        .await
    }
}
