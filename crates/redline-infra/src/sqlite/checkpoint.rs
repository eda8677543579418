//! SQLite checkpoint store implementation.
//!
//! Implements `CheckpointStore` from `redline-core`. One row per run holds
//! the latest checkpoint; the run state is stored as a JSON blob. A save is a
//! single upsert statement, so readers see either the previous or the new
//! checkpoint and never a partial one.

use chrono::{DateTime, Utc};
use redline_core::repository::CheckpointStore;
use redline_types::error::StoreError;
use redline_types::run::{Checkpoint, RunId, RunState, RunStatus, RunSummary, Target};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `CheckpointStore`.
pub struct SqliteCheckpointStore {
    pool: DatabasePool,
}

impl SqliteCheckpointStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct CheckpointRow {
    run_id: String,
    next_node: String,
    status: String,
    step: i64,
    state: Option<String>,
    created_at: Option<String>,
    updated_at: String,
}

impl CheckpointRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow, with_state: bool) -> Result<Self, sqlx::Error> {
        Ok(Self {
            run_id: row.try_get("run_id")?,
            next_node: row.try_get("next_node")?,
            status: row.try_get("status")?,
            step: row.try_get("step")?,
            state: if with_state {
                Some(row.try_get("state")?)
            } else {
                None
            },
            created_at: if with_state {
                Some(row.try_get("created_at")?)
            } else {
                None
            },
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn parse_header(&self) -> Result<(RunId, Target, RunStatus, DateTime<Utc>), StoreError> {
        let run_id: RunId = self
            .run_id
            .parse()
            .map_err(|e| StoreError::Persistence(format!("invalid run id '{}': {e}", self.run_id)))?;
        let corrupt = |reason: String| StoreError::Corrupt { run_id, reason };

        let next: Target = self.next_node.parse().map_err(corrupt)?;
        let status: RunStatus = self.status.parse().map_err(corrupt)?;
        let updated_at = parse_datetime(&self.updated_at).map_err(corrupt)?;
        Ok((run_id, next, status, updated_at))
    }

    fn into_summary(self) -> Result<RunSummary, StoreError> {
        let (run_id, next, status, updated_at) = self.parse_header()?;
        Ok(RunSummary {
            run_id,
            next,
            status,
            step: self.step as u64,
            updated_at,
        })
    }

    fn into_checkpoint(self) -> Result<Checkpoint, StoreError> {
        let (run_id, next, status, updated_at) = self.parse_header()?;
        let corrupt = |reason: String| StoreError::Corrupt { run_id, reason };

        let state: RunState = serde_json::from_str(self.state.as_deref().unwrap_or_default())
            .map_err(|e| corrupt(format!("invalid state JSON: {e}")))?;
        let created_at = parse_datetime(self.created_at.as_deref().unwrap_or_default()).map_err(corrupt)?;

        Ok(Checkpoint {
            run_id,
            next,
            status,
            step: self.step as u64,
            state,
            created_at,
            updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid datetime '{s}': {e}"))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn persistence(e: sqlx::Error) -> StoreError {
    StoreError::Persistence(e.to_string())
}

// ---------------------------------------------------------------------------
// CheckpointStore impl
// ---------------------------------------------------------------------------

impl CheckpointStore for SqliteCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        let state_json = serde_json::to_string(&checkpoint.state)
            .map_err(|e| StoreError::Persistence(format!("serialize state: {e}")))?;

        sqlx::query(
            r#"INSERT INTO run_checkpoints (run_id, next_node, status, step, state, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(run_id) DO UPDATE SET
                 next_node = excluded.next_node,
                 status = excluded.status,
                 step = excluded.step,
                 state = excluded.state,
                 updated_at = excluded.updated_at"#,
        )
        .bind(checkpoint.run_id.to_string())
        .bind(checkpoint.next.to_string())
        .bind(checkpoint.status.to_string())
        .bind(checkpoint.step as i64)
        .bind(&state_json)
        .bind(format_datetime(&checkpoint.created_at))
        .bind(format_datetime(&checkpoint.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(persistence)?;

        Ok(())
    }

    async fn load(&self, run_id: &RunId) -> Result<Checkpoint, StoreError> {
        let row = sqlx::query(
            "SELECT run_id, next_node, status, step, state, created_at, updated_at FROM run_checkpoints WHERE run_id = ?",
        )
        .bind(run_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(persistence)?;

        match row {
            Some(row) => CheckpointRow::from_row(&row, true)
                .map_err(persistence)?
                .into_checkpoint(),
            None => Err(StoreError::RunNotFound(*run_id)),
        }
    }

    async fn exists(&self, run_id: &RunId) -> Result<bool, StoreError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM run_checkpoints WHERE run_id = ?")
            .bind(run_id.to_string())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(persistence)?;
        Ok(row.0 > 0)
    }

    async fn list_runs(&self) -> Result<Vec<RunSummary>, StoreError> {
        let rows = sqlx::query(
            "SELECT run_id, next_node, status, step, updated_at FROM run_checkpoints ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(persistence)?;

        rows.iter()
            .map(|row| {
                CheckpointRow::from_row(row, false)
                    .map_err(persistence)?
                    .into_summary()
            })
            .collect()
    }

    async fn delete(&self, run_id: &RunId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM run_checkpoints WHERE run_id = ?")
            .bind(run_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(persistence)?;
        Ok(result.rows_affected() > 0)
    }
}
