use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use taskline_core::errors::{TasklineError, TasklineResult};
use taskline_core::models::{TaskEnvelope, TaskPayload};
use taskline_core::traits::TaskQueue;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS queue (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id TEXT NOT NULL UNIQUE,
    task_name TEXT NOT NULL,
    payload TEXT NOT NULL,
    queue_name TEXT NOT NULL,
    enqueued_at INTEGER NOT NULL,
    eta INTEGER,
    exclusive INTEGER NOT NULL DEFAULT 0
)
"#;

/// Durable-flavored queue strategy backed by an in-memory SQLite table.
///
/// The monotonic `seq` column preserves insertion order; timestamps are
/// stored as unix milliseconds so visibility filtering happens in SQL. The
/// pool is pinned to a single connection because every connection to
/// `sqlite::memory:` would otherwise see its own database.
pub struct SqliteQueue {
    pool: SqlitePool,
}

impl SqliteQueue {
    pub async fn connect() -> TasklineResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

fn envelope_from_row(row: &SqliteRow) -> TasklineResult<TaskEnvelope> {
    let payload_json: String = row.try_get("payload")?;
    let payload: TaskPayload = serde_json::from_str(&payload_json)
        .map_err(|e| TasklineError::Serialization(e.to_string()))?;
    let enqueued_at_ms: i64 = row.try_get("enqueued_at")?;
    let eta_ms: Option<i64> = row.try_get("eta")?;

    let to_datetime = |ms: i64| {
        DateTime::<Utc>::from_timestamp_millis(ms)
            .ok_or_else(|| TasklineError::Internal(format!("timestamp {ms} out of range")))
    };

    Ok(TaskEnvelope {
        task_id: row.try_get("task_id")?,
        task_name: row.try_get("task_name")?,
        payload,
        queue_name: row.try_get("queue_name")?,
        enqueued_at: to_datetime(enqueued_at_ms)?,
        eta: eta_ms.map(to_datetime).transpose()?,
        exclusive: row.try_get("exclusive")?,
    })
}

#[async_trait]
impl TaskQueue for SqliteQueue {
    async fn enqueue(&self, envelope: TaskEnvelope) -> TasklineResult<()> {
        let payload = serde_json::to_string(&envelope.payload)
            .map_err(|e| TasklineError::Serialization(e.to_string()))?;
        // The UNIQUE constraint on task_id is the duplicate check; no
        // read-then-insert window.
        sqlx::query(
            "INSERT INTO queue (task_id, task_name, payload, queue_name, enqueued_at, eta, exclusive) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&envelope.task_id)
        .bind(&envelope.task_name)
        .bind(payload)
        .bind(&envelope.queue_name)
        .bind(envelope.enqueued_at.timestamp_millis())
        .bind(envelope.eta.map(|eta| eta.timestamp_millis()))
        .bind(envelope.exclusive)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                TasklineError::DuplicateEnvelope {
                    task_id: envelope.task_id.clone(),
                }
            } else {
                TasklineError::Storage(e)
            }
        })?;
        Ok(())
    }

    async fn dequeue(&self, lane: &str) -> TasklineResult<Option<TaskEnvelope>> {
        // Single statement, so two concurrent callers can never take the
        // same row.
        let row = sqlx::query(
            "DELETE FROM queue WHERE task_id = ( \
                 SELECT task_id FROM queue \
                 WHERE queue_name = ? AND (eta IS NULL OR eta <= ?) \
                 ORDER BY seq LIMIT 1 \
             ) RETURNING *",
        )
        .bind(lane)
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(envelope_from_row).transpose()
    }

    async fn dequeue_any(&self, lane: &str) -> TasklineResult<Option<TaskEnvelope>> {
        let row = sqlx::query(
            "DELETE FROM queue WHERE task_id = ( \
                 SELECT task_id FROM queue WHERE queue_name = ? \
                 ORDER BY seq LIMIT 1 \
             ) RETURNING *",
        )
        .bind(lane)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(envelope_from_row).transpose()
    }

    async fn peek(&self, lane: &str, count: usize) -> TasklineResult<Vec<TaskEnvelope>> {
        let rows = sqlx::query(
            "SELECT * FROM queue WHERE queue_name = ? AND (eta IS NULL OR eta <= ?) \
             ORDER BY seq LIMIT ?",
        )
        .bind(lane)
        .bind(Utc::now().timestamp_millis())
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(envelope_from_row).collect()
    }

    async fn move_to_lane(&self, task_id: &str, new_lane: &str) -> TasklineResult<()> {
        let result = sqlx::query("UPDATE queue SET queue_name = ? WHERE task_id = ?")
            .bind(new_lane)
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TasklineError::EnvelopeNotFound {
                task_id: task_id.to_string(),
            });
        }
        Ok(())
    }

    async fn reschedule(
        &self,
        task_id: &str,
        new_eta: Option<DateTime<Utc>>,
    ) -> TasklineResult<()> {
        let result = sqlx::query("UPDATE queue SET eta = ? WHERE task_id = ?")
            .bind(new_eta.map(|eta| eta.timestamp_millis()))
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TasklineError::EnvelopeNotFound {
                task_id: task_id.to_string(),
            });
        }
        Ok(())
    }

    async fn remove(&self, task_id: &str) -> TasklineResult<TaskEnvelope> {
        let row = sqlx::query("DELETE FROM queue WHERE task_id = ? RETURNING *")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Err(TasklineError::EnvelopeNotFound {
                task_id: task_id.to_string(),
            });
        };
        envelope_from_row(&row)
    }

    async fn has_queued(&self, task_name: &str) -> TasklineResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue WHERE task_name = ?")
            .bind(task_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn lanes(&self) -> TasklineResult<Vec<String>> {
        let lanes: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT queue_name FROM queue ORDER BY queue_name")
                .fetch_all(&self.pool)
                .await?;
        Ok(lanes)
    }

    async fn len(&self, lane: &str) -> TasklineResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue WHERE queue_name = ?")
            .bind(lane)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn total(&self) -> TasklineResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
