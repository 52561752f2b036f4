// src/queue/mod.rs
//! Durable job queue stored in the `queue_jobs` table.
//!
//! Jobs move `waiting -> active -> completed | failed`. A claimed job holds a lock
//! that the worker renews while it runs; when a lock expires the job is treated as
//! stalled and handed back to the queue. Failed attempts are retried with
//! exponential backoff until `max_attempts` is reached.

pub mod jobs;

pub use jobs::{ApplicationJob, JobKind, RejectionEmailJob};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::core::config_manager::QueueConfig;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("Job {0} not found")]
    NotFound(i64),
    /// The job was reclaimed or finished elsewhere after this worker's lock expired
    #[error("Job {id} attempt {attempt} no longer holds the lock")]
    LostLock { id: i64, attempt: u32 },
    #[error("Corrupt queue row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn parse(value: &str) -> Result<Self, QueueError> {
        match value {
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(QueueError::Corrupt(format!("unknown job state '{}'", other))),
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-job overrides; `None` falls back to the queue defaults
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    pub delay_ms: i64,
    /// Lower runs first
    pub priority: i64,
    pub attempts: Option<u32>,
    pub backoff_ms: Option<i64>,
}

impl EnqueueOptions {
    pub fn delayed(delay_ms: i64) -> Self {
        Self {
            delay_ms,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueJob {
    pub id: i64,
    pub kind: JobKind,
    pub payload: Value,
    pub state: JobState,
    pub priority: i64,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub backoff_ms: i64,
    pub run_at: i64,
    pub progress: u8,
    pub last_error: Option<String>,
}

impl QueueJob {
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, QueueError> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }

    /// Candidate name when the payload has one, the job kind otherwise
    pub fn label(&self) -> &str {
        self.payload
            .get("candidateName")
            .and_then(Value::as_str)
            .unwrap_or(self.kind.as_str())
    }

    pub fn attempts_left(&self) -> bool {
        self.attempts_made < self.max_attempts
    }

    fn lost_lock(&self) -> QueueError {
        QueueError::LostLock {
            id: self.id,
            attempt: self.attempts_made,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Back to waiting until `run_at` (epoch ms)
    Retrying { run_at: i64 },
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueCounts {
    pub waiting: i64,
    pub delayed: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// `base * 2^(attempt - 1)` for the attempt that just failed
pub fn backoff_delay(base_ms: i64, attempts_made: u32) -> i64 {
    let exponent = attempts_made.saturating_sub(1).min(20);
    base_ms.saturating_mul(1_i64 << exponent)
}

const JOB_COLUMNS: &str = "id, kind, payload, state, priority, attempts_made, max_attempts, \
                           backoff_ms, run_at, progress, last_error";

#[derive(Clone)]
pub struct JobQueue {
    pool: SqlitePool,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(pool: SqlitePool, config: QueueConfig) -> Self {
        Self { pool, config }
    }

    pub async fn enqueue<P: Serialize>(
        &self,
        kind: JobKind,
        payload: &P,
        options: EnqueueOptions,
    ) -> Result<i64, QueueError> {
        let now = now_ms();
        let payload = serde_json::to_string(payload)?;
        let attempts = options.attempts.unwrap_or(self.config.attempts).max(1);
        let backoff = options.backoff_ms.unwrap_or(self.config.backoff_ms).max(0);

        let result = sqlx::query(
            r#"
            INSERT INTO queue_jobs (
                kind, payload, state, priority, attempts_made, max_attempts, backoff_ms,
                run_at, progress, created_at, updated_at
            )
            VALUES (?, ?, 'waiting', ?, 0, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(kind.as_str())
        .bind(&payload)
        .bind(options.priority)
        .bind(attempts as i64)
        .bind(backoff)
        .bind(now + options.delay_ms.max(0))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            "Queued {} job {} (delay {}ms, priority {})",
            kind, id, options.delay_ms, options.priority
        );
        Ok(id)
    }

    pub async fn get(&self, id: i64) -> Result<Option<QueueJob>, QueueError> {
        let row = sqlx::query(&format!("SELECT {} FROM queue_jobs WHERE id = ?", JOB_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_job).transpose()
    }

    /// Take the most urgent due job, mark it active and lock it for `lock_ms`
    pub async fn claim_next(&self, lock_ms: i64) -> Result<Option<QueueJob>, QueueError> {
        self.claim_next_at(now_ms(), lock_ms).await
    }

    async fn claim_next_at(&self, now: i64, lock_ms: i64) -> Result<Option<QueueJob>, QueueError> {
        // Single statement, so concurrent claimers never receive the same job
        let sql = format!(
            r#"
            UPDATE queue_jobs
            SET state = 'active',
                attempts_made = attempts_made + 1,
                locked_until = ?,
                updated_at = ?
            WHERE state = 'waiting'
              AND id = (
                SELECT id FROM queue_jobs
                WHERE state = 'waiting' AND run_at <= ?
                ORDER BY priority ASC, run_at ASC, id ASC
                LIMIT 1
              )
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(now + lock_ms)
            .bind(now)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_job).transpose()
    }

    /// Extend the lock of a running job. False once the job is no longer active.
    pub async fn renew_lock(&self, id: i64, lock_ms: i64) -> Result<bool, QueueError> {
        let now = now_ms();
        let updated = sqlx::query(
            "UPDATE queue_jobs SET locked_until = ?, updated_at = ? WHERE id = ? AND state = 'active'",
        )
        .bind(now + lock_ms)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(updated.rows_affected() > 0)
    }

    pub async fn set_progress(&self, id: i64, progress: u8) -> Result<(), QueueError> {
        let updated = sqlx::query("UPDATE queue_jobs SET progress = ?, updated_at = ? WHERE id = ?")
            .bind(progress.min(100) as i64)
            .bind(now_ms())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(QueueError::NotFound(id));
        }
        Ok(())
    }

    pub async fn complete(&self, job: &QueueJob) -> Result<(), QueueError> {
        let now = now_ms();
        let updated = sqlx::query(
            r#"
            UPDATE queue_jobs
            SET state = 'completed', locked_until = NULL, last_error = NULL,
                finished_at = ?, updated_at = ?
            WHERE id = ? AND state = 'active' AND attempts_made = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(job.id)
        .bind(job.attempts_made as i64)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(job.lost_lock());
        }

        info!("Job {} completed successfully for {}", job.id, job.label());
        self.prune(JobState::Completed, self.config.keep_completed).await
    }

    /// Record a failed attempt; the job is retried while attempts remain
    pub async fn fail(&self, job: &QueueJob, reason: &str) -> Result<FailOutcome, QueueError> {
        self.fail_at(now_ms(), job, reason).await
    }

    async fn fail_at(
        &self,
        now: i64,
        job: &QueueJob,
        reason: &str,
    ) -> Result<FailOutcome, QueueError> {
        error!("Job {} failed for {}: {}", job.id, job.label(), reason);

        if job.attempts_left() {
            let run_at = now + backoff_delay(job.backoff_ms, job.attempts_made);
            let updated = sqlx::query(
                r#"
                UPDATE queue_jobs
                SET state = 'waiting', locked_until = NULL, run_at = ?, last_error = ?, updated_at = ?
                WHERE id = ? AND state = 'active' AND attempts_made = ?
                "#,
            )
            .bind(run_at)
            .bind(reason)
            .bind(now)
            .bind(job.id)
            .bind(job.attempts_made as i64)
            .execute(&self.pool)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(job.lost_lock());
            }

            info!(
                "Job {} will retry (attempt {}/{}) in {}ms",
                job.id,
                job.attempts_made + 1,
                job.max_attempts,
                run_at - now
            );
            return Ok(FailOutcome::Retrying { run_at });
        }

        self.mark_failed(job, reason, now).await?;
        self.prune(JobState::Failed, self.config.keep_failed).await?;
        Ok(FailOutcome::Failed)
    }

    /// Terminal failure of the attempt `job` describes
    async fn mark_failed(&self, job: &QueueJob, reason: &str, now: i64) -> Result<(), QueueError> {
        let updated = sqlx::query(
            r#"
            UPDATE queue_jobs
            SET state = 'failed', locked_until = NULL, last_error = ?, finished_at = ?, updated_at = ?
            WHERE id = ? AND state = 'active' AND attempts_made = ?
            "#,
        )
        .bind(reason)
        .bind(now)
        .bind(now)
        .bind(job.id)
        .bind(job.attempts_made as i64)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(job.lost_lock());
        }
        Ok(())
    }

    /// Hand jobs whose lock expired back to the queue. Returns how many were found.
    pub async fn recover_stalled(&self) -> Result<usize, QueueError> {
        self.recover_stalled_at(now_ms()).await
    }

    async fn recover_stalled_at(&self, now: i64) -> Result<usize, QueueError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM queue_jobs WHERE state = 'active' AND locked_until < ?",
            JOB_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let stalled = rows.iter().map(row_to_job).collect::<Result<Vec<_>, _>>()?;

        for job in &stalled {
            warn!("Job {} stalled for {}", job.id, job.label());

            if job.attempts_left() {
                sqlx::query(
                    r#"
                    UPDATE queue_jobs
                    SET state = 'waiting', locked_until = NULL, run_at = ?, updated_at = ?
                    WHERE id = ? AND state = 'active' AND attempts_made = ?
                    "#,
                )
                .bind(now)
                .bind(now)
                .bind(job.id)
                .bind(job.attempts_made as i64)
                .execute(&self.pool)
                .await?;
            } else {
                match self
                    .mark_failed(job, "job stalled more than allowable limit", now)
                    .await
                {
                    // Finished between the scan and the update
                    Ok(()) | Err(QueueError::LostLock { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        if !stalled.is_empty() {
            self.prune(JobState::Failed, self.config.keep_failed).await?;
        }
        Ok(stalled.len())
    }

    pub async fn counts(&self) -> Result<QueueCounts, QueueError> {
        let now = now_ms();
        let rows = sqlx::query(
            r#"
            SELECT state,
                   COUNT(*) AS total,
                   SUM(CASE WHEN run_at > ? THEN 1 ELSE 0 END) AS delayed
            FROM queue_jobs
            GROUP BY state
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = QueueCounts::default();
        for row in rows {
            let state: String = row.try_get("state")?;
            let total: i64 = row.try_get("total")?;
            let delayed: i64 = row.try_get::<Option<i64>, _>("delayed")?.unwrap_or(0);
            match JobState::parse(&state)? {
                JobState::Waiting => {
                    counts.delayed = delayed;
                    counts.waiting = total - delayed;
                }
                JobState::Active => counts.active = total,
                JobState::Completed => counts.completed = total,
                JobState::Failed => counts.failed = total,
            }
        }
        Ok(counts)
    }

    /// Keep only the newest `keep` jobs in a finished state
    async fn prune(&self, state: JobState, keep: i64) -> Result<(), QueueError> {
        let removed = sqlx::query(
            r#"
            DELETE FROM queue_jobs
            WHERE state = ?
              AND id NOT IN (
                SELECT id FROM queue_jobs
                WHERE state = ?
                ORDER BY finished_at DESC, id DESC
                LIMIT ?
              )
            "#,
        )
        .bind(state.as_str())
        .bind(state.as_str())
        .bind(keep.max(0))
        .execute(&self.pool)
        .await?;

        if removed.rows_affected() > 0 {
            info!("Removed {} old {} jobs", removed.rows_affected(), state);
        }
        Ok(())
    }
}

fn row_to_job(row: &SqliteRow) -> Result<QueueJob, QueueError> {
    let kind: String = row.try_get("kind")?;
    let state: String = row.try_get("state")?;
    let payload: String = row.try_get("payload")?;

    Ok(QueueJob {
        id: row.try_get("id")?,
        kind: kind.parse().map_err(QueueError::Corrupt)?,
        payload: serde_json::from_str(&payload)?,
        state: JobState::parse(&state)?,
        priority: row.try_get("priority")?,
        attempts_made: row.try_get::<i64, _>("attempts_made")?.max(0) as u32,
        max_attempts: row.try_get::<i64, _>("max_attempts")?.max(0) as u32,
        backoff_ms: row.try_get("backoff_ms")?,
        run_at: row.try_get("run_at")?,
        progress: row.try_get::<i64, _>("progress")?.clamp(0, 100) as u8,
        last_error: row.try_get("last_error")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;
    use serde_json::json;

    async fn queue_with(config: QueueConfig) -> JobQueue {
        let db = Database::in_memory().await.unwrap();
        JobQueue::new(db.pool().clone(), config)
    }

    async fn queue() -> JobQueue {
        queue_with(QueueConfig::default()).await
    }

    fn payload(name: &str) -> Value {
        json!({ "submissionId": format!("sub-{}", name), "candidateName": name })
    }

    #[test]
    fn test_backoff_is_exponential() {
        assert_eq!(backoff_delay(2000, 1), 2000);
        assert_eq!(backoff_delay(2000, 2), 4000);
        assert_eq!(backoff_delay(2000, 3), 8000);
        assert_eq!(backoff_delay(2000, 0), 2000);
    }

    #[tokio::test]
    async fn test_enqueue_applies_defaults() {
        let queue = queue().await;
        let id = queue
            .enqueue(JobKind::HrApplication, &payload("Jane"), EnqueueOptions::default())
            .await
            .unwrap();

        let job = queue.get(id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Waiting);
        assert_eq!(job.max_attempts, 3);
        assert_eq!(job.backoff_ms, 2000);
        assert_eq!(job.attempts_made, 0);
        assert_eq!(job.label(), "Jane");
    }

    #[tokio::test]
    async fn test_claim_respects_priority_and_delay() {
        let queue = queue().await;
        let low = queue
            .enqueue(
                JobKind::HrApplication,
                &payload("Low"),
                EnqueueOptions { priority: 5, ..Default::default() },
            )
            .await
            .unwrap();
        let high = queue
            .enqueue(
                JobKind::HrApplication,
                &payload("High"),
                EnqueueOptions { priority: 1, ..Default::default() },
            )
            .await
            .unwrap();
        queue
            .enqueue(
                JobKind::RejectionEmail,
                &payload("Later"),
                EnqueueOptions::delayed(60_000),
            )
            .await
            .unwrap();

        let now = now_ms() + 10;
        let first = queue.claim_next_at(now, 30_000).await.unwrap().unwrap();
        let second = queue.claim_next_at(now, 30_000).await.unwrap().unwrap();
        assert_eq!(first.id, high);
        assert_eq!(second.id, low);
        assert_eq!(first.state, JobState::Active);
        assert_eq!(first.attempts_made, 1);

        assert!(queue.claim_next_at(now, 30_000).await.unwrap().is_none());
        let delayed = queue.claim_next_at(now + 60_000, 30_000).await.unwrap().unwrap();
        assert_eq!(delayed.kind, JobKind::RejectionEmail);
    }

    #[tokio::test]
    async fn test_failed_attempts_back_off_then_fail() {
        let queue = queue().await;
        let id = queue
            .enqueue(
                JobKind::HrApplication,
                &payload("Jane"),
                EnqueueOptions { attempts: Some(2), backoff_ms: Some(1000), ..Default::default() },
            )
            .await
            .unwrap();

        let t = now_ms() + 10;
        let job = queue.claim_next_at(t, 30_000).await.unwrap().unwrap();
        let outcome = queue.fail_at(t, &job, "LLM timeout").await.unwrap();
        assert_eq!(outcome, FailOutcome::Retrying { run_at: t + 1000 });

        assert!(queue.claim_next_at(t + 999, 30_000).await.unwrap().is_none());
        let retry = queue.claim_next_at(t + 1000, 30_000).await.unwrap().unwrap();
        assert_eq!(retry.attempts_made, 2);
        assert_eq!(retry.last_error.as_deref(), Some("LLM timeout"));

        let outcome = queue.fail_at(t + 1000, &retry, "LLM timeout").await.unwrap();
        assert_eq!(outcome, FailOutcome::Failed);
        assert_eq!(queue.get(id).await.unwrap().unwrap().state, JobState::Failed);
    }

    #[tokio::test]
    async fn test_completed_jobs_are_pruned() {
        let queue = queue_with(QueueConfig { keep_completed: 2, ..QueueConfig::default() }).await;
        let mut ids = Vec::new();
        for name in ["A", "B", "C"] {
            ids.push(
                queue
                    .enqueue(JobKind::HrApplication, &payload(name), EnqueueOptions::default())
                    .await
                    .unwrap(),
            );
        }

        let now = now_ms() + 10;
        while let Some(job) = queue.claim_next_at(now, 30_000).await.unwrap() {
            queue.complete(&job).await.unwrap();
        }

        assert!(queue.get(ids[0]).await.unwrap().is_none());
        assert!(queue.get(ids[2]).await.unwrap().is_some());
        assert_eq!(queue.counts().await.unwrap().completed, 2);
    }

    #[tokio::test]
    async fn test_stalled_jobs_are_recovered() {
        let queue = queue().await;
        let id = queue
            .enqueue(JobKind::HrApplication, &payload("Jane"), EnqueueOptions::default())
            .await
            .unwrap();

        let t = now_ms() + 10;
        queue.claim_next_at(t, 1000).await.unwrap().unwrap();
        assert_eq!(queue.recover_stalled_at(t + 500).await.unwrap(), 0);
        assert_eq!(queue.recover_stalled_at(t + 2000).await.unwrap(), 1);

        let job = queue.get(id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Waiting);
        assert_eq!(job.attempts_made, 1);
    }

    #[tokio::test]
    async fn test_reclaimed_job_ignores_the_previous_holder() {
        let queue = queue().await;
        let id = queue
            .enqueue(JobKind::HrApplication, &payload("Jane"), EnqueueOptions::default())
            .await
            .unwrap();

        let t = now_ms() + 10;
        let stale = queue.claim_next_at(t, 1000).await.unwrap().unwrap();
        assert_eq!(queue.recover_stalled_at(t + 2000).await.unwrap(), 1);
        let live = queue.claim_next_at(t + 2000, 30_000).await.unwrap().unwrap();
        assert_eq!(live.attempts_made, 2);

        assert!(matches!(
            queue.complete(&stale).await,
            Err(QueueError::LostLock { attempt: 1, .. })
        ));
        assert!(matches!(
            queue.fail_at(t + 2100, &stale, "late failure").await,
            Err(QueueError::LostLock { .. })
        ));

        let row = queue.get(id).await.unwrap().unwrap();
        assert_eq!(row.state, JobState::Active);
        assert_eq!(row.attempts_made, 2);
        assert!(row.last_error.is_none());

        queue.complete(&live).await.unwrap();
        assert_eq!(queue.get(id).await.unwrap().unwrap().state, JobState::Completed);

        // Terminal states stay terminal
        assert!(matches!(
            queue.fail_at(t + 3000, &live, "after completion").await,
            Err(QueueError::LostLock { .. })
        ));
        assert_eq!(queue.get(id).await.unwrap().unwrap().state, JobState::Completed);
    }

    #[tokio::test]
    async fn test_stalled_job_without_attempts_fails() {
        let queue = queue().await;
        let id = queue
            .enqueue(
                JobKind::HrApplication,
                &payload("Jane"),
                EnqueueOptions { attempts: Some(1), ..Default::default() },
            )
            .await
            .unwrap();

        let t = now_ms() + 10;
        queue.claim_next_at(t, 1000).await.unwrap().unwrap();
        queue.recover_stalled_at(t + 2000).await.unwrap();

        let job = queue.get(id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert!(job.last_error.unwrap().contains("stalled"));
    }

    #[tokio::test]
    async fn test_progress_lock_and_counts() {
        let queue = queue().await;
        let id = queue
            .enqueue(JobKind::HrApplication, &payload("Jane"), EnqueueOptions::default())
            .await
            .unwrap();
        queue
            .enqueue(JobKind::RejectionEmail, &payload("Joe"), EnqueueOptions::delayed(60_000))
            .await
            .unwrap();

        let job = queue.claim_next(30_000).await.unwrap().unwrap();
        assert_eq!(job.id, id);
        queue.set_progress(id, 150).await.unwrap();
        assert!(queue.renew_lock(id, 30_000).await.unwrap());
        assert_eq!(queue.get(id).await.unwrap().unwrap().progress, 100);

        let counts = queue.counts().await.unwrap();
        assert_eq!(counts.active, 1);
        assert_eq!(counts.delayed, 1);
        assert_eq!(counts.waiting, 0);

        queue.complete(&job).await.unwrap();
        assert!(!queue.renew_lock(id, 30_000).await.unwrap());
        assert!(matches!(
            queue.set_progress(999, 10).await,
            Err(QueueError::NotFound(999))
        ));
    }
}
