// src/worker/mod.rs
//! Queue consumer. Each slot claims one job at a time; a heartbeat keeps the
//! job's lock alive while it runs, and a separate loop hands stalled jobs back.

pub mod pipeline;

pub use pipeline::{ApplicationPipeline, NoProgress, PipelineSettings, ProgressReporter, Route};

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::config_manager::WorkerConfig;
use crate::queue::{ApplicationJob, JobKind, JobQueue, QueueError, QueueJob, RejectionEmailJob};

/// Mirrors pipeline progress onto the queue row
struct QueueProgress {
    queue: JobQueue,
    job_id: i64,
}

#[async_trait]
impl ProgressReporter for QueueProgress {
    async fn report(&self, percent: u8) {
        if let Err(e) = self.queue.set_progress(self.job_id, percent).await {
            warn!("Could not record progress for job {}: {}", self.job_id, e);
        }
    }
}

#[derive(Clone)]
pub struct Worker {
    queue: JobQueue,
    pipeline: Arc<ApplicationPipeline>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(queue: JobQueue, pipeline: Arc<ApplicationPipeline>, config: WorkerConfig) -> Self {
        Self {
            queue,
            pipeline,
            config,
        }
    }

    /// Run until `shutdown` turns true. Jobs already running are finished first.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let slots = self.config.concurrency.max(1);
        info!(
            "Worker started with {} slots (poll {}ms, lock {}ms)",
            slots, self.config.poll_interval_ms, self.config.lock_duration_ms
        );

        if let Err(e) = self.queue.recover_stalled().await {
            warn!("Initial stalled job check failed: {}", e);
        }

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(slots + 1);
        for slot in 0..slots {
            let worker = self.clone();
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                worker.slot_loop(slot, shutdown).await;
            }));
        }

        let worker = self.clone();
        handles.push(tokio::spawn(async move {
            worker.stalled_loop(shutdown).await;
        }));

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Worker task ended abnormally: {}", e);
            }
        }

        info!("Worker stopped");
        Ok(())
    }

    /// Claim and process a single due job. Returns false when nothing was due.
    pub async fn process_next(&self) -> Result<bool> {
        match self.queue.claim_next(self.config.lock_duration_ms).await? {
            Some(job) => {
                self.handle(job).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn slot_loop(&self, slot: usize, mut shutdown: watch::Receiver<bool>) {
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(10));

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.process_next().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => error!("Slot {} failed to claim a job: {:#}", slot, e),
            }

            tokio::select! {
                _ = tokio::time::sleep(poll) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!("Worker slot {} exited", slot);
    }

    async fn stalled_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let period = Duration::from_millis(self.config.stalled_interval_ms.max(100));

        loop {
            tokio::select! {
                _ = tokio::time::sleep(period) => {
                    if let Err(e) = self.queue.recover_stalled().await {
                        error!("Stalled job check failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn handle(&self, job: QueueJob) {
        info!(
            "Processing job {} ({}) for {}, attempt {}/{}",
            job.id,
            job.kind,
            job.label(),
            job.attempts_made,
            job.max_attempts
        );

        let heartbeat = self.spawn_heartbeat(job.id);
        let outcome = self.dispatch(&job).await;
        heartbeat.abort();

        let recorded = match outcome {
            Ok(()) => self.queue.complete(&job).await,
            Err(e) => self.queue.fail(&job, &format!("{:#}", e)).await.map(|_| ()),
        };

        match recorded {
            Ok(()) => {}
            Err(QueueError::LostLock { id, attempt }) => warn!(
                "Job {} attempt {} lost its lock before finishing, result dropped",
                id, attempt
            ),
            Err(e) => error!("Could not record outcome of job {}: {}", job.id, e),
        }
    }

    fn spawn_heartbeat(&self, job_id: i64) -> JoinHandle<()> {
        let queue = self.queue.clone();
        let lock_ms = self.config.lock_duration_ms;
        let every = Duration::from_millis((lock_ms / 2).max(500) as u64);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match queue.renew_lock(job_id, lock_ms).await {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!("Job {} lost its lock", job_id);
                        break;
                    }
                    Err(e) => warn!("Lock renewal for job {} failed: {}", job_id, e),
                }
            }
        })
    }

    async fn dispatch(&self, job: &QueueJob) -> Result<()> {
        match job.kind {
            JobKind::HrApplication => {
                let payload: ApplicationJob = job.payload_as()?;
                let progress = QueueProgress {
                    queue: self.queue.clone(),
                    job_id: job.id,
                };
                self.pipeline.process(&payload, &progress).await?;
            }
            JobKind::RejectionEmail => {
                let payload: RejectionEmailJob = job.payload_as()?;
                self.pipeline.send_rejection(&payload).await?;
            }
        }
        Ok(())
    }
}
