//! Bounded media job queue
//!
//! Jobs are buffered in an mpsc channel and drained by a single worker loop
//! that spawns one task per job, limited by a semaphore. Jobs outlive the
//! webhook request that submitted them.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinSet;
use uuid::Uuid;

use super::{JobReport, MediaJob, MediaPipeline};
use crate::config::MediaConfig;
use crate::{Error, Result};

struct QueuedJob {
    job: MediaJob,
    done: oneshot::Sender<JobReport>,
}

/// Handle to a submitted job
#[derive(Debug)]
pub struct JobHandle {
    job_id: Uuid,
    rx: oneshot::Receiver<JobReport>,
}

impl JobHandle {
    #[must_use]
    pub const fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Wait for the job to finish
    ///
    /// # Errors
    ///
    /// Returns `Error::Media` if the worker dropped the job without a report
    pub async fn report(self) -> Result<JobReport> {
        self.rx
            .await
            .map_err(|_| Error::Media(format!("job {} ended without a report", self.job_id)))
    }
}

/// Sender side of the media worker
#[derive(Clone)]
pub struct MediaQueue {
    tx: mpsc::Sender<QueuedJob>,
}

impl MediaQueue {
    /// Start the worker loop on the current runtime
    #[must_use]
    pub fn start(pipeline: Arc<MediaPipeline>, config: &MediaConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let max_concurrent = config.max_concurrent_jobs.max(1);

        tokio::spawn(run_worker_loop(rx, pipeline, max_concurrent));
        tracing::debug!(
            capacity = config.queue_capacity,
            max_concurrent, "media queue started"
        );

        Self { tx }
    }

    /// Enqueue `job` without waiting
    ///
    /// # Errors
    ///
    /// Returns `Error::Media` if the queue is full or the worker has stopped
    pub fn submit(&self, job: MediaJob) -> Result<JobHandle> {
        let job_id = job.id;
        let (done, rx) = oneshot::channel();

        self.tx.try_send(QueuedJob { job, done }).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                tracing::warn!(job = %job_id, "media queue full, rejecting job");
                Error::Media("media queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => Error::Media("media queue is closed".to_string()),
        })?;

        tracing::debug!(job = %job_id, "media job queued");
        Ok(JobHandle { job_id, rx })
    }
}

async fn run_worker_loop(
    mut rx: mpsc::Receiver<QueuedJob>,
    pipeline: Arc<MediaPipeline>,
    max_concurrent: usize,
) {
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let mut workers = JoinSet::new();

    while let Some(queued) = rx.recv().await {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };

        // Reap finished tasks so the set does not grow without bound
        while let Some(result) = workers.try_join_next() {
            if let Err(e) = result {
                tracing::error!(error = %e, "media job task panicked");
            }
        }

        let pipeline = Arc::clone(&pipeline);
        workers.spawn(async move {
            let _permit = permit;
            let report = pipeline.run(&queued.job).await;
            // Submitter may have dropped its handle
            let _ = queued.done.send(report);
        });
    }

    while let Some(result) = workers.join_next().await {
        if let Err(e) = result {
            tracing::error!(error = %e, "media job task panicked");
        }
    }
    tracing::debug!("media queue stopped");
}
