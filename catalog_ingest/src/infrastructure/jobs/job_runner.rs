// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Job Runner
//!
//! Worker pool consuming the processing queue. Each worker loops: claim a
//! job, acquire the upload's named lock, run the handler under the
//! per-attempt timeout, record the outcome. Workers hold cancellation
//! tokens and drain gracefully on shutdown - an in-flight attempt finishes
//! (or times out), nothing new is claimed.
//!
//! ## Execution Guarantees
//!
//! - **At-least-once**: failures and timeouts count as attempts and requeue
//!   until `job.tries` is exhausted, then the job parks as failed
//! - **Per-upload exclusion**: the named lock taken before the handler runs
//!   means at most one attempt per upload executes at a time, and attempts
//!   never overlap `completeUpload` or the attach resolver's recovery reset
//! - **Timeout accounting**: a timed-out attempt cannot run the handler's
//!   failure path (its future is dropped), so the runner itself marks the
//!   upload failed before requeueing

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use catalog_ingest_bootstrap::CancellationToken;
use catalog_ingest_domain::{IngestError, JobHandler, JobQueue, ProcessingJob, UploadRepository};

use crate::infrastructure::config::ingest_config::JobSettings;
use crate::infrastructure::metrics::MetricsService;
use crate::infrastructure::runtime::UploadLockRegistry;

/// Background worker pool for processing jobs.
pub struct JobRunner {
    queue: Arc<dyn JobQueue>,
    handler: Arc<dyn JobHandler>,
    uploads: Arc<dyn UploadRepository>,
    locks: Arc<UploadLockRegistry>,
    metrics: Arc<MetricsService>,
    settings: JobSettings,
}

impl JobRunner {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        handler: Arc<dyn JobHandler>,
        uploads: Arc<dyn UploadRepository>,
        locks: Arc<UploadLockRegistry>,
        metrics: Arc<MetricsService>,
        settings: JobSettings,
    ) -> Self {
        Self {
            queue,
            handler,
            uploads,
            locks,
            metrics,
            settings,
        }
    }

    /// Requeues jobs orphaned by a previous process. Called once at boot,
    /// before workers start.
    pub async fn recover(&self) -> Result<u64, IngestError> {
        self.queue.recover_orphaned().await
    }

    /// Spawns the configured number of workers. Each worker exits when the
    /// token cancels; callers await the handles to drain.
    pub fn spawn_workers(self: &Arc<Self>, token: CancellationToken) -> Vec<JoinHandle<()>> {
        (0..self.settings.workers)
            .map(|worker_id| {
                let runner = Arc::clone(self);
                let token = token.clone();
                tokio::spawn(async move {
                    runner.worker_loop(worker_id, token).await;
                })
            })
            .collect()
    }

    async fn worker_loop(&self, worker_id: usize, token: CancellationToken) {
        info!(worker_id, "job worker started");
        let poll_interval = Duration::from_millis(self.settings.poll_interval_ms);

        loop {
            if token.is_cancelled() {
                break;
            }

            match self.queue.claim_next().await {
                Ok(Some(job)) => {
                    self.run_attempt(&job).await;
                }
                Ok(None) => {
                    // Idle: wait for work or shutdown
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(poll_interval) => {}
                    }
                }
                Err(e) => {
                    warn!(worker_id, "failed to claim job: {}", e);
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(poll_interval) => {}
                    }
                }
            }
        }
        info!(worker_id, "job worker drained");
    }

    /// Executes one attempt of one claimed job.
    async fn run_attempt(&self, job: &ProcessingJob) {
        // Resolve the session first; the named lock is keyed by upload_id
        let upload_id = match self.uploads.find_by_id(job.upload_row_id).await {
            Ok(Some(session)) => session.upload_id(),
            Ok(None) => {
                error!(job_id = job.id, upload_row_id = job.upload_row_id, "upload row missing; parking job");
                // Park permanently: a missing row will not reappear
                let _ = self.queue.mark_failed_or_retry(job.id, "upload row missing", 0).await;
                return;
            }
            Err(e) => {
                warn!(job_id = job.id, "failed to load upload for job: {}", e);
                let _ = self
                    .queue
                    .mark_failed_or_retry(job.id, &e.to_string(), self.settings.tries)
                    .await;
                return;
            }
        };

        // Serialize against completeUpload, attach recovery, and other attempts
        let _guard = self.locks.acquire(upload_id).await;

        debug!(job_id = job.id, %upload_id, attempt = job.attempts, "processing attempt started");
        self.metrics.job_started();
        let started = Instant::now();

        let outcome = tokio::time::timeout(
            Duration::from_secs(self.settings.timeout_s),
            self.handler.handle(job),
        )
        .await;

        self.metrics.job_finished();

        match outcome {
            Ok(Ok(())) => {
                self.metrics.record_job_success(started.elapsed());
                if let Err(e) = self.queue.mark_done(job.id).await {
                    error!(job_id = job.id, "failed to mark job done: {}", e);
                }
                debug!(job_id = job.id, %upload_id, "processing attempt succeeded");
            }
            Ok(Err(e)) => {
                // The handler already failed the upload row before raising
                self.record_failed_attempt(job, &e.to_string(), started).await;
            }
            Err(_elapsed) => {
                let timeout_error = IngestError::ProcessingTimeout(format!(
                    "attempt {} exceeded the {}s processing timeout",
                    job.attempts, self.settings.timeout_s
                ));
                // The handler future was dropped mid-flight; it could not
                // fail the upload itself
                self.fail_upload(job.upload_row_id).await;
                self.record_failed_attempt(job, &timeout_error.to_string(), started).await;
            }
        }
    }

    async fn record_failed_attempt(&self, job: &ProcessingJob, error_text: &str, started: Instant) {
        self.metrics.record_job_failure(started.elapsed());

        match self
            .queue
            .mark_failed_or_retry(job.id, error_text, self.settings.tries)
            .await
        {
            Ok(true) => {
                warn!(
                    job_id = job.id,
                    attempt = job.attempts,
                    error = error_text,
                    "processing attempt failed; will retry"
                );
            }
            Ok(false) => {
                error!(
                    job_id = job.id,
                    attempts = job.attempts,
                    error = error_text,
                    "processing failed permanently"
                );
            }
            Err(e) => {
                error!(job_id = job.id, "failed to record job failure: {}", e);
            }
        }
    }

    /// Fails the upload row directly; used when the handler could not.
    async fn fail_upload(&self, upload_row_id: i64) {
        match self.uploads.find_by_id(upload_row_id).await {
            Ok(Some(mut session)) => {
                if !session.status().is_terminal() {
                    if session.mark_failed().is_ok() {
                        if let Err(e) = self.uploads.update(&session).await {
                            error!(upload_row_id, "failed to persist failed status: {}", e);
                        } else {
                            self.metrics.record_upload_failed();
                        }
                    }
                }
            }
            Ok(None) => {}
            Err(e) => error!(upload_row_id, "failed to load upload while failing it: {}", e),
        }
    }
}
