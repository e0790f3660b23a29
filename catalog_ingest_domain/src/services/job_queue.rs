// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processing Job Queue Port
//!
//! Durable at-least-once queue feeding the background image processor.
//! Jobs are enqueued by the assembler when the canonical blob lands and are
//! consumed by the job runner's worker pool.
//!
//! ## Delivery Contract
//!
//! - **At-least-once**: a job survives process restarts; a claim that is
//!   never completed is recovered and handed out again
//! - **Bounded retries**: each failure increments `attempts`; once the
//!   configured cap is reached the job is parked as failed
//! - **Single claim**: `claim_next` hands a job to exactly one worker at a
//!   time; per-upload mutual exclusion across *different* jobs is the
//!   runner's responsibility (upload lock)

use async_trait::async_trait;

use crate::IngestError;

/// One queued processing job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingJob {
    /// Queue row id.
    pub id: i64,
    /// Row id of the upload session to process.
    pub upload_row_id: i64,
    /// Absolute path of the assembled source blob.
    pub source_path: String,
    /// Attempts already consumed, including the current one.
    pub attempts: u32,
}

/// Durable queue of processing jobs.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueues a job and returns its queue id.
    async fn enqueue(&self, upload_row_id: i64, source_path: &str) -> Result<i64, IngestError>;

    /// Claims the next runnable job, marking it running; `None` when the
    /// queue is empty.
    async fn claim_next(&self) -> Result<Option<ProcessingJob>, IngestError>;

    /// Marks a claimed job as successfully completed.
    async fn mark_done(&self, job_id: i64) -> Result<(), IngestError>;

    /// Records a failed attempt. Requeues the job when attempts remain
    /// under `max_tries` and returns `true`; otherwise parks it as failed
    /// and returns `false`.
    async fn mark_failed_or_retry(
        &self,
        job_id: i64,
        error: &str,
        max_tries: u32,
    ) -> Result<bool, IngestError>;

    /// Requeues jobs left claimed by a previous process (crash recovery).
    /// Returns how many were recovered.
    async fn recover_orphaned(&self) -> Result<u64, IngestError>;
}

/// Handler the runner invokes for each claimed job.
///
/// Implemented by the application layer's upload processor; failures are
/// returned (not swallowed) so the runner can count the attempt and retry.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &ProcessingJob) -> Result<(), IngestError>;
}
