// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Job Queue
//!
//! Durable, at-least-once implementation of the [`JobQueue`] port on the
//! `processing_jobs` table. Jobs survive process restarts; a crashed worker
//! leaves its job `running`, and [`SqliteJobQueue::recover_orphaned`]
//! requeues those at boot.
//!
//! ## Claim Protocol
//!
//! `claim_next` claims atomically with a single
//! `UPDATE ... WHERE id = (SELECT ...) RETURNING` statement, so two workers
//! polling concurrently can never claim the same row. Claiming increments
//! `attempts`; the returned job carries the attempt number it is consuming.
//!
//! ## Retry Backoff
//!
//! A failed attempt requeues with `available_at` pushed out linearly with
//! the attempt count, which keeps a crashing decode from hot-looping while
//! staying well under the per-attempt timeout scale.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use catalog_ingest_domain::{IngestError, JobQueue, ProcessingJob};

const STATUS_QUEUED: &str = "queued";
const STATUS_RUNNING: &str = "running";
const STATUS_DONE: &str = "done";
const STATUS_FAILED: &str = "failed";

/// Seconds added per already-consumed attempt before a retry runs.
const RETRY_BACKOFF_SECS: i64 = 5;

/// SQLite-backed durable processing queue.
pub struct SqliteJobQueue {
    pub(crate) pool: SqlitePool,
}

impl SqliteJobQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    async fn status_of(&self, job_id: i64) -> String {
        sqlx::query_scalar("SELECT status FROM processing_jobs WHERE id = ?")
            .bind(job_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn enqueue(&self, upload_row_id: i64, source_path: &str) -> Result<i64, IngestError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO processing_jobs (
                upload_row_id, source_path, status, attempts, available_at, created_at, updated_at
            )
            VALUES (?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(upload_row_id)
        .bind(source_path)
        .bind(STATUS_QUEUED)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::database_error(format!("failed to enqueue job: {}", e)))?;

        let job_id = result.last_insert_rowid();
        debug!(job_id, upload_row_id, "processing job enqueued");
        Ok(job_id)
    }

    async fn claim_next(&self) -> Result<Option<ProcessingJob>, IngestError> {
        let now = Utc::now();

        // Single-statement claim: the subquery selection and the status flip
        // happen atomically, so concurrent workers cannot double-claim.
        let row = sqlx::query(
            r#"
            UPDATE processing_jobs
            SET status = ?, attempts = attempts + 1, updated_at = ?
            WHERE id = (
                SELECT id FROM processing_jobs
                WHERE status = ? AND available_at <= ?
                ORDER BY id
                LIMIT 1
            )
            RETURNING id, upload_row_id, source_path, attempts
            "#,
        )
        .bind(STATUS_RUNNING)
        .bind(now)
        .bind(STATUS_QUEUED)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IngestError::database_error(format!("failed to claim job: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let attempts: i64 = row
            .try_get("attempts")
            .map_err(|e| IngestError::database_error(format!("missing attempts column: {}", e)))?;

        Ok(Some(ProcessingJob {
            id: row
                .try_get("id")
                .map_err(|e| IngestError::database_error(format!("missing id column: {}", e)))?,
            upload_row_id: row
                .try_get("upload_row_id")
                .map_err(|e| IngestError::database_error(format!("missing upload_row_id column: {}", e)))?,
            source_path: row
                .try_get("source_path")
                .map_err(|e| IngestError::database_error(format!("missing source_path column: {}", e)))?,
            attempts: attempts as u32,
        }))
    }

    async fn mark_done(&self, job_id: i64) -> Result<(), IngestError> {
        sqlx::query("UPDATE processing_jobs SET status = ?, updated_at = ? WHERE id = ?")
            .bind(STATUS_DONE)
            .bind(Utc::now())
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(|e| IngestError::database_error(format!("failed to complete job: {}", e)))?;
        Ok(())
    }

    async fn mark_failed_or_retry(&self, job_id: i64, error: &str, max_tries: u32) -> Result<bool, IngestError> {
        let attempts: Option<i64> = sqlx::query_scalar("SELECT attempts FROM processing_jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestError::database_error(format!("failed to read job attempts: {}", e)))?;

        let Some(attempts) = attempts else {
            return Err(IngestError::not_found(format!("job {} does not exist", job_id)));
        };

        let retry = (attempts as u32) < max_tries;
        let next_status = if retry { STATUS_QUEUED } else { STATUS_FAILED };
        let available_at: DateTime<Utc> = Utc::now() + Duration::seconds(RETRY_BACKOFF_SECS * attempts);

        sqlx::query(
            "UPDATE processing_jobs SET status = ?, last_error = ?, available_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(next_status)
        .bind(error)
        .bind(available_at)
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::database_error(format!("failed to record job failure: {}", e)))?;

        if retry {
            debug!(job_id, attempts, error, "job requeued for retry");
        } else {
            warn!(job_id, attempts, error, "job failed permanently");
        }
        Ok(retry)
    }

    async fn recover_orphaned(&self) -> Result<u64, IngestError> {
        let result = sqlx::query("UPDATE processing_jobs SET status = ?, updated_at = ? WHERE status = ?")
            .bind(STATUS_QUEUED)
            .bind(Utc::now())
            .bind(STATUS_RUNNING)
            .execute(&self.pool)
            .await
            .map_err(|e| IngestError::database_error(format!("failed to recover orphaned jobs: {}", e)))?;

        let recovered = result.rows_affected();
        if recovered > 0 {
            warn!(recovered, "requeued jobs left running by a previous process");
        }
        Ok(recovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::schema::in_memory_pool;
    use crate::infrastructure::repositories::SqliteUploadRepository;
    use catalog_ingest_domain::{UploadId, UploadRepository, UploadSession};

    async fn queue_with_upload() -> (SqliteJobQueue, i64) {
        let pool = in_memory_pool().await.unwrap();
        let uploads = SqliteUploadRepository::new(pool.clone());
        let session = uploads
            .create_if_absent(&UploadSession::new(UploadId::generate(), None, None))
            .await
            .unwrap();
        (SqliteJobQueue::new(pool), session.id().unwrap())
    }

    #[tokio::test]
    async fn test_enqueue_claim_complete() {
        let (queue, upload_row_id) = queue_with_upload().await;
        let job_id = queue.enqueue(upload_row_id, "/blob/u/original.png").await.unwrap();

        let job = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(job.id, job_id);
        assert_eq!(job.upload_row_id, upload_row_id);
        assert_eq!(job.attempts, 1);

        // Claimed job is not visible to other workers
        assert!(queue.claim_next().await.unwrap().is_none());

        queue.mark_done(job.id).await.unwrap();
        assert_eq!(queue.status_of(job.id).await, "done");
    }

    #[tokio::test]
    async fn test_retry_until_cap() {
        let (queue, upload_row_id) = queue_with_upload().await;
        queue.enqueue(upload_row_id, "/p").await.unwrap();

        let job = queue.claim_next().await.unwrap().unwrap();
        assert!(queue.mark_failed_or_retry(job.id, "decode failed", 3).await.unwrap());
        assert_eq!(queue.status_of(job.id).await, "queued");

        // Backoff pushes availability into the future; force it back for test
        sqlx::query("UPDATE processing_jobs SET available_at = ?")
            .bind(Utc::now() - Duration::seconds(1))
            .execute(&queue.pool)
            .await
            .unwrap();

        let job = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(job.attempts, 2);
        assert!(queue.mark_failed_or_retry(job.id, "decode failed", 3).await.unwrap());

        sqlx::query("UPDATE processing_jobs SET available_at = ?")
            .bind(Utc::now() - Duration::seconds(1))
            .execute(&queue.pool)
            .await
            .unwrap();

        let job = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(job.attempts, 3);
        // Third failure exhausts the budget
        assert!(!queue.mark_failed_or_retry(job.id, "decode failed", 3).await.unwrap());
        assert_eq!(queue.status_of(job.id).await, "failed");
        assert!(queue.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recover_orphaned_requeues_running() {
        let (queue, upload_row_id) = queue_with_upload().await;
        queue.enqueue(upload_row_id, "/p").await.unwrap();
        let job = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(queue.status_of(job.id).await, "running");

        assert_eq!(queue.recover_orphaned().await.unwrap(), 1);
        assert_eq!(queue.status_of(job.id).await, "queued");

        // Recovery does not touch attempts; the next claim consumes attempt 2
        let job = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(job.attempts, 2);
    }

    #[tokio::test]
    async fn test_claim_orders_fifo() {
        let (queue, upload_row_id) = queue_with_upload().await;
        let first = queue.enqueue(upload_row_id, "/a").await.unwrap();
        let second = queue.enqueue(upload_row_id, "/b").await.unwrap();

        assert_eq!(queue.claim_next().await.unwrap().unwrap().id, first);
        assert_eq!(queue.claim_next().await.unwrap().unwrap().id, second);
    }
}
