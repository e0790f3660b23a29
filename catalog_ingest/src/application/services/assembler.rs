// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Assembler
//!
//! Drives `POST /upload/complete`: verifies the chunk set, concatenates it
//! into the canonical blob under a running MD5, and hands the session to
//! the background processor. The whole operation runs under the session's
//! named lock.
//!
//! ## Algorithm
//!
//! 1. Load the session (`not_found` if absent); an already-`complete`
//!    session succeeds idempotently; a `failed` one is rejected
//! 2. Transition `uploading → assembling` and persist it so status polls
//!    observe the change
//! 3. List chunks; an empty set fails the session (`no_chunks`), a gap in
//!    the integer-sorted index sequence fails it naming the gaps
//!    (`missing_chunks`)
//! 4. Stream chunks in index order into a staging file, feeding the
//!    running MD5; chunks are read one at a time, never the whole file
//! 5. A digest mismatch against the declared checksum fails the session
//!    but retains the chunk files, so the client may re-drive completion
//!    after a reset; the staging file is deleted
//! 6. Atomically rename the staging file to `<upload_id>/original(.<ext>)`,
//!    record checksum/size/path on the row (still `assembling`), and
//!    enqueue the processing job
//! 7. Best-effort removal of the chunk temp directory
//!
//! The session stays `assembling` until the processing job records the
//! `original` variant; completion is observed through status polling.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

use catalog_ingest_domain::{
    BlobStore, IngestError, JobQueue, Md5Checksum, Md5Hasher, UploadId, UploadRepository, UploadStatus, VariantTag,
};

use crate::infrastructure::metrics::MetricsService;
use crate::infrastructure::runtime::UploadLockRegistry;

/// Result of a completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOutcome {
    pub upload_id: UploadId,
    /// True when the session was already complete and nothing was redone.
    pub already_complete: bool,
}

/// Assembles verified chunk sets into canonical blobs.
pub struct Assembler {
    uploads: Arc<dyn UploadRepository>,
    blobs: Arc<dyn BlobStore>,
    queue: Arc<dyn JobQueue>,
    locks: Arc<UploadLockRegistry>,
    metrics: Arc<MetricsService>,
}

impl Assembler {
    pub fn new(
        uploads: Arc<dyn UploadRepository>,
        blobs: Arc<dyn BlobStore>,
        queue: Arc<dyn JobQueue>,
        locks: Arc<UploadLockRegistry>,
        metrics: Arc<MetricsService>,
    ) -> Self {
        Self {
            uploads,
            blobs,
            queue,
            locks,
            metrics,
        }
    }

    /// Completes an upload: verify, assemble, enqueue processing.
    #[instrument(skip(self), fields(upload_id = raw_upload_id))]
    pub async fn complete_upload(&self, raw_upload_id: &str, raw_checksum: &str) -> Result<AssemblyOutcome, IngestError> {
        let upload_id = UploadId::parse(raw_upload_id)?;
        let declared = Md5Checksum::parse(raw_checksum)?;

        let _guard = self.locks.acquire(upload_id).await;

        let mut session = self
            .uploads
            .find_by_upload_id(upload_id)
            .await?
            .ok_or_else(|| IngestError::not_found(format!("upload {} does not exist", upload_id)))?;

        match session.status() {
            UploadStatus::Complete => {
                // Repeated completion succeeds without duplicating work
                return Ok(AssemblyOutcome {
                    upload_id,
                    already_complete: true,
                });
            }
            UploadStatus::Failed => {
                return Err(IngestError::NotAcceptingChunks(format!(
                    "upload {} has failed; completion is not retryable from this state",
                    upload_id
                )));
            }
            UploadStatus::Assembling => {
                if session.path().is_some() {
                    // Assembly finished earlier; the processing job is in
                    // flight. Nothing to redo.
                    return Ok(AssemblyOutcome {
                        upload_id,
                        already_complete: false,
                    });
                }
                // A previous completion crashed mid-assembly; re-drive it
            }
            UploadStatus::Uploading => {
                session.begin_assembly()?;
                self.uploads.update(&session).await?;
            }
        }

        match self.assemble(&mut session, upload_id, &declared).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // Fail the session on every assembly error except pure I/O
                // hiccups that did not invalidate anything (kept simple:
                // all of them are fatal for this attempt)
                if !session.status().is_terminal() {
                    if session.mark_failed().is_ok() {
                        if let Err(update_err) = self.uploads.update(&session).await {
                            warn!(%upload_id, "failed to persist failed status: {}", update_err);
                        }
                        self.metrics.record_upload_failed();
                    }
                }
                Err(e)
            }
        }
    }

    /// The fallible middle of completion; callers handle failing the row.
    async fn assemble(
        &self,
        session: &mut catalog_ingest_domain::UploadSession,
        upload_id: UploadId,
        declared: &Md5Checksum,
    ) -> Result<AssemblyOutcome, IngestError> {
        let manifest = self.blobs.list_chunks(upload_id).await?;
        let total_chunks = manifest.verify_contiguous()?;

        // Stream-concatenate in index order with a running digest
        let staging = self.blobs.staging_path(upload_id);
        if let Some(parent) = staging.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IngestError::io_error(format!("failed to create staging dir: {}", e)))?;
        }
        let mut file = tokio::fs::File::create(&staging)
            .await
            .map_err(|e| IngestError::io_error(format!("failed to create staging file: {}", e)))?;

        let mut hasher = Md5Hasher::new();
        let mut assembled_size: u64 = 0;
        for &index in manifest.indices() {
            let bytes = self.blobs.read_chunk(upload_id, index).await?;
            hasher.update(&bytes);
            assembled_size += bytes.len() as u64;
            file.write_all(&bytes)
                .await
                .map_err(|e| IngestError::io_error(format!("failed to write staging file: {}", e)))?;
        }
        file.flush()
            .await
            .map_err(|e| IngestError::io_error(format!("failed to flush staging file: {}", e)))?;
        drop(file);

        let computed = hasher.finalize();
        if computed != *declared {
            // Keep the chunks so the client may retry completion; drop the
            // partial product
            if let Err(e) = tokio::fs::remove_file(&staging).await {
                warn!(%upload_id, "failed to remove staging file: {}", e);
            }
            return Err(IngestError::FileChecksumMismatch(format!(
                "declared {} but assembled file hashes to {}",
                declared, computed
            )));
        }

        let blob_name = VariantTag::Original.blob_name(session.original_extension().as_deref());
        let relative_path = self.blobs.put_blob_from_staging(upload_id, &blob_name, &staging).await?;

        session.record_assembly(computed, assembled_size, relative_path)?;
        self.uploads.update(session).await?;

        let upload_row_id = session
            .id()
            .ok_or_else(|| IngestError::internal_error("assembled session has no row id".to_string()))?;
        let absolute = self.blobs.blob_path(upload_id, &blob_name);
        let absolute = absolute
            .to_str()
            .ok_or_else(|| IngestError::io_error(format!("non-utf8 blob path {}", absolute.display())))?;
        self.queue.enqueue(upload_row_id, absolute).await?;

        // Chunks are no longer needed; failure to clean up only leaks disk
        if let Err(e) = self.blobs.delete_chunk_dir(upload_id).await {
            warn!(%upload_id, "failed to delete chunk dir: {}", e);
        }

        self.metrics.record_upload_assembled();
        info!(%upload_id, total_chunks, assembled_size, "upload assembled");

        Ok(AssemblyOutcome {
            upload_id,
            already_complete: false,
        })
    }
}
