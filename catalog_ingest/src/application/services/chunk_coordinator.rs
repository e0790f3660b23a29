// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Coordinator
//!
//! Stateful reception of out-of-order, possibly duplicated chunks. One call
//! handles one `POST /upload/chunk` submission:
//!
//! 1. Validate the request shape (uuid, counts, checksum format)
//! 2. Hash the received bytes; a mismatch against the declared chunk
//!    checksum is rejected without touching any state, so the client can
//!    retry exactly that chunk
//! 3. Lazily register the upload session (create-if-absent upsert, which
//!    tolerates concurrent first chunks)
//! 4. Refuse chunks for sessions that left the `uploading` state
//! 5. Atomically write `tmp/<upload_id>/chunk_<index>.part`; re-sending an
//!    index overwrites, making reception idempotent
//!
//! Chunk writes take no per-upload lock: filename uniqueness plus atomic
//! rename give concurrent chunk submissions of one session a well-defined
//! outcome, and the session row is only ever upserted here.

use std::sync::Arc;

use tracing::{debug, instrument};

use catalog_ingest_domain::{
    BlobStore, IngestError, Md5Checksum, UploadId, UploadRepository, UploadSession,
};

use crate::infrastructure::metrics::MetricsService;

/// One chunk submission, as decoded from the multipart form.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub upload_id: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    /// Lowercase hex MD5 the client computed for `chunk`.
    pub chunk_checksum: String,
    pub chunk: Vec<u8>,
    /// Advisory fields, recorded on first sight.
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
}

/// Receives and verifies individual chunks.
pub struct ChunkCoordinator {
    uploads: Arc<dyn UploadRepository>,
    blobs: Arc<dyn BlobStore>,
    metrics: Arc<MetricsService>,
}

impl ChunkCoordinator {
    pub fn new(uploads: Arc<dyn UploadRepository>, blobs: Arc<dyn BlobStore>, metrics: Arc<MetricsService>) -> Self {
        Self {
            uploads,
            blobs,
            metrics,
        }
    }

    /// Handles one chunk submission and returns the accepted index.
    #[instrument(skip(self, request), fields(upload_id = %request.upload_id, chunk_index = request.chunk_index))]
    pub async fn receive_chunk(&self, request: ChunkRequest) -> Result<u32, IngestError> {
        let upload_id = UploadId::parse(&request.upload_id)?;

        if request.total_chunks == 0 {
            return Err(IngestError::validation_failed("total_chunks must be at least 1"));
        }
        if request.chunk_index >= request.total_chunks {
            return Err(IngestError::validation_failed(format!(
                "chunk_index {} out of range for {} chunks",
                request.chunk_index, request.total_chunks
            )));
        }

        let declared = Md5Checksum::parse(&request.chunk_checksum)?;
        let computed = Md5Checksum::of(&request.chunk);
        if computed != declared {
            // No state is mutated; the client retries this chunk
            return Err(IngestError::ChunkChecksumMismatch(format!(
                "chunk {} declared {} but bytes hash to {}",
                request.chunk_index, declared, computed
            )));
        }

        // Lazily create the session on first chunk
        let mut candidate = UploadSession::new(upload_id, request.file_name.clone(), request.file_size);
        if let Some(mime) = &request.mime_type {
            let mut metadata = serde_json::Map::new();
            metadata.insert("mime_type".to_string(), serde_json::Value::String(mime.clone()));
            candidate.set_metadata(metadata);
        }
        let mut session = self.uploads.create_if_absent(&candidate).await?;

        // An existing row may predate the advisory fields (e.g. the first
        // chunk to arrive carried none); fill gaps without overwriting
        if session.original_filename().is_none() && request.file_name.is_some() {
            session.merge_advisory(request.file_name.as_deref(), request.file_size);
            self.uploads.update(&session).await?;
        }

        if !session.status().accepts_chunks() {
            return Err(IngestError::NotAcceptingChunks(format!(
                "upload {} is {}",
                upload_id,
                session.status()
            )));
        }

        self.blobs.put_chunk(upload_id, request.chunk_index, &request.chunk).await?;

        self.metrics.record_chunk_received(request.chunk.len() as u64);
        debug!(
            %upload_id,
            chunk_index = request.chunk_index,
            total_chunks = request.total_chunks,
            size = request.chunk.len(),
            "chunk accepted"
        );
        Ok(request.chunk_index)
    }
}
