// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Processor
//!
//! The body of the background processing job: consume an assembled source
//! file, produce the fixed family of image variants, and advance the upload
//! state machine to `complete`.
//!
//! ## Algorithm
//!
//! 1. Load the session; a session already `complete` makes the attempt a
//!    no-op (the queue is at-least-once, duplicate deliveries happen)
//! 2. Normalize the state machine: a `failed` session being retried resets
//!    through `uploading` back to `assembling`
//! 3. Verify the source blob exists and is non-empty; decode it and detect
//!    dimensions and mime from the bytes
//! 4. Upsert the `original` image row, then for every configured size:
//!    resize (aspect-preserving, never enlarging), encode JPEG, write the
//!    blob, upsert the row with recomputed dimensions and checksum
//! 5. Transition the session to `complete`
//!
//! On any failure the session is marked `failed` and the error re-raised so
//! the runner counts the attempt and retries. Every write here is an upsert
//! keyed on `(upload, variant)` with deterministic output paths, so partial
//! runs leave nothing a re-execution cannot overwrite.
//!
//! Decoding and encoding are CPU-bound and run inside `spawn_blocking`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use catalog_ingest_domain::{
    BlobStore, ImageAsset, ImageRepository, IngestError, JobHandler, Md5Checksum, ProcessingJob, UploadRepository,
    UploadSession, UploadStatus, VariantTag,
};

use crate::infrastructure::metrics::MetricsService;
use crate::infrastructure::processing::{EncodedVariant, ImageVariantService};

/// Produces image variants for assembled uploads.
pub struct UploadProcessor {
    uploads: Arc<dyn UploadRepository>,
    images: Arc<dyn ImageRepository>,
    blobs: Arc<dyn BlobStore>,
    codec: Arc<ImageVariantService>,
    variant_tags: Vec<VariantTag>,
    metrics: Arc<MetricsService>,
}

impl UploadProcessor {
    pub fn new(
        uploads: Arc<dyn UploadRepository>,
        images: Arc<dyn ImageRepository>,
        blobs: Arc<dyn BlobStore>,
        codec: Arc<ImageVariantService>,
        variant_tags: Vec<VariantTag>,
        metrics: Arc<MetricsService>,
    ) -> Self {
        Self {
            uploads,
            images,
            blobs,
            codec,
            variant_tags,
            metrics,
        }
    }

    async fn process(&self, session: &mut UploadSession, job: &ProcessingJob) -> Result<(), IngestError> {
        // Normalize the state machine for retries and recovery resets
        match session.status() {
            UploadStatus::Assembling => {}
            UploadStatus::Uploading => session.begin_assembly()?,
            UploadStatus::Failed => {
                session.reset_for_reprocessing()?;
                session.begin_assembly()?;
            }
            UploadStatus::Complete => return Ok(()),
        }

        let source = Path::new(&job.source_path);
        let metadata = tokio::fs::metadata(source)
            .await
            .map_err(|e| IngestError::processing_failed(format!("source {} unreadable: {}", source.display(), e)))?;
        if metadata.len() == 0 {
            return Err(IngestError::processing_failed(format!(
                "source {} is empty",
                source.display()
            )));
        }

        let bytes = tokio::fs::read(source)
            .await
            .map_err(|e| IngestError::processing_failed(format!("failed to read source {}: {}", source.display(), e)))?;

        let relative_original = session
            .path()
            .map(str::to_string)
            .ok_or_else(|| IngestError::InconsistentState("assembled session has no canonical path".to_string()))?;

        // Decode and encode every variant off the async executor
        let codec = Arc::clone(&self.codec);
        let targets: Vec<u32> = self.variant_tags.iter().filter_map(VariantTag::target_longest_side).collect();
        type CpuOutput = ((u32, u32, String, Md5Checksum), Vec<(u32, EncodedVariant)>);
        let ((width, height, mime_type, source_checksum), encoded) =
            tokio::task::spawn_blocking(move || -> Result<CpuOutput, IngestError> {
                let decoded = codec.decode(&bytes)?;
                let mut outputs = Vec::with_capacity(targets.len());
                for target in targets {
                    outputs.push((target, codec.encode_variant(&decoded, target)?));
                }
                let source_checksum = Md5Checksum::of(&bytes);
                Ok(((decoded.width, decoded.height, decoded.mime_type, source_checksum), outputs))
            })
            .await
            .map_err(|e| IngestError::internal_error(format!("variant encoding task panicked: {}", e)))??;

        let upload_row_id = session
            .id()
            .ok_or_else(|| IngestError::internal_error("processing an unpersisted session".to_string()))?;
        let upload_id = session.upload_id();

        self.images
            .upsert(&ImageAsset::new(
                upload_row_id,
                VariantTag::Original,
                relative_original,
                mime_type,
                width,
                height,
                source_checksum,
            ))
            .await?;
        self.metrics.record_variant_produced();

        for (target, variant) in encoded {
            let tag = VariantTag::Sized(target);
            let blob_name = tag.blob_name(None);
            let relative = self.blobs.put_blob(upload_id, &blob_name, &variant.bytes).await?;
            self.images
                .upsert(&ImageAsset::new(
                    upload_row_id,
                    tag,
                    relative,
                    "image/jpeg".to_string(),
                    variant.width,
                    variant.height,
                    Md5Checksum::of(&variant.bytes),
                ))
                .await?;
            self.metrics.record_variant_produced();
        }

        session.mark_complete()?;
        self.uploads.update(session).await?;

        info!(%upload_id, width, height, variants = self.variant_tags.len(), "upload processed");
        Ok(())
    }
}

#[async_trait]
impl JobHandler for UploadProcessor {
    #[instrument(skip(self, job), fields(job_id = job.id, upload_row_id = job.upload_row_id, attempt = job.attempts))]
    async fn handle(&self, job: &ProcessingJob) -> Result<(), IngestError> {
        let mut session = self
            .uploads
            .find_by_id(job.upload_row_id)
            .await?
            .ok_or_else(|| IngestError::not_found(format!("upload row {} does not exist", job.upload_row_id)))?;

        // Duplicate delivery of an already-finished upload is a no-op
        if session.status() == UploadStatus::Complete {
            return Ok(());
        }

        match self.process(&mut session, job).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Fail the session, then re-raise for the runner's retry
                // accounting
                if !session.status().is_terminal() {
                    if session.mark_failed().is_ok() {
                        if let Err(update_err) = self.uploads.update(&session).await {
                            warn!(upload_row_id = job.upload_row_id, "failed to persist failure: {}", update_err);
                        }
                        self.metrics.record_upload_failed();
                    }
                }
                Err(e)
            }
        }
    }
}
