// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Attachment Resolver
//!
//! Binds a completed upload's image to a catalog product identified by SKU,
//! with primary-image semantics. The resolver only *observes* upload state,
//! it never infers completion; a client racing the processing job receives
//! a "not yet ready" signal and polls.
//!
//! ## Status Handling
//!
//! - `complete` → resolve the image and link it
//! - `uploading` / `assembling` → pending signal carrying the seconds since
//!   the session was last touched (clients back off on it); a session stuck
//!   past `attach.ready_wait_s` is declared failed instead
//! - `failed` → recovery escape hatch: when the assembled blob still exists
//!   on disk the session resets to `uploading`, the processing job is
//!   re-enqueued, and the caller gets the pending signal; otherwise an error
//!
//! ## Image Resolution
//!
//! The `original` variant is bound; when it is missing but other variants
//! exist the first available variant is bound with a warning. A `complete`
//! session without any image rows is an internal inconsistency: the session
//! is failed and the call errors.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use catalog_ingest_domain::{
    BlobStore, ImageRepository, IngestError, JobQueue, ProductRepository, Sku, UploadId, UploadRepository,
    UploadStatus, VariantTag,
};

use crate::infrastructure::metrics::MetricsService;
use crate::infrastructure::runtime::UploadLockRegistry;

/// A resolved attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachOutcome {
    pub image_id: i64,
    pub product_id: i64,
    pub is_primary: bool,
}

/// Result of an attach call: resolved, or not yet ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachResponse {
    Attached(AttachOutcome),
    /// The upload is not `complete` yet; `status` is the wire status for
    /// the 202 body and `processing_time` the seconds since last update.
    Pending {
        status: &'static str,
        processing_time: i64,
    },
}

/// Resolves product attachments for completed uploads.
pub struct AttachmentResolver {
    uploads: Arc<dyn UploadRepository>,
    images: Arc<dyn ImageRepository>,
    products: Arc<dyn ProductRepository>,
    blobs: Arc<dyn BlobStore>,
    queue: Arc<dyn JobQueue>,
    locks: Arc<UploadLockRegistry>,
    metrics: Arc<MetricsService>,
    ready_wait_s: u64,
}

impl AttachmentResolver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        uploads: Arc<dyn UploadRepository>,
        images: Arc<dyn ImageRepository>,
        products: Arc<dyn ProductRepository>,
        blobs: Arc<dyn BlobStore>,
        queue: Arc<dyn JobQueue>,
        locks: Arc<UploadLockRegistry>,
        metrics: Arc<MetricsService>,
        ready_wait_s: u64,
    ) -> Self {
        Self {
            uploads,
            images,
            products,
            blobs,
            queue,
            locks,
            metrics,
            ready_wait_s,
        }
    }

    /// Attaches the upload's image to the product with the given SKU.
    #[instrument(skip(self), fields(upload_id = raw_upload_id, sku = raw_sku))]
    pub async fn attach(&self, raw_upload_id: &str, raw_sku: &str, is_primary: bool) -> Result<AttachResponse, IngestError> {
        let upload_id = UploadId::parse(raw_upload_id)?;
        let sku = Sku::parse(raw_sku)?;

        let _guard = self.locks.acquire(upload_id).await;

        let mut session = self
            .uploads
            .find_by_upload_id(upload_id)
            .await?
            .ok_or_else(|| IngestError::not_found(format!("upload {} does not exist", upload_id)))?;
        let product = self
            .products
            .find_by_sku(&sku)
            .await?
            .ok_or_else(|| IngestError::not_found(format!("product {} does not exist", sku)))?;

        match session.status() {
            UploadStatus::Complete => {}
            UploadStatus::Uploading | UploadStatus::Assembling => {
                let elapsed = session.seconds_since_update(Utc::now());
                if elapsed > self.ready_wait_s as i64 {
                    // Stuck session: nothing has touched it in too long
                    let stalled_in = session.status();
                    session.mark_failed()?;
                    self.uploads.update(&session).await?;
                    self.metrics.record_upload_failed();
                    return Err(IngestError::processing_failed(format!(
                        "upload {} stalled in {} for {}s",
                        upload_id, stalled_in, elapsed
                    )));
                }
                return Ok(AttachResponse::Pending {
                    status: "uploading",
                    processing_time: elapsed,
                });
            }
            UploadStatus::Failed => {
                return self.try_recover(&mut session, upload_id).await;
            }
        }

        let upload_row_id = session
            .id()
            .ok_or_else(|| IngestError::internal_error("complete session without row id".to_string()))?;

        let image = match self
            .images
            .find_by_upload_and_variant(upload_row_id, &VariantTag::Original)
            .await?
        {
            Some(original) => original,
            None => {
                let all = self.images.list_for_upload(upload_row_id).await?;
                match all.into_iter().next() {
                    Some(first) => {
                        warn!(%upload_id, variant = %first.variant(), "original variant missing; binding first available");
                        first
                    }
                    None => {
                        // Status says complete but nothing was recorded
                        session.mark_failed()?;
                        self.uploads.update(&session).await?;
                        self.metrics.record_upload_failed();
                        return Err(IngestError::InconsistentState(format!(
                            "upload {} is complete but has no image records",
                            upload_id
                        )));
                    }
                }
            }
        };

        let image_id = image
            .id()
            .ok_or_else(|| IngestError::internal_error("image record without id".to_string()))?;
        let link = self.products.attach_image(product.id(), image_id, is_primary).await?;

        self.metrics.record_attachment();
        info!(%upload_id, %sku, image_id, is_primary = link.is_primary, "image attached to product");

        Ok(AttachResponse::Attached(AttachOutcome {
            image_id,
            product_id: product.id(),
            is_primary: link.is_primary,
        }))
    }

    /// The `failed` recovery escape hatch: if the assembled blob survived,
    /// reset the session and re-enqueue processing.
    async fn try_recover(
        &self,
        session: &mut catalog_ingest_domain::UploadSession,
        upload_id: UploadId,
    ) -> Result<AttachResponse, IngestError> {
        let Some(relative) = session.path().map(str::to_string) else {
            return Err(IngestError::processing_failed(format!(
                "upload {} failed before assembly; nothing to recover",
                upload_id
            )));
        };

        if !self.blobs.exists(&relative).await? {
            return Err(IngestError::processing_failed(format!(
                "upload {} failed and its assembled blob is gone",
                upload_id
            )));
        }

        session.reset_for_reprocessing()?;
        self.uploads.update(session).await?;

        let upload_row_id = session
            .id()
            .ok_or_else(|| IngestError::internal_error("recovering session without row id".to_string()))?;
        let blob_name = VariantTag::Original.blob_name(session.original_extension().as_deref());
        let absolute = self.blobs.blob_path(upload_id, &blob_name);
        let absolute = absolute
            .to_str()
            .ok_or_else(|| IngestError::io_error(format!("non-utf8 blob path {}", absolute.display())))?;
        self.queue.enqueue(upload_row_id, absolute).await?;

        warn!(%upload_id, "failed upload reset for reprocessing via attach recovery");
        Ok(AttachResponse::Pending {
            status: "processing",
            processing_time: 0,
        })
    }
}
