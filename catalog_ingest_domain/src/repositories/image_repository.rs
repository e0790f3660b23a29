// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Image Repository Port
//!
//! Persistence interface for [`ImageAsset`] variant records. Writes are
//! upserts keyed on `(upload, variant)` so the at-least-once processing job
//! converges on one row per variant no matter how often it re-runs.

use async_trait::async_trait;

use crate::entities::ImageAsset;
use crate::value_objects::VariantTag;
use crate::IngestError;

/// Persistent store of derived image variants.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Inserts or replaces the row for `(asset.upload_row_id, asset.variant)`
    /// and returns the persisted record with its id.
    async fn upsert(&self, asset: &ImageAsset) -> Result<ImageAsset, IngestError>;

    /// Fetches one variant of an upload.
    async fn find_by_upload_and_variant(
        &self,
        upload_row_id: i64,
        variant: &VariantTag,
    ) -> Result<Option<ImageAsset>, IngestError>;

    /// Lists every variant recorded for an upload, original first.
    async fn list_for_upload(&self, upload_row_id: i64) -> Result<Vec<ImageAsset>, IngestError>;
}
