// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Image Asset Entity
//!
//! `ImageAsset` is one derived image of an upload: the preserved original or
//! a sized JPEG rendition. Rows are produced by the processing job, keyed
//! uniquely on `(upload, variant)`, and re-processing upserts them so the
//! job stays idempotent.
//!
//! Invariants: the blob at `path` exists and hashes to `checksum`; `width`
//! and `height` match the decoded file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{Md5Checksum, VariantTag};

/// One derived image variant of an upload session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Server-assigned row id; `None` until persisted.
    id: Option<i64>,
    /// Row id of the owning upload session.
    upload_row_id: i64,
    variant: VariantTag,
    /// Storage-relative path of the encoded blob.
    path: String,
    mime_type: String,
    width: u32,
    height: u32,
    /// MD5 of the encoded bytes at `path`.
    checksum: Md5Checksum,
    created_at: DateTime<Utc>,
}

impl ImageAsset {
    /// Creates a new unpersisted variant record.
    pub fn new(
        upload_row_id: i64,
        variant: VariantTag,
        path: String,
        mime_type: String,
        width: u32,
        height: u32,
        checksum: Md5Checksum,
    ) -> Self {
        Self {
            id: None,
            upload_row_id,
            variant,
            path,
            mime_type,
            width,
            height,
            checksum,
            created_at: Utc::now(),
        }
    }

    /// Rehydrates a record from its persisted representation.
    #[allow(clippy::too_many_arguments)]
    pub fn hydrate(
        id: i64,
        upload_row_id: i64,
        variant: VariantTag,
        path: String,
        mime_type: String,
        width: u32,
        height: u32,
        checksum: Md5Checksum,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id),
            upload_row_id,
            variant,
            path,
            mime_type,
            width,
            height,
            checksum,
            created_at,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn upload_row_id(&self) -> i64 {
        self.upload_row_id
    }

    pub fn variant(&self) -> &VariantTag {
        &self.variant
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn checksum(&self) -> &Md5Checksum {
        &self.checksum
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Longest side of the stored image in pixels.
    pub fn longest_side(&self) -> u32 {
        self.width.max(self.height)
    }
}
