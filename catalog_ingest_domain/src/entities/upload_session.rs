// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Session Entity
//!
//! This module provides `UploadSession`, the aggregate root of the ingest
//! domain. A session is addressed by its client-chosen [`UploadId`] and owns
//! every artifact of one upload: the chunk files received so far, the
//! assembled canonical blob, and the derived image variants.
//!
//! ## Lifecycle
//!
//! Sessions are created lazily when the first chunk arrives, move through
//! the [`UploadStatus`] state machine, and are never deleted by the core
//! (retention is external policy):
//!
//! 1. **uploading** - rows are upserted on first chunk; chunks accumulate
//! 2. **assembling** - completion verified the chunk set and the whole-file
//!    checksum; the canonical blob exists and a processing job is queued
//! 3. **complete** - the processing job recorded the `original` variant
//! 4. **failed** - a fatal error occurred; the attachment resolver may
//!    reset the session to `uploading` when the assembled blob survives
//!
//! ## Invariants
//!
//! - `upload_id` is unique across sessions
//! - status transitions follow the state machine graph; mutators validate
//!   transitions and bump `updated_at`
//! - `file_checksum` and `path` become non-null when assembly succeeds and
//!   are never cleared afterwards
//!
//! All mutation of one session must be serialized by the caller (the
//! per-upload lock); the entity itself only guards the transition graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{Md5Checksum, UploadId, UploadStatus};
use crate::IngestError;

/// Aggregate root for one chunked upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    /// Server-assigned monotonic row id; `None` until persisted.
    id: Option<i64>,
    upload_id: UploadId,
    original_filename: Option<String>,
    /// Size the client declared when uploading; advisory.
    declared_size: Option<u64>,
    /// Actual size of the assembled blob; set at assembly.
    file_size: Option<u64>,
    /// Whole-file checksum; set once assembly verified it.
    file_checksum: Option<Md5Checksum>,
    status: UploadStatus,
    /// Arbitrary client-supplied metadata.
    metadata: serde_json::Map<String, serde_json::Value>,
    /// Storage-relative path of the canonical blob; set at assembly.
    path: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UploadSession {
    /// Creates a new session in `uploading`, as done lazily on first chunk.
    pub fn new(upload_id: UploadId, original_filename: Option<String>, declared_size: Option<u64>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            upload_id,
            original_filename,
            declared_size,
            file_size: None,
            file_checksum: None,
            status: UploadStatus::Uploading,
            metadata: serde_json::Map::new(),
            path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrates a session from its persisted representation.
    ///
    /// Used by repositories only; performs no transition validation.
    #[allow(clippy::too_many_arguments)]
    pub fn hydrate(
        id: i64,
        upload_id: UploadId,
        original_filename: Option<String>,
        declared_size: Option<u64>,
        file_size: Option<u64>,
        file_checksum: Option<Md5Checksum>,
        status: UploadStatus,
        metadata: serde_json::Map<String, serde_json::Value>,
        path: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id),
            upload_id,
            original_filename,
            declared_size,
            file_size,
            file_checksum,
            status,
            metadata,
            path,
            created_at,
            updated_at,
        }
    }

    /// Server-assigned row id, if persisted.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Assigns the row id after the initial insert.
    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn upload_id(&self) -> UploadId {
        self.upload_id
    }

    pub fn original_filename(&self) -> Option<&str> {
        self.original_filename.as_deref()
    }

    pub fn declared_size(&self) -> Option<u64> {
        self.declared_size
    }

    pub fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    pub fn file_checksum(&self) -> Option<&Md5Checksum> {
        self.file_checksum.as_ref()
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn metadata(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Extension of the original filename, lowercased, without the dot.
    pub fn original_extension(&self) -> Option<String> {
        let name = self.original_filename.as_deref()?;
        let ext = std::path::Path::new(name).extension()?.to_str()?;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_ascii_lowercase())
        }
    }

    /// Seconds elapsed since the session was last mutated.
    pub fn seconds_since_update(&self, now: DateTime<Utc>) -> i64 {
        (now - self.updated_at).num_seconds()
    }

    /// Merges client-supplied advisory fields that may arrive with any chunk.
    pub fn merge_advisory(&mut self, filename: Option<&str>, declared_size: Option<u64>) {
        if self.original_filename.is_none() {
            if let Some(name) = filename {
                self.original_filename = Some(name.to_string());
            }
        }
        if self.declared_size.is_none() {
            self.declared_size = declared_size;
        }
    }

    /// Replaces the metadata map.
    pub fn set_metadata(&mut self, metadata: serde_json::Map<String, serde_json::Value>) {
        self.metadata = metadata;
        self.touch();
    }

    /// `uploading → assembling`, taken when completion starts.
    pub fn begin_assembly(&mut self) -> Result<(), IngestError> {
        self.status = self.status.transition_to(UploadStatus::Assembling)?;
        self.touch();
        Ok(())
    }

    /// Records the verified assembly result while remaining `assembling`.
    ///
    /// The session stays in `assembling` until the processing job records
    /// the `original` variant; only then does it move to `complete`.
    pub fn record_assembly(&mut self, checksum: Md5Checksum, file_size: u64, path: String) -> Result<(), IngestError> {
        if self.status != UploadStatus::Assembling {
            return Err(IngestError::InvalidStateTransition(format!(
                "cannot record assembly while {}",
                self.status
            )));
        }
        self.file_checksum = Some(checksum);
        self.file_size = Some(file_size);
        self.path = Some(path);
        self.touch();
        Ok(())
    }

    /// `assembling → complete`, taken by the processing job on success.
    pub fn mark_complete(&mut self) -> Result<(), IngestError> {
        self.status = self.status.transition_to(UploadStatus::Complete)?;
        self.touch();
        Ok(())
    }

    /// Fails the session from any non-terminal state.
    pub fn mark_failed(&mut self) -> Result<(), IngestError> {
        self.status = self.status.transition_to(UploadStatus::Failed)?;
        self.touch();
        Ok(())
    }

    /// `failed → uploading`: the attachment resolver's recovery reset,
    /// taken only when the assembled blob still exists on disk.
    pub fn reset_for_reprocessing(&mut self) -> Result<(), IngestError> {
        self.status = self.status.transition_to(UploadStatus::Uploading)?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
