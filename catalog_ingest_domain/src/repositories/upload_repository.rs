// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Repository Port
//!
//! Persistence interface for [`UploadSession`] rows. The registry is the
//! durable record of every session's state machine; the chunk files
//! themselves live in the blob store and are not mirrored here.

use async_trait::async_trait;

use crate::entities::UploadSession;
use crate::value_objects::UploadId;
use crate::IngestError;

/// Persistent registry of upload sessions.
#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Inserts the session if no row with its `upload_id` exists, otherwise
    /// returns the existing row untouched.
    ///
    /// This is the create-if-absent upsert required to tolerate concurrent
    /// first chunks of the same session; callers must not assume the
    /// returned row carries the advisory fields they passed in.
    async fn create_if_absent(&self, session: &UploadSession) -> Result<UploadSession, IngestError>;

    /// Looks a session up by its client-chosen uuid.
    async fn find_by_upload_id(&self, upload_id: UploadId) -> Result<Option<UploadSession>, IngestError>;

    /// Looks a session up by its server-assigned row id.
    async fn find_by_id(&self, id: i64) -> Result<Option<UploadSession>, IngestError>;

    /// Persists the session's current state (status, checksum, sizes, path,
    /// metadata, timestamps). The row must already exist.
    async fn update(&self, session: &UploadSession) -> Result<(), IngestError>;
}
