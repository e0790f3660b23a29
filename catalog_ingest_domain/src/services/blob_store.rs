// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Blob Store Port
//!
//! Session-scoped binary storage for chunk temp files, assembled canonical
//! blobs, and derived variants. The contract fixes the persisted layout:
//!
//! ```text
//! <root>/tmp/<upload_id>/chunk_<index>.part     -- per-chunk temp files
//! <root>/<upload_id>/original(.<ext>)           -- assembled canonical blob
//! <root>/<upload_id>/<variant>.jpg              -- derived variants
//! ```
//!
//! ## Write Semantics
//!
//! Every write finalizes atomically (write to a temp file, then rename into
//! place). Re-writing the same chunk index replaces the previous bytes, so
//! chunk reception is idempotent without any locking: concurrent writers of
//! the same `(upload, index)` race to an equivalent end state.
//!
//! The manifest of a session is whatever `list_chunks` observes on disk;
//! no separate chunk bookkeeping exists.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::value_objects::{ChunkManifest, UploadId};
use crate::IngestError;

/// Session-rooted blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Atomically writes one chunk at `tmp/<upload_id>/chunk_<index>.part`.
    /// Re-sending an index overwrites the previous bytes.
    async fn put_chunk(&self, upload_id: UploadId, index: u32, bytes: &[u8]) -> Result<(), IngestError>;

    /// Reads one chunk's bytes.
    async fn read_chunk(&self, upload_id: UploadId, index: u32) -> Result<Vec<u8>, IngestError>;

    /// Lists the chunk indices present for a session, in ascending numeric
    /// order (parsed from the filename, never lexically sorted).
    async fn list_chunks(&self, upload_id: UploadId) -> Result<ChunkManifest, IngestError>;

    /// Removes the session's chunk temp directory and everything in it.
    /// Missing directories are not an error.
    async fn delete_chunk_dir(&self, upload_id: UploadId) -> Result<(), IngestError>;

    /// Atomically writes a named blob into the session directory and
    /// returns its storage-relative path.
    async fn put_blob(&self, upload_id: UploadId, name: &str, bytes: &[u8]) -> Result<String, IngestError>;

    /// Atomically moves an already-written staging file (obtained from
    /// [`BlobStore::staging_path`]) into place as a named blob and returns
    /// its storage-relative path. The rename never copies.
    async fn put_blob_from_staging(
        &self,
        upload_id: UploadId,
        name: &str,
        staging: &Path,
    ) -> Result<String, IngestError>;

    /// Reads a named blob of the session.
    async fn read_blob(&self, upload_id: UploadId, name: &str) -> Result<Vec<u8>, IngestError>;

    /// Absolute filesystem path of a chunk file.
    fn chunk_path(&self, upload_id: UploadId, index: u32) -> PathBuf;

    /// Absolute filesystem path of a named blob.
    fn blob_path(&self, upload_id: UploadId, name: &str) -> PathBuf;

    /// Storage-relative path of a named blob (`<upload_id>/<name>`).
    fn relative_blob_path(&self, upload_id: UploadId, name: &str) -> String;

    /// A staging file path on the same filesystem as the session directory,
    /// suitable for stream-writing and then `put_blob_from_staging`.
    fn staging_path(&self, upload_id: UploadId) -> PathBuf;

    /// Whether a blob exists at the given storage-relative path.
    async fn exists(&self, relative_path: &str) -> Result<bool, IngestError>;
}
