// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem Blob Store
//!
//! Filesystem-backed implementation of the [`BlobStore`] port, rooted at the
//! configured `blob.root` directory:
//!
//! ```text
//! <root>/tmp/<upload_id>/chunk_<index>.part     -- per-chunk temp files
//! <root>/<upload_id>/original(.<ext>)           -- assembled canonical blob
//! <root>/<upload_id>/<variant>.jpg              -- derived variants
//! ```
//!
//! ## Atomicity
//!
//! Every write lands in a sibling temp file first and is renamed into place,
//! so readers never observe partial content and re-sending a chunk index
//! atomically replaces the previous bytes. Staging files for assembly live
//! under the same root, which keeps the final rename on one filesystem.
//!
//! ## Listing
//!
//! `list_chunks` parses the integer index out of each `chunk_<n>.part`
//! filename; entries that do not match the pattern are ignored. Ordering is
//! numeric via [`ChunkManifest`], never a lexical filename sort.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use catalog_ingest_domain::{BlobStore, ChunkManifest, IngestError, UploadId};

const CHUNK_PREFIX: &str = "chunk_";
const CHUNK_SUFFIX: &str = ".part";

/// Session-scoped blob storage on the local filesystem.
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// Creates a store rooted at `root`. The directory is created on first
    /// use; construction never touches the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chunk_dir(&self, upload_id: UploadId) -> PathBuf {
        self.root.join("tmp").join(upload_id.to_string())
    }

    fn session_dir(&self, upload_id: UploadId) -> PathBuf {
        self.root.join(upload_id.to_string())
    }

    fn chunk_file_name(index: u32) -> String {
        format!("{}{}{}", CHUNK_PREFIX, index, CHUNK_SUFFIX)
    }

    /// Parses the chunk index out of a `chunk_<n>.part` filename.
    fn parse_chunk_index(file_name: &str) -> Option<u32> {
        file_name
            .strip_prefix(CHUNK_PREFIX)?
            .strip_suffix(CHUNK_SUFFIX)?
            .parse()
            .ok()
    }

    async fn ensure_dir(path: &Path) -> Result<(), IngestError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| IngestError::io_error(format!("failed to create directory {}: {}", path.display(), e)))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o755);
            fs::set_permissions(path, perms)
                .await
                .map_err(|e| IngestError::io_error(format!("failed to chmod {}: {}", path.display(), e)))?;
        }
        Ok(())
    }

    #[cfg(unix)]
    async fn set_file_permissions(path: &Path) -> Result<(), IngestError> {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o644);
        fs::set_permissions(path, perms)
            .await
            .map_err(|e| IngestError::io_error(format!("failed to chmod {}: {}", path.display(), e)))
    }

    #[cfg(not(unix))]
    async fn set_file_permissions(_path: &Path) -> Result<(), IngestError> {
        Ok(())
    }

    /// Writes bytes to a temp sibling of `dest` and renames it into place.
    async fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), IngestError> {
        let parent = dest
            .parent()
            .ok_or_else(|| IngestError::io_error(format!("blob path {} has no parent", dest.display())))?;
        Self::ensure_dir(parent).await?;

        let temp = parent.join(format!(".{}.tmp", Uuid::new_v4()));
        let mut file = fs::File::create(&temp)
            .await
            .map_err(|e| IngestError::io_error(format!("failed to create temp file {}: {}", temp.display(), e)))?;
        file.write_all(bytes)
            .await
            .map_err(|e| IngestError::io_error(format!("failed to write {}: {}", temp.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| IngestError::io_error(format!("failed to flush {}: {}", temp.display(), e)))?;
        drop(file);

        Self::set_file_permissions(&temp).await?;
        fs::rename(&temp, dest).await.map_err(|e| {
            IngestError::io_error(format!(
                "failed to rename {} into {}: {}",
                temp.display(),
                dest.display(),
                e
            ))
        })?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put_chunk(&self, upload_id: UploadId, index: u32, bytes: &[u8]) -> Result<(), IngestError> {
        let dest = self.chunk_path(upload_id, index);
        Self::write_atomic(&dest, bytes).await?;
        debug!(%upload_id, index, size = bytes.len(), "chunk written");
        Ok(())
    }

    async fn read_chunk(&self, upload_id: UploadId, index: u32) -> Result<Vec<u8>, IngestError> {
        let path = self.chunk_path(upload_id, index);
        fs::read(&path)
            .await
            .map_err(|e| IngestError::io_error(format!("failed to read chunk {}: {}", path.display(), e)))
    }

    async fn list_chunks(&self, upload_id: UploadId) -> Result<ChunkManifest, IngestError> {
        let dir = self.chunk_dir(upload_id);
        let mut indices = Vec::new();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ChunkManifest::from_indices(indices));
            }
            Err(e) => {
                return Err(IngestError::io_error(format!(
                    "failed to list chunk dir {}: {}",
                    dir.display(),
                    e
                )));
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| IngestError::io_error(format!("failed to read chunk dir {}: {}", dir.display(), e)))?
        {
            let name = entry.file_name();
            if let Some(index) = name.to_str().and_then(Self::parse_chunk_index) {
                indices.push(index);
            }
        }

        Ok(ChunkManifest::from_indices(indices))
    }

    async fn delete_chunk_dir(&self, upload_id: UploadId) -> Result<(), IngestError> {
        let dir = self.chunk_dir(upload_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IngestError::io_error(format!(
                "failed to delete chunk dir {}: {}",
                dir.display(),
                e
            ))),
        }
    }

    async fn put_blob(&self, upload_id: UploadId, name: &str, bytes: &[u8]) -> Result<String, IngestError> {
        let dest = self.blob_path(upload_id, name);
        Self::write_atomic(&dest, bytes).await?;
        debug!(%upload_id, name, size = bytes.len(), "blob written");
        Ok(self.relative_blob_path(upload_id, name))
    }

    async fn put_blob_from_staging(
        &self,
        upload_id: UploadId,
        name: &str,
        staging: &Path,
    ) -> Result<String, IngestError> {
        let dest = self.blob_path(upload_id, name);
        let parent = dest
            .parent()
            .ok_or_else(|| IngestError::io_error(format!("blob path {} has no parent", dest.display())))?;
        Self::ensure_dir(parent).await?;
        Self::set_file_permissions(staging).await?;
        fs::rename(staging, &dest).await.map_err(|e| {
            IngestError::io_error(format!(
                "failed to finalize staging file {} into {}: {}",
                staging.display(),
                dest.display(),
                e
            ))
        })?;
        Ok(self.relative_blob_path(upload_id, name))
    }

    async fn read_blob(&self, upload_id: UploadId, name: &str) -> Result<Vec<u8>, IngestError> {
        let path = self.blob_path(upload_id, name);
        fs::read(&path)
            .await
            .map_err(|e| IngestError::io_error(format!("failed to read blob {}: {}", path.display(), e)))
    }

    fn chunk_path(&self, upload_id: UploadId, index: u32) -> PathBuf {
        self.chunk_dir(upload_id).join(Self::chunk_file_name(index))
    }

    fn blob_path(&self, upload_id: UploadId, name: &str) -> PathBuf {
        self.session_dir(upload_id).join(name)
    }

    fn relative_blob_path(&self, upload_id: UploadId, name: &str) -> String {
        format!("{}/{}", upload_id, name)
    }

    fn staging_path(&self, upload_id: UploadId) -> PathBuf {
        self.chunk_dir(upload_id).join(format!(".assembly-{}.tmp", Uuid::new_v4()))
    }

    async fn exists(&self, relative_path: &str) -> Result<bool, IngestError> {
        let path = self.root.join(relative_path);
        match fs::try_exists(&path).await {
            Ok(found) => Ok(found),
            Err(e) => {
                warn!(path = %path.display(), "existence probe failed: {}", e);
                Err(IngestError::io_error(format!(
                    "failed to probe {}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }
}
