// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Upload Repository
//!
//! SQLite-backed implementation of the [`UploadRepository`] port. The
//! `uploads` table is the durable registry of every session's state
//! machine; rows are created lazily on first chunk via a conflict-ignoring
//! upsert so that concurrent first chunks of one session cannot race into
//! duplicate rows.
//!
//! Timestamps are stored as RFC 3339 text in UTC; status and checksum
//! columns round-trip through their validating value objects, so a corrupt
//! row surfaces as a database error instead of silently entering the state
//! machine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use catalog_ingest_domain::{IngestError, Md5Checksum, UploadId, UploadRepository, UploadSession, UploadStatus};

/// SQLite-backed upload session registry.
pub struct SqliteUploadRepository {
    pool: SqlitePool,
}

impl SqliteUploadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_session(row: &SqliteRow) -> Result<UploadSession, IngestError> {
        let upload_id: String = row
            .try_get("upload_id")
            .map_err(|e| IngestError::database_error(format!("missing upload_id column: {}", e)))?;
        let status: String = row
            .try_get("status")
            .map_err(|e| IngestError::database_error(format!("missing status column: {}", e)))?;
        let metadata_text: String = row
            .try_get("metadata")
            .map_err(|e| IngestError::database_error(format!("missing metadata column: {}", e)))?;
        let metadata = match serde_json::from_str(&metadata_text)? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        let file_checksum: Option<String> = row
            .try_get("file_checksum")
            .map_err(|e| IngestError::database_error(format!("missing file_checksum column: {}", e)))?;
        let checksum = file_checksum.as_deref().map(Md5Checksum::parse).transpose()?;

        let declared_size: Option<i64> = row
            .try_get("declared_size")
            .map_err(|e| IngestError::database_error(format!("missing declared_size column: {}", e)))?;
        let file_size: Option<i64> = row
            .try_get("file_size")
            .map_err(|e| IngestError::database_error(format!("missing file_size column: {}", e)))?;

        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| IngestError::database_error(format!("missing created_at column: {}", e)))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| IngestError::database_error(format!("missing updated_at column: {}", e)))?;

        Ok(UploadSession::hydrate(
            row.try_get("id")
                .map_err(|e| IngestError::database_error(format!("missing id column: {}", e)))?,
            UploadId::parse(&upload_id)?,
            row.try_get("original_filename")
                .map_err(|e| IngestError::database_error(format!("missing original_filename column: {}", e)))?,
            declared_size.map(|v| v as u64),
            file_size.map(|v| v as u64),
            checksum,
            UploadStatus::parse(&status)?,
            metadata,
            row.try_get("path")
                .map_err(|e| IngestError::database_error(format!("missing path column: {}", e)))?,
            created_at,
            updated_at,
        ))
    }
}

#[async_trait]
impl UploadRepository for SqliteUploadRepository {
    async fn create_if_absent(&self, session: &UploadSession) -> Result<UploadSession, IngestError> {
        let metadata = serde_json::Value::Object(session.metadata().clone()).to_string();

        sqlx::query(
            r#"
            INSERT INTO uploads (
                upload_id, original_filename, declared_size, file_size,
                file_checksum, status, metadata, path, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (upload_id) DO NOTHING
            "#,
        )
        .bind(session.upload_id().to_string())
        .bind(session.original_filename())
        .bind(session.declared_size().map(|v| v as i64))
        .bind(session.file_size().map(|v| v as i64))
        .bind(session.file_checksum().map(|c| c.as_str().to_string()))
        .bind(session.status().as_str())
        .bind(metadata)
        .bind(session.path())
        .bind(session.created_at())
        .bind(session.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::database_error(format!("failed to upsert upload: {}", e)))?;

        self.find_by_upload_id(session.upload_id())
            .await?
            .ok_or_else(|| IngestError::database_error("upload row vanished after upsert".to_string()))
    }

    async fn find_by_upload_id(&self, upload_id: UploadId) -> Result<Option<UploadSession>, IngestError> {
        let row = sqlx::query("SELECT * FROM uploads WHERE upload_id = ?")
            .bind(upload_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestError::database_error(format!("failed to query upload: {}", e)))?;

        row.as_ref().map(Self::row_to_session).transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UploadSession>, IngestError> {
        let row = sqlx::query("SELECT * FROM uploads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestError::database_error(format!("failed to query upload by id: {}", e)))?;

        row.as_ref().map(Self::row_to_session).transpose()
    }

    async fn update(&self, session: &UploadSession) -> Result<(), IngestError> {
        let id = session
            .id()
            .ok_or_else(|| IngestError::database_error("cannot update an unpersisted upload".to_string()))?;
        let metadata = serde_json::Value::Object(session.metadata().clone()).to_string();

        let result = sqlx::query(
            r#"
            UPDATE uploads
            SET original_filename = ?, declared_size = ?, file_size = ?,
                file_checksum = ?, status = ?, metadata = ?, path = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(session.original_filename())
        .bind(session.declared_size().map(|v| v as i64))
        .bind(session.file_size().map(|v| v as i64))
        .bind(session.file_checksum().map(|c| c.as_str().to_string()))
        .bind(session.status().as_str())
        .bind(metadata)
        .bind(session.path())
        .bind(session.updated_at())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::database_error(format!("failed to update upload: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(IngestError::not_found(format!("upload row {} does not exist", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::schema::in_memory_pool;

    async fn repository() -> SqliteUploadRepository {
        let pool = in_memory_pool().await.unwrap();
        SqliteUploadRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = repository().await;
        let session = UploadSession::new(UploadId::generate(), Some("cat.png".to_string()), Some(42));
        let persisted = repo.create_if_absent(&session).await.unwrap();

        assert!(persisted.id().is_some());
        assert_eq!(persisted.upload_id(), session.upload_id());
        assert_eq!(persisted.original_filename(), Some("cat.png"));
        assert_eq!(persisted.status(), UploadStatus::Uploading);

        let found = repo.find_by_id(persisted.id().unwrap()).await.unwrap().unwrap();
        assert_eq!(found, persisted);
    }

    #[tokio::test]
    async fn test_create_if_absent_keeps_existing_row() {
        let repo = repository().await;
        let id = UploadId::generate();
        let first = UploadSession::new(id, Some("first.png".to_string()), Some(1));
        let second = UploadSession::new(id, Some("second.png".to_string()), Some(2));

        let a = repo.create_if_absent(&first).await.unwrap();
        let b = repo.create_if_absent(&second).await.unwrap();

        assert_eq!(a.id(), b.id());
        assert_eq!(b.original_filename(), Some("first.png"));
    }

    #[tokio::test]
    async fn test_update_round_trips_state() {
        let repo = repository().await;
        let session = UploadSession::new(UploadId::generate(), Some("cat.png".to_string()), None);
        let mut persisted = repo.create_if_absent(&session).await.unwrap();

        persisted.begin_assembly().unwrap();
        persisted
            .record_assembly(Md5Checksum::of(b"bytes"), 5, format!("{}/original.png", session.upload_id()))
            .unwrap();
        repo.update(&persisted).await.unwrap();

        let found = repo.find_by_upload_id(session.upload_id()).await.unwrap().unwrap();
        assert_eq!(found.status(), UploadStatus::Assembling);
        assert_eq!(found.file_size(), Some(5));
        assert_eq!(found.file_checksum(), Some(&Md5Checksum::of(b"bytes")));
        assert!(found.path().unwrap().ends_with("original.png"));
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let repo = repository().await;
        assert!(repo.find_by_upload_id(UploadId::generate()).await.unwrap().is_none());
        assert!(repo.find_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_unpersisted_fails() {
        let repo = repository().await;
        let session = UploadSession::new(UploadId::generate(), None, None);
        assert!(repo.update(&session).await.is_err());
    }
}
