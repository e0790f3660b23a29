// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Image Repository
//!
//! SQLite-backed implementation of the [`ImageRepository`] port. Variant
//! rows are upserted on `(upload_row_id, variant)` so re-running the
//! processing job replaces rather than duplicates, which is what makes the
//! at-least-once queue safe for this table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use catalog_ingest_domain::{ImageAsset, ImageRepository, IngestError, Md5Checksum, VariantTag};

/// SQLite-backed store of derived image variants.
pub struct SqliteImageRepository {
    pool: SqlitePool,
}

impl SqliteImageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_asset(row: &SqliteRow) -> Result<ImageAsset, IngestError> {
        let variant: String = row
            .try_get("variant")
            .map_err(|e| IngestError::database_error(format!("missing variant column: {}", e)))?;
        let checksum: String = row
            .try_get("checksum")
            .map_err(|e| IngestError::database_error(format!("missing checksum column: {}", e)))?;
        let width: i64 = row
            .try_get("width")
            .map_err(|e| IngestError::database_error(format!("missing width column: {}", e)))?;
        let height: i64 = row
            .try_get("height")
            .map_err(|e| IngestError::database_error(format!("missing height column: {}", e)))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| IngestError::database_error(format!("missing created_at column: {}", e)))?;

        Ok(ImageAsset::hydrate(
            row.try_get("id")
                .map_err(|e| IngestError::database_error(format!("missing id column: {}", e)))?,
            row.try_get("upload_row_id")
                .map_err(|e| IngestError::database_error(format!("missing upload_row_id column: {}", e)))?,
            VariantTag::parse(&variant)?,
            row.try_get("path")
                .map_err(|e| IngestError::database_error(format!("missing path column: {}", e)))?,
            row.try_get("mime_type")
                .map_err(|e| IngestError::database_error(format!("missing mime_type column: {}", e)))?,
            width as u32,
            height as u32,
            Md5Checksum::parse(&checksum)?,
            created_at,
        ))
    }
}

#[async_trait]
impl ImageRepository for SqliteImageRepository {
    async fn upsert(&self, asset: &ImageAsset) -> Result<ImageAsset, IngestError> {
        sqlx::query(
            r#"
            INSERT INTO images (
                upload_row_id, variant, path, mime_type, width, height, checksum, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (upload_row_id, variant) DO UPDATE SET
                path = excluded.path,
                mime_type = excluded.mime_type,
                width = excluded.width,
                height = excluded.height,
                checksum = excluded.checksum
            "#,
        )
        .bind(asset.upload_row_id())
        .bind(asset.variant().as_str())
        .bind(asset.path())
        .bind(asset.mime_type())
        .bind(asset.width() as i64)
        .bind(asset.height() as i64)
        .bind(asset.checksum().as_str())
        .bind(asset.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::database_error(format!("failed to upsert image: {}", e)))?;

        self.find_by_upload_and_variant(asset.upload_row_id(), asset.variant())
            .await?
            .ok_or_else(|| IngestError::database_error("image row vanished after upsert".to_string()))
    }

    async fn find_by_upload_and_variant(
        &self,
        upload_row_id: i64,
        variant: &VariantTag,
    ) -> Result<Option<ImageAsset>, IngestError> {
        let row = sqlx::query("SELECT * FROM images WHERE upload_row_id = ? AND variant = ?")
            .bind(upload_row_id)
            .bind(variant.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestError::database_error(format!("failed to query image: {}", e)))?;

        row.as_ref().map(Self::row_to_asset).transpose()
    }

    async fn list_for_upload(&self, upload_row_id: i64) -> Result<Vec<ImageAsset>, IngestError> {
        // Original first, then sized variants ascending
        let rows = sqlx::query(
            r#"
            SELECT * FROM images
            WHERE upload_row_id = ?
            ORDER BY CASE WHEN variant = 'original' THEN 0 ELSE 1 END, CAST(variant AS INTEGER)
            "#,
        )
        .bind(upload_row_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IngestError::database_error(format!("failed to list images: {}", e)))?;

        rows.iter().map(Self::row_to_asset).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::schema::in_memory_pool;
    use crate::infrastructure::repositories::SqliteUploadRepository;
    use catalog_ingest_domain::{UploadId, UploadRepository, UploadSession};

    async fn fixtures() -> (SqliteImageRepository, i64) {
        let pool = in_memory_pool().await.unwrap();

        let uploads = SqliteUploadRepository::new(pool.clone());
        let session = uploads
            .create_if_absent(&UploadSession::new(UploadId::generate(), Some("a.png".to_string()), None))
            .await
            .unwrap();

        (SqliteImageRepository::new(pool), session.id().unwrap())
    }

    fn asset(upload_row_id: i64, variant: VariantTag, width: u32, height: u32) -> ImageAsset {
        let name = variant.blob_name(Some("png"));
        ImageAsset::new(
            upload_row_id,
            variant,
            format!("u/{}", name),
            "image/jpeg".to_string(),
            width,
            height,
            Md5Checksum::of(name.as_bytes()),
        )
    }

    #[tokio::test]
    async fn test_upsert_assigns_id() {
        let (repo, upload_row_id) = fixtures().await;
        let saved = repo.upsert(&asset(upload_row_id, VariantTag::Original, 2048, 1365)).await.unwrap();
        assert!(saved.id().is_some());
        assert_eq!(saved.width(), 2048);
    }

    #[tokio::test]
    async fn test_upsert_replaces_on_conflict() {
        let (repo, upload_row_id) = fixtures().await;
        let first = repo.upsert(&asset(upload_row_id, VariantTag::Sized(256), 256, 171)).await.unwrap();
        let second = repo.upsert(&asset(upload_row_id, VariantTag::Sized(256), 256, 200)).await.unwrap();

        assert_eq!(first.id(), second.id());
        assert_eq!(second.height(), 200);

        let all = repo.list_for_upload(upload_row_id).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_list_orders_original_first() {
        let (repo, upload_row_id) = fixtures().await;
        for variant in [VariantTag::Sized(1024), VariantTag::Sized(256), VariantTag::Original, VariantTag::Sized(512)] {
            repo.upsert(&asset(upload_row_id, variant, 100, 100)).await.unwrap();
        }

        let all = repo.list_for_upload(upload_row_id).await.unwrap();
        let tags: Vec<String> = all.iter().map(|a| a.variant().as_str()).collect();
        assert_eq!(tags, vec!["original", "256", "512", "1024"]);
    }

    #[tokio::test]
    async fn test_find_missing_variant() {
        let (repo, upload_row_id) = fixtures().await;
        assert!(repo
            .find_by_upload_and_variant(upload_row_id, &VariantTag::Sized(512))
            .await
            .unwrap()
            .is_none());
    }
}
