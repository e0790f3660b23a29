// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Product Repository
//!
//! SQLite-backed implementation of the [`ProductRepository`] port.
//!
//! `attach_image` is the one write in the system with a multi-row
//! invariant: a product may flag at most one link primary, and the
//! denormalized `products.primary_image_id` must name that link's image.
//! Both sides are written inside a single transaction in "clear others,
//! then set this one" order, so the invariant is never observable broken,
//! even to readers racing the attach.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use catalog_ingest_domain::{IngestError, Product, ProductImageLink, ProductRepository, Sku};

/// SQLite-backed catalog product store.
pub struct SqliteProductRepository {
    pool: SqlitePool,
}

impl SqliteProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_product(row: &SqliteRow) -> Result<Product, IngestError> {
        let sku: String = row
            .try_get("sku")
            .map_err(|e| IngestError::database_error(format!("missing sku column: {}", e)))?;
        Ok(Product::new(
            row.try_get("id")
                .map_err(|e| IngestError::database_error(format!("missing id column: {}", e)))?,
            Sku::parse(&sku)?,
            row.try_get("name")
                .map_err(|e| IngestError::database_error(format!("missing name column: {}", e)))?,
            row.try_get("primary_image_id")
                .map_err(|e| IngestError::database_error(format!("missing primary_image_id column: {}", e)))?,
        ))
    }

    fn row_to_link(row: &SqliteRow) -> Result<ProductImageLink, IngestError> {
        let is_primary: i64 = row
            .try_get("is_primary")
            .map_err(|e| IngestError::database_error(format!("missing is_primary column: {}", e)))?;
        Ok(ProductImageLink {
            product_id: row
                .try_get("product_id")
                .map_err(|e| IngestError::database_error(format!("missing product_id column: {}", e)))?,
            image_id: row
                .try_get("image_id")
                .map_err(|e| IngestError::database_error(format!("missing image_id column: {}", e)))?,
            is_primary: is_primary != 0,
        })
    }
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<Product>, IngestError> {
        let row = sqlx::query("SELECT * FROM products WHERE sku = ?")
            .bind(sku.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestError::database_error(format!("failed to query product: {}", e)))?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn create(&self, sku: &Sku, name: &str) -> Result<Product, IngestError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO products (sku, name, primary_image_id, created_at, updated_at) VALUES (?, ?, NULL, ?, ?)",
        )
        .bind(sku.as_str())
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::database_error(format!("failed to create product: {}", e)))?;

        Ok(Product::new(result.last_insert_rowid(), sku.clone(), name.to_string(), None))
    }

    async fn find_link(&self, product_id: i64, image_id: i64) -> Result<Option<ProductImageLink>, IngestError> {
        let row = sqlx::query("SELECT * FROM product_images WHERE product_id = ? AND image_id = ?")
            .bind(product_id)
            .bind(image_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IngestError::database_error(format!("failed to query link: {}", e)))?;

        row.as_ref().map(Self::row_to_link).transpose()
    }

    async fn attach_image(
        &self,
        product_id: i64,
        image_id: i64,
        is_primary: bool,
    ) -> Result<ProductImageLink, IngestError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IngestError::database_error(format!("failed to start attach transaction: {}", e)))?;

        // Insert the link; an existing link keeps its flag for now and is
        // promoted below when primary was requested.
        sqlx::query(
            r#"
            INSERT INTO product_images (product_id, image_id, is_primary, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (product_id, image_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(image_id)
        .bind(is_primary)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| IngestError::database_error(format!("failed to insert link: {}", e)))?;

        if is_primary {
            // Clear others, then set this one - one atomic step
            sqlx::query("UPDATE product_images SET is_primary = 0 WHERE product_id = ? AND image_id != ?")
                .bind(product_id)
                .bind(image_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| IngestError::database_error(format!("failed to demote primaries: {}", e)))?;

            sqlx::query("UPDATE product_images SET is_primary = 1 WHERE product_id = ? AND image_id = ?")
                .bind(product_id)
                .bind(image_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| IngestError::database_error(format!("failed to promote link: {}", e)))?;

            sqlx::query("UPDATE products SET primary_image_id = ?, updated_at = ? WHERE id = ?")
                .bind(image_id)
                .bind(Utc::now())
                .bind(product_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| IngestError::database_error(format!("failed to set primary_image_id: {}", e)))?;
        }

        let row = sqlx::query("SELECT * FROM product_images WHERE product_id = ? AND image_id = ?")
            .bind(product_id)
            .bind(image_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| IngestError::database_error(format!("failed to read back link: {}", e)))?;
        let link = Self::row_to_link(&row)?;

        tx.commit()
            .await
            .map_err(|e| IngestError::database_error(format!("failed to commit attach transaction: {}", e)))?;

        Ok(link)
    }

    async fn links_for_product(&self, product_id: i64) -> Result<Vec<ProductImageLink>, IngestError> {
        let rows = sqlx::query("SELECT * FROM product_images WHERE product_id = ? ORDER BY image_id")
            .bind(product_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IngestError::database_error(format!("failed to list links: {}", e)))?;

        rows.iter().map(Self::row_to_link).collect()
    }
}
