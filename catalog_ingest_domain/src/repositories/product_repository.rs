// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Product Repository Port
//!
//! Catalog-side persistence interface used by the attachment resolver.
//! Product CRUD proper is an external surface; this port covers SKU lookup,
//! link management, and the primary-image invariant.

use async_trait::async_trait;

use crate::entities::{Product, ProductImageLink};
use crate::value_objects::Sku;
use crate::IngestError;

/// Persistent store of products and product-image links.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Looks a product up by its business key.
    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<Product>, IngestError>;

    /// Creates a product. Used by seeding and tests; the catalog CRUD
    /// surface is external.
    async fn create(&self, sku: &Sku, name: &str) -> Result<Product, IngestError>;

    /// Fetches an existing product-image link.
    async fn find_link(&self, product_id: i64, image_id: i64) -> Result<Option<ProductImageLink>, IngestError>;

    /// Inserts or updates the `(product, image)` link inside one
    /// transaction.
    ///
    /// When `is_primary` is requested, every other link of the product is
    /// demoted and the product's `primary_image_id` is set to this image in
    /// the same transaction, so the at-most-one-primary invariant can never
    /// be observed violated.
    async fn attach_image(
        &self,
        product_id: i64,
        image_id: i64,
        is_primary: bool,
    ) -> Result<ProductImageLink, IngestError>;

    /// Lists every image link of a product.
    async fn links_for_product(&self, product_id: i64) -> Result<Vec<ProductImageLink>, IngestError>;
}
