// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Product and Product-Image Link
//!
//! The catalog itself is an external collaborator; these records carry the
//! slice the attachment resolver needs: looking a product up by SKU,
//! linking images to it, and maintaining the primary-image invariant.
//!
//! ## Primary-Image Invariant
//!
//! For any product, at most one link has `is_primary = true`, and when the
//! denormalized `primary_image_id` column is set it names exactly that
//! link's image. Both writes happen in one transaction ("clear others, then
//! set this one"); readers trust the link-table flag if the two ever
//! disagree.

use serde::{Deserialize, Serialize};

use crate::value_objects::Sku;

/// Catalog product as seen by the ingest core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: i64,
    sku: Sku,
    name: String,
    /// Denormalized id of the primary image, if one is flagged.
    primary_image_id: Option<i64>,
}

impl Product {
    pub fn new(id: i64, sku: Sku, name: String, primary_image_id: Option<i64>) -> Self {
        Self {
            id,
            sku,
            name,
            primary_image_id,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_image_id(&self) -> Option<i64> {
        self.primary_image_id
    }
}

/// Many-to-many link between a product and an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImageLink {
    pub product_id: i64,
    pub image_id: i64,
    pub is_primary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_accessors() {
        let product = Product::new(3, Sku::parse("SKU-1").unwrap(), "Widget".to_string(), None);
        assert_eq!(product.id(), 3);
        assert_eq!(product.sku().as_str(), "SKU-1");
        assert_eq!(product.primary_image_id(), None);
    }
}
