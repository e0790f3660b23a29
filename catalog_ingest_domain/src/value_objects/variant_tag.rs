// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Image Variant Tags
//!
//! This module provides `VariantTag`, the closed set of derived image
//! variants the processing pipeline produces for every completed upload.
//!
//! ## Variant Family
//!
//! | Tag | Longest side | Encoding |
//! |---|---|---|
//! | `original` | source dimensions | source bytes preserved |
//! | `256` | 256 px | JPEG |
//! | `512` | 512 px | JPEG |
//! | `1024` | 1024 px | JPEG |
//!
//! `original` is a pseudo-variant: it points at the unmodified assembled
//! blob and never resizes. The sized variants shrink the longest side to the
//! target, preserve aspect ratio, and never enlarge a smaller source.
//!
//! The set of sized variants is configurable (`variants` option); this type
//! models any `(tag, longest_side)` pair while the constants cover the
//! default family.

use serde::{Deserialize, Serialize};

use crate::IngestError;

/// Identifies one derived image of an upload.
///
/// `(upload, variant)` is unique in the image table; the tag also determines
/// the variant's deterministic blob name so re-processing converges on the
/// same paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantTag {
    /// The unmodified assembled source image.
    Original,
    /// A resized rendition with the given target longest side in pixels.
    Sized(u32),
}

impl VariantTag {
    /// The default sized-variant family: 256, 512, and 1024 pixels.
    pub const DEFAULT_SIZES: [u32; 3] = [256, 512, 1024];

    /// Returns the wire/storage name of the tag (`original`, `256`, ...).
    pub fn as_str(&self) -> String {
        match self {
            VariantTag::Original => "original".to_string(),
            VariantTag::Sized(side) => side.to_string(),
        }
    }

    /// Parses a tag from its wire/storage name.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ValidationFailed` when the name is neither
    /// `original` nor a positive pixel size.
    pub fn parse(s: &str) -> Result<Self, IngestError> {
        if s == "original" {
            return Ok(VariantTag::Original);
        }
        match s.parse::<u32>() {
            Ok(side) if side > 0 => Ok(VariantTag::Sized(side)),
            _ => Err(IngestError::validation_failed(format!(
                "unknown variant tag '{}'",
                s
            ))),
        }
    }

    /// Target longest side in pixels; `None` for the original.
    pub fn target_longest_side(&self) -> Option<u32> {
        match self {
            VariantTag::Original => None,
            VariantTag::Sized(side) => Some(*side),
        }
    }

    /// Blob name of this variant inside the upload's session directory.
    ///
    /// Sized variants are always JPEG; the original keeps the extension of
    /// the uploaded file when one is known.
    pub fn blob_name(&self, original_extension: Option<&str>) -> String {
        match self {
            VariantTag::Original => match original_extension {
                Some(ext) if !ext.is_empty() => format!("original.{}", ext),
                _ => "original".to_string(),
            },
            VariantTag::Sized(side) => format!("{}.jpg", side),
        }
    }
}

impl std::fmt::Display for VariantTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        assert_eq!(VariantTag::parse("original").unwrap(), VariantTag::Original);
        assert_eq!(VariantTag::parse("512").unwrap(), VariantTag::Sized(512));
        assert_eq!(VariantTag::Sized(256).as_str(), "256");
    }

    #[test]
    fn test_rejects_unknown_tags() {
        assert!(VariantTag::parse("thumbnail").is_err());
        assert!(VariantTag::parse("0").is_err());
        assert!(VariantTag::parse("-256").is_err());
    }

    #[test]
    fn test_blob_names() {
        assert_eq!(VariantTag::Original.blob_name(Some("png")), "original.png");
        assert_eq!(VariantTag::Original.blob_name(None), "original");
        assert_eq!(VariantTag::Sized(1024).blob_name(Some("png")), "1024.jpg");
    }

    #[test]
    fn test_default_family() {
        assert_eq!(VariantTag::DEFAULT_SIZES, [256, 512, 1024]);
        assert_eq!(VariantTag::Original.target_longest_side(), None);
        assert_eq!(VariantTag::Sized(512).target_longest_side(), Some(512));
    }
}
