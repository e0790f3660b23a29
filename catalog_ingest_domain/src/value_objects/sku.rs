// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Product Business Key
//!
//! `Sku` is the validated business key that identifies a catalog product in
//! the attachment flow. The catalog itself is an external collaborator; the
//! ingest core only needs to look products up by SKU and therefore validates
//! the key's shape at the boundary.
//!
//! Accepted shape: 1–64 characters drawn from ASCII letters, digits, dot,
//! underscore, and dash. Surrounding whitespace is trimmed.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::IngestError;

fn sku_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]{1,64}$").expect("static SKU pattern compiles"))
}

/// Validated catalog product business key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Parses and validates a SKU.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ValidationFailed` when the trimmed value is
    /// empty, too long, or contains characters outside the allowed set.
    pub fn parse(s: &str) -> Result<Self, IngestError> {
        let trimmed = s.trim();
        if !sku_pattern().is_match(trimmed) {
            return Err(IngestError::validation_failed(format!(
                "invalid sku '{}': expected 1-64 characters of [A-Za-z0-9._-]",
                s
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the SKU as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_typical_skus() {
        assert_eq!(Sku::parse("WIDGET-001").unwrap().as_str(), "WIDGET-001");
        assert_eq!(Sku::parse("  shoe.42_b  ").unwrap().as_str(), "shoe.42_b");
    }

    #[test]
    fn test_rejects_invalid_skus() {
        assert!(Sku::parse("").is_err());
        assert!(Sku::parse("   ").is_err());
        assert!(Sku::parse("has space").is_err());
        assert!(Sku::parse(&"x".repeat(65)).is_err());
        assert!(Sku::parse("emoji🙂").is_err());
    }
}
