// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Integrity Checksums
//!
//! This module provides the `Md5Checksum` value object and the incremental
//! `Md5Hasher` used for integrity verification throughout the ingest flow.
//!
//! ## Overview
//!
//! The upload protocol exchanges MD5 digests as lowercase hexadecimal
//! strings at two levels:
//!
//! - **Per chunk**: every received chunk must hash to the checksum the
//!   client declared for it before it is written to disk
//! - **Per file**: the assembled file must hash to the whole-file checksum
//!   declared at completion before it becomes the canonical blob
//!
//! Derived image variants also store an MD5 of their encoded bytes so that
//! blobs can be audited against the image table at any time.
//!
//! ## Processing Model
//!
//! `Md5Hasher` supports incremental hashing so assembly can stream chunk
//! files into the canonical blob without buffering the whole file:
//!
//! ```rust
//! use catalog_ingest_domain::value_objects::{Md5Checksum, Md5Hasher};
//!
//! let mut hasher = Md5Hasher::new();
//! hasher.update(b"hello ");
//! hasher.update(b"world");
//! assert_eq!(hasher.finalize(), Md5Checksum::of(b"hello world"));
//! ```
//!
//! MD5 is retained for wire compatibility with the upload clients; it is an
//! integrity check against corruption, not an authenticity mechanism.

use serde::{Deserialize, Serialize};

use crate::IngestError;

/// An MD5 digest in canonical lowercase-hex form.
///
/// Construction is validating: a checksum is always exactly 32 lowercase
/// hexadecimal characters, so equality comparison against client-supplied
/// values is a plain string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Md5Checksum(String);

impl Md5Checksum {
    /// Number of hex characters in an MD5 digest.
    pub const HEX_LEN: usize = 32;

    /// Computes the checksum of a byte slice.
    pub fn of(bytes: &[u8]) -> Self {
        let digest = md5::compute(bytes);
        Self(hex::encode(digest.0))
    }

    /// Parses a client-supplied checksum string.
    ///
    /// Uppercase hex is normalized to lowercase; anything that is not 32 hex
    /// characters is rejected.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ValidationFailed` for malformed input.
    pub fn parse(s: &str) -> Result<Self, IngestError> {
        if s.len() != Self::HEX_LEN {
            return Err(IngestError::validation_failed(format!(
                "checksum must be {} hex characters, got {}",
                Self::HEX_LEN,
                s.len()
            )));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IngestError::validation_failed(format!(
                "checksum contains non-hex characters: '{}'",
                s
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Returns the checksum as a lowercase hex string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Md5Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Incremental MD5 state for streaming verification.
///
/// Used during assembly where chunk files are concatenated into the
/// canonical blob: each copied buffer feeds the hasher, and the final digest
/// is compared against the client's declared whole-file checksum.
pub struct Md5Hasher {
    context: md5::Context,
}

impl Default for Md5Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Md5Hasher {
    /// Creates a fresh hasher.
    pub fn new() -> Self {
        Self {
            context: md5::Context::new(),
        }
    }

    /// Feeds bytes into the running digest.
    pub fn update(&mut self, bytes: &[u8]) {
        self.context.consume(bytes);
    }

    /// Consumes the hasher and produces the final checksum.
    pub fn finalize(self) -> Md5Checksum {
        let digest = self.context.compute();
        Md5Checksum(hex::encode(digest.0))
    }
}
