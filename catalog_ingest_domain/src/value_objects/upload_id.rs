// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Session Identifier
//!
//! This module provides the `UploadId` value object, the type-safe identifier
//! of an upload session. Upload ids are chosen by the client as RFC 4122 v4
//! UUIDs so that a client can resume an interrupted upload without a
//! server-side handshake.
//!
//! ## Design Principles
//!
//! - **Type Safety**: An `UploadId` cannot be confused with other uuid-backed
//!   identifiers at compile time
//! - **Self-Validation**: Construction from strings rejects anything that is
//!   not a valid v4 UUID
//! - **Value Semantics**: Two ids with the same uuid are equal
//!
//! ## Usage
//!
//! ```rust
//! use catalog_ingest_domain::value_objects::UploadId;
//!
//! let id = UploadId::parse("0e4ac69e-92b8-4f7a-9d53-6ac3ce0f97e3").unwrap();
//! assert_eq!(id.to_string(), "0e4ac69e-92b8-4f7a-9d53-6ac3ce0f97e3");
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::IngestError;

/// Type-safe identifier of an upload session.
///
/// Wraps a client-supplied RFC 4122 v4 UUID. The wrapper exists so the
/// signature of every operation that is scoped to one upload session says so
/// in its types rather than passing bare strings around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(Uuid);

impl UploadId {
    /// Creates an upload id from an already-validated uuid.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generates a fresh random upload id.
    ///
    /// Production ids come from clients; this is used by tests and tools.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an upload id from its canonical hyphenated string form.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ValidationFailed` when the string is not a
    /// valid RFC 4122 UUID.
    pub fn parse(s: &str) -> Result<Self, IngestError> {
        let uuid = Uuid::parse_str(s)
            .map_err(|e| IngestError::validation_failed(format!("invalid upload_id '{}': {}", s, e)))?;
        if uuid.is_nil() {
            return Err(IngestError::validation_failed("upload_id cannot be the nil uuid"));
        }
        Ok(Self(uuid))
    }

    /// Returns the underlying uuid.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UploadId {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
