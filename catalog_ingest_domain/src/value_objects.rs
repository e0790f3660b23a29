// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Value Objects
//!
//! Immutable domain values for the catalog ingest system. Value objects are
//! compared by value, validate themselves on construction, and carry no
//! identity of their own.
//!
//! - [`UploadId`]: client-chosen RFC 4122 v4 identifier of an upload session
//! - [`Md5Checksum`] / [`Md5Hasher`]: lowercase-hex MD5 integrity values
//! - [`ChunkManifest`]: per-session accounting of received chunk indices
//! - [`UploadStatus`]: the upload session state machine
//! - [`VariantTag`]: the fixed family of derived image variants
//! - [`Sku`]: validated catalog business key

pub mod checksum;
pub mod chunk_manifest;
pub mod sku;
pub mod upload_id;
pub mod upload_status;
pub mod variant_tag;

pub use checksum::{Md5Checksum, Md5Hasher};
pub use chunk_manifest::ChunkManifest;
pub use sku::Sku;
pub use upload_id::UploadId;
pub use upload_status::UploadStatus;
pub use variant_tag::VariantTag;
