// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Catalog Ingest Domain
//!
//! The catalog ingest domain holds the business rules of chunked image
//! ingestion: how upload sessions move through their lifecycle, when a chunk
//! set is complete, what integrity means for chunks, files, and variants,
//! and how images bind to catalog products. It is independent of databases,
//! filesystems, HTTP, and the async runtime.
//!
//! ## Module Structure
//!
//! - [`entities`]: objects with identity and mutable lifecycle state
//!   (`UploadSession`, `ImageAsset`, `Product`)
//! - [`value_objects`]: immutable, self-validating values (`UploadId`,
//!   `Md5Checksum`, `ChunkManifest`, `UploadStatus`, `VariantTag`, `Sku`)
//! - [`repositories`]: async persistence ports implemented by
//!   infrastructure (`UploadRepository`, `ImageRepository`,
//!   `ProductRepository`)
//! - [`services`]: async infrastructure ports (`BlobStore`, `JobQueue`)
//! - [`error`]: the `IngestError` hierarchy shared by every layer
//!
//! ## Core Flow
//!
//! ```text
//! chunks ──► UploadSession (uploading) ──► ChunkManifest complete?
//!                                             │
//!                     whole-file checksum OK  ▼
//!                          UploadSession (assembling) ──► ProcessingJob
//!                                             │
//!                 variants + original row     ▼
//!                          UploadSession (complete) ──► attach to Product
//! ```
//!
//! Integrity checks (MD5 per chunk, per file, per variant) and the
//! per-upload serialization requirement are expressed here; their
//! enforcement lives in the application services that drive these types.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

// Re-export commonly used types at the crate root
pub use entities::{ImageAsset, Product, ProductImageLink, UploadSession};
pub use error::IngestError;
pub use repositories::{ImageRepository, ProductRepository, UploadRepository};
pub use services::{BlobStore, JobHandler, JobQueue, ProcessingJob};
pub use value_objects::{ChunkManifest, Md5Checksum, Md5Hasher, Sku, UploadId, UploadStatus, VariantTag};
