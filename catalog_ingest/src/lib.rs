// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Catalog Ingest
//!
//! A chunked image ingestion service for catalog-management workflows.
//! Clients split large binary payloads into chunks and upload them in any
//! order with per-chunk integrity checks; the service reassembles the file
//! under a whole-file checksum, derives a family of sized image variants in
//! a durable background job, and binds the result to catalog products with
//! primary-image semantics.
//!
//! ## Architecture Overview
//!
//! The service follows the same layered layout as the rest of our systems:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Presentation Layer                          │
//! │  (HTTP endpoints: chunk, complete, status, ready, attach)   │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  (ChunkCoordinator, Assembler, UploadProcessor,             │
//! │   AttachmentResolver)                                       │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! │  (UploadSession, ChunkManifest, ImageAsset, ports)          │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                         │
//! │  (SQLite repositories, filesystem blob store, job queue,    │
//! │   image codec, metrics, config)                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Control Flow
//!
//! 1. `POST /upload/chunk` writes verified chunks to the session's temp
//!    directory and lazily registers the upload
//! 2. `POST /upload/complete` assembles the chunks into the canonical blob,
//!    verifies the whole-file checksum, and enqueues a processing job
//! 3. The job runner decodes the source and emits `original`, `256`, `512`,
//!    and `1024` variants, then marks the upload `complete`
//! 4. `POST /upload/attach-to-product` links the finished image to a
//!    product by SKU, optionally as its primary image
//!
//! Every mutation of one upload is serialized through a named lock; the
//! queue is at-least-once with bounded retries, so the processing pipeline
//! is written to converge when re-run.

pub mod application;
pub mod infrastructure;
pub mod presentation;

// Re-export domain types commonly used by integration tests and embedders
pub use catalog_ingest_domain::{IngestError, UploadId, UploadStatus, VariantTag};
