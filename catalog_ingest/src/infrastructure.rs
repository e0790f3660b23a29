// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Layer
//!
//! Concrete adapters behind the domain's ports: filesystem blob storage,
//! SQLite persistence, the durable job queue and its worker pool, the image
//! codec, configuration loading, metrics, and the per-upload lock registry.

pub mod blob;
pub mod config;
pub mod jobs;
pub mod metrics;
pub mod processing;
pub mod repositories;
pub mod runtime;
