// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQLite repository implementations and schema management.

pub mod schema;
pub mod sqlite_image_repository;
pub mod sqlite_product_repository;
pub mod sqlite_upload_repository;

pub use sqlite_image_repository::SqliteImageRepository;
pub use sqlite_product_repository::SqliteProductRepository;
pub use sqlite_upload_repository::SqliteUploadRepository;
