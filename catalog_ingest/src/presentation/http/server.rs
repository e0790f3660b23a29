// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # HTTP Server
//!
//! Axum router assembly and graceful serving. The router is built from an
//! [`AppState`] bundle so integration tests can drive the full surface with
//! `tower::ServiceExt::oneshot` without binding a socket.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use catalog_ingest_bootstrap::CancellationToken;
use catalog_ingest_domain::{ImageRepository, IngestError, UploadRepository};

use crate::application::services::{Assembler, AttachmentResolver, ChunkCoordinator};
use crate::infrastructure::metrics::MetricsService;
use crate::presentation::http::handlers;

/// Largest accepted request body. The reference client uploads 5 MiB
/// chunks; the ceiling leaves generous headroom without permitting
/// arbitrarily large bodies.
const MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ChunkCoordinator>,
    pub assembler: Arc<Assembler>,
    pub resolver: Arc<AttachmentResolver>,
    pub uploads: Arc<dyn UploadRepository>,
    pub images: Arc<dyn ImageRepository>,
    pub metrics: Arc<MetricsService>,
}

/// Builds the service router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/upload/chunk", post(handlers::upload_chunk))
        .route("/upload/complete", post(handlers::complete_upload))
        .route("/upload/:upload_id/status", get(handlers::upload_status))
        .route("/upload/:upload_id/ready", get(handlers::upload_ready))
        .route("/upload/attach-to-product", post(handlers::attach_to_product))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(state)
}

/// Binds `addr` and serves until the token cancels.
pub async fn serve(addr: &str, router: Router, token: CancellationToken) -> Result<(), IngestError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| IngestError::io_error(format!("failed to bind {}: {}", addr, e)))?;
    info!(addr, "http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .map_err(|e| IngestError::io_error(format!("http server error: {}", e)))
}
