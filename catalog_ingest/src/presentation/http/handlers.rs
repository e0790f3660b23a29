// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # HTTP Handlers
//!
//! One handler per endpoint of the external contract:
//!
//! | Method | Path | Service |
//! |---|---|---|
//! | POST | `/upload/chunk` | `ChunkCoordinator::receive_chunk` |
//! | POST | `/upload/complete` | `Assembler::complete_upload` |
//! | GET | `/upload/{upload_id}/status` | upload registry lookup |
//! | GET | `/upload/{upload_id}/ready` | original-variant existence |
//! | POST | `/upload/attach-to-product` | `AttachmentResolver::attach` |
//!
//! Domain errors map to wire responses here and nowhere else: client
//! mistakes are 422 with a stable error code, unknown resources 404,
//! pending attachments 202, everything else 500.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use catalog_ingest_domain::{IngestError, UploadId, VariantTag};

use crate::application::services::{AttachResponse, ChunkRequest};
use crate::presentation::http::server::AppState;

/// Wire-level error wrapper carrying a domain error.
#[derive(Debug)]
pub struct ApiError(pub IngestError);

impl From<IngestError> for ApiError {
    fn from(error: IngestError) -> Self {
        Self(error)
    }
}

/// Stable machine-readable code for each error kind.
fn wire_code(error: &IngestError) -> &'static str {
    match error {
        IngestError::ValidationFailed(_) => "validation_failed",
        IngestError::NotFound(_) => "not_found",
        IngestError::ChunkChecksumMismatch(_) => "chunk_checksum_mismatch",
        IngestError::FileChecksumMismatch(_) => "checksum_mismatch",
        IngestError::NoChunks(_) => "no_chunks",
        IngestError::MissingChunks(_) => "missing_chunks",
        IngestError::NotAcceptingChunks(_) => "not_accepting_chunks",
        IngestError::NotReady(_) => "not_ready",
        IngestError::InconsistentState(_) => "inconsistent_state",
        IngestError::InvalidStateTransition(_) => "invalid_state_transition",
        IngestError::ProcessingFailed(_) => "processing_failed",
        IngestError::ProcessingTimeout(_) => "processing_timeout",
        IngestError::IoError(_)
        | IngestError::DatabaseError(_)
        | IngestError::SerializationError(_)
        | IngestError::InvalidConfiguration(_)
        | IngestError::InternalError(_) => "internal_error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            IngestError::ValidationFailed(_)
            | IngestError::ChunkChecksumMismatch(_)
            | IngestError::FileChecksumMismatch(_)
            | IngestError::NoChunks(_)
            | IngestError::MissingChunks(_)
            | IngestError::NotAcceptingChunks(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::NotFound(_) => StatusCode::NOT_FOUND,
            IngestError::NotReady(_) => StatusCode::ACCEPTED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(category = self.0.category(), "request failed: {}", self.0);
        }

        let body = json!({
            "status": "error",
            "error": wire_code(&self.0),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// `POST /upload/chunk` - multipart chunk submission.
pub async fn upload_chunk(State(state): State<AppState>, mut multipart: Multipart) -> Result<Response, ApiError> {
    let mut upload_id: Option<String> = None;
    let mut chunk_index: Option<u32> = None;
    let mut total_chunks: Option<u32> = None;
    let mut chunk_checksum: Option<String> = None;
    let mut chunk: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut file_size: Option<u64> = None;
    let mut mime_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IngestError::validation_failed(format!("malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "chunk" => {
                if file_name.is_none() {
                    file_name = field.file_name().map(str::to_string);
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| IngestError::validation_failed(format!("failed to read chunk field: {}", e)))?;
                chunk = Some(bytes.to_vec());
            }
            other => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| IngestError::validation_failed(format!("failed to read field {}: {}", other, e)))?;
                match other {
                    "upload_id" => upload_id = Some(text),
                    "chunk_index" => {
                        chunk_index = Some(text.parse().map_err(|_| {
                            IngestError::validation_failed(format!("chunk_index '{}' is not a non-negative integer", text))
                        })?);
                    }
                    "total_chunks" => {
                        total_chunks = Some(text.parse().map_err(|_| {
                            IngestError::validation_failed(format!("total_chunks '{}' is not a positive integer", text))
                        })?);
                    }
                    "chunk_checksum" => chunk_checksum = Some(text),
                    "file_name" => file_name = Some(text),
                    "file_size" => {
                        file_size = text.parse().ok();
                    }
                    "mime_type" => mime_type = Some(text),
                    _ => {} // unknown fields are ignored
                }
            }
        }
    }

    let request = ChunkRequest {
        upload_id: upload_id.ok_or_else(|| IngestError::validation_failed("upload_id is required"))?,
        chunk_index: chunk_index.ok_or_else(|| IngestError::validation_failed("chunk_index is required"))?,
        total_chunks: total_chunks.ok_or_else(|| IngestError::validation_failed("total_chunks is required"))?,
        chunk_checksum: chunk_checksum.ok_or_else(|| IngestError::validation_failed("chunk_checksum is required"))?,
        chunk: chunk.ok_or_else(|| IngestError::validation_failed("chunk file is required"))?,
        file_name,
        file_size,
        mime_type,
    };

    let received = state.coordinator.receive_chunk(request).await?;
    Ok(Json(json!({ "status": "ok", "received_chunk": received })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub upload_id: String,
    pub file_checksum: String,
}

/// `POST /upload/complete` - assemble and enqueue processing.
pub async fn complete_upload(
    State(state): State<AppState>,
    Json(request): Json<CompleteRequest>,
) -> Result<Response, ApiError> {
    let outcome = state
        .assembler
        .complete_upload(&request.upload_id, &request.file_checksum)
        .await?;
    Ok(Json(json!({
        "status": "assembled",
        "upload_id": outcome.upload_id.to_string(),
    }))
    .into_response())
}

/// `GET /upload/{upload_id}/status` - state machine observation.
pub async fn upload_status(State(state): State<AppState>, Path(upload_id): Path<String>) -> Result<Response, ApiError> {
    let upload_id = UploadId::parse(&upload_id)?;
    let session = state
        .uploads
        .find_by_upload_id(upload_id)
        .await?
        .ok_or_else(|| IngestError::not_found(format!("upload {} does not exist", upload_id)))?;

    Ok(Json(json!({
        "upload_id": session.upload_id().to_string(),
        "status": session.status().as_str(),
        "file_size": session.file_size(),
        "file_checksum": session.file_checksum().map(|c| c.to_string()),
    }))
    .into_response())
}

/// `GET /upload/{upload_id}/ready` - true iff the original variant record
/// exists, i.e. processing has landed.
pub async fn upload_ready(State(state): State<AppState>, Path(upload_id): Path<String>) -> Result<Response, ApiError> {
    let upload_id = UploadId::parse(&upload_id)?;
    let session = state
        .uploads
        .find_by_upload_id(upload_id)
        .await?
        .ok_or_else(|| IngestError::not_found(format!("upload {} does not exist", upload_id)))?;

    let ready = match session.id() {
        Some(row_id) => state
            .images
            .find_by_upload_and_variant(row_id, &VariantTag::Original)
            .await?
            .is_some(),
        None => false,
    };

    Ok(Json(json!({ "ready": ready })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct AttachRequest {
    pub upload_id: String,
    pub sku: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// `POST /upload/attach-to-product` - bind a finished upload to a product.
pub async fn attach_to_product(
    State(state): State<AppState>,
    Json(request): Json<AttachRequest>,
) -> Result<Response, ApiError> {
    let response = state
        .resolver
        .attach(&request.upload_id, &request.sku, request.is_primary)
        .await?;

    match response {
        AttachResponse::Attached(outcome) => Ok(Json(json!({
            "status": "success",
            "image_id": outcome.image_id,
            "product_id": outcome.product_id,
            "is_primary": outcome.is_primary,
        }))
        .into_response()),
        AttachResponse::Pending { status, processing_time } => Ok((
            StatusCode::ACCEPTED,
            Json(json!({
                "status": status,
                "processing_time": processing_time,
            })),
        )
            .into_response()),
    }
}

/// `GET /metrics` - Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state.metrics.get_metrics()?;
    Ok(([("content-type", "text/plain; version=0.0.4")], body).into_response())
}

/// `GET /health` - liveness probe.
pub async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}
