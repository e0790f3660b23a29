// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the error system for the catalog ingest domain. It
//! categorizes every failure the upload, processing, and attachment flows can
//! produce, and gives callers enough context to decide between retrying,
//! surfacing the error to the client, or failing the upload session.
//!
//! ## Error Categories
//!
//! ### Client Errors
//! - **ValidationFailed**: Malformed requests (bad uuid, missing fields)
//! - **ChunkChecksumMismatch**: Received chunk bytes do not hash to the
//!   declared checksum; the client re-sends the chunk
//! - **FileChecksumMismatch**: Assembled file does not hash to the declared
//!   whole-file checksum; the upload is failed but chunks are retained
//! - **NoChunks** / **MissingChunks**: Completion requested on an empty or
//!   non-contiguous chunk set
//! - **NotAcceptingChunks**: Chunk received while the session is not in the
//!   `uploading` state
//! - **NotFound**: Unknown upload id or SKU
//!
//! ### Coordination Errors
//! - **NotReady**: Attachment requested before processing finished; carries
//!   the seconds since the session was last touched so clients can back off
//! - **InconsistentState**: The session claims `complete` but no image rows
//!   exist; an internal invariant violation
//! - **InvalidStateTransition**: A state machine transition outside the
//!   allowed graph was attempted
//!
//! ### Processing Errors
//! - **ProcessingFailed**: The variant pipeline failed (decode error,
//!   unreadable source); retried by the job runner
//! - **ProcessingTimeout**: A processing attempt exceeded the per-attempt
//!   timeout; counts against the retry budget
//!
//! ### Infrastructure Errors
//! - **IoError**: Blob store and filesystem failures
//! - **DatabaseError**: Persistent store failures
//! - **SerializationError**: Metadata encoding/decoding failures
//! - **InvalidConfiguration**: Malformed or out-of-range configuration
//! - **InternalError**: Unexpected failures with no better category
//!
//! ## Recovery
//!
//! `is_recoverable()` marks the transient kinds (`IoError`,
//! `ProcessingTimeout`, `ProcessingFailed`) that the at-least-once job runner
//! may retry. Everything else requires client or operator intervention.

use thiserror::Error;

/// Comprehensive error type for all catalog ingest domain operations.
///
/// Variants carry human-readable context as strings; wire-level mapping
/// (HTTP status codes, JSON error bodies) is a presentation concern.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IngestError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Chunk checksum mismatch: {0}")]
    ChunkChecksumMismatch(String),

    #[error("File checksum mismatch: {0}")]
    FileChecksumMismatch(String),

    #[error("No chunks received: {0}")]
    NoChunks(String),

    #[error("Missing chunks: {0}")]
    MissingChunks(String),

    #[error("Upload is not accepting chunks: {0}")]
    NotAcceptingChunks(String),

    #[error("Upload is not ready: {0}")]
    NotReady(String),

    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Processing timed out: {0}")]
    ProcessingTimeout(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IngestError {
    /// Creates a new validation error
    pub fn validation_failed(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    /// Creates a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates a new processing error
    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    /// Creates a new IO error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    /// Creates a new database error
    pub fn database_error(msg: impl Into<String>) -> Self {
        Self::DatabaseError(msg.into())
    }

    /// Creates a new serialization error
    pub fn serialization_error(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Checks if the error is recoverable by the at-least-once job runner
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IngestError::IoError(_) | IngestError::ProcessingTimeout(_) | IngestError::ProcessingFailed(_)
        )
    }

    /// Checks if the error was caused by the client request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IngestError::ValidationFailed(_)
                | IngestError::NotFound(_)
                | IngestError::ChunkChecksumMismatch(_)
                | IngestError::FileChecksumMismatch(_)
                | IngestError::NoChunks(_)
                | IngestError::MissingChunks(_)
                | IngestError::NotAcceptingChunks(_)
        )
    }

    /// Gets the error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            IngestError::ValidationFailed(_) => "validation",
            IngestError::NotFound(_) => "validation",
            IngestError::ChunkChecksumMismatch(_) => "integrity",
            IngestError::FileChecksumMismatch(_) => "integrity",
            IngestError::NoChunks(_) => "manifest",
            IngestError::MissingChunks(_) => "manifest",
            IngestError::NotAcceptingChunks(_) => "state",
            IngestError::NotReady(_) => "state",
            IngestError::InconsistentState(_) => "state",
            IngestError::InvalidStateTransition(_) => "state",
            IngestError::ProcessingFailed(_) => "processing",
            IngestError::ProcessingTimeout(_) => "processing",
            IngestError::IoError(_) => "infrastructure",
            IngestError::DatabaseError(_) => "infrastructure",
            IngestError::SerializationError(_) => "infrastructure",
            IngestError::InvalidConfiguration(_) => "configuration",
            IngestError::InternalError(_) => "system",
        }
    }
}

impl From<std::io::Error> for IngestError {
    fn from(error: std::io::Error) -> Self {
        IngestError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(error: serde_json::Error) -> Self {
        IngestError::SerializationError(error.to_string())
    }
}
