// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload Session State Machine
//!
//! This module defines `UploadStatus`, the state machine every upload
//! session moves through, together with the transition guard that keeps
//! sessions on the allowed graph.
//!
//! ## State Graph
//!
//! ```text
//!           create
//!     ─────────────► uploading
//!                      │  complete_upload() & checksum OK
//!                      ▼
//!                  assembling
//!                      │  processing job records the original variant
//!                      ▼
//!                   complete
//!      (from any non-terminal state, on fatal error) ──► failed
//!                   failed ──► uploading   (attach recovery reset only)
//! ```
//!
//! ## Semantics
//!
//! - `uploading` is the only state in which new chunks are accepted
//! - `assembling` covers both synchronous assembly and the window in which
//!   the processing job has not yet produced the `original` image record
//! - `complete` is terminal success; `failed` is terminal failure except for
//!   the attachment resolver's recovery reset back to `uploading` when the
//!   assembled blob is still on disk
//!
//! Transitions are validated here; serializing concurrent transitions for
//! one session is the caller's responsibility (per-upload lock).

use serde::{Deserialize, Serialize};

use crate::IngestError;

/// Lifecycle state of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Accepting chunks.
    Uploading,
    /// Chunks verified; canonical blob and variants are being produced.
    Assembling,
    /// Terminal success: the original variant record exists.
    Complete,
    /// Terminal failure (recoverable only through the attach reset path).
    Failed,
}

impl UploadStatus {
    /// Returns the lowercase wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Uploading => "uploading",
            UploadStatus::Assembling => "assembling",
            UploadStatus::Complete => "complete",
            UploadStatus::Failed => "failed",
        }
    }

    /// Parses a status from its wire name.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::ValidationFailed` for unknown names.
    pub fn parse(s: &str) -> Result<Self, IngestError> {
        match s {
            "uploading" => Ok(UploadStatus::Uploading),
            "assembling" => Ok(UploadStatus::Assembling),
            "complete" => Ok(UploadStatus::Complete),
            "failed" => Ok(UploadStatus::Failed),
            other => Err(IngestError::validation_failed(format!(
                "unknown upload status '{}'",
                other
            ))),
        }
    }

    /// Whether this state accepts new chunks.
    pub fn accepts_chunks(&self) -> bool {
        matches!(self, UploadStatus::Uploading)
    }

    /// Whether this state is terminal for normal control flow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Complete | UploadStatus::Failed)
    }

    /// Checks whether a transition to `next` is on the allowed graph.
    ///
    /// Any non-terminal state may fail. `Failed → Uploading` is permitted
    /// for the attachment resolver's recovery reset.
    pub fn can_transition_to(&self, next: UploadStatus) -> bool {
        match (self, next) {
            (UploadStatus::Uploading, UploadStatus::Assembling) => true,
            (UploadStatus::Assembling, UploadStatus::Complete) => true,
            (UploadStatus::Uploading, UploadStatus::Failed) => true,
            (UploadStatus::Assembling, UploadStatus::Failed) => true,
            (UploadStatus::Failed, UploadStatus::Uploading) => true,
            _ => false,
        }
    }

    /// Validates a transition, returning the new state on success.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::InvalidStateTransition` when the transition is
    /// not on the graph.
    pub fn transition_to(&self, next: UploadStatus) -> Result<UploadStatus, IngestError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(IngestError::InvalidStateTransition(format!(
                "{} -> {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for status in [
            UploadStatus::Uploading,
            UploadStatus::Assembling,
            UploadStatus::Complete,
            UploadStatus::Failed,
        ] {
            assert_eq!(UploadStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let status = UploadStatus::Uploading;
        let status = status.transition_to(UploadStatus::Assembling).unwrap();
        let status = status.transition_to(UploadStatus::Complete).unwrap();
        assert!(status.is_terminal());
    }

    #[test]
    fn test_failure_from_non_terminal_states() {
        assert!(UploadStatus::Uploading.can_transition_to(UploadStatus::Failed));
        assert!(UploadStatus::Assembling.can_transition_to(UploadStatus::Failed));
        assert!(!UploadStatus::Complete.can_transition_to(UploadStatus::Failed));
    }

    #[test]
    fn test_recovery_reset() {
        assert!(UploadStatus::Failed.can_transition_to(UploadStatus::Uploading));
        assert!(!UploadStatus::Failed.can_transition_to(UploadStatus::Complete));
    }

    #[test]
    fn test_complete_is_final() {
        for next in [
            UploadStatus::Uploading,
            UploadStatus::Assembling,
            UploadStatus::Failed,
        ] {
            assert!(UploadStatus::Complete.transition_to(next).is_err());
        }
    }

    #[test]
    fn test_only_uploading_accepts_chunks() {
        assert!(UploadStatus::Uploading.accepts_chunks());
        assert!(!UploadStatus::Assembling.accepts_chunks());
        assert!(!UploadStatus::Complete.accepts_chunks());
        assert!(!UploadStatus::Failed.accepts_chunks());
    }
}
