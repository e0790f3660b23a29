// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Manifest
//!
//! This module provides `ChunkManifest`, the per-session accounting of which
//! chunk indices are currently present for an upload. The manifest is not
//! persisted: it is derived on demand from the blob store's chunk listing,
//! which makes the filesystem the single source of truth for reception state
//! and keeps chunk writes lock-free.
//!
//! ## Completion Predicate
//!
//! Chunks may arrive in any order, duplicated, and with gaps while the
//! session is `uploading`. Assembly requires the received indices to form
//! exactly the contiguous range `0..N`. `verify_contiguous` reports the gap
//! indices when they do not, so completion failures name the chunks the
//! client still has to send.
//!
//! ## Ordering
//!
//! Indices are always ordered numerically, never lexically: chunk 10 sorts
//! after chunk 2 even though `"chunk_10"` sorts before `"chunk_2"`.

use crate::IngestError;

/// Accounting of the chunk indices present for one upload session.
///
/// Derived from the blob store listing; construction sorts and de-duplicates
/// so callers can rely on ascending unique indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkManifest {
    indices: Vec<u32>,
}

impl ChunkManifest {
    /// Builds a manifest from raw listed indices (any order, duplicates
    /// tolerated).
    pub fn from_indices(mut indices: Vec<u32>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    /// Number of distinct chunks present.
    pub fn count(&self) -> usize {
        self.indices.len()
    }

    /// Whether no chunks have been received.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Ascending distinct chunk indices.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Indices missing from the contiguous range `0..=max_index`.
    pub fn missing_indices(&self) -> Vec<u32> {
        match self.indices.last() {
            None => Vec::new(),
            Some(&max) => {
                let mut missing = Vec::new();
                let mut present = self.indices.iter().copied().peekable();
                for expected in 0..=max {
                    if present.peek() == Some(&expected) {
                        present.next();
                    } else {
                        missing.push(expected);
                    }
                }
                missing
            }
        }
    }

    /// Verifies the manifest covers exactly `0..N` and returns N.
    ///
    /// # Errors
    ///
    /// - `IngestError::NoChunks` when the manifest is empty
    /// - `IngestError::MissingChunks` naming the gap indices otherwise
    pub fn verify_contiguous(&self) -> Result<u32, IngestError> {
        if self.indices.is_empty() {
            return Err(IngestError::NoChunks("no chunk files on disk".to_string()));
        }
        let missing = self.missing_indices();
        if !missing.is_empty() {
            let listed: Vec<String> = missing.iter().take(16).map(|i| i.to_string()).collect();
            let suffix = if missing.len() > 16 { ", ..." } else { "" };
            return Err(IngestError::MissingChunks(format!(
                "{} missing of {} expected: [{}{}]",
                missing.len(),
                self.indices.last().unwrap() + 1,
                listed.join(", "),
                suffix
            )));
        }
        Ok(self.indices.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_orders_numerically_and_dedupes() {
        let manifest = ChunkManifest::from_indices(vec![10, 2, 0, 1, 2, 10]);
        assert_eq!(manifest.indices(), &[0, 1, 2, 10]);
        assert_eq!(manifest.count(), 4);
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = ChunkManifest::from_indices(vec![]);
        assert!(manifest.is_empty());
        assert!(matches!(manifest.verify_contiguous(), Err(IngestError::NoChunks(_))));
    }

    #[test]
    fn test_contiguous_range_passes() {
        let manifest = ChunkManifest::from_indices(vec![2, 0, 1]);
        assert_eq!(manifest.verify_contiguous().unwrap(), 3);
    }

    #[test]
    fn test_gaps_are_named() {
        let manifest = ChunkManifest::from_indices(vec![0, 1, 3, 6]);
        assert_eq!(manifest.missing_indices(), vec![2, 4, 5]);
        match manifest.verify_contiguous() {
            Err(IngestError::MissingChunks(msg)) => {
                assert!(msg.contains('2'));
                assert!(msg.contains('4'));
            }
            other => panic!("expected MissingChunks, got {:?}", other),
        }
    }

    #[test]
    fn test_single_chunk_upload() {
        let manifest = ChunkManifest::from_indices(vec![0]);
        assert_eq!(manifest.verify_contiguous().unwrap(), 1);
    }

    #[test]
    fn test_missing_first_chunk() {
        let manifest = ChunkManifest::from_indices(vec![1, 2]);
        assert_eq!(manifest.missing_indices(), vec![0]);
        assert!(manifest.verify_contiguous().is_err());
    }

    proptest! {
        /// Any permutation (with duplicates) of a full range verifies.
        #[test]
        fn prop_full_range_always_verifies(n in 1u32..200, dup in 0usize..4) {
            let mut indices: Vec<u32> = (0..n).collect();
            for d in 0..dup {
                indices.push(d as u32 % n);
            }
            indices.reverse();
            let manifest = ChunkManifest::from_indices(indices);
            prop_assert_eq!(manifest.verify_contiguous().unwrap(), n);
        }

        /// Removing any index from a full range is reported as exactly that gap.
        #[test]
        fn prop_single_gap_detected(n in 2u32..200, gap in 0u32..199) {
            prop_assume!(gap < n - 1);
            let indices: Vec<u32> = (0..n).filter(|&i| i != gap).collect();
            let manifest = ChunkManifest::from_indices(indices);
            prop_assert_eq!(manifest.missing_indices(), vec![gap]);
        }
    }
}
