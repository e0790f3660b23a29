// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Per-Upload Lock Registry
//!
//! Named async mutexes keyed by [`UploadId`], serializing every mutation of
//! one upload session: `completeUpload`, each processing attempt, and the
//! attachment resolver's status inspection all run under the session's
//! lock. Chunk writes deliberately do not take it (atomic rename plus the
//! row upsert carry their idempotence).
//!
//! This is the single serialization mechanism in the system; nothing uses
//! row-level database locks, so the two schemes can never deadlock against
//! each other. Single-node chunk reception is an explicit scope assumption.
//!
//! The registry stores weak references and prunes dead entries on the fly,
//! so it does not grow with the total number of uploads ever seen.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex as RegistryMutex;
use tokio::sync::{Mutex, OwnedMutexGuard};

use catalog_ingest_domain::UploadId;

/// Prune dead weak entries once the registry exceeds this size.
const PRUNE_THRESHOLD: usize = 1024;

/// Registry of named per-upload async locks.
#[derive(Default)]
pub struct UploadLockRegistry {
    locks: RegistryMutex<HashMap<UploadId, Weak<Mutex<()>>>>,
}

impl UploadLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for one upload, waiting if another task holds it.
    ///
    /// The returned guard owns the mutex; dropping it releases the lock and
    /// lets the registry entry expire.
    pub async fn acquire(&self, upload_id: UploadId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            if locks.len() > PRUNE_THRESHOLD {
                locks.retain(|_, weak| weak.strong_count() > 0);
            }
            match locks.get(&upload_id).and_then(Weak::upgrade) {
                Some(existing) => existing,
                None => {
                    let fresh = Arc::new(Mutex::new(()));
                    locks.insert(upload_id, Arc::downgrade(&fresh));
                    fresh
                }
            }
        };
        lock.lock_owned().await
    }

    /// Number of live entries; used by tests.
    pub fn live_locks(&self) -> usize {
        self.locks.lock().values().filter(|weak| weak.strong_count() > 0).count()
    }
}
