// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Ingest Configuration
//!
//! This module provides `IngestConfig`, the server's complete configuration
//! surface, loaded from (highest precedence last):
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, default `catalog_ingest.toml` if present)
//! 3. Environment variables prefixed `CATALOG_INGEST_` (section separator
//!    `__`, e.g. `CATALOG_INGEST_JOB__TIMEOUT_S=120`)
//! 4. CLI overrides (`--blob-root`, `--database-url`, `--bind`)
//!
//! ## Recognized Options
//!
//! | Option | Effect | Default |
//! |---|---|---|
//! | `server.addr` | HTTP bind address | `127.0.0.1:8080` |
//! | `database.url` | SQLite URL | `sqlite://catalog_ingest.db` |
//! | `blob.root` | Root of the blob store | `./blob` |
//! | `job.tries` | Max processing-job attempts | 3 |
//! | `job.timeout_s` | Per-attempt timeout in seconds | 300 |
//! | `job.workers` | Background worker count | 2 |
//! | `job.poll_interval_ms` | Queue poll interval when idle | 250 |
//! | `variants` | Longest sides of derived variants | `[256, 512, 1024]` |
//! | `attach.ready_wait_s` | Staleness threshold during attach | 30 |
//! | `image.jpeg_quality` | JPEG quality for resized variants | 90 |
//!
//! Validation happens after merging so a bad override fails startup with a
//! configuration error rather than surfacing mid-request.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use catalog_ingest_bootstrap::ServerArgs;
use catalog_ingest_domain::{IngestError, VariantTag};

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address, e.g. `127.0.0.1:8080`.
    pub addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Persistent store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite connection URL.
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://catalog_ingest.db".to_string(),
        }
    }
}

/// Blob store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobSettings {
    /// Root directory of the session-scoped blob namespace.
    pub root: PathBuf,
}

impl Default for BlobSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./blob"),
        }
    }
}

/// Background processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Maximum attempts per processing job.
    pub tries: u32,
    /// Per-attempt timeout in seconds.
    pub timeout_s: u64,
    /// Number of concurrent queue workers.
    pub workers: usize,
    /// Idle poll interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            tries: 3,
            timeout_s: 300,
            workers: 2,
            poll_interval_ms: 250,
        }
    }
}

/// Attachment endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachSettings {
    /// Seconds a non-complete upload may sit untouched before the attach
    /// endpoint declares it failed.
    pub ready_wait_s: u64,
}

impl Default for AttachSettings {
    fn default() -> Self {
        Self { ready_wait_s: 30 }
    }
}

/// Image encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSettings {
    /// JPEG quality (1-100) for resized variants.
    pub jpeg_quality: u8,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

fn default_variants() -> Vec<u32> {
    VariantTag::DEFAULT_SIZES.to_vec()
}

/// Complete server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub blob: BlobSettings,
    pub job: JobSettings,
    pub attach: AttachSettings,
    pub image: ImageSettings,
    /// Longest sides of the derived variants, ascending. Each variant's tag
    /// is its pixel size; `original` is implicit and always produced.
    #[serde(default = "default_variants")]
    pub variants: Vec<u32>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            database: DatabaseSettings::default(),
            blob: BlobSettings::default(),
            job: JobSettings::default(),
            attach: AttachSettings::default(),
            image: ImageSettings::default(),
            variants: default_variants(),
        }
    }
}

impl IngestConfig {
    /// Loads configuration from defaults, an optional TOML file, and the
    /// environment, then applies CLI overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::InvalidConfiguration` when sources fail to
    /// parse or merged values are out of range.
    pub fn load(args: &ServerArgs) -> Result<Self, IngestError> {
        let mut builder = Config::builder();

        match &args.config {
            Some(path) => {
                builder = builder.add_source(File::from(path.as_path()).required(true));
            }
            None => {
                builder = builder.add_source(File::from(Path::new("catalog_ingest.toml")).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("CATALOG_INGEST")
                .separator("__")
                .try_parsing(true),
        );

        let merged = builder
            .build()
            .map_err(|e| IngestError::invalid_config(format!("failed to load configuration: {}", e)))?;

        let mut config: IngestConfig = merged
            .try_deserialize()
            .map_err(|e| IngestError::invalid_config(format!("failed to parse configuration: {}", e)))?;

        if let Some(root) = &args.blob_root {
            config.blob.root = root.clone();
        }
        if let Some(url) = &args.database_url {
            config.database.url = url.clone();
        }
        if let Some(addr) = &args.bind {
            config.server.addr = addr.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates merged values.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.job.tries == 0 {
            return Err(IngestError::invalid_config("job.tries must be at least 1"));
        }
        if self.job.timeout_s == 0 {
            return Err(IngestError::invalid_config("job.timeout_s must be at least 1"));
        }
        if self.job.workers == 0 {
            return Err(IngestError::invalid_config("job.workers must be at least 1"));
        }
        if !(1..=100).contains(&self.image.jpeg_quality) {
            return Err(IngestError::invalid_config(format!(
                "image.jpeg_quality must be 1-100, got {}",
                self.image.jpeg_quality
            )));
        }
        if self.variants.is_empty() {
            return Err(IngestError::invalid_config("variants must name at least one size"));
        }
        if self.variants.iter().any(|&side| side == 0) {
            return Err(IngestError::invalid_config("variant sizes must be positive"));
        }
        let mut seen = std::collections::HashSet::new();
        for &side in &self.variants {
            if !seen.insert(side) {
                return Err(IngestError::invalid_config(format!("duplicate variant size {}", side)));
            }
        }
        Ok(())
    }

    /// The configured sized-variant tags, in order.
    pub fn variant_tags(&self) -> Vec<VariantTag> {
        self.variants.iter().map(|&side| VariantTag::Sized(side)).collect()
    }
}
