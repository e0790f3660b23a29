// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Server Command Line
//!
//! Clap-based argument parsing for the ingest server binary. Arguments are
//! overrides layered on top of the configuration file and environment; only
//! deployment-varying knobs are exposed here.

use std::path::PathBuf;

use clap::Parser;

/// Catalog ingest server arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "catalog_ingest",
    about = "Chunked image upload, processing, and catalog attachment service",
    version
)]
pub struct ServerArgs {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the blob store root directory
    #[arg(long, value_name = "DIR")]
    pub blob_root: Option<PathBuf>,

    /// Override the SQLite database URL (e.g. sqlite://ingest.db)
    #[arg(long, value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the HTTP bind address (e.g. 127.0.0.1:8080)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Increase log verbosity (repeatable)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ServerArgs {
    /// Parses arguments from the process command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default tracing filter directive for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
