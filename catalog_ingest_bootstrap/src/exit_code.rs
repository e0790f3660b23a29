// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process Exit Codes
//!
//! BSD-sysexits-flavored exit codes for the server binary so supervisors
//! can distinguish configuration mistakes from runtime failures.

/// Exit codes reported by the server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Clean shutdown.
    Success = 0,
    /// Generic runtime failure.
    Failure = 1,
    /// Invalid CLI usage or configuration (EX_USAGE/EX_CONFIG territory).
    ConfigError = 78,
    /// Could not create or open a required file or directory.
    CantCreate = 73,
}

impl ExitCode {
    /// Terminates the process with this code.
    pub fn exit(self) -> ! {
        std::process::exit(self as i32)
    }
}

/// Maps a bootstrap-phase error to an exit code by message inspection.
///
/// Configuration problems are surfaced before any worker starts, so the
/// mapping only needs to distinguish setup failure classes.
pub fn result_to_exit_code(result: &anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::Success,
        Err(error) => {
            let text = error.to_string();
            if text.contains("configuration") || text.contains("Invalid configuration") {
                ExitCode::ConfigError
            } else if text.contains("Permission denied") || text.contains("No such file") {
                ExitCode::CantCreate
            } else {
                ExitCode::Failure
            }
        }
    }
}
