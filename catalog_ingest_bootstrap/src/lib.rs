// /////////////////////////////////////////////////////////////////////////////
// Catalog Ingest
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Catalog Ingest Bootstrap
//!
//! Entry-point concerns for the ingest server, kept separate from the
//! application so that `main` stays a thin composition root:
//!
//! - [`cli`]: clap argument parsing for the server binary
//! - [`logger`]: a minimal logging abstraction for the bootstrap phase,
//!   before the tracing subscriber is installed
//! - [`shutdown`]: cancellation tokens and graceful-shutdown coordination
//! - [`signals`]: SIGINT/SIGTERM wiring into the shutdown coordinator
//! - [`exit_code`]: process exit-code mapping
//!
//! ## Startup Sequence
//!
//! ```text
//! parse CLI ─► init tracing ─► load config ─► build services
//!                                   │
//!                                   ▼
//!              spawn HTTP server + job workers (each holding a token)
//!                                   │
//!            SIGINT/SIGTERM ──► initiate_shutdown ──► drain ──► exit
//! ```

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod shutdown;
pub mod signals;

pub use cli::ServerArgs;
pub use exit_code::{result_to_exit_code, ExitCode};
pub use logger::{BootstrapLogger, ConsoleLogger, NoOpLogger};
pub use shutdown::{CancellationToken, ShutdownCoordinator};
pub use signals::install_signal_handlers;
