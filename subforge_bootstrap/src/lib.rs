// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Module
//!
//! The bootstrap crate sits **outside** the DDD layers (domain,
//! application, infrastructure) and provides:
//!
//! - **Entry point** - process lifecycle, composed in the `subforge` binary's `main.rs`
//! - **Platform abstraction** - OS-specific operations (POSIX vs Windows)
//! - **Signal handling** - graceful shutdown (SIGTERM, SIGINT)
//! - **Argument parsing** - secure CLI argument validation
//! - **Exit code mapping** - the external contract's documented exit codes
//! - **Shutdown coordination** - two-phase cancellation (soft-terminate, then kill)
//!
//! ## Architecture Position
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          BOOTSTRAP (this crate)              │
//! │  - Entry point, CLI, signals, platform       │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │   subforge (application + infrastructure)    │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │            subforge-domain                   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Bootstrap can depend on the domain and application crates; neither of
//! those depends back on bootstrap.
//!
//! ## Module Structure
//!
//! - `platform` - OS abstraction (Unix/Windows)
//! - `signals` - signal handling (SIGTERM, SIGINT / Ctrl+C)
//! - `cli` - secure argument parsing (`parser` + `validator` submodules)
//! - `config` - bootstrap-phase configuration
//! - `exit_code` - the three CLI entry points' documented exit codes
//! - `logger` - bootstrap-specific logging
//! - `shutdown` - shutdown coordination
//!
//! ## Usage
//!
//! ```no_run
//! use subforge_bootstrap::{bootstrap_cli, ExitCode};
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     let cli = match bootstrap_cli() {
//!         Ok(cli) => cli,
//!         Err(e) => {
//!             eprintln!("{e}");
//!             return std::process::ExitCode::from(ExitCode::InvalidArguments.as_i32() as u8);
//!         }
//!     };
//!     // dispatch `cli.command` to the matching use case...
//!     let _ = cli;
//!     std::process::ExitCode::SUCCESS
//! }
//! ```

pub mod cli;
pub mod config;
pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_and_validate, ValidatedCli, ValidatedCommand};
pub use exit_code::ExitCode;

/// Parses and security-validates CLI arguments. The main entry point for
/// the bootstrap layer: clap will handle `--help`/`--version` and exit
/// the process on its own.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
