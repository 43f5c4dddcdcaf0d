// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Structured logging setup.
//!
//! One subscriber for the whole process: a human-readable formatter to
//! stderr for interactive use, filtered by `LOG_LEVEL` (falling back to
//! `info`). Per-stage subprocess output is a separate concern, written
//! directly to the stage's own log file by the process launcher rather
//! than routed through `tracing`.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global tracing subscriber. Call once, at process start.
pub fn init() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Logs a stage lifecycle transition at `info`, independent of the
/// per-stage log file (spec's ambient "structured log line for every
/// stage transition").
pub fn log_stage_transition(job_id: &str, stage: &str, from: &str, to: &str) {
    tracing::info!(job_id, stage, from, to, "stage transition");
}
