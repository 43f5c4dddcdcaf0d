// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A hierarchical, language-neutral error taxonomy for the orchestrator. Every
//! failure that can occur while preparing a job, resolving parameters,
//! executing a stage, or driving the pipeline is represented by one variant
//! here; nothing in the orchestrator core returns a bare `String` or `&str`
//! error.
//!
//! ## Design Principles
//!
//! - **Specific**: each variant names one failure mode from the propagation
//!   policy in the specification's error-handling design.
//! - **Actionable**: the payload is a diagnostic message, not the
//!   discriminator — callers match on the variant, not on its text.
//! - **Categorized**: [`OrchestratorError::category`] groups variants for
//!   logging and metrics without a second parallel enum.
//! - **Recoverable vs. fatal**: [`OrchestratorError::is_retryable`] tells the
//!   stage executor whether a retry with degraded parameters makes sense.

use thiserror::Error;

/// Errors that can occur anywhere in the orchestrator core.
///
/// `Skipped` stage transitions are **not** represented here — skipping an
/// optional stage with a missing runtime is a normal, non-error manifest
/// transition (see [`crate::entities::manifest::StageStatus::Skipped`]).
#[derive(Error, Debug, Clone)]
pub enum OrchestratorError {
    /// Bad CLI arguments, unreadable media, malformed config, or an invalid
    /// job/workflow/language combination caught at `prepare` time.
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// A required runtime's executable or import probe is missing.
    #[error("runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// A stage's declared input file is absent from the job directory.
    #[error("input missing for stage '{stage}': {path}")]
    InputMissing { stage: String, path: String },

    /// The stage subprocess exited 0 but an expected output file is absent
    /// or empty.
    #[error("output missing for stage '{stage}': {path}")]
    OutputMissing { stage: String, path: String },

    /// The stage subprocess exited with a non-zero status.
    #[error("subprocess failed for stage '{stage}' (exit code {exit_code:?}): {detail}")]
    SubprocessFailed {
        stage: String,
        exit_code: Option<i32>,
        detail: String,
    },

    /// The stage exceeded its wall-clock budget and was terminated.
    #[error("stage '{0}' timed out")]
    Timeout(String),

    /// The driver received a cancellation signal mid-stage.
    #[error("interrupted: {0}")]
    Interrupted(String),

    /// `manifest.json` failed to parse or violated its schema.
    #[error("manifest corrupt: {0}")]
    ManifestCorrupt(String),

    /// The cache index is inconsistent with the filesystem; recoverable by
    /// rebuilding the index (losing hit-rate, not data), or a single entry
    /// exceeds `max_size_gb`.
    #[error("cache corrupt: {0}")]
    CacheCorrupt(String),

    /// The parameter resolver produced an invalid combination (e.g.
    /// `batch_size < 1`, unknown precision).
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A job, job directory, or manifest entry could not be found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Filesystem or other I/O failure not otherwise categorized.
    #[error("io error: {0}")]
    Io(String),

    /// JSON (de)serialization failure outside manifest/job schema validation.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An invariant the orchestrator relies on was violated; indicates a bug
    /// rather than a user-correctable condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Short category tag, stable across releases, used for logging fields
    /// and metrics labels.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InputInvalid(_) => "input_invalid",
            Self::RuntimeUnavailable(_) => "runtime_unavailable",
            Self::InputMissing { .. } => "input_missing",
            Self::OutputMissing { .. } => "output_missing",
            Self::SubprocessFailed { .. } => "subprocess_failed",
            Self::Timeout(_) => "timeout",
            Self::Interrupted(_) => "interrupted",
            Self::ManifestCorrupt(_) => "manifest_corrupt",
            Self::CacheCorrupt(_) => "cache_corrupt",
            Self::ConfigInvalid(_) => "config_invalid",
            Self::NotFound(_) => "not_found",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether the stage executor's retry-with-degraded-parameters policy
    /// applies to this failure. Fatal-to-pipeline errors (missing required
    /// runtime, missing input, manifest write failure, cache corruption)
    /// are never retryable at the stage boundary.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SubprocessFailed { .. } | Self::Timeout(_) | Self::OutputMissing { .. }
        )
    }

    /// One-line, error-kind-matched hint shown in the `run` command's
    /// failure banner (spec §7 "user-visible behavior").
    pub fn hint(&self) -> &'static str {
        match self {
            Self::RuntimeUnavailable(_) => "install or configure the missing runtime, then re-run with --restart",
            Self::InputMissing { .. } => "a prior stage did not produce its declared output; inspect that stage's log",
            Self::OutputMissing { .. } => "the stage exited 0 without producing its declared output; check the stage log",
            Self::SubprocessFailed { .. } => "check the stage log file for the underlying failure",
            Self::Timeout(_) => "raise the stage timeout in config and re-run with --restart",
            Self::ConfigInvalid(_) => "fix the offending parameter in the global or job config",
            Self::CacheCorrupt(_) => "the cache index will be rebuilt on next access; no data was lost",
            _ => "re-run with --restart after addressing the underlying condition",
        }
    }
}

impl From<std::io::Error> for OrchestratorError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
