// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! The orchestrator's exit codes are part of its external contract (each
//! CLI entry point documents its own set), so this is a closed mapping
//! rather than the BSD `sysexits.h` ladder: every variant corresponds to
//! exactly one documented code for `prepare`, `run`, or `status`.

use std::fmt;
use subforge_domain::OrchestratorError;

/// Exit codes for the three CLI entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Success: `prepare` produced a job id, `run` finished every active
    /// stage, or `status` printed the manifest (always succeeds).
    #[default]
    Success = 0,

    /// `run`: one or more stages failed.
    StageFailed = 1,

    /// Any command: malformed CLI arguments, caught before the command runs.
    InvalidArguments = 2,

    /// `prepare`: source media not found or unreadable.
    MediaUnreadable = 3,

    /// `prepare`: invalid workflow name or workflow/language combination.
    InvalidWorkflow = 4,

    /// `run`: job id or job directory not found.
    JobNotFound = 5,

    /// `run`: a required (non-skippable) runtime is unavailable.
    RuntimeUnavailable = 6,

    /// Interrupted by SIGINT (Ctrl+C).
    Interrupted = 130,

    /// Terminated by SIGTERM.
    Terminated = 143,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps a `prepare`-time failure to its documented exit code.
    pub fn for_prepare_error(error: &OrchestratorError) -> Self {
        match error {
            OrchestratorError::InputInvalid(msg) if msg.contains("workflow") || msg.contains("language") => {
                ExitCode::InvalidWorkflow
            }
            OrchestratorError::NotFound(_) => ExitCode::MediaUnreadable,
            OrchestratorError::Io(_) => ExitCode::MediaUnreadable,
            OrchestratorError::InputInvalid(_) => ExitCode::InvalidArguments,
            _ => ExitCode::InvalidArguments,
        }
    }

    /// Maps a `run`-time failure to its documented exit code. Per-stage
    /// failures recorded in the manifest are reported via
    /// [`ExitCode::StageFailed`] by the caller directly; this handles the
    /// failures that prevent the driver from starting at all.
    pub fn for_run_error(error: &OrchestratorError) -> Self {
        match error {
            OrchestratorError::NotFound(_) => ExitCode::JobNotFound,
            OrchestratorError::RuntimeUnavailable(_) => ExitCode::RuntimeUnavailable,
            OrchestratorError::InputInvalid(_) => ExitCode::InvalidArguments,
            OrchestratorError::Interrupted(_) => ExitCode::Interrupted,
            _ => ExitCode::StageFailed,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "success",
            ExitCode::StageFailed => "one or more stages failed",
            ExitCode::InvalidArguments => "invalid arguments",
            ExitCode::MediaUnreadable => "source media not found or unreadable",
            ExitCode::InvalidWorkflow => "invalid workflow or language combination",
            ExitCode::JobNotFound => "job not found",
            ExitCode::RuntimeUnavailable => "required runtime unavailable",
            ExitCode::Interrupted => "interrupted (SIGINT)",
            ExitCode::Terminated => "terminated (SIGTERM)",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    pub fn is_signal(self) -> bool {
        matches!(self, ExitCode::Interrupted | ExitCode::Terminated)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_codes_match_the_external_contract() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::StageFailed.as_i32(), 1);
        assert_eq!(ExitCode::InvalidArguments.as_i32(), 2);
        assert_eq!(ExitCode::MediaUnreadable.as_i32(), 3);
        assert_eq!(ExitCode::InvalidWorkflow.as_i32(), 4);
        assert_eq!(ExitCode::JobNotFound.as_i32(), 5);
        assert_eq!(ExitCode::RuntimeUnavailable.as_i32(), 6);
    }

    #[test]
    fn prepare_not_found_maps_to_media_unreadable() {
        let err = OrchestratorError::NotFound("movie.mkv".to_string());
        assert_eq!(ExitCode::for_prepare_error(&err), ExitCode::MediaUnreadable);
    }

    #[test]
    fn run_runtime_unavailable_maps_through() {
        let err = OrchestratorError::RuntimeUnavailable("asr-whisper".to_string());
        assert_eq!(ExitCode::for_run_error(&err), ExitCode::RuntimeUnavailable);
    }

    #[test]
    fn run_subprocess_failure_is_a_stage_failure() {
        let err = OrchestratorError::SubprocessFailed {
            stage: "asr".to_string(),
            exit_code: Some(1),
            detail: "whisper crashed".to_string(),
        };
        assert_eq!(ExitCode::for_run_error(&err), ExitCode::StageFailed);
    }
}
