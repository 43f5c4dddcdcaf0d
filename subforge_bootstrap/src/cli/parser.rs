// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parser
//!
//! Command-line interface parsing using clap. This module defines the
//! CLI structure and handles argument parsing; security validation
//! happens in the `validator` module after parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure.
#[derive(Parser, Debug, Clone)]
#[command(name = "subforge")]
#[command(about = concat!("Subforge media pipeline orchestrator v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging (equivalent to LOG_LEVEL=debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Global configuration file path (overrides /etc/subforge/config)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// CLI subcommands: the orchestrator's three entry points.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a job directory and its initial manifest from a source
    /// media file and a workflow, without running any stage.
    Prepare {
        /// Source media file to process
        #[arg(short, long)]
        input: PathBuf,

        /// Workflow to run: transcribe, translate, or subtitle
        #[arg(short, long)]
        workflow: String,

        /// Source language (BCP-47), auto-detected by the ASR stage if omitted
        #[arg(long)]
        source_language: Option<String>,

        /// Target languages (BCP-47, comma-separated), required for
        /// translate/subtitle workflows
        #[arg(long, value_delimiter = ',')]
        target_languages: Vec<String>,

        /// User id recorded on the job and used in its job id
        #[arg(long, default_value = "default")]
        user_id: String,

        /// Clip the source media to `start:end` in seconds before processing
        #[arg(long, value_parser = parse_clip_range)]
        clip_range: Option<(f64, f64)>,
    },

    /// Drive a prepared job's active stages to completion, in order.
    Run {
        /// Job id, or a path to the job's directory under `WORKDIR_ROOT`
        job: String,

        /// Reset the named stage (and every stage after it) to `pending`
        /// before driving, instead of resuming from the first pending stage
        #[arg(long)]
        restart: Option<String>,

        /// Only run these stages (comma-separated), skipping the rest of
        /// the workflow's active set
        #[arg(long, value_delimiter = ',')]
        stages: Vec<String>,

        /// Print the stage plan and exit without invoking any subprocess
        /// or mutating the manifest
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a prepared or running job's manifest.
    Status {
        /// Job id, or a path to the job's directory under `WORKDIR_ROOT`
        job: String,

        /// Emit the manifest as JSON instead of the tabular form
        #[arg(long)]
        json: bool,

        /// Purge expired cache entries before printing status
        #[arg(long)]
        gc: bool,
    },
}

/// Parses `start:end` (seconds) for `--clip-range`.
fn parse_clip_range(s: &str) -> Result<(f64, f64), String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("clip range '{s}' must be 'start:end' in seconds"))?;
    let start: f64 = start
        .parse()
        .map_err(|_| format!("invalid clip range start '{start}'"))?;
    let end: f64 = end.parse().map_err(|_| format!("invalid clip range end '{end}'"))?;
    Ok((start, end))
}

/// Parses CLI arguments. Clap exits the process with a usage message on
/// failure.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clip_range() {
        assert_eq!(parse_clip_range("1.5:12").unwrap(), (1.5, 12.0));
    }

    #[test]
    fn rejects_malformed_clip_range() {
        assert!(parse_clip_range("not-a-range").is_err());
    }

    #[test]
    fn prepare_requires_input_and_workflow() {
        let cli = Cli::try_parse_from([
            "subforge",
            "prepare",
            "--input",
            "movie.mkv",
            "--workflow",
            "subtitle",
            "--target-languages",
            "es,fr",
        ]);
        assert!(cli.is_ok());
    }

    #[test]
    fn run_accepts_job_id_and_flags() {
        let cli = Cli::try_parse_from(["subforge", "run", "20260728-alice-0007", "--dry-run"]);
        assert!(cli.is_ok());
    }
}
