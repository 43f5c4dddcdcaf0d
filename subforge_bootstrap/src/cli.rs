// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse_cli()             │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validate_cli()                  │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated arguments
//! └─────────────────────────────────────┘
//! ```
//!
//! Domain-typed parsing (`Workflow`, `LanguageCode`, `JobId`) happens one
//! layer up, in the application use cases — this module only guarantees
//! that every string and path reaching them has already passed length,
//! pattern, and range checks.
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// CLI arguments after security validation: paths are canonicalized (or
/// pattern-checked, for paths that do not exist yet) and every numeric
/// argument is range-checked.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

/// Validated command variants, one per CLI entry point (spec §6).
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Prepare {
        input: PathBuf,
        workflow: String,
        source_language: Option<String>,
        target_languages: Vec<String>,
        user_id: String,
        clip_range: Option<(f64, f64)>,
    },
    Run {
        job: String,
        restart: Option<String>,
        stages: Vec<String>,
        dry_run: bool,
    },
    Status {
        job: String,
        json: bool,
        gc: bool,
    },
}

/// Parses and validates CLI arguments in one call: clap parsing followed
/// by security validation.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

/// Applies security validation to parsed CLI arguments.
fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = match cli.config {
        Some(ref path) => {
            SecureArgParser::validate_argument(&path.to_string_lossy())?;
            Some(path.clone())
        }
        None => None,
    };

    let command = match cli.command {
        Commands::Prepare {
            input,
            workflow,
            source_language,
            target_languages,
            user_id,
            clip_range,
        } => {
            let validated_input = SecureArgParser::validate_path(&input.to_string_lossy())?;
            SecureArgParser::validate_argument(&workflow)?;
            if let Some(ref lang) = source_language {
                SecureArgParser::validate_argument(lang)?;
            }
            for lang in &target_languages {
                SecureArgParser::validate_argument(lang)?;
            }
            SecureArgParser::validate_argument(&user_id)?;
            if let Some((start, end)) = clip_range {
                if !(start.is_finite() && end.is_finite()) || start < 0.0 || end <= start {
                    return Err(ParseError::InvalidValue {
                        arg: "clip-range".to_string(),
                        reason: format!("'{start}:{end}' must satisfy 0 <= start < end"),
                    });
                }
            }

            ValidatedCommand::Prepare {
                input: validated_input,
                workflow,
                source_language,
                target_languages,
                user_id,
                clip_range,
            }
        }
        Commands::Run {
            job,
            restart,
            stages,
            dry_run,
        } => {
            SecureArgParser::validate_argument(&job)?;
            if let Some(ref stage) = restart {
                SecureArgParser::validate_argument(stage)?;
            }
            for stage in &stages {
                SecureArgParser::validate_argument(stage)?;
            }

            ValidatedCommand::Run {
                job,
                restart,
                stages,
                dry_run,
            }
        }
        Commands::Status { job, json, gc } => {
            SecureArgParser::validate_argument(&job)?;
            ValidatedCommand::Status { job, json, gc }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dangerous_user_id() {
        let cli = Cli {
            command: Commands::Prepare {
                input: PathBuf::from("Cargo.toml"),
                workflow: "transcribe".to_string(),
                source_language: None,
                target_languages: vec![],
                user_id: "../etc".to_string(),
                clip_range: None,
            },
            verbose: false,
            config: None,
        };
        assert!(matches!(validate_cli(cli), Err(ParseError::DangerousPattern { .. })));
    }

    #[test]
    fn rejects_inverted_clip_range() {
        let cli = Cli {
            command: Commands::Prepare {
                input: PathBuf::from("Cargo.toml"),
                workflow: "transcribe".to_string(),
                source_language: None,
                target_languages: vec![],
                user_id: "alice".to_string(),
                clip_range: Some((10.0, 2.0)),
            },
            verbose: false,
            config: None,
        };
        assert!(matches!(validate_cli(cli), Err(ParseError::InvalidValue { .. })));
    }

    #[test]
    fn accepts_well_formed_status_command() {
        let cli = Cli {
            command: Commands::Status {
                job: "20260728-alice-0007".to_string(),
                json: true,
                gc: false,
            },
            verbose: false,
            config: None,
        };
        assert!(validate_cli(cli).is_ok());
    }
}
