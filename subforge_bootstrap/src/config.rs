// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Configuration
//!
//! `BootstrapConfig` holds the handful of settings the entry point needs
//! before the application layer's own layered `GlobalConfig` (defaults →
//! TOML → env → job overrides) is loaded: which command was invoked, the
//! log level, and the config file path override. It is immutable once
//! built, the way `ValidatedCli` is immutable once validated.

use crate::cli::ValidatedCommand;
use std::path::PathBuf;

/// Log level, convertible to a `tracing::Level` for subscriber setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }

    /// Resolves `LOG_LEVEL`, falling back to `Debug` when `--verbose` was
    /// passed and to `Info` otherwise.
    pub fn resolve(verbose: bool) -> Self {
        match std::env::var("LOG_LEVEL").ok().as_deref() {
            Some("error") => LogLevel::Error,
            Some("warn") => LogLevel::Warn,
            Some("info") => LogLevel::Info,
            Some("debug") => LogLevel::Debug,
            Some("trace") => LogLevel::Trace,
            _ if verbose => LogLevel::Debug,
            _ => LogLevel::Info,
        }
    }
}

/// Immutable bootstrap-phase configuration, built once from a
/// [`crate::cli::ValidatedCli`].
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    command: ValidatedCommand,
    log_level: LogLevel,
    config_path: Option<PathBuf>,
}

impl BootstrapConfig {
    pub fn from_validated_cli(cli: crate::cli::ValidatedCli) -> Self {
        Self {
            log_level: LogLevel::resolve(cli.verbose),
            config_path: cli.config,
            command: cli.command,
        }
    }

    pub fn command(&self) -> &ValidatedCommand {
        &self.command
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ValidatedCli;

    #[test]
    fn verbose_flag_raises_log_level_without_env_override() {
        std::env::remove_var("LOG_LEVEL");
        assert_eq!(LogLevel::resolve(true), LogLevel::Debug);
        assert_eq!(LogLevel::resolve(false), LogLevel::Info);
    }

    #[test]
    fn builds_from_validated_cli() {
        let cli = ValidatedCli {
            command: ValidatedCommand::Status {
                job: "20260728-alice-0007".to_string(),
                json: false,
                gc: false,
            },
            verbose: false,
            config: Some(PathBuf::from("/tmp/subforge.toml")),
        };
        let config = BootstrapConfig::from_validated_cli(cli);
        assert_eq!(config.config_path(), Some(&PathBuf::from("/tmp/subforge.toml")));
    }
}
