// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secure Command-Line Argument Parsing
//!
//! Security-first argument validation, applied after `clap` parsing and
//! before any argument reaches application code.
//!
//! ## Security Features
//!
//! - **Length limits** - prevent buffer overflow / DoS-by-argument attempts
//! - **Pattern detection** - block path traversal and shell injection
//! - **Path normalization** - canonical path resolution for existing inputs
//! - **System directory protection** - refuse to treat protected paths as job storage
//!
//! ## Dangerous Patterns Detected
//!
//! - `..` - path traversal
//! - `~` - home directory expansion
//! - `$` - variable expansion
//! - Backticks - command substitution
//! - `;` `&` `|` - command chaining
//! - `>` `<` - redirection
//! - Null bytes, newlines, carriage returns

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum argument count (prevent DOS)
const MAX_ARG_COUNT: usize = 100;

/// Maximum single argument length
const MAX_ARG_LENGTH: usize = 1000;

/// Maximum path length
const MAX_PATH_LENGTH: usize = 4096;

/// Dangerous patterns that indicate potential attacks
const DANGEROUS_PATTERNS: &[&str] = &[
    "..", // Path traversal
    "~",  // Home directory
    "$",  // Variable expansion
    "`",  // Command substitution
    ";",  // Command chaining
    "&",  // Background/AND
    "|",  // Pipe
    ">",  // Redirect output
    "<",  // Redirect input
    "\n", // Newline
    "\r", // Carriage return
    "\0", // Null byte
];

/// Protected system directories; a job must never be prepared or run
/// with its working directory resolving under one of these.
const PROTECTED_DIRS: &[&str] = &[
    "/etc",
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
    "/boot",
    "/sys",
    "/proc",
    "/dev",
];

/// Secure argument parsing errors.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("too many arguments (max {MAX_ARG_COUNT})")]
    TooManyArguments,

    #[error("argument too long (max {MAX_ARG_LENGTH} characters): {0}")]
    ArgumentTooLong(String),

    #[error("dangerous pattern detected in argument: {pattern} in {arg}")]
    DangerousPattern { pattern: String, arg: String },

    #[error("path exceeds maximum length (max {MAX_PATH_LENGTH})")]
    PathTooLong,

    #[error("access to protected system directory denied: {0}")]
    ProtectedDirectory(String),

    #[error("path does not exist: {0}")]
    PathNotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid argument value for {arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
}

/// Security-first argument validator, applied to every CLI argument
/// before it is handed to domain parsing (`JobId::parse`,
/// `Workflow::from_str`, ...).
pub struct SecureArgParser;

impl SecureArgParser {
    /// Validates a single argument for length and dangerous patterns.
    pub fn validate_argument(arg: &str) -> Result<(), ParseError> {
        if arg.len() > MAX_ARG_LENGTH {
            return Err(ParseError::ArgumentTooLong(
                arg.chars().take(50).collect::<String>() + "...",
            ));
        }

        for pattern in DANGEROUS_PATTERNS {
            if arg.contains(pattern) {
                return Err(ParseError::DangerousPattern {
                    pattern: pattern.to_string(),
                    arg: arg.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Validates and canonicalizes a path that is expected to already
    /// exist (source media, an existing job directory).
    pub fn validate_path(path: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(path).map_err(|e| match e {
            ParseError::ArgumentTooLong(_) => ParseError::InvalidPath(format!("path too long: {path}")),
            ParseError::DangerousPattern { pattern, .. } => {
                ParseError::InvalidPath(format!("path contains dangerous pattern '{pattern}': {path}"))
            }
            other => other,
        })?;

        let path_obj = Path::new(path);

        let canonical = path_obj.canonicalize().map_err(|e| {
            if !path_obj.exists() {
                ParseError::PathNotFound(path.to_string())
            } else {
                ParseError::InvalidPath(format!("{path}: {e}"))
            }
        })?;

        if canonical.to_string_lossy().len() > MAX_PATH_LENGTH {
            return Err(ParseError::PathTooLong);
        }

        for protected in PROTECTED_DIRS {
            if canonical.starts_with(protected) {
                return Err(ParseError::ProtectedDirectory(canonical.display().to_string()));
            }
        }

        Ok(canonical)
    }

    /// Validates a path that may not exist yet (a job directory about to
    /// be created by `prepare`): pattern/length checks only, no
    /// canonicalization, but still rejects protected directories by
    /// lexical prefix.
    pub fn validate_new_path(path: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(path)?;
        let path_obj = PathBuf::from(path);
        if path_obj.is_absolute() {
            for protected in PROTECTED_DIRS {
                if path_obj.starts_with(protected) {
                    return Err(ParseError::ProtectedDirectory(path_obj.display().to_string()));
                }
            }
        }
        Ok(path_obj)
    }

    pub fn validate_optional_path(path: Option<&str>) -> Result<Option<PathBuf>, ParseError> {
        match path {
            Some(p) => Self::validate_path(p).map(Some),
            None => Ok(None),
        }
    }

    /// Validates a numeric argument against an inclusive range.
    pub fn validate_number<T>(arg_name: &str, value: T, min: T, max: T) -> Result<T, ParseError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(ParseError::InvalidValue {
                arg: arg_name.to_string(),
                reason: format!("must be between {min} and {max}, got {value}"),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod argument_validation {
        use super::*;

        #[test]
        fn accepts_safe_arguments() {
            assert!(SecureArgParser::validate_argument("safe-arg").is_ok());
            assert!(SecureArgParser::validate_argument("file.txt").is_ok());
            assert!(SecureArgParser::validate_argument("20260728-alice-0007").is_ok());
        }

        #[test]
        fn rejects_too_long_arguments() {
            let long_arg = "a".repeat(MAX_ARG_LENGTH + 1);
            assert!(matches!(
                SecureArgParser::validate_argument(&long_arg),
                Err(ParseError::ArgumentTooLong(_))
            ));
        }

        #[test]
        fn detects_dangerous_patterns() {
            let dangerous = vec![
                "../etc/passwd",
                "~/.ssh/id_rsa",
                "$(whoami)",
                "`ls`",
                "file;rm -rf /",
                "file&background",
                "file|pipe",
                "file>output",
                "file<input",
                "file\nwith\nnewlines",
            ];

            for arg in dangerous {
                assert!(
                    matches!(SecureArgParser::validate_argument(arg), Err(ParseError::DangerousPattern { .. })),
                    "failed to detect dangerous pattern in: {arg}"
                );
            }
        }
    }

    mod path_validation {
        use super::*;

        #[test]
        fn rejects_protected_directories_by_prefix() {
            let result = SecureArgParser::validate_new_path("/etc/subforge/job");
            assert!(matches!(result, Err(ParseError::ProtectedDirectory(_))));
        }

        #[test]
        fn accepts_relative_new_paths() {
            assert!(SecureArgParser::validate_new_path("out/20260728-alice-0007").is_ok());
        }

        #[test]
        fn missing_existing_path_is_not_found() {
            let result = SecureArgParser::validate_path("/nonexistent/does/not/exist");
            assert!(matches!(result, Err(ParseError::PathNotFound(_))));
        }
    }

    mod number_validation {
        use super::*;

        #[test]
        fn validates_values_within_range() {
            assert_eq!(SecureArgParser::validate_number("cpu_threads", 8u32, 1, 128).unwrap(), 8);
        }

        #[test]
        fn rejects_out_of_range_values() {
            assert!(SecureArgParser::validate_number("cpu_threads", 0u32, 1, 128).is_err());
            assert!(SecureArgParser::validate_number("cpu_threads", 200u32, 1, 128).is_err());
        }
    }
}
