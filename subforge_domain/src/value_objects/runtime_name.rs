// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Logical runtime names (spec §3 "Runtime descriptor", C2).
//!
//! Unlike [`crate::value_objects::stage_name::StageName`], this is not a
//! closed enum: runtimes are parameterized by language pair
//! (`translate_indic_en`, `translate_ja_en`, ...), so the set is open. The
//! validation here only rules out values that could never be a safe path
//! segment or environment-variable suffix.

use crate::error::OrchestratorError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuntimeName(String);

/// The one runtime every workflow requires; resolving it is mandatory
/// (spec §3 "Runtime descriptor": "Exactly one runtime is designated
/// 'utility' and is required").
pub const UTILITY_RUNTIME: &str = "util";

impl RuntimeName {
    pub fn new(raw: impl Into<String>) -> Result<Self, OrchestratorError> {
        let raw = raw.into();
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]{0,63}$").expect("static pattern is valid"));
        if re.is_match(&raw) {
            Ok(Self(raw))
        } else {
            Err(OrchestratorError::ConfigInvalid(format!(
                "runtime name '{raw}' must match [a-z][a-z0-9_]* (max 64 chars)"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_utility(&self) -> bool {
        self.0 == UTILITY_RUNTIME
    }
}

impl std::fmt::Display for RuntimeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RuntimeName {
    type Error = OrchestratorError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RuntimeName> for String {
    fn from(value: RuntimeName) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_language_pair_suffixes() {
        assert!(RuntimeName::new("translate_indic_en").is_ok());
        assert!(RuntimeName::new("asr_gpu").is_ok());
    }

    #[test]
    fn rejects_path_traversal_like_values() {
        assert!(RuntimeName::new("../etc").is_err());
        assert!(RuntimeName::new("Asr").is_err());
        assert!(RuntimeName::new("").is_err());
    }

    #[test]
    fn recognizes_the_utility_runtime() {
        let util = RuntimeName::new(UTILITY_RUNTIME).unwrap();
        assert!(util.is_utility());
        let other = RuntimeName::new("asr_gpu").unwrap();
        assert!(!other.is_utility());
    }
}
