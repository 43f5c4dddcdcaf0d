// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! BCP-47-ish language codes (spec §3 "Job record", target_languages).
//!
//! Validation is deliberately shallow: a two-to-three letter primary
//! subtag plus an optional region subtag, lowercased/uppercased the way
//! `ja` and `zh-Hant` conventionally appear. Full BCP-47 grammar (scripts,
//! variants, extensions) is out of scope; the runtime layer rejects
//! languages it doesn't actually support at resolution time, not here.

use crate::error::OrchestratorError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(raw: impl Into<String>) -> Result<Self, OrchestratorError> {
        let raw = raw.into();
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^[a-zA-Z]{2,3}(-[a-zA-Z0-9]{2,8})?$").expect("static pattern is valid")
        });
        if re.is_match(&raw) {
            Ok(Self(raw))
        } else {
            Err(OrchestratorError::InputInvalid(format!(
                "language code '{raw}' is not a recognizable BCP-47 subtag"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The primary subtag, lowercased, used for runtime/glossary lookups
    /// that key off language family rather than region (e.g. `zh-Hant` and
    /// `zh-Hans` share a glossary).
    pub fn primary_subtag(&self) -> String {
        self.0.split('-').next().unwrap_or(&self.0).to_ascii_lowercase()
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = OrchestratorError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LanguageCode> for String {
    fn from(value: LanguageCode) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_primary_and_region_subtags() {
        assert!(LanguageCode::new("en").is_ok());
        assert!(LanguageCode::new("zh-Hant").is_ok());
        assert!(LanguageCode::new("pt-BR").is_ok());
    }

    #[test]
    fn rejects_empty_and_overlong_values() {
        assert!(LanguageCode::new("").is_err());
        assert!(LanguageCode::new("english").is_err());
    }

    #[test]
    fn primary_subtag_drops_region_and_lowercases() {
        let code = LanguageCode::new("ZH-Hant").unwrap();
        assert_eq!(code.primary_subtag(), "zh");
    }
}
