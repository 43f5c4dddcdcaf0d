// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Job identity value object.
//!
//! A `JobId` has the form `YYYYMMDD-<user>-NNNN` where `NNNN` is monotonic
//! per user per day (spec §4.5). It is URL-safe and directly usable as a
//! path segment under `WORKDIR_ROOT`.

use crate::error::OrchestratorError;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn user_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").expect("static pattern is valid"))
}

/// URL-safe, directory-safe identifier for one job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Builds a new id from its constituent parts, validating the user
    /// segment (no path separators, no shell metacharacters).
    pub fn new(date: chrono::NaiveDate, user_id: &str, sequence: u32) -> Result<Self, OrchestratorError> {
        if !user_pattern().is_match(user_id) {
            return Err(OrchestratorError::InputInvalid(format!(
                "user id '{user_id}' must match [a-zA-Z0-9_-]{{1,64}}"
            )));
        }
        if sequence == 0 || sequence > 9999 {
            return Err(OrchestratorError::InputInvalid(
                "job sequence must be between 1 and 9999".to_string(),
            ));
        }
        Ok(Self(format!(
            "{}-{}-{:04}",
            date.format("%Y%m%d"),
            user_id,
            sequence
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses and validates a previously-formatted job id, e.g. one read
    /// back from a CLI argument or a job directory name.
    pub fn parse(raw: &str) -> Result<Self, OrchestratorError> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^\d{8}-[a-zA-Z0-9_-]{1,64}-\d{4}$").expect("static pattern is valid")
        });
        if re.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(OrchestratorError::InputInvalid(format!(
                "'{raw}' is not a valid job id (expected YYYYMMDD-<user>-NNNN)"
            )))
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for JobId {
    type Error = OrchestratorError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JobId> for String {
    fn from(value: JobId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn formats_as_date_user_sequence() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let id = JobId::new(date, "alice", 7).unwrap();
        assert_eq!(id.as_str(), "20260728-alice-0007");
    }

    #[test]
    fn rejects_zero_sequence() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        assert!(JobId::new(date, "alice", 0).is_err());
    }

    #[test]
    fn rejects_unsafe_user_id() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        assert!(JobId::new(date, "../etc", 1).is_err());
    }

    #[test]
    fn parse_round_trips_a_formatted_id() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        let id = JobId::new(date, "bob", 42).unwrap();
        let parsed = JobId::parse(id.as_str()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        assert!(JobId::parse("not-a-job-id").is_err());
        assert!(JobId::parse("2026-bob-0001").is_err());
    }
}
