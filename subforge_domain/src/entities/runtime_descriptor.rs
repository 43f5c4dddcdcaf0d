// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Resolved runtime record (spec §3 "Runtime descriptor", C2).

use crate::value_objects::availability::Availability;
use crate::value_objects::runtime_name::RuntimeName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the runtime registry knows about one runtime at resolution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeDescriptor {
    pub name: RuntimeName,
    pub availability: Availability,
    pub executable_path: Option<PathBuf>,
    pub version: Option<String>,
    /// `None` if the liveness probe was never run (e.g. registry entry
    /// came from a stale cache and the probe was skipped for `status`).
    pub checked_at: Option<DateTime<Utc>>,
}

impl RuntimeDescriptor {
    pub fn missing(name: RuntimeName) -> Self {
        Self {
            name,
            availability: Availability::Missing,
            executable_path: None,
            version: None,
            checked_at: None,
        }
    }

    pub fn ready(name: RuntimeName, executable_path: PathBuf, version: impl Into<String>, checked_at: DateTime<Utc>) -> Self {
        Self {
            name,
            availability: Availability::Ready,
            executable_path: Some(executable_path),
            version: Some(version.into()),
            checked_at: Some(checked_at),
        }
    }

    pub fn degraded(name: RuntimeName, executable_path: PathBuf, checked_at: DateTime<Utc>) -> Self {
        Self {
            name,
            availability: Availability::Degraded,
            executable_path: Some(executable_path),
            version: None,
            checked_at: Some(checked_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_runtime_has_no_path_or_version() {
        let descriptor = RuntimeDescriptor::missing(RuntimeName::new("asr_gpu").unwrap());
        assert_eq!(descriptor.availability, Availability::Missing);
        assert!(descriptor.executable_path.is_none());
    }

    #[test]
    fn ready_runtime_carries_version_and_path() {
        let descriptor = RuntimeDescriptor::ready(
            RuntimeName::new("util").unwrap(),
            PathBuf::from("/usr/bin/ffmpeg"),
            "6.1",
            Utc::now(),
        );
        assert_eq!(descriptor.availability, Availability::Ready);
        assert_eq!(descriptor.version.as_deref(), Some("6.1"));
    }
}
