// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Health of a resolved runtime (spec §3 "Runtime descriptor", C2).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Resolved, executable, and passed its liveness check.
    Ready,
    /// Not found in the runtime registry or its executable is missing.
    Missing,
    /// Found, but the liveness check failed or it reported a version
    /// mismatch; callers may still attempt to use it if no alternative
    /// exists, but must surface a warning.
    Degraded,
}

impl Availability {
    pub fn is_usable(&self) -> bool {
        !matches!(self, Availability::Missing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Ready => "ready",
            Availability::Missing => "missing",
            Availability::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_is_unusable() {
        assert!(Availability::Ready.is_usable());
        assert!(Availability::Degraded.is_usable());
        assert!(!Availability::Missing.is_usable());
    }
}
