// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The closed set of workflows a job can run (spec §3 "Workflow").

use crate::value_objects::stage_name::StageName;
use serde::{Deserialize, Serialize};

/// A named subset of the stage catalog. `Subtitle` is the superset of
/// `Translate`, which is the superset of `Transcribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    Transcribe,
    Translate,
    Subtitle,
}

impl Workflow {
    /// The stages active for this workflow, independent of per-stage
    /// enabled flags or runtime availability (those are applied later by
    /// the driver). Order matches [`crate::stage_catalog::catalog`].
    pub fn stage_set(&self) -> &'static [StageName] {
        use StageName::*;
        match self {
            Workflow::Transcribe => &[Demux, SourceSeparation, Vad, Asr, Alignment],
            Workflow::Translate => &[Demux, SourceSeparation, Vad, Asr, Alignment, Translation],
            Workflow::Subtitle => &[
                Demux,
                SourceSeparation,
                Vad,
                Asr,
                Alignment,
                Translation,
                Subtitles,
                Mux,
            ],
        }
    }

    /// Whether this workflow requires a non-empty target-language list
    /// (spec §3 job record invariant).
    pub fn requires_target_languages(&self) -> bool {
        !matches!(self, Workflow::Transcribe)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::Transcribe => "transcribe",
            Workflow::Translate => "translate",
            Workflow::Subtitle => "subtitle",
        }
    }
}

impl std::str::FromStr for Workflow {
    type Err = crate::error::OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transcribe" => Ok(Workflow::Transcribe),
            "translate" => Ok(Workflow::Translate),
            "subtitle" => Ok(Workflow::Subtitle),
            other => Err(Self::Err::InputInvalid(format!(
                "unknown workflow '{other}' (expected transcribe, translate, or subtitle)"
            ))),
        }
    }
}

impl std::fmt::Display for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtitle_is_the_superset() {
        let transcribe: std::collections::HashSet<_> = Workflow::Transcribe.stage_set().iter().collect();
        let subtitle: std::collections::HashSet<_> = Workflow::Subtitle.stage_set().iter().collect();
        assert!(transcribe.is_subset(&subtitle));
    }

    #[test]
    fn only_transcribe_allows_empty_targets() {
        assert!(!Workflow::Transcribe.requires_target_languages());
        assert!(Workflow::Translate.requires_target_languages());
        assert!(Workflow::Subtitle.requires_target_languages());
    }

    #[test]
    fn round_trips_through_str() {
        for w in [Workflow::Transcribe, Workflow::Translate, Workflow::Subtitle] {
            assert_eq!(w.as_str().parse::<Workflow>().unwrap(), w);
        }
    }
}
