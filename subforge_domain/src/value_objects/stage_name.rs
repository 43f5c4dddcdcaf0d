// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Closed set of pipeline stages.
//!
//! This replaces the source system's string-keyed stage→script table
//! (spec §9, design note 1) with a tagged variant: adding a stage is a
//! typed, localized change to this enum plus an entry in
//! [`crate::stage_catalog::catalog`], not a string that can typo its way
//! past the compiler.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Demux,
    SourceSeparation,
    Vad,
    Asr,
    Alignment,
    Translation,
    Subtitles,
    Mux,
}

impl StageName {
    /// All stages in catalog order.
    pub const ALL: [StageName; 8] = [
        StageName::Demux,
        StageName::SourceSeparation,
        StageName::Vad,
        StageName::Asr,
        StageName::Alignment,
        StageName::Translation,
        StageName::Subtitles,
        StageName::Mux,
    ];

    /// Position in the total order imposed by the stage catalog (spec §3
    /// "Stage descriptor" invariant: a later stage never feeds an earlier
    /// one).
    pub fn ordinal(&self) -> u8 {
        match self {
            StageName::Demux => 1,
            StageName::SourceSeparation => 2,
            StageName::Vad => 3,
            StageName::Asr => 4,
            StageName::Alignment => 5,
            StageName::Translation => 6,
            StageName::Subtitles => 7,
            StageName::Mux => 8,
        }
    }

    /// The `NN_stage` directory this stage owns under the job directory
    /// (spec §3 "Artifact layout").
    pub fn dir_name(&self) -> &'static str {
        match self {
            StageName::Demux => "01_demux",
            StageName::SourceSeparation => "02_source_separation",
            StageName::Vad => "03_vad",
            StageName::Asr => "04_asr",
            StageName::Alignment => "05_alignment",
            StageName::Translation => "06_translation",
            StageName::Subtitles => "07_subtitles",
            StageName::Mux => "08_mux",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Demux => "demux",
            StageName::SourceSeparation => "source_separation",
            StageName::Vad => "vad",
            StageName::Asr => "asr",
            StageName::Alignment => "alignment",
            StageName::Translation => "translation",
            StageName::Subtitles => "subtitles",
            StageName::Mux => "mux",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StageName {
    type Err = crate::error::OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageName::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| Self::Err::InputInvalid(format!("unknown stage '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_strictly_increasing_in_catalog_order() {
        let ordinals: Vec<u8> = StageName::ALL.iter().map(StageName::ordinal).collect();
        let mut sorted = ordinals.clone();
        sorted.sort_unstable();
        assert_eq!(ordinals, sorted);
        assert_eq!(ordinals.iter().collect::<std::collections::HashSet<_>>().len(), 8);
    }

    #[test]
    fn round_trips_through_str() {
        for stage in StageName::ALL {
            assert_eq!(stage.as_str().parse::<StageName>().unwrap(), stage);
        }
    }
}
