// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! An optional sub-range of the source media to process (spec §3 "Job
//! record", `clip_range`), used to run a quick smoke test over a few
//! minutes of a long recording instead of the whole file.

use crate::error::OrchestratorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Half-open `[start, end)` range in seconds from the start of the source
/// media. `end` must be strictly greater than `start`; an absent range
/// means "process the whole file."
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRange {
    start_secs: f64,
    end_secs: f64,
}

impl ClipRange {
    pub fn new(start_secs: f64, end_secs: f64) -> Result<Self, OrchestratorError> {
        if !start_secs.is_finite() || !end_secs.is_finite() || start_secs < 0.0 {
            return Err(OrchestratorError::InputInvalid(
                "clip range bounds must be finite and start must be non-negative".to_string(),
            ));
        }
        if end_secs <= start_secs {
            return Err(OrchestratorError::InputInvalid(format!(
                "clip range end ({end_secs}) must be greater than start ({start_secs})"
            )));
        }
        Ok(Self { start_secs, end_secs })
    }

    pub fn start(&self) -> Duration {
        Duration::from_secs_f64(self.start_secs)
    }

    pub fn end(&self) -> Duration {
        Duration::from_secs_f64(self.end_secs)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.end_secs - self.start_secs)
    }

    /// Formats as `ffmpeg -ss`/`-to` compatible `HH:MM:SS.mmm` pair, used
    /// when building the demux stage's subprocess arguments.
    pub fn as_ffmpeg_args(&self) -> (String, String) {
        (format_timestamp(self.start_secs), format_timestamp(self.end_secs))
    }
}

fn format_timestamp(total_secs: f64) -> String {
    let whole = total_secs.trunc() as u64;
    let millis = ((total_secs - total_secs.trunc()) * 1000.0).round() as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let seconds = whole % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_duration() {
        assert!(ClipRange::new(10.0, 10.0).is_err());
        assert!(ClipRange::new(10.0, 5.0).is_err());
    }

    #[test]
    fn rejects_negative_start() {
        assert!(ClipRange::new(-1.0, 5.0).is_err());
    }

    #[test]
    fn formats_ffmpeg_timestamps() {
        let range = ClipRange::new(65.5, 3600.25).unwrap();
        let (start, end) = range.as_ffmpeg_args();
        assert_eq!(start, "00:01:05.500");
        assert_eq!(end, "01:00:00.250");
    }

    #[test]
    fn duration_is_the_span_between_bounds() {
        let range = ClipRange::new(30.0, 90.0).unwrap();
        assert_eq!(range.duration(), Duration::from_secs(60));
    }
}
