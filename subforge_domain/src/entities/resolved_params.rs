// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The output of the parameter resolver (spec §4.4): one concrete,
//! fully-resolved parameter set per stage invocation, after the
//! defaults → global config → env vars → job overrides precedence chain
//! has been collapsed.

use crate::value_objects::device::{Device, Precision};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fully-resolved parameters for one stage invocation. `extra` carries
/// stage-specific knobs (e.g. VAD's `min_silence_ms`) that don't warrant
/// their own field, keyed by the name used in config files and recorded
/// verbatim in the manifest for reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedParams {
    pub device: Device,
    pub precision: Precision,
    pub batch_size: u32,
    pub timeout_secs: u64,
    /// ASR model id, e.g. `"large"`/`"medium"` (spec §4.4 capability table).
    /// `None` for stages the table doesn't drive a model choice for.
    pub asr_model: Option<String>,
    /// Whether the ASR stage should run in chunked mode (spec §4.4
    /// chunking policy: `device = metal` OR audio duration > 600s).
    pub chunked: bool,
    pub chunk_duration_secs: Option<u64>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ResolvedParams {
    pub fn new(device: Device, precision: Precision, batch_size: u32, timeout_secs: u64) -> Self {
        Self {
            device,
            precision,
            batch_size,
            timeout_secs,
            asr_model: None,
            chunked: false,
            chunk_duration_secs: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn with_asr_model(mut self, asr_model: impl Into<String>) -> Self {
        self.asr_model = Some(asr_model.into());
        self
    }

    pub fn with_chunking(mut self, chunked: bool, chunk_duration_secs: u64) -> Self {
        self.chunked = chunked;
        self.chunk_duration_secs = if chunked { Some(chunk_duration_secs) } else { None };
        self
    }

    /// Degrades parameters for retry `attempt` (1-indexed) per the
    /// spec §4.8 step 7 ladder: halve `batch_size`, then halve
    /// `chunk_duration_secs`, then fall back to CPU/int8.
    pub fn degrade(&self, attempt: u32) -> Self {
        let mut next = self.clone();
        match attempt {
            1 => {
                next.batch_size = (next.batch_size / 2).max(1);
            }
            2 => {
                next.batch_size = (next.batch_size / 2).max(1);
                if let Some(chunk) = next.chunk_duration_secs {
                    next.chunk_duration_secs = Some((chunk / 2).max(1));
                }
            }
            _ => {
                next.batch_size = (next.batch_size / 2).max(1);
                if let Some(chunk) = next.chunk_duration_secs {
                    next.chunk_duration_secs = Some((chunk / 2).max(1));
                }
                next.device = Device::Cpu;
                next.precision = Precision::Int8;
            }
        }
        next
    }

    /// Canonical JSON used as part of the cache key (spec §3 "Cache entry"
    /// note: "the cache key must include every resolved parameter that
    /// affects output bytes"). `BTreeMap` and `serde_json`'s deterministic
    /// field order make this stable across runs.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_json_is_stable_for_equal_params() {
        let a = ResolvedParams::new(Device::Cuda, Precision::Fp16, 8, 120)
            .with_extra("min_silence_ms", serde_json::json!(500));
        let b = ResolvedParams::new(Device::Cuda, Precision::Fp16, 8, 120)
            .with_extra("min_silence_ms", serde_json::json!(500));
        assert_eq!(a.canonical_json().unwrap(), b.canonical_json().unwrap());
    }

    #[test]
    fn differing_extras_produce_differing_json() {
        let a = ResolvedParams::new(Device::Cpu, Precision::Int8, 4, 60);
        let b = a.clone().with_extra("min_silence_ms", serde_json::json!(250));
        assert_ne!(a.canonical_json().unwrap(), b.canonical_json().unwrap());
    }
}
