// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The parameter resolver (spec §4.4): collapses
//! defaults → global config → env vars → job overrides into one
//! [`ResolvedParams`] per stage. Pure and synchronous — no I/O, no
//! runtime dependency — so it can be exhaustively unit- and
//! property-tested without fixtures.

use crate::entities::resolved_params::ResolvedParams;
use crate::value_objects::capability::{CapabilityRecord, GpuKind};
use crate::value_objects::device::{Device, Precision};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A partially-specified layer in the precedence chain. Any field left
/// `None` falls through to the next, lower-precedence layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageParamOverrides {
    pub device: Option<Device>,
    pub precision: Option<Precision>,
    pub batch_size: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub asr_model: Option<String>,
    pub chunk_duration_secs: Option<u64>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Inputs to one resolution, ordered from lowest to highest precedence.
pub struct ResolverInputs<'a> {
    pub capability: &'a CapabilityRecord,
    pub global_config: &'a StageParamOverrides,
    pub env_overrides: &'a StageParamOverrides,
    pub job_overrides: &'a StageParamOverrides,
    /// Source audio duration, when known, to drive the chunking policy
    /// (spec §4.4: "audio duration > 600s" triggers chunked ASR). `None`
    /// when the duration can't yet be determined (e.g. before demux).
    pub audio_duration_secs: Option<f64>,
}

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_CHUNK_DURATION_SECS: u64 = 300;
const CHUNKING_DURATION_THRESHOLD_SECS: f64 = 600.0;

/// Derives the capability-driven defaults that sit below every
/// configured layer, per the spec §4.4 resolver table.
fn capability_defaults(capability: &CapabilityRecord) -> (Device, u32, Precision, &'static str) {
    match capability.gpu_kind {
        GpuKind::Cuda if capability.device_memory_gb >= 20.0 => (Device::Cuda, 32, Precision::Fp16, "large"),
        GpuKind::Cuda if capability.device_memory_gb >= 10.0 => (Device::Cuda, 16, Precision::Fp16, "large"),
        GpuKind::Cuda => (Device::Cuda, 8, Precision::Fp16, "large"),
        GpuKind::Metal if capability.device_memory_gb >= 16.0 => (Device::Metal, 16, Precision::Fp16, "large"),
        GpuKind::Metal => (Device::Metal, 8, Precision::Fp16, "large"),
        GpuKind::Cpu => (Device::Cpu, 1, Precision::Int8, "medium"),
    }
}

/// Resolves one stage's parameters by folding the four layers in
/// precedence order. `extra` keys are merged rather than replaced
/// wholesale: a job override for one key doesn't erase a global-config
/// default for another key in the same map.
pub fn resolve(inputs: ResolverInputs<'_>) -> ResolvedParams {
    let (default_device, default_batch_size, default_precision, default_asr_model) = capability_defaults(inputs.capability);

    let mut device = default_device;
    let mut precision = default_precision;
    let mut batch_size = default_batch_size;
    let mut timeout_secs = DEFAULT_TIMEOUT_SECS;
    let mut asr_model = default_asr_model.to_string();
    let mut chunk_duration_secs = DEFAULT_CHUNK_DURATION_SECS;
    let mut extra = BTreeMap::new();

    for layer in [inputs.global_config, inputs.env_overrides, inputs.job_overrides] {
        if let Some(d) = layer.device {
            device = d;
        }
        if let Some(p) = layer.precision {
            precision = p;
        }
        if let Some(b) = layer.batch_size {
            batch_size = b;
        }
        if let Some(t) = layer.timeout_secs {
            timeout_secs = t;
        }
        if let Some(ref model) = layer.asr_model {
            asr_model = model.clone();
        }
        if let Some(c) = layer.chunk_duration_secs {
            chunk_duration_secs = c;
        }
        extra.extend(layer.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let chunked = device == Device::Metal || inputs.audio_duration_secs.is_some_and(|d| d > CHUNKING_DURATION_THRESHOLD_SECS);

    let mut resolved = ResolvedParams::new(device, precision, batch_size, timeout_secs)
        .with_asr_model(asr_model)
        .with_chunking(chunked, chunk_duration_secs);
    resolved.extra = extra;
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn capability(gpu_kind: GpuKind) -> CapabilityRecord {
        CapabilityRecord::new(gpu_kind, if matches!(gpu_kind, GpuKind::Cpu) { 0.0 } else { 16.0 }, 8, 32.0, "linux", "x86_64", Utc::now()).unwrap()
    }

    #[test]
    fn cpu_only_host_defaults_to_int8_on_cpu() {
        let capability = capability(GpuKind::Cpu);
        let resolved = resolve(ResolverInputs {
            capability: &capability,
            global_config: &StageParamOverrides::default(),
            env_overrides: &StageParamOverrides::default(),
            job_overrides: &StageParamOverrides::default(),
            audio_duration_secs: None,
        });
        assert_eq!(resolved.device, Device::Cpu);
        assert_eq!(resolved.precision, Precision::Int8);
        assert_eq!(resolved.batch_size, 1);
        assert_eq!(resolved.asr_model.as_deref(), Some("medium"));
    }

    #[test]
    fn gpu_host_defaults_to_fp16_on_its_device() {
        let capability = capability(GpuKind::Cuda);
        let resolved = resolve(ResolverInputs {
            capability: &capability,
            global_config: &StageParamOverrides::default(),
            env_overrides: &StageParamOverrides::default(),
            job_overrides: &StageParamOverrides::default(),
            audio_duration_secs: None,
        });
        assert_eq!(resolved.device, Device::Cuda);
        assert_eq!(resolved.precision, Precision::Fp16);
        assert_eq!(resolved.asr_model.as_deref(), Some("large"));
    }

    #[test]
    fn job_override_beats_global_config_and_env() {
        let capability = capability(GpuKind::Cuda);
        let global = StageParamOverrides {
            batch_size: Some(4),
            ..Default::default()
        };
        let env = StageParamOverrides {
            batch_size: Some(8),
            ..Default::default()
        };
        let job = StageParamOverrides {
            batch_size: Some(16),
            ..Default::default()
        };
        let resolved = resolve(ResolverInputs {
            capability: &capability,
            global_config: &global,
            env_overrides: &env,
            job_overrides: &job,
            audio_duration_secs: None,
        });
        assert_eq!(resolved.batch_size, 16);
    }

    #[test]
    fn extra_keys_merge_across_layers_instead_of_replacing() {
        let capability = capability(GpuKind::Cpu);
        let mut global = StageParamOverrides::default();
        global.extra.insert("min_silence_ms".to_string(), serde_json::json!(500));
        let mut job = StageParamOverrides::default();
        job.extra.insert("beam_size".to_string(), serde_json::json!(5));

        let resolved = resolve(ResolverInputs {
            capability: &capability,
            global_config: &global,
            env_overrides: &StageParamOverrides::default(),
            job_overrides: &job,
            audio_duration_secs: None,
        });

        assert_eq!(resolved.extra.get("min_silence_ms"), Some(&serde_json::json!(500)));
        assert_eq!(resolved.extra.get("beam_size"), Some(&serde_json::json!(5)));
    }

    fn capability_with_memory(gpu_kind: GpuKind, device_memory_gb: f64) -> CapabilityRecord {
        CapabilityRecord::new(gpu_kind, device_memory_gb, 8, 32.0, "linux", "x86_64", Utc::now()).unwrap()
    }

    fn resolve_with(capability: &CapabilityRecord, audio_duration_secs: Option<f64>) -> ResolvedParams {
        resolve(ResolverInputs {
            capability,
            global_config: &StageParamOverrides::default(),
            env_overrides: &StageParamOverrides::default(),
            job_overrides: &StageParamOverrides::default(),
            audio_duration_secs,
        })
    }

    #[test]
    fn cuda_tiers_follow_the_capability_table() {
        let high = capability_with_memory(GpuKind::Cuda, 24.0);
        assert_eq!(resolve_with(&high, None).batch_size, 32);
        let mid = capability_with_memory(GpuKind::Cuda, 16.0);
        assert_eq!(resolve_with(&mid, None).batch_size, 16);
        let low = capability_with_memory(GpuKind::Cuda, 4.0);
        assert_eq!(resolve_with(&low, None).batch_size, 8);
    }

    #[test]
    fn metal_tiers_follow_the_capability_table() {
        let high = capability_with_memory(GpuKind::Metal, 16.0);
        assert_eq!(resolve_with(&high, None).batch_size, 16);
        let low = capability_with_memory(GpuKind::Metal, 8.0);
        assert_eq!(resolve_with(&low, None).batch_size, 8);
    }

    #[test]
    fn metal_device_always_chunks_regardless_of_duration() {
        let metal = capability_with_memory(GpuKind::Metal, 16.0);
        assert!(resolve_with(&metal, Some(60.0)).chunked);
    }

    #[test]
    fn long_audio_chunks_on_any_device() {
        let cuda = capability_with_memory(GpuKind::Cuda, 24.0);
        assert!(!resolve_with(&cuda, Some(300.0)).chunked);
        assert!(resolve_with(&cuda, Some(601.0)).chunked);
    }

    #[test]
    fn chunk_duration_defaults_to_300_seconds_when_chunked() {
        let cuda = capability_with_memory(GpuKind::Cuda, 24.0);
        let resolved = resolve_with(&cuda, Some(900.0));
        assert_eq!(resolved.chunk_duration_secs, Some(300));
    }
}
