// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Layered configuration (defaults → global TOML → env vars → job
//! overrides), built on the `config` crate the way the rest of the
//! orchestrator layers its parameter resolution.
//!
//! This is the *global* layer of that chain. Job-level overrides live in
//! the job's own `config.toml` under its job directory and are merged in
//! separately by the `prepare` use case, since they aren't known until a
//! job id exists.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use subforge_domain::services::StageParamOverrides;
use subforge_domain::value_objects::capability::GpuKind;

/// User-provided capability overrides (spec §4.1 "a user-provided
/// override in config takes precedence over the probed value"). Any
/// field left `None` falls through to the probed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityOverride {
    pub gpu_kind: Option<GpuKind>,
    pub device_memory_gb: Option<f64>,
    pub cpu_cores: Option<u32>,
    pub available_ram_gb: Option<f64>,
}

/// Top-level settings read from the global config file and `SUBFORGE_*`
/// environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Root directory under which job directories are created (`WORKDIR_ROOT`).
    pub workdir_root: PathBuf,
    /// Root directory for the content-addressed cache.
    pub cache_root: PathBuf,
    /// Root directory under which installed model runtimes live.
    pub runtimes_root: PathBuf,
    /// Per-layer cache size ceilings in gigabytes, keyed by
    /// `CacheLayer::as_str`.
    #[serde(default)]
    pub cache_max_size_gb: std::collections::BTreeMap<String, f64>,
    /// Default stage parameter overrides, keyed by stage name.
    #[serde(default)]
    pub stage_overrides: std::collections::BTreeMap<String, StageParamOverrides>,
    /// Grace period for soft-terminate before SIGKILL on cancellation.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// User-provided capability values that override the probed record.
    #[serde(default)]
    pub capability_override: CapabilityOverride,
    /// TTL for the cached capability record (spec §4.1 `load_or_probe`).
    #[serde(default = "default_capability_ttl_hours")]
    pub capability_ttl_hours: i64,
}

fn default_capability_ttl_hours() -> i64 {
    24
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            workdir_root: PathBuf::from("/var/lib/subforge/jobs"),
            cache_root: PathBuf::from("/var/lib/subforge/cache"),
            runtimes_root: PathBuf::from("/var/lib/subforge/runtimes"),
            cache_max_size_gb: std::collections::BTreeMap::new(),
            stage_overrides: std::collections::BTreeMap::new(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            capability_override: CapabilityOverride::default(),
            capability_ttl_hours: default_capability_ttl_hours(),
        }
    }
}

impl GlobalConfig {
    pub fn stage_overrides(&self, stage: &str) -> StageParamOverrides {
        self.stage_overrides.get(stage).cloned().unwrap_or_default()
    }

    /// Applies `capability_override` on top of a probed record, field by
    /// field (spec §4.1 edge case: user override wins over the probe).
    pub fn apply_capability_override(
        &self,
        mut probed: subforge_domain::value_objects::capability::CapabilityRecord,
    ) -> subforge_domain::value_objects::capability::CapabilityRecord {
        let overrides = &self.capability_override;
        if let Some(gpu_kind) = overrides.gpu_kind {
            probed.gpu_kind = gpu_kind;
        }
        if let Some(device_memory_gb) = overrides.device_memory_gb {
            probed.device_memory_gb = device_memory_gb;
        }
        if let Some(cpu_cores) = overrides.cpu_cores {
            probed.cpu_cores = cpu_cores;
        }
        if let Some(available_ram_gb) = overrides.available_ram_gb {
            probed.available_ram_gb = available_ram_gb;
        }
        probed
    }
}

/// Loads the global configuration: built-in defaults, then `config_path`
/// if it exists, then `SUBFORGE_*` environment variables, highest
/// precedence last (spec §6 `ENV_VARS` table, `--config` override).
pub fn load(config_path: Option<&Path>) -> anyhow::Result<GlobalConfig> {
    let mut builder = config::Config::builder().add_source(config::Config::try_from(&GlobalConfig::default())?);

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(false));
    } else {
        builder = builder.add_source(config::File::with_name("/etc/subforge/config").required(false));
    }

    builder = builder.add_source(config::Environment::with_prefix("SUBFORGE").separator("__"));

    let settled = builder.build().context("failed to build layered configuration")?;
    settled.try_deserialize().context("failed to deserialize global configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_shutdown_grace() {
        let config = GlobalConfig::default();
        assert_eq!(config.shutdown_grace_secs, 10);
    }

    #[test]
    fn load_with_no_file_falls_back_to_defaults() {
        let config = load(Some(Path::new("/nonexistent/subforge.toml"))).unwrap();
        assert_eq!(config.workdir_root, PathBuf::from("/var/lib/subforge/jobs"));
    }

    #[test]
    fn stage_overrides_defaults_to_empty_for_unknown_stage() {
        let config = GlobalConfig::default();
        assert_eq!(config.stage_overrides("asr"), StageParamOverrides::default());
    }
}
