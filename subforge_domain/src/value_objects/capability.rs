// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Host capability record (spec §3 "Capability record", C1).

use crate::error::OrchestratorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuKind {
    Cuda,
    Metal,
    Cpu,
}

/// Probed hardware description used to derive per-stage defaults.
///
/// Invariant: `gpu_kind == Cpu` implies `device_memory_gb == 0` (enforced by
/// [`CapabilityRecord::new`], never by direct field construction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRecord {
    pub gpu_kind: GpuKind,
    pub device_memory_gb: f64,
    pub cpu_cores: u32,
    pub available_ram_gb: f64,
    pub os: String,
    pub arch: String,
    pub probed_at: DateTime<Utc>,
}

impl CapabilityRecord {
    pub fn new(
        gpu_kind: GpuKind,
        device_memory_gb: f64,
        cpu_cores: u32,
        available_ram_gb: f64,
        os: impl Into<String>,
        arch: impl Into<String>,
        probed_at: DateTime<Utc>,
    ) -> Result<Self, OrchestratorError> {
        let device_memory_gb = if matches!(gpu_kind, GpuKind::Cpu) {
            0.0
        } else {
            device_memory_gb
        };
        if cpu_cores == 0 {
            return Err(OrchestratorError::ConfigInvalid(
                "cpu_cores must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            gpu_kind,
            device_memory_gb,
            cpu_cores,
            available_ram_gb,
            os: os.into(),
            arch: arch.into(),
            probed_at,
        })
    }

    /// Whether this record is still within its freshness window.
    pub fn is_fresh(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.probed_at) < ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_gpu_kind_forces_zero_device_memory() {
        let record = CapabilityRecord::new(GpuKind::Cpu, 16.0, 8, 32.0, "linux", "x86_64", Utc::now()).unwrap();
        assert_eq!(record.device_memory_gb, 0.0);
    }

    #[test]
    fn rejects_zero_cpu_cores() {
        assert!(CapabilityRecord::new(GpuKind::Cpu, 0.0, 0, 32.0, "linux", "x86_64", Utc::now()).is_err());
    }

    #[test]
    fn freshness_respects_ttl() {
        let record =
            CapabilityRecord::new(GpuKind::Cuda, 24.0, 16, 64.0, "linux", "x86_64", Utc::now() - chrono::Duration::hours(2))
                .unwrap();
        assert!(!record.is_fresh(chrono::Duration::hours(1), Utc::now()));
        assert!(record.is_fresh(chrono::Duration::hours(3), Utc::now()));
    }
}
