// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! One-shot hardware detection (C1), backed by the bootstrap crate's
//! `Platform` trait for CPU/RAM and a best-effort subprocess probe for
//! GPU presence. Per spec §4.1, GPU detection never fails outright: any
//! error or absent tool falls back to `GpuKind::Cpu`.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use subforge_bootstrap::platform::Platform;
use subforge_domain::services::capability_probe::CapabilityCache;
use subforge_domain::services::CapabilityProbe;
use subforge_domain::value_objects::{CapabilityRecord, GpuKind};
use subforge_domain::OrchestratorError;

/// Filesystem-backed [`CapabilityCache`]: reads/writes one JSON file,
/// write-side copy-then-rename to avoid torn reads (spec §4.1
/// `load_or_probe`, same durability shape as the manifest store).
pub struct FilesystemCapabilityCache {
    path: PathBuf,
}

impl FilesystemCapabilityCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CapabilityCache for FilesystemCapabilityCache {
    async fn read(&self) -> Option<CapabilityRecord> {
        let contents = tokio::fs::read_to_string(&self.path).await.ok()?;
        serde_json::from_str(&contents).ok()
    }

    async fn write(&self, record: &CapabilityRecord) {
        let Some(parent) = self.path.parent() else { return };
        if tokio::fs::create_dir_all(parent).await.is_err() {
            return;
        }
        let Ok(json) = serde_json::to_string_pretty(record) else { return };
        let tmp = self.path.with_extension("json.tmp");
        if tokio::fs::write(&tmp, json).await.is_ok() {
            let _ = tokio::fs::rename(&tmp, &self.path).await;
        }
    }
}

/// Probes CPU/RAM via the platform abstraction and GPU presence via
/// `nvidia-smi` (Linux/Windows) or `system_profiler` (macOS).
pub struct SystemCapabilityProbe {
    platform: Arc<dyn Platform>,
}

impl SystemCapabilityProbe {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    async fn detect_gpu(&self) -> (GpuKind, f64) {
        if self.platform.platform_name() == "macos" {
            return Self::detect_metal().await;
        }
        Self::detect_cuda().await
    }

    async fn detect_cuda() -> (GpuKind, f64) {
        let output = tokio::process::Command::new("nvidia-smi")
            .args(["--query-gpu=memory.total", "--format=csv,noheader,nounits"])
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                let stdout = String::from_utf8_lossy(&out.stdout);
                match stdout.lines().next().and_then(|line| line.trim().parse::<f64>().ok()) {
                    Some(mb) => (GpuKind::Cuda, mb / 1024.0),
                    None => (GpuKind::Cpu, 0.0),
                }
            }
            _ => (GpuKind::Cpu, 0.0),
        }
    }

    async fn detect_metal() -> (GpuKind, f64) {
        let output = tokio::process::Command::new("system_profiler")
            .arg("SPDisplaysDataType")
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                let stdout = String::from_utf8_lossy(&out.stdout);
                if stdout.contains("Metal") {
                    // Apple Silicon shares system memory with the GPU; there is no
                    // separate dedicated figure to parse out of this tool's output.
                    (GpuKind::Metal, 0.0)
                } else {
                    (GpuKind::Cpu, 0.0)
                }
            }
            _ => (GpuKind::Cpu, 0.0),
        }
    }
}

#[async_trait]
impl CapabilityProbe for SystemCapabilityProbe {
    async fn probe(&self) -> Result<CapabilityRecord, OrchestratorError> {
        let cpu_cores = self.platform.cpu_count() as u32;
        let available_ram_gb = self
            .platform
            .available_memory()
            .map(|bytes| bytes as f64 / (1024.0 * 1024.0 * 1024.0))
            .unwrap_or(0.0);

        let (gpu_kind, device_memory_gb) = self.detect_gpu().await;

        CapabilityRecord::new(
            gpu_kind,
            device_memory_gb,
            cpu_cores.max(1),
            available_ram_gb,
            self.platform.platform_name(),
            std::env::consts::ARCH,
            chrono::Utc::now(),
        )
    }
}
