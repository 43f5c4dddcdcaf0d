// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Filesystem-backed runtime registry (C2, spec §4.2).
//!
//! A runtime lives at `<runtimes_root>/<name>/bin/<name>` with a sibling
//! `import_probe` executable that exits 0 when the runtime's Python
//! environment (or equivalent) is importable. Results are cached
//! in-memory for the registry's lifetime, which callers scope to one
//! driver run per spec §4.2 ("cached in memory for the lifetime of a
//! driver run").

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use subforge_domain::entities::runtime_descriptor::RuntimeDescriptor;
use subforge_domain::error::OrchestratorError;
use subforge_domain::services::runtime_registry::RuntimeRegistry;
use subforge_domain::value_objects::runtime_name::RuntimeName;
use tokio::sync::Mutex;

pub struct FilesystemRuntimeRegistry {
    runtimes_root: PathBuf,
    cache: Mutex<HashMap<RuntimeName, RuntimeDescriptor>>,
}

impl FilesystemRuntimeRegistry {
    pub fn new(runtimes_root: impl Into<PathBuf>) -> Self {
        Self {
            runtimes_root: runtimes_root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn executable_path(&self, name: &RuntimeName) -> PathBuf {
        self.runtimes_root.join(name.as_str()).join("bin").join(name.as_str())
    }

    fn import_probe_path(&self, name: &RuntimeName) -> PathBuf {
        self.runtimes_root.join(name.as_str()).join("bin").join("import_probe")
    }

    async fn probe(&self, name: &RuntimeName) -> RuntimeDescriptor {
        let executable = self.executable_path(name);
        if !tokio::fs::try_exists(&executable).await.unwrap_or(false) {
            return RuntimeDescriptor::missing(name.clone());
        }

        let probe = self.import_probe_path(name);
        let probe_ok = match tokio::process::Command::new(&probe).output().await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        };

        if probe_ok {
            RuntimeDescriptor::ready(name.clone(), executable, runtime_version(name), Utc::now())
        } else {
            RuntimeDescriptor::degraded(name.clone(), executable, Utc::now())
        }
    }
}

/// No general version-reporting convention exists across runtimes; the
/// registry records the runtime name itself as a placeholder version
/// until a runtime declares a real one via its import probe's output.
fn runtime_version(name: &RuntimeName) -> String {
    name.as_str().to_string()
}

#[async_trait]
impl RuntimeRegistry for FilesystemRuntimeRegistry {
    async fn resolve(&self, name: &RuntimeName) -> Result<RuntimeDescriptor, OrchestratorError> {
        {
            let cache = self.cache.lock().await;
            if let Some(descriptor) = cache.get(name) {
                return Ok(descriptor.clone());
            }
        }

        let descriptor = self.probe(name).await;
        self.cache.lock().await.insert(name.clone(), descriptor.clone());

        if name.is_utility() && descriptor.availability == subforge_domain::value_objects::availability::Availability::Missing {
            return Err(OrchestratorError::RuntimeUnavailable(format!(
                "required utility runtime '{name}' is missing at {}",
                self.executable_path(name).display()
            )));
        }

        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subforge_domain::value_objects::availability::Availability;

    #[tokio::test]
    async fn missing_runtime_resolves_to_missing_when_optional() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FilesystemRuntimeRegistry::new(dir.path());
        let name = RuntimeName::new("asr_gpu").unwrap();

        let descriptor = registry.resolve(&name).await.unwrap();
        assert_eq!(descriptor.availability, Availability::Missing);
    }

    #[tokio::test]
    async fn missing_utility_runtime_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FilesystemRuntimeRegistry::new(dir.path());
        let util = RuntimeName::new(subforge_domain::value_objects::runtime_name::UTILITY_RUNTIME).unwrap();

        let result = registry.resolve(&util).await;
        assert!(matches!(result, Err(OrchestratorError::RuntimeUnavailable(_))));
    }

    #[tokio::test]
    async fn resolution_is_cached_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FilesystemRuntimeRegistry::new(dir.path());
        let name = RuntimeName::new("asr_gpu").unwrap();

        let first = registry.resolve(&name).await.unwrap();
        let second = registry.resolve(&name).await.unwrap();
        assert_eq!(first.checked_at, second.checked_at);
    }
}
