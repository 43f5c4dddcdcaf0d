// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Status use case (spec §4.6): a read-only manifest report, with an
//! optional cache garbage-collection pass. Always succeeds (exit 0) —
//! a missing manifest is reported in the output, not as a process
//! failure.

use serde::Serialize;
use std::collections::BTreeMap;
use subforge_domain::entities::manifest::Manifest;
use subforge_domain::error::OrchestratorError;
use subforge_domain::repositories::{CacheRepository, ManifestRepository};
use subforge_domain::value_objects::cache_layer::CacheLayer;
use subforge_domain::value_objects::job_id::JobId;

const ALL_LAYERS: [CacheLayer; 5] = [
    CacheLayer::Metadata,
    CacheLayer::Fingerprint,
    CacheLayer::Asr,
    CacheLayer::Translation,
    CacheLayer::Glossary,
];

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub manifest: Option<Manifest>,
    pub gc_evicted: Option<BTreeMap<String, u64>>,
}

pub struct StatusRequest {
    pub job_id: String,
    pub gc: bool,
}

pub async fn status(
    request: StatusRequest,
    manifest_store: &dyn ManifestRepository,
    cache: Option<&dyn CacheRepository>,
    cache_max_size_gb: &BTreeMap<String, f64>,
) -> Result<StatusReport, OrchestratorError> {
    let job_id = JobId::parse(&request.job_id)?;

    let manifest = if manifest_store.exists(&job_id).await? {
        Some(manifest_store.load(&job_id).await?)
    } else {
        None
    };

    let gc_evicted = if request.gc {
        let mut evicted = BTreeMap::new();
        if let Some(cache) = cache {
            for layer in ALL_LAYERS {
                let max_size_gb = cache_max_size_gb.get(layer.as_str()).copied().unwrap_or(f64::MAX);
                let count = cache.purge_expired(layer, max_size_gb).await?;
                evicted.insert(layer.as_str().to_string(), count);
            }
        }
        Some(evicted)
    } else {
        None
    };

    Ok(StatusReport { manifest, gc_evicted })
}

/// Renders a report as the human-readable table printed by default
/// (spec §6 `status` without `--json`).
pub fn render_table(report: &StatusReport) -> String {
    let mut out = String::new();
    match &report.manifest {
        None => out.push_str("job not found\n"),
        Some(manifest) => {
            out.push_str(&format!("job:     {}\n", manifest.job_id));
            out.push_str(&format!("updated: {}\n", manifest.updated_at));
            out.push_str("stage                status      cache_hit\n");
            for entry in &manifest.stages {
                out.push_str(&format!(
                    "{:<20} {:<11} {}\n",
                    entry.stage.as_str(),
                    format!("{:?}", entry.status).to_lowercase(),
                    entry.cache_hit
                ));
            }
        }
    }
    if let Some(evicted) = &report.gc_evicted {
        for (layer, count) in evicted {
            out.push_str(&format!("gc: {layer} evicted {count}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use subforge_domain::value_objects::workflow::Workflow;

    #[tokio::test]
    async fn status_of_an_unknown_job_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::infrastructure::manifest_store::FilesystemManifestStore::new(dir.path());
        let request = StatusRequest {
            job_id: "20260728-alice-0001".to_string(),
            gc: false,
        };
        let report = status(request, &store, None, &BTreeMap::new()).await.unwrap();
        assert!(report.manifest.is_none());
        assert!(render_table(&report).contains("not found"));
    }

    #[tokio::test]
    async fn status_of_a_known_job_reports_its_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::infrastructure::manifest_store::FilesystemManifestStore::new(dir.path());
        let job_id = JobId::new(Utc::now().date_naive(), "alice", 1).unwrap();
        let manifest = Manifest::new(job_id.clone(), Workflow::Transcribe.stage_set(), Utc::now());
        store.save(&manifest).await.unwrap();

        let request = StatusRequest {
            job_id: job_id.as_str().to_string(),
            gc: false,
        };
        let report = status(request, &store, None, &BTreeMap::new()).await.unwrap();
        assert!(report.manifest.is_some());
    }
}
