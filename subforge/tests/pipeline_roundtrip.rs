// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end `prepare` -> `run` -> `status` round-trip, stubbing out the
//! stage executor so the test never shells out to a real media runtime.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use subforge::application::{prepare, run, status, PrepareRequest, RunRequest, StatusRequest};
use subforge::infrastructure::manifest_store::FilesystemManifestStore;
use subforge_bootstrap::shutdown::ShutdownCoordinator;
use subforge_domain::entities::job_record::JobRecord;
use subforge_domain::entities::manifest::StageStatus;
use subforge_domain::entities::resolved_params::ResolvedParams;
use subforge_domain::entities::runtime_descriptor::RuntimeDescriptor;
use subforge_domain::error::OrchestratorError;
use subforge_domain::repositories::ManifestRepository;
use subforge_domain::services::process_launcher::{LaunchOutcome, LaunchSpec, ProcessLauncher};
use subforge_domain::services::runtime_registry::RuntimeRegistry;
use subforge_domain::services::stage_executor::{StageExecutor, StageOutcome};
use subforge_domain::value_objects::device::{Device, Precision};
use subforge_domain::value_objects::runtime_name::RuntimeName;
use subforge_domain::value_objects::stage_name::StageName;

struct AlwaysSucceeds;

#[async_trait]
impl StageExecutor for AlwaysSucceeds {
    async fn execute(&self, _job: &JobRecord, _stage: StageName, _job_dir: &Path) -> StageOutcome {
        StageOutcome::Succeeded {
            resolved_params: ResolvedParams::new(Device::Cpu, Precision::Int8, 1, 60),
            cache_hit: false,
            produced_artifacts: vec![],
            attempts: 1,
        }
    }
}

struct NeverResolves;

#[async_trait]
impl RuntimeRegistry for NeverResolves {
    async fn resolve(&self, name: &RuntimeName) -> Result<RuntimeDescriptor, OrchestratorError> {
        Ok(RuntimeDescriptor::missing(name.clone()))
    }
}

struct NeverLaunches;

#[async_trait]
impl ProcessLauncher for NeverLaunches {
    async fn launch(&self, _spec: LaunchSpec) -> Result<LaunchOutcome, OrchestratorError> {
        panic!("clip_range is None in these tests; launch should not be called")
    }
}

#[tokio::test]
async fn prepare_then_run_then_status_reports_a_fully_succeeded_job() {
    let workdir = tempfile::tempdir().unwrap();
    let media = workdir.path().join("source.mp4");
    tokio::fs::write(&media, b"not really a video").await.unwrap();

    let manifest_store: Arc<dyn ManifestRepository> = Arc::new(FilesystemManifestStore::new(workdir.path()));

    let prepare_request = PrepareRequest {
        input: media,
        workflow: "transcribe".to_string(),
        source_language: None,
        target_languages: vec![],
        user_id: "alice".to_string(),
        clip_range: None,
    };
    let outcome = prepare(
        prepare_request,
        workdir.path(),
        manifest_store.clone(),
        Arc::new(NeverResolves),
        Arc::new(NeverLaunches),
    )
    .await
    .unwrap();
    assert!(outcome.job_dir.join("job.json").exists());
    assert!(outcome.job_dir.join("manifest.json").exists());

    let run_request = RunRequest {
        job_id: outcome.job_id.as_str().to_string(),
        restart: None,
        stages: vec![],
        dry_run: false,
    };
    let coordinator = ShutdownCoordinator::default();
    let run_result = run(
        run_request,
        workdir.path(),
        manifest_store.clone(),
        Arc::new(AlwaysSucceeds),
        coordinator.token(),
    )
    .await
    .unwrap();
    assert!(run_result.failed_stage.is_none());
    assert!(!run_result.interrupted);

    let status_request = StatusRequest {
        job_id: outcome.job_id.as_str().to_string(),
        gc: false,
    };
    let report = status(status_request, manifest_store.as_ref(), None, &Default::default())
        .await
        .unwrap();
    let manifest = report.manifest.expect("a prepared and run job must have a manifest");
    assert!(manifest.is_complete());
    for entry in &manifest.stages {
        assert_eq!(entry.status, StageStatus::Succeeded);
    }

    let table = subforge::application::render_table(&report);
    assert!(table.contains(outcome.job_id.as_str()));
}

#[tokio::test]
async fn restarting_from_a_mid_pipeline_stage_only_reruns_the_tail() {
    let workdir = tempfile::tempdir().unwrap();
    let media = workdir.path().join("source.mp4");
    tokio::fs::write(&media, b"not really a video").await.unwrap();

    let manifest_store: Arc<dyn ManifestRepository> = Arc::new(FilesystemManifestStore::new(workdir.path()));

    let prepare_request = PrepareRequest {
        input: media,
        workflow: "transcribe".to_string(),
        source_language: None,
        target_languages: vec![],
        user_id: "bob".to_string(),
        clip_range: None,
    };
    let outcome = prepare(
        prepare_request,
        workdir.path(),
        manifest_store.clone(),
        Arc::new(NeverResolves),
        Arc::new(NeverLaunches),
    )
    .await
    .unwrap();

    let coordinator = ShutdownCoordinator::default();
    run(
        RunRequest {
            job_id: outcome.job_id.as_str().to_string(),
            restart: None,
            stages: vec![],
            dry_run: false,
        },
        workdir.path(),
        manifest_store.clone(),
        Arc::new(AlwaysSucceeds),
        coordinator.token(),
    )
    .await
    .unwrap();

    let second = run(
        RunRequest {
            job_id: outcome.job_id.as_str().to_string(),
            restart: Some("asr".to_string()),
            stages: vec![],
            dry_run: false,
        },
        workdir.path(),
        manifest_store,
        Arc::new(AlwaysSucceeds),
        coordinator.token(),
    )
    .await
    .unwrap();

    let reran: Vec<_> = second.reports.iter().map(|r| r.stage).collect();
    assert!(reran.contains(&StageName::Asr));
    assert!(!reran.contains(&StageName::Demux));
}
