// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Run use case: loads a prepared job and drives it through the
//! pipeline (spec §4.9), wiring the driver to the process's
//! cancellation token.

use crate::driver::{Driver, DriverResult, RunOptions};
use crate::infrastructure::job_dir::JobDir;
use std::path::Path;
use std::sync::Arc;
use subforge_bootstrap::shutdown::CancellationToken;
use subforge_domain::entities::job_record::JobRecord;
use subforge_domain::error::OrchestratorError;
use subforge_domain::repositories::ManifestRepository;
use subforge_domain::services::stage_executor::StageExecutor;
use subforge_domain::value_objects::job_id::JobId;
use subforge_domain::value_objects::stage_name::StageName;

pub struct RunRequest {
    pub job_id: String,
    pub restart: Option<String>,
    pub stages: Vec<String>,
    pub dry_run: bool,
}

pub async fn run(
    request: RunRequest,
    workdir_root: &Path,
    manifest_store: Arc<dyn ManifestRepository>,
    stage_executor: Arc<dyn StageExecutor>,
    cancellation: CancellationToken,
) -> Result<DriverResult, OrchestratorError> {
    let job_id = JobId::parse(&request.job_id)?;
    let job_dir = JobDir::new(workdir_root.join(job_id.as_str()));

    if !manifest_store.exists(&job_id).await? {
        return Err(OrchestratorError::NotFound(format!("job '{job_id}' has no manifest")));
    }

    let job_json = tokio::fs::read_to_string(job_dir.job_json())
        .await
        .map_err(|_| OrchestratorError::NotFound(format!("job '{job_id}' has no job.json")))?;
    let job: JobRecord = serde_json::from_str(&job_json)?;

    let restart = request.restart.as_deref().map(str::parse).transpose()?;
    let stage_subset = request.stages.iter().map(|s| s.parse()).collect::<Result<Vec<StageName>, _>>()?;

    let options = RunOptions {
        restart,
        stage_subset,
        dry_run: request.dry_run,
    };

    let driver = Driver::new(manifest_store, stage_executor);
    driver.run(&job, job_dir.root(), options, cancellation).await
}
