// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Pipeline driver (C9, spec §4.9): the sequential stage-catalog walk
//! that owns a job's manifest for the lifetime of one `run` invocation.

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use subforge_bootstrap::shutdown::CancellationToken;
use subforge_domain::entities::job_record::JobRecord;
use subforge_domain::entities::manifest::{Manifest, StageStatus};
use subforge_domain::error::OrchestratorError;
use subforge_domain::repositories::ManifestRepository;
use subforge_domain::services::stage_executor::{StageExecutor, StageOutcome};
use subforge_domain::value_objects::stage_name::StageName;

/// What the caller asked `run` to do, already validated (spec §4.9
/// "options").
pub struct RunOptions {
    pub restart: Option<StageName>,
    pub stage_subset: Vec<StageName>,
    pub dry_run: bool,
}

/// One stage's fate for this run, reported back to the CLI summary.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: StageName,
    pub outcome: &'static str,
    pub cache_hit: bool,
}

/// Outcome of one `run` invocation.
#[derive(Debug, Clone)]
pub struct DriverResult {
    pub reports: Vec<StageReport>,
    pub failed_stage: Option<StageName>,
    pub interrupted: bool,
}

pub struct Driver {
    manifest_store: Arc<dyn ManifestRepository>,
    stage_executor: Arc<dyn StageExecutor>,
}

impl Driver {
    pub fn new(manifest_store: Arc<dyn ManifestRepository>, stage_executor: Arc<dyn StageExecutor>) -> Self {
        Self {
            manifest_store,
            stage_executor,
        }
    }

    /// Whether `stage` should run this invocation (spec §4.9 step 3).
    fn should_run(active: &[StageName], options: &RunOptions, manifest: &Manifest, stage: StageName) -> bool {
        if !active.contains(&stage) {
            return false;
        }
        if !options.stage_subset.is_empty() && !options.stage_subset.contains(&stage) {
            return false;
        }
        let already_succeeded = manifest.stage(stage).map(|e| e.status == StageStatus::Succeeded).unwrap_or(false);
        if already_succeeded {
            let restarting_from_here_or_before = options.restart.is_some_and(|from| from.ordinal() <= stage.ordinal());
            return restarting_from_here_or_before;
        }
        true
    }

    pub async fn run(
        &self,
        job: &JobRecord,
        job_dir: &Path,
        options: RunOptions,
        cancellation: CancellationToken,
    ) -> Result<DriverResult, OrchestratorError> {
        let mut manifest = self.manifest_store.load(&job.job_id).await?;

        if let Some(from) = options.restart {
            manifest.restart_from(from, Utc::now());
            self.manifest_store.save(&manifest).await?;
        }

        let active = job.workflow.stage_set();
        let mut reports = Vec::new();

        for stage in StageName::ALL {
            if cancellation.is_cancelled() {
                return Ok(DriverResult {
                    reports,
                    failed_stage: None,
                    interrupted: true,
                });
            }

            if !Self::should_run(active, &options, &manifest, stage) {
                continue;
            }

            if options.dry_run {
                reports.push(StageReport {
                    stage,
                    outcome: "would_run",
                    cache_hit: false,
                });
                continue;
            }

            manifest.transition(stage, StageStatus::Running, Utc::now())?;
            self.manifest_store.save(&manifest).await?;

            let outcome = tokio::select! {
                outcome = self.stage_executor.execute(job, stage, job_dir) => outcome,
                _ = cancellation.cancelled() => StageOutcome::Failed(OrchestratorError::Interrupted(stage.to_string()), 0),
            };

            match outcome {
                StageOutcome::Succeeded {
                    resolved_params,
                    cache_hit,
                    produced_artifacts,
                    attempts,
                } => {
                    manifest.mark_succeeded(stage, resolved_params, cache_hit, produced_artifacts, attempts, Utc::now())?;
                    self.manifest_store.save(&manifest).await?;
                    reports.push(StageReport {
                        stage,
                        outcome: "succeeded",
                        cache_hit,
                    });
                }
                StageOutcome::Skipped { reason: _ } => {
                    manifest.transition(stage, StageStatus::Skipped, Utc::now())?;
                    self.manifest_store.save(&manifest).await?;
                    reports.push(StageReport {
                        stage,
                        outcome: "skipped",
                        cache_hit: false,
                    });
                }
                StageOutcome::Failed(error, attempts) => {
                    let interrupted = matches!(error, OrchestratorError::Interrupted(_));
                    manifest.mark_failed(stage, &error, attempts, Utc::now())?;
                    self.manifest_store.save(&manifest).await?;
                    reports.push(StageReport {
                        stage,
                        outcome: "failed",
                        cache_hit: false,
                    });
                    return Ok(DriverResult {
                        reports,
                        failed_stage: Some(stage),
                        interrupted,
                    });
                }
            }
        }

        Ok(DriverResult {
            reports,
            failed_stage: None,
            interrupted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use subforge_bootstrap::shutdown::ShutdownCoordinator;
    use subforge_domain::entities::resolved_params::ResolvedParams;
    use subforge_domain::value_objects::device::{Device, Precision};
    use subforge_domain::value_objects::job_id::JobId;
    use subforge_domain::value_objects::workflow::Workflow;

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

    fn job_id() -> JobId {
        JobId::new(NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(), "alice", 1).unwrap()
    }

    fn job() -> JobRecord {
        JobRecord::new(job_id(), Workflow::Transcribe, None, "/media/a.mp4".into(), vec![], None, Utc::now(), "alice").unwrap()
    }

    #[tokio::test]
    async fn resume_of_a_fully_succeeded_job_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ManifestRepository> = Arc::new(crate::infrastructure::manifest_store::FilesystemManifestStore::new(dir.path()));
        let mut manifest = Manifest::new(job_id(), Workflow::Transcribe.stage_set(), Utc::now());
        for stage in Workflow::Transcribe.stage_set() {
            manifest.transition(*stage, StageStatus::Running, Utc::now()).unwrap();
            manifest
                .mark_succeeded(*stage, ResolvedParams::new(Device::Cpu, Precision::Int8, 1, 60), false, vec![], 1, Utc::now())
                .unwrap();
        }
        store.save(&manifest).await.unwrap();

        let driver = Driver::new(store, Arc::new(AlwaysSucceeds));
        let options = RunOptions {
            restart: None,
            stage_subset: vec![],
            dry_run: false,
        };
        let coordinator = ShutdownCoordinator::default();
        let result = driver.run(&job(), dir.path(), options, coordinator.token()).await.unwrap();

        assert!(result.reports.is_empty());
        assert!(result.failed_stage.is_none());
    }
}
