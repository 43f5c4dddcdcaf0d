// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Job preparer use case (C5, spec §4.5).

use crate::infrastructure::job_dir::JobDir;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use subforge_domain::entities::job_record::JobRecord;
use subforge_domain::entities::manifest::Manifest;
use subforge_domain::error::OrchestratorError;
use subforge_domain::repositories::ManifestRepository;
use subforge_domain::services::process_launcher::{LaunchSpec, ProcessLauncher};
use subforge_domain::services::runtime_registry::RuntimeRegistry;
use subforge_domain::value_objects::clip_range::ClipRange;
use subforge_domain::value_objects::job_id::JobId;
use subforge_domain::value_objects::language_code::LanguageCode;
use subforge_domain::value_objects::runtime_name::{RuntimeName, UTILITY_RUNTIME};
use subforge_domain::value_objects::workflow::Workflow;

/// Budget for the clip transcode; generous because it only ever spans a
/// few minutes of source media (spec §4.5 "smoke test" use case), never
/// the whole file.
const CLIP_TRANSCODE_TIMEOUT_SECS: u64 = 600;

pub struct PrepareRequest {
    pub input: PathBuf,
    pub workflow: String,
    pub source_language: Option<String>,
    pub target_languages: Vec<String>,
    pub user_id: String,
    pub clip_range: Option<(f64, f64)>,
}

pub struct PrepareOutcome {
    pub job_id: JobId,
    pub job_dir: PathBuf,
    pub run_command: String,
}

/// Picks the next monotonic sequence for `user_id` on `date` by scanning
/// existing job directory names under `workdir_root` (spec §4.5: `NNNN`
/// monotonic per user-day).
fn next_sequence(workdir_root: &Path, date: chrono::NaiveDate, user_id: &str) -> u32 {
    let prefix = format!("{}-{}-", date.format("%Y%m%d"), user_id);
    let Ok(entries) = std::fs::read_dir(workdir_root) else {
        return 1;
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| name.strip_prefix(&prefix).map(|s| s.to_string()))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .map(|highest| highest + 1)
        .unwrap_or(1)
}

pub async fn prepare(
    request: PrepareRequest,
    workdir_root: &Path,
    manifest_store: Arc<dyn ManifestRepository>,
    runtime_registry: Arc<dyn RuntimeRegistry>,
    process_launcher: Arc<dyn ProcessLauncher>,
) -> Result<PrepareOutcome, OrchestratorError> {
    if !request.input.exists() {
        return Err(OrchestratorError::InputInvalid(format!(
            "source media '{}' does not exist or is not readable",
            request.input.display()
        )));
    }

    let workflow: Workflow = request.workflow.parse()?;
    let source_language = request.source_language.map(LanguageCode::new).transpose()?;
    let target_languages = request
        .target_languages
        .into_iter()
        .map(LanguageCode::new)
        .collect::<Result<Vec<_>, _>>()?;
    let clip_range = request.clip_range.map(|(start, end)| ClipRange::new(start, end)).transpose()?;

    let now = Utc::now();
    let date = now.date_naive();
    let sequence = next_sequence(workdir_root, date, &request.user_id);
    let job_id = JobId::new(date, &request.user_id, sequence)?;

    let job = JobRecord::new(
        job_id.clone(),
        workflow,
        source_language,
        request.input.clone(),
        target_languages,
        clip_range,
        now,
        &request.user_id,
    )?;

    let job_dir = JobDir::new(workdir_root.join(job_id.as_str()));
    for dir in job_dir.all_directories() {
        tokio::fs::create_dir_all(&dir).await?;
    }

    let basename = request
        .input
        .file_name()
        .ok_or_else(|| OrchestratorError::InputInvalid("source media path has no file name".to_string()))?;
    let media_dest = job_dir.media_dir().join(basename);

    match clip_range {
        Some(range) => transcode_clip(&runtime_registry, &process_launcher, &request.input, &media_dest, range).await?,
        None => {
            tokio::fs::copy(&request.input, &media_dest).await?;
        }
    }

    tokio::fs::write(job_dir.job_json(), serde_json::to_string_pretty(&job)?).await?;

    let manifest = Manifest::new(job_id.clone(), workflow.stage_set(), now);
    manifest_store.save(&manifest).await?;

    let run_command = format!("subforge run {}", job_id);
    Ok(PrepareOutcome {
        job_id,
        job_dir: job_dir.root().to_path_buf(),
        run_command,
    })
}

/// Transcodes just `range` of `source` into `dest`, via the utility
/// runtime's ffmpeg wrapper (spec §4.5: "if clip range given, transcode
/// just that span into `media/<basename>`").
async fn transcode_clip(
    runtime_registry: &Arc<dyn RuntimeRegistry>,
    process_launcher: &Arc<dyn ProcessLauncher>,
    source: &Path,
    dest: &Path,
    range: ClipRange,
) -> Result<(), OrchestratorError> {
    let utility = RuntimeName::new(UTILITY_RUNTIME)?;
    let descriptor = runtime_registry.resolve(&utility).await?;
    let executable = descriptor
        .executable_path
        .ok_or_else(|| OrchestratorError::RuntimeUnavailable(format!("runtime '{utility}' has no resolved executable")))?;

    let (start, end) = range.as_ffmpeg_args();
    let working_dir = dest
        .parent()
        .ok_or_else(|| OrchestratorError::Internal("clip destination has no parent directory".to_string()))?
        .to_path_buf();

    let spec = LaunchSpec {
        executable,
        args: vec![
            "-y".to_string(),
            "-ss".to_string(),
            start,
            "-to".to_string(),
            end,
            "-i".to_string(),
            source.display().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            dest.display().to_string(),
        ],
        working_dir,
        env: Default::default(),
        timeout: Duration::from_secs(CLIP_TRANSCODE_TIMEOUT_SECS),
    };

    let outcome = process_launcher.launch(spec).await?;
    if outcome.timed_out {
        return Err(OrchestratorError::Timeout("clip transcode".to_string()));
    }
    match outcome.exit_code {
        Some(0) => Ok(()),
        code => Err(OrchestratorError::SubprocessFailed {
            stage: "clip transcode".to_string(),
            exit_code: code,
            detail: format!("see {}", outcome.log_path.display()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::manifest_store::FilesystemManifestStore;
    use async_trait::async_trait;
    use subforge_domain::entities::runtime_descriptor::RuntimeDescriptor;

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
        async fn launch(&self, _spec: LaunchSpec) -> Result<subforge_domain::services::process_launcher::LaunchOutcome, OrchestratorError> {
            panic!("clip_range is None in these tests; launch should not be called")
        }
    }

    fn deps() -> (Arc<dyn RuntimeRegistry>, Arc<dyn ProcessLauncher>) {
        (Arc::new(NeverResolves), Arc::new(NeverLaunches))
    }

    #[tokio::test]
    async fn prepare_rejects_nonexistent_media() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ManifestRepository> = Arc::new(FilesystemManifestStore::new(dir.path()));
        let request = PrepareRequest {
            input: dir.path().join("missing.mp4"),
            workflow: "transcribe".to_string(),
            source_language: None,
            target_languages: vec![],
            user_id: "alice".to_string(),
            clip_range: None,
        };
        let (runtime_registry, process_launcher) = deps();
        let result = prepare(request, dir.path(), store, runtime_registry, process_launcher).await;
        assert!(matches!(result, Err(OrchestratorError::InputInvalid(_))));
    }

    #[tokio::test]
    async fn prepare_creates_job_directory_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("a.mp4");
        tokio::fs::write(&media, b"fake media bytes").await.unwrap();
        let store: Arc<dyn ManifestRepository> = Arc::new(FilesystemManifestStore::new(dir.path()));

        let request = PrepareRequest {
            input: media,
            workflow: "transcribe".to_string(),
            source_language: Some("en".to_string()),
            target_languages: vec![],
            user_id: "alice".to_string(),
            clip_range: None,
        };
        let (runtime_registry, process_launcher) = deps();
        let outcome = prepare(request, dir.path(), store, runtime_registry, process_launcher).await.unwrap();

        assert!(outcome.job_dir.join("job.json").exists());
        assert!(outcome.job_dir.join("manifest.json").exists());
    }

    #[tokio::test]
    async fn prepare_rejects_empty_target_languages_for_translate() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("a.mp4");
        tokio::fs::write(&media, b"fake media bytes").await.unwrap();
        let store: Arc<dyn ManifestRepository> = Arc::new(FilesystemManifestStore::new(dir.path()));

        let request = PrepareRequest {
            input: media,
            workflow: "translate".to_string(),
            source_language: None,
            target_languages: vec![],
            user_id: "alice".to_string(),
            clip_range: None,
        };
        let (runtime_registry, process_launcher) = deps();
        let result = prepare(request, dir.path(), store, runtime_registry, process_launcher).await;
        assert!(result.is_err());
    }
}
