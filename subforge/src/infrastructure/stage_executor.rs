// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Stage executor (C8, spec §4.8): the algorithm that runs one stage
//! from declared-input validation through cache population, wiring
//! together the runtime registry, process launcher, and cache
//! repository ports.

use crate::infrastructure::job_dir::JobDir;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use subforge_domain::entities::cache_entry::CacheEntry;
use subforge_domain::entities::job_record::JobRecord;
use subforge_domain::entities::resolved_params::ResolvedParams;
use subforge_domain::error::OrchestratorError;
use subforge_domain::services::cache_keys;
use subforge_domain::services::parameter_resolver::{resolve as resolve_params, ResolverInputs, StageParamOverrides};
use subforge_domain::services::process_launcher::{LaunchSpec, ProcessLauncher};
use subforge_domain::services::runtime_registry::RuntimeRegistry;
use subforge_domain::services::stage_executor::{StageExecutor, StageOutcome};
use subforge_domain::repositories::CacheRepository;
use subforge_domain::stage_catalog;
use subforge_domain::value_objects::cache_layer::CacheLayer;
use subforge_domain::value_objects::capability::CapabilityRecord;
use subforge_domain::value_objects::device::Device;
use subforge_domain::value_objects::runtime_name::{RuntimeName, UTILITY_RUNTIME};
use subforge_domain::value_objects::stage_name::StageName;

/// Degraded retries the executor attempts before giving up, on top of
/// the initial attempt (spec §4.8 step 7: halve batch_size, then halve
/// chunk_duration, then fall back to CPU).
const MAX_DEGRADED_RETRIES: u32 = 3;

/// Runtime name this stage needs, before any device/language suffix is
/// applied. Stages that drive the always-present utility wrapper
/// (ffmpeg, the subtitle formatter) still resolve the utility runtime so
/// a missing `util` install is caught the same way a missing named
/// runtime would be.
fn base_runtime_name(stage: StageName, device: Device) -> String {
    match stage {
        StageName::Demux | StageName::Subtitles | StageName::Mux => UTILITY_RUNTIME.to_string(),
        StageName::SourceSeparation => "source_separation".to_string(),
        StageName::Vad => "vad".to_string(),
        StageName::Asr => match device {
            Device::Cuda | Device::Metal => "asr_gpu".to_string(),
            Device::Cpu => "asr_cpu".to_string(),
        },
        StageName::Alignment => "alignment".to_string(),
        StageName::Translation => "translate".to_string(),
    }
}

/// Cache layer backing this stage's primary output, if any (spec §4.7:
/// not every stage is cacheable).
fn cache_layer_for(stage: StageName) -> Option<CacheLayer> {
    match stage {
        StageName::Asr => Some(CacheLayer::Asr),
        StageName::Translation => Some(CacheLayer::Translation),
        _ => None,
    }
}

/// The immediately preceding active stage, whose primary output feeds
/// both input validation and, for cacheable stages, the content
/// fingerprint (spec §4.7 "ASR"/"translation" key formulas both start
/// from a content hash of their input).
fn predecessor_of(stage: StageName) -> Option<StageName> {
    if stage.ordinal() == 1 {
        None
    } else {
        Some(StageName::ALL[(stage.ordinal() - 2) as usize])
    }
}

/// Duration in seconds of the demuxed audio track, read straight from its
/// RIFF/WAVE header, feeding the chunking policy's `duration > 600s` rule
/// (spec §4.4). `None` if the file isn't there yet or isn't a PCM WAV with
/// a `fmt `/`data` chunk pair this reads.
fn probe_wav_duration_secs(path: &Path) -> Option<f64> {
    let data = std::fs::read(path).ok()?;
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return None;
    }

    let mut pos = 12;
    let mut sample_rate: u32 = 0;
    let mut channels: u16 = 0;
    let mut bits_per_sample: u16 = 0;
    let mut data_size: u32 = 0;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = u32::from_le_bytes(data[pos + 4..pos + 8].try_into().ok()?);
        let body_start = pos + 8;
        if body_start + chunk_size as usize > data.len() {
            break;
        }
        if chunk_id == b"fmt " && chunk_size >= 16 {
            channels = u16::from_le_bytes(data[body_start + 2..body_start + 4].try_into().ok()?);
            sample_rate = u32::from_le_bytes(data[body_start + 4..body_start + 8].try_into().ok()?);
            bits_per_sample = u16::from_le_bytes(data[body_start + 14..body_start + 16].try_into().ok()?);
        } else if chunk_id == b"data" {
            data_size = chunk_size;
        }
        pos = body_start + chunk_size as usize + (chunk_size as usize % 2);
    }

    if sample_rate == 0 || channels == 0 || bits_per_sample == 0 {
        return None;
    }
    let bytes_per_frame = u32::from(channels) * (u32::from(bits_per_sample) / 8);
    if bytes_per_frame == 0 {
        return None;
    }
    Some(f64::from(data_size) / f64::from(bytes_per_frame) / f64::from(sample_rate))
}

pub struct SubprocessStageExecutor {
    runtime_registry: Arc<dyn RuntimeRegistry>,
    process_launcher: Arc<dyn ProcessLauncher>,
    cache: Option<Arc<dyn CacheRepository>>,
    capability: CapabilityRecord,
    global_overrides: StageParamOverrides,
}

impl SubprocessStageExecutor {
    pub fn new(
        runtime_registry: Arc<dyn RuntimeRegistry>,
        process_launcher: Arc<dyn ProcessLauncher>,
        cache: Option<Arc<dyn CacheRepository>>,
        capability: CapabilityRecord,
        global_overrides: StageParamOverrides,
    ) -> Self {
        Self {
            runtime_registry,
            process_launcher,
            cache,
            capability,
            global_overrides,
        }
    }

    fn resolve_params(&self, audio_duration_secs: Option<f64>) -> ResolvedParams {
        resolve_params(ResolverInputs {
            capability: &self.capability,
            global_config: &self.global_overrides,
            env_overrides: &StageParamOverrides::default(),
            job_overrides: &StageParamOverrides::default(),
            audio_duration_secs,
        })
    }

    async fn validate_inputs(&self, stage: StageName, job: &JobRecord, job_dir: &JobDir) -> Result<(), OrchestratorError> {
        // Every stage after the first reads its immediate predecessor's
        // primary output; the first stage reads the job's own media copy.
        let required = match predecessor_of(stage) {
            Some(predecessor) => job_dir.stage_output(predecessor, &stage_catalog::describe(predecessor).primary_output(job)),
            None => job_dir.media_dir(),
        };
        if !required.exists() {
            return Err(OrchestratorError::InputMissing {
                stage: stage.to_string(),
                path: required.display().to_string(),
            });
        }
        Ok(())
    }

    /// Reads the predecessor stage's primary output and folds it with
    /// stage-specific context, plus the specific output file name, into
    /// the fingerprint used by the cache key (spec §4.7 ASR/translation
    /// key formulas). Keyed per output file rather than per stage so a
    /// multi-language translation job caches (and can partially hit) each
    /// target language independently, since `CacheEntry` holds exactly
    /// one artifact per key.
    async fn content_fingerprint(
        &self,
        stage: StageName,
        job: &JobRecord,
        job_dir: &JobDir,
        params: &ResolvedParams,
        output_name: &str,
    ) -> Result<String, OrchestratorError> {
        let predecessor = predecessor_of(stage).ok_or_else(|| {
            OrchestratorError::Internal(format!("stage '{stage}' is cacheable but has no predecessor to fingerprint"))
        })?;
        let predecessor_output = job_dir.stage_output(predecessor, &stage_catalog::describe(predecessor).primary_output(job));
        let content = tokio::fs::read(&predecessor_output).await.map_err(|e| OrchestratorError::InputMissing {
            stage: stage.to_string(),
            path: format!("{}: {e}", predecessor_output.display()),
        })?;
        let content_hash = cache_keys::fingerprint_bytes(&content);

        match stage {
            StageName::Asr => {
                let model_id = params.asr_model.as_deref().unwrap_or("unspecified");
                let language = job.source_language.as_ref().map(|l| l.as_str()).unwrap_or("auto");
                Ok(format!("{content_hash}|{model_id}|{language}|{output_name}"))
            }
            StageName::Translation => {
                let target_langs = job.target_languages.iter().map(|l| l.as_str()).collect::<Vec<_>>().join(",");
                Ok(format!("{content_hash}|{target_langs}|no-glossary|{output_name}"))
            }
            _ => Ok(format!("{content_hash}|{output_name}")),
        }
    }

    async fn run_subprocess(
        &self,
        stage: StageName,
        job_dir: &JobDir,
        runtime_name: &RuntimeName,
        params: &ResolvedParams,
    ) -> Result<(), OrchestratorError> {
        let descriptor = self.runtime_registry.resolve(runtime_name).await?;
        let executable = descriptor
            .executable_path
            .ok_or_else(|| OrchestratorError::RuntimeUnavailable(format!("runtime '{runtime_name}' has no resolved executable")))?;

        let mut env = BTreeMap::new();
        env.insert("SUBFORGE_JOB_DIR".to_string(), job_dir.root().display().to_string());
        env.insert("SUBFORGE_DEVICE".to_string(), params.device.to_string());
        env.insert("SUBFORGE_PRECISION".to_string(), params.precision.to_string());
        env.insert("SUBFORGE_BATCH_SIZE".to_string(), params.batch_size.to_string());
        if let Some(model) = &params.asr_model {
            env.insert("SUBFORGE_ASR_MODEL".to_string(), model.clone());
        }
        if let Some(chunk) = params.chunk_duration_secs {
            env.insert("SUBFORGE_CHUNK_DURATION_SECS".to_string(), chunk.to_string());
        }

        let spec = LaunchSpec {
            executable,
            args: vec![stage.as_str().to_string(), job_dir.root().display().to_string()],
            working_dir: job_dir.stage_dir(stage),
            env,
            timeout: Duration::from_secs(params.timeout_secs),
        };

        let outcome = self.process_launcher.launch(spec).await?;
        if outcome.timed_out {
            return Err(OrchestratorError::Timeout(stage.to_string()));
        }
        match outcome.exit_code {
            Some(0) => Ok(()),
            code => Err(OrchestratorError::SubprocessFailed {
                stage: stage.to_string(),
                exit_code: code,
                detail: format!("see {}", outcome.log_path.display()),
            }),
        }
    }

    fn verify_outputs(&self, stage: StageName, job_dir: &JobDir, job: &JobRecord) -> Result<Vec<String>, OrchestratorError> {
        let descriptor = stage_catalog::describe(stage);
        let outputs = descriptor.outputs(job);
        for name in &outputs {
            let path = job_dir.stage_output(stage, name);
            match std::fs::metadata(&path) {
                Ok(meta) if meta.len() > 0 => {}
                _ => {
                    return Err(OrchestratorError::OutputMissing {
                        stage: stage.to_string(),
                        path: path.display().to_string(),
                    })
                }
            }
        }
        Ok(outputs)
    }

    /// Removes a stage's own output directory and recreates it empty, so
    /// a retry never finds a partial output left behind by the previous
    /// attempt (spec §4.8 edge case).
    async fn clear_stage_dir(&self, job_dir: &JobDir, stage: StageName) -> Result<(), OrchestratorError> {
        let dir = job_dir.stage_dir(stage);
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        tokio::fs::create_dir_all(&dir).await?;
        Ok(())
    }

    async fn run_with_retries(&self, job: &JobRecord, stage: StageName, job_dir: &JobDir, mut params: ResolvedParams) -> StageOutcome {
        let runtime_name = match RuntimeName::new(base_runtime_name(stage, params.device)) {
            Ok(name) => name,
            Err(e) => return StageOutcome::Failed(e, 0),
        };

        let descriptor = stage_catalog::describe(stage);
        if descriptor.requires_named_runtime || stage == StageName::Demux || stage == StageName::Subtitles || stage == StageName::Mux {
            match self.runtime_registry.resolve(&runtime_name).await {
                Ok(resolved) if !resolved.availability.is_usable() && descriptor.skippable_without_runtime => {
                    return StageOutcome::Skipped {
                        reason: format!("runtime '{runtime_name}' unavailable"),
                    };
                }
                Ok(resolved) if !resolved.availability.is_usable() => {
                    return StageOutcome::Failed(OrchestratorError::RuntimeUnavailable(runtime_name.to_string()), 0);
                }
                Err(e) => return StageOutcome::Failed(e, 0),
                Ok(_) => {}
            }
        }

        let mut attempt = 1;
        loop {
            let runtime_name = match RuntimeName::new(base_runtime_name(stage, params.device)) {
                Ok(name) => name,
                Err(e) => return StageOutcome::Failed(e, attempt),
            };

            let result = self
                .run_subprocess(stage, job_dir, &runtime_name, &params)
                .await
                .and_then(|()| self.verify_outputs(stage, job_dir, job));

            match result {
                Ok(produced_artifacts) => {
                    return StageOutcome::Succeeded {
                        resolved_params: params,
                        cache_hit: false,
                        produced_artifacts,
                        attempts: attempt,
                    }
                }
                Err(error) if error.is_retryable() && attempt <= MAX_DEGRADED_RETRIES => {
                    if let Err(e) = self.clear_stage_dir(job_dir, stage).await {
                        return StageOutcome::Failed(e, attempt);
                    }
                    params = params.degrade(attempt);
                    attempt += 1;
                }
                Err(error) => return StageOutcome::Failed(error, attempt),
            }
        }
    }
}

#[async_trait]
impl StageExecutor for SubprocessStageExecutor {
    async fn execute(&self, job: &JobRecord, stage: StageName, job_dir: &Path) -> StageOutcome {
        let job_dir = JobDir::new(job_dir.to_path_buf());
        if let Err(e) = self.validate_inputs(stage, job, &job_dir).await {
            return StageOutcome::Failed(e, 0);
        }

        let demux = stage_catalog::describe(StageName::Demux);
        let audio_path = job_dir.stage_output(StageName::Demux, &demux.primary_output(job));
        let audio_duration_secs = probe_wav_duration_secs(&audio_path);

        let params = self.resolve_params(audio_duration_secs);
        let descriptor = stage_catalog::describe(stage);
        let outputs = descriptor.outputs(job);

        // One cache key per declared output file, since a multi-language
        // translation job must be able to hit for some target languages
        // and miss for others.
        let mut cache_keys_by_output = Vec::with_capacity(outputs.len());
        if self.cache.is_some() {
            if let Some(layer) = cache_layer_for(stage) {
                for name in &outputs {
                    let fingerprint = match self.content_fingerprint(stage, job, &job_dir, &params, name).await {
                        Ok(f) => f,
                        Err(e) => return StageOutcome::Failed(e, 0),
                    };
                    match cache_keys::compute_key(layer, &fingerprint, &params) {
                        Ok(key) => cache_keys_by_output.push((name.clone(), layer, key)),
                        Err(e) => return StageOutcome::Failed(OrchestratorError::Internal(e.to_string()), 0),
                    }
                }
            }
        }

        if let Some(cache) = &self.cache {
            if !cache_keys_by_output.is_empty() {
                let mut hit_all = true;
                let mut copied = Vec::new();
                for (name, layer, key) in &cache_keys_by_output {
                    match cache.lookup(*layer, key).await {
                        Ok(Some(entry)) => {
                            let dest = job_dir.stage_output(stage, name);
                            if tokio::fs::copy(&entry.artifact_path, &dest).await.is_ok() {
                                let _ = cache.touch(*layer, key).await;
                                copied.push(name.clone());
                            } else {
                                hit_all = false;
                                break;
                            }
                        }
                        Ok(None) => {
                            hit_all = false;
                            break;
                        }
                        Err(e) => return StageOutcome::Failed(e, 0),
                    }
                }
                if hit_all {
                    return StageOutcome::Succeeded {
                        resolved_params: params,
                        cache_hit: true,
                        produced_artifacts: copied,
                        attempts: 0,
                    };
                }
            }
        }

        let outcome = self.run_with_retries(job, stage, &job_dir, params).await;

        if let StageOutcome::Succeeded { .. } = &outcome {
            if let Some(cache) = &self.cache {
                for (name, layer, key) in &cache_keys_by_output {
                    let output = job_dir.stage_output(stage, name);
                    if let Ok(meta) = std::fs::metadata(&output) {
                        let entry = CacheEntry::new(*layer, key.clone(), output, meta.len(), Utc::now());
                        let _ = cache.insert(entry).await;
                    }
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asr_picks_gpu_runtime_on_cuda_device() {
        assert_eq!(base_runtime_name(StageName::Asr, Device::Cuda), "asr_gpu");
        assert_eq!(base_runtime_name(StageName::Asr, Device::Cpu), "asr_cpu");
    }

    #[test]
    fn only_asr_and_translation_are_cacheable() {
        assert!(cache_layer_for(StageName::Asr).is_some());
        assert!(cache_layer_for(StageName::Translation).is_some());
        assert!(cache_layer_for(StageName::Demux).is_none());
    }

    #[test]
    fn predecessor_of_demux_is_none() {
        assert_eq!(predecessor_of(StageName::Demux), None);
    }

    #[test]
    fn predecessor_of_asr_is_vad() {
        assert_eq!(predecessor_of(StageName::Asr), Some(StageName::Vad));
    }
}
