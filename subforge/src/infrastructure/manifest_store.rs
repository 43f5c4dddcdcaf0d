// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Durable manifest store (C6, spec §3 "Manifest" durability note, §4.6).
//!
//! `manifest.json` is written with the same write-temp / fsync / atomic
//! rename protocol used elsewhere in this codebase for crash-safe files,
//! guarded by an `fs2` advisory lock so a concurrent `status` read never
//! observes a half-written file. On load, a manifest whose only `running`
//! stage never finished is recovered to `failed` (spec §5: an interrupted
//! run leaves at most one dangling `running` entry).

use async_trait::async_trait;
use chrono::Utc;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;
use subforge_domain::entities::manifest::{Manifest, StageStatus};
use subforge_domain::error::OrchestratorError;
use subforge_domain::repositories::ManifestRepository;
use subforge_domain::value_objects::job_id::JobId;

pub struct FilesystemManifestStore {
    workdir_root: PathBuf,
}

impl FilesystemManifestStore {
    pub fn new(workdir_root: impl Into<PathBuf>) -> Self {
        Self {
            workdir_root: workdir_root.into(),
        }
    }

    fn manifest_path(&self, job_id: &JobId) -> PathBuf {
        self.workdir_root.join(job_id.as_str()).join("manifest.json")
    }

    fn lock_path(&self, job_id: &JobId) -> PathBuf {
        self.workdir_root.join(job_id.as_str()).join("manifest.json.lock")
    }
}

/// Reading and writing take an advisory lock synchronously (`fs2` has no
/// async API); the blocking work is short enough that spawning it onto
/// tokio's blocking pool would cost more than it saves, so callers pay a
/// small amount of non-async time inside the async fn.
fn read_locked(path: &std::path::Path, lock_path: &std::path::Path) -> Result<Option<String>, OrchestratorError> {
    if !path.exists() {
        return Ok(None);
    }
    let lock_file = OpenOptions::new().create(true).write(true).open(lock_path)?;
    lock_file.lock_shared().map_err(|e| OrchestratorError::Io(format!("locking manifest: {e}")))?;
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;
    FileExt::unlock(&lock_file).map_err(|e| OrchestratorError::Io(format!("unlocking manifest: {e}")))?;
    Ok(Some(contents))
}

fn write_locked(path: &std::path::Path, lock_path: &std::path::Path, contents: &str) -> Result<(), OrchestratorError> {
    let parent = path.parent().ok_or_else(|| OrchestratorError::Io("manifest path has no parent".to_string()))?;
    std::fs::create_dir_all(parent)?;

    let lock_file = OpenOptions::new().create(true).write(true).open(lock_path)?;
    lock_file.lock_exclusive().map_err(|e| OrchestratorError::Io(format!("locking manifest: {e}")))?;

    let tmp_path = path.with_extension("json.tmp");
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(contents.as_bytes())?;
    tmp_file.sync_all()?;
    std::fs::rename(&tmp_path, path)?;

    FileExt::unlock(&lock_file).map_err(|e| OrchestratorError::Io(format!("unlocking manifest: {e}")))?;
    Ok(())
}

#[async_trait]
impl ManifestRepository for FilesystemManifestStore {
    async fn load(&self, job_id: &JobId) -> Result<Manifest, OrchestratorError> {
        let path = self.manifest_path(job_id);
        let lock_path = self.lock_path(job_id);
        let contents = read_locked(&path, &lock_path)?
            .ok_or_else(|| OrchestratorError::NotFound(format!("manifest for job '{job_id}' does not exist")))?;

        let mut manifest: Manifest = serde_json::from_str(&contents)
            .map_err(|e| OrchestratorError::ManifestCorrupt(format!("job '{job_id}': {e}")))?;

        if let Some(running) = manifest.running_stage() {
            let error = OrchestratorError::Interrupted(format!("stage '{running}' was running when the process exited"));
            let attempts = manifest.stage(running).map(|entry| entry.attempts).unwrap_or(0);
            manifest
                .mark_failed(running, &error, attempts, Utc::now())
                .map_err(|e| OrchestratorError::ManifestCorrupt(format!("recovering interrupted stage: {e}")))?;
            self.save(&manifest).await?;
        }

        Ok(manifest)
    }

    async fn save(&self, manifest: &Manifest) -> Result<(), OrchestratorError> {
        let path = self.manifest_path(&manifest.job_id);
        let lock_path = self.lock_path(&manifest.job_id);
        let contents = serde_json::to_string_pretty(manifest)?;
        write_locked(&path, &lock_path, &contents)
    }

    async fn exists(&self, job_id: &JobId) -> Result<bool, OrchestratorError> {
        Ok(self.manifest_path(job_id).exists())
    }
}
