// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Job directory layout helpers (spec §3 "Artifact layout", bit-exact).
//!
//! Every stage reads only from `<= its own ordinal` directories and
//! writes only into its own directory plus `logs/`; these path helpers
//! are the single place that encodes that contract so the executor and
//! the preparer can't drift apart on it. The actual file names for a
//! stage's outputs (which vary per job for translation/subtitles/mux)
//! come from [`subforge_domain::stage_catalog::StageDescriptor::outputs`];
//! this module only knows directory shape, not file naming.

use std::path::{Path, PathBuf};
use subforge_domain::value_objects::StageName;

/// Handle on a job's directory, deriving every artifact path from the
/// job root.
#[derive(Debug, Clone)]
pub struct JobDir {
    root: PathBuf,
}

impl JobDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_json(&self) -> PathBuf {
        self.root.join("job.json")
    }

    pub fn manifest_json(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    pub fn env_snapshot(&self) -> PathBuf {
        self.root.join("config").join("env.snapshot")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.root.join("media")
    }

    /// The directory a single stage owns (`<ordinal>_<stage>/`).
    pub fn stage_dir(&self, stage: StageName) -> PathBuf {
        self.root.join(stage.dir_name())
    }

    /// The primary output path a stage produces within its own directory
    /// (spec §3 stage catalog `outputs`).
    pub fn stage_output(&self, stage: StageName, file_name: &str) -> PathBuf {
        self.stage_dir(stage).join(file_name)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// The log file path for one run of one stage, named
    /// `<ordinal>_<stage>_<timestamp>.log`.
    pub fn stage_log(&self, stage: StageName, timestamp: &str) -> PathBuf {
        self.logs_dir()
            .join(format!("{:02}_{}_{}.log", stage.ordinal(), stage.as_str(), timestamp))
    }

    /// All directories that must exist before `prepare` finishes: the
    /// job root, its media dir, config dir, logs dir, and one directory
    /// per catalog stage.
    pub fn all_directories(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.root.clone(), self.media_dir(), self.root.join("config"), self.logs_dir()];
        dirs.extend(StageName::ALL.iter().map(|stage| self.stage_dir(*stage)));
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_dir_matches_the_documented_layout() {
        let job_dir = JobDir::new("/out/20260728-alice-0007");
        assert_eq!(
            job_dir.stage_dir(StageName::Asr),
            PathBuf::from("/out/20260728-alice-0007/04_asr")
        );
    }

    #[test]
    fn all_directories_covers_every_catalog_stage() {
        let job_dir = JobDir::new("/out/job");
        let dirs = job_dir.all_directories();
        assert_eq!(dirs.len(), 4 + StageName::ALL.len());
    }

    #[test]
    fn stage_log_embeds_ordinal_and_name() {
        let job_dir = JobDir::new("/out/job");
        let log_path = job_dir.stage_log(StageName::Mux, "20260728T120000Z");
        assert_eq!(log_path, PathBuf::from("/out/job/logs/08_mux_20260728T120000Z.log"));
    }
}
