// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Port for executing one stage end-to-end (spec §4.8): cache lookup,
//! input validation, subprocess launch via [`crate::services::process_launcher::ProcessLauncher`],
//! output validation, and cache population.
//!
//! This mirrors the teacher's split between the domain-level
//! `StageExecutor` trait and its infrastructure implementation: the
//! driver in the application layer depends only on this trait, so the
//! concrete subprocess/cache/runtime wiring can change without touching
//! pipeline-driving logic.

use crate::entities::job_record::JobRecord;
use crate::entities::resolved_params::ResolvedParams;
use crate::error::OrchestratorError;
use crate::value_objects::stage_name::StageName;
use async_trait::async_trait;
use std::path::Path;

/// Result of running (or skipping) one stage.
#[derive(Debug, Clone)]
pub enum StageOutcome {
    Succeeded {
        resolved_params: ResolvedParams,
        cache_hit: bool,
        /// File names (relative to the stage's own directory) actually
        /// written, per [`crate::stage_catalog::StageDescriptor::outputs`]
        /// (spec §3 "Manifest" `produced_artifacts`).
        produced_artifacts: Vec<String>,
        /// How many subprocess attempts this stage took, 1 if it
        /// succeeded on the first try (spec §4.8 step 7 retry policy).
        attempts: u32,
    },
    Skipped {
        reason: String,
    },
    /// The terminal error plus how many attempts were made before giving
    /// up.
    Failed(OrchestratorError, u32),
}

#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Executes `stage` for `job`, reading/writing the job directory
    /// rooted at `job_dir`. Never panics on a stage failure: failures are
    /// returned as [`StageOutcome::Failed`] so the driver can record them
    /// in the manifest and decide whether to continue.
    async fn execute(&self, job: &JobRecord, stage: StageName, job_dir: &Path) -> StageOutcome;
}
