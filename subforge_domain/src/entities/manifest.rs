// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `manifest.json`: the durable record of one job's progress (spec §3
//! "Manifest", §5 state machine, §8 testable properties).
//!
//! The manifest is the orchestrator's only mutable durable state. Every
//! invariant the state machine promises is enforced here, in the domain,
//! so infrastructure only ever has to serialize an already-valid value —
//! it never has to re-derive "is this transition legal."

use crate::error::OrchestratorError;
use crate::entities::resolved_params::ResolvedParams;
use crate::value_objects::job_id::JobId;
use crate::value_objects::stage_name::StageName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stage's position in its own lifecycle (spec §5).
///
/// Ordinal values back [`StageStatus::can_transition_to`]; do not reorder
/// the variants without updating that table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl StageStatus {
    /// Terminal states cannot transition further except by explicit
    /// `--restart`, which resets the entry to `Pending` rather than going
    /// through this table (spec §5 "Restart" note).
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Succeeded | StageStatus::Failed | StageStatus::Skipped)
    }

    /// Whether `self -> next` is a legal in-run transition.
    pub fn can_transition_to(&self, next: StageStatus) -> bool {
        use StageStatus::*;
        matches!(
            (self, next),
            (Pending, Running) | (Pending, Skipped) | (Running, Succeeded) | (Running, Failed) | (Running, Skipped)
        )
    }
}

/// One row of the manifest's stage table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEntry {
    pub stage: StageName,
    pub status: StageStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub resolved_params: Option<ResolvedParams>,
    pub cache_hit: bool,
    /// Set only on `Failed`; the category tag from [`OrchestratorError::category`],
    /// kept separate from a free-text message so `status` can group failures.
    pub failure_category: Option<String>,
    pub failure_detail: Option<String>,
    /// Subprocess attempts made for this stage, including the one that
    /// finally succeeded or the one that gave up (spec §4.8 step 7).
    pub attempts: u32,
    /// File names this stage actually wrote, relative to its own
    /// directory (spec §3 "Manifest").
    pub produced_artifacts: Vec<String>,
}

impl StageEntry {
    pub fn pending(stage: StageName) -> Self {
        Self {
            stage,
            status: StageStatus::Pending,
            started_at: None,
            finished_at: None,
            resolved_params: None,
            cache_hit: false,
            failure_category: None,
            failure_detail: None,
            attempts: 0,
            produced_artifacts: Vec::new(),
        }
    }
}

/// The full durable record for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub job_id: JobId,
    pub schema_version: u32,
    pub stages: Vec<StageEntry>,
    pub updated_at: DateTime<Utc>,
}

/// The manifest schema version this build writes and reads. Bumped when
/// a field is added or removed in a way that changes on-disk meaning.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

impl Manifest {
    /// Builds a fresh manifest with every active stage `Pending`, in
    /// catalog order (spec §4.5 "prepare" creates the manifest).
    pub fn new(job_id: JobId, active_stages: &[StageName], now: DateTime<Utc>) -> Self {
        Self {
            job_id,
            schema_version: MANIFEST_SCHEMA_VERSION,
            stages: active_stages.iter().copied().map(StageEntry::pending).collect(),
            updated_at: now,
        }
    }

    pub fn stage(&self, name: StageName) -> Option<&StageEntry> {
        self.stages.iter().find(|entry| entry.stage == name)
    }

    fn stage_mut(&mut self, name: StageName) -> Result<&mut StageEntry, OrchestratorError> {
        self.stages
            .iter_mut()
            .find(|entry| entry.stage == name)
            .ok_or_else(|| OrchestratorError::NotFound(format!("stage '{name}' is not active for this job")))
    }

    /// Invariant: at most one stage is `Running` at a time (spec §8
    /// "single running stage" property) — the driver is sequential, so
    /// this is enforced here rather than relying on caller discipline.
    pub fn running_stage(&self) -> Option<StageName> {
        self.stages
            .iter()
            .find(|entry| entry.status == StageStatus::Running)
            .map(|entry| entry.stage)
    }

    pub fn transition(&mut self, name: StageName, next: StageStatus, now: DateTime<Utc>) -> Result<(), OrchestratorError> {
        if next == StageStatus::Running && self.running_stage().is_some_and(|running| running != name) {
            return Err(OrchestratorError::Internal(format!(
                "cannot start stage '{name}': another stage is already running"
            )));
        }
        let entry = self.stage_mut(name)?;
        if !entry.status.can_transition_to(next) {
            return Err(OrchestratorError::Internal(format!(
                "illegal transition for stage '{name}': {:?} -> {:?}",
                entry.status, next
            )));
        }
        match next {
            StageStatus::Running => entry.started_at = Some(now),
            StageStatus::Succeeded | StageStatus::Failed | StageStatus::Skipped => entry.finished_at = Some(now),
            StageStatus::Pending => {}
        }
        entry.status = next;
        self.updated_at = now;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn mark_succeeded(
        &mut self,
        name: StageName,
        resolved_params: ResolvedParams,
        cache_hit: bool,
        produced_artifacts: Vec<String>,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        self.transition(name, StageStatus::Succeeded, now)?;
        let entry = self.stage_mut(name)?;
        entry.resolved_params = Some(resolved_params);
        entry.cache_hit = cache_hit;
        entry.produced_artifacts = produced_artifacts;
        entry.attempts = attempts;
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        name: StageName,
        error: &OrchestratorError,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        self.transition(name, StageStatus::Failed, now)?;
        let entry = self.stage_mut(name)?;
        entry.failure_category = Some(error.category().to_string());
        entry.failure_detail = Some(error.to_string());
        entry.attempts = attempts;
        Ok(())
    }

    /// Resets a terminal stage and every stage after it back to
    /// `Pending`, for `run --restart` (spec §5 "Restart"): a stage's
    /// output can depend on an earlier stage's output, so resuming from
    /// the middle without clearing downstream state would leave stale
    /// artifacts next to fresh ones.
    pub fn restart_from(&mut self, name: StageName, now: DateTime<Utc>) {
        let from_ordinal = name.ordinal();
        for entry in self.stages.iter_mut().filter(|entry| entry.stage.ordinal() >= from_ordinal) {
            entry.status = StageStatus::Pending;
            entry.started_at = None;
            entry.finished_at = None;
            entry.resolved_params = None;
            entry.cache_hit = false;
            entry.failure_category = None;
            entry.failure_detail = None;
            entry.attempts = 0;
            entry.produced_artifacts = Vec::new();
        }
        self.updated_at = now;
    }

    /// Whether every active stage has reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.stages.iter().all(|entry| entry.status.is_terminal())
    }

    /// The first `Pending` stage in catalog order, i.e. what the driver
    /// runs next.
    pub fn next_pending(&self) -> Option<StageName> {
        self.stages
            .iter()
            .find(|entry| entry.status == StageStatus::Pending)
            .map(|entry| entry.stage)
    }
}
