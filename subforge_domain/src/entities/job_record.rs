// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The immutable job request recorded at `prepare` time (spec §3 "Job
//! record", §4.5).

use crate::error::OrchestratorError;
use crate::value_objects::clip_range::ClipRange;
use crate::value_objects::job_id::JobId;
use crate::value_objects::language_code::LanguageCode;
use crate::value_objects::workflow::Workflow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the user asked for, fixed at `prepare` time. `run` and `status`
/// read this but never mutate it; re-running with different parameters
/// means preparing a new job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub workflow: Workflow,
    /// The source media's spoken language, if known at `prepare` time.
    /// Feeds the ASR stage's model selection and its cache key (spec §3
    /// "Cache entry" ASR formula includes `language`).
    pub source_language: Option<LanguageCode>,
    pub source_media: PathBuf,
    pub target_languages: Vec<LanguageCode>,
    pub clip_range: Option<ClipRange>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl JobRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_id: JobId,
        workflow: Workflow,
        source_language: Option<LanguageCode>,
        source_media: PathBuf,
        target_languages: Vec<LanguageCode>,
        clip_range: Option<ClipRange>,
        created_at: DateTime<Utc>,
        created_by: impl Into<String>,
    ) -> Result<Self, OrchestratorError> {
        if workflow.requires_target_languages() && target_languages.is_empty() {
            return Err(OrchestratorError::InputInvalid(format!(
                "workflow '{workflow}' requires at least one target language"
            )));
        }
        if !workflow.requires_target_languages() && !target_languages.is_empty() {
            return Err(OrchestratorError::InputInvalid(
                "transcribe workflow does not accept target languages".to_string(),
            ));
        }
        Ok(Self {
            job_id,
            workflow,
            source_language,
            source_media,
            target_languages,
            clip_range,
            created_at,
            created_by: created_by.into(),
        })
    }
}
