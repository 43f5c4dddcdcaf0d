// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The declarative stage catalog: the single source of truth for stage
//! ordering, required inputs/outputs, and which stages are skippable
//! (spec §3 "Stage descriptor", design note 1).
//!
//! Every place that needs "what stage comes after Asr" or "does Mux
//! require a runtime" reads this table rather than re-deriving it, so the
//! catalog and the documentation can never drift apart the way the source
//! system's scattered per-script constants did.

use crate::entities::job_record::JobRecord;
use crate::value_objects::stage_name::StageName;

/// One row of the stage catalog.
#[derive(Debug, Clone, Copy, Eq)]
pub struct StageDescriptor {
    pub name: StageName,
    /// Computes this stage's output file names (relative to its own
    /// `NN_stage/` directory) for a given job. A function pointer rather
    /// than a fixed string because the translation/subtitles stages emit
    /// one file per target language and the mux stage's name depends on
    /// the source media's basename (spec §3 "Artifact layout", bit-exact).
    output_names: fn(&JobRecord) -> Vec<String>,
    /// Whether a missing/degraded runtime causes this stage to be skipped
    /// rather than fail the job (spec §5 "Skip" transition).
    pub skippable_without_runtime: bool,
    /// Whether this stage needs a resolved runtime at all. `Demux` and
    /// `Mux` run via the always-present utility runtime's ffmpeg wrapper.
    pub requires_named_runtime: bool,
}

impl StageDescriptor {
    /// Every file this stage must produce for `job`, in the order a
    /// consumer should look for them.
    pub fn outputs(&self, job: &JobRecord) -> Vec<String> {
        (self.output_names)(job)
    }

    /// The representative output used for predecessor-input checks and
    /// single-file cache population: the stage's first declared output.
    pub fn primary_output(&self, job: &JobRecord) -> String {
        self.outputs(job)
            .into_iter()
            .next()
            .expect("every stage declares at least one output for an active job")
    }
}

fn basename_stem(job: &JobRecord) -> String {
    job.source_media
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

fn basename_ext(job: &JobRecord) -> String {
    job.source_media.extension().and_then(|s| s.to_str()).unwrap_or("mkv").to_string()
}

fn demux_outputs(_job: &JobRecord) -> Vec<String> {
    vec!["audio.wav".to_string()]
}

fn source_separation_outputs(_job: &JobRecord) -> Vec<String> {
    vec!["vocals.wav".to_string(), "accompaniment.wav".to_string()]
}

fn vad_outputs(_job: &JobRecord) -> Vec<String> {
    vec!["speech_segments.json".to_string()]
}

fn asr_outputs(_job: &JobRecord) -> Vec<String> {
    vec!["segments.json".to_string()]
}

fn alignment_outputs(_job: &JobRecord) -> Vec<String> {
    vec!["segments_aligned.json".to_string()]
}

fn translation_outputs(job: &JobRecord) -> Vec<String> {
    job.target_languages
        .iter()
        .map(|lang| format!("translation_{}.json", lang.as_str()))
        .collect()
}

fn subtitles_outputs(job: &JobRecord) -> Vec<String> {
    let stem = basename_stem(job);
    job.target_languages
        .iter()
        .map(|lang| format!("{stem}.{}.srt", lang.as_str()))
        .collect()
}

fn mux_outputs(job: &JobRecord) -> Vec<String> {
    vec![format!("{}_subtitled.{}", basename_stem(job), basename_ext(job))]
}

const DEMUX: StageDescriptor = StageDescriptor {
    name: StageName::Demux,
    output_names: demux_outputs,
    skippable_without_runtime: false,
    requires_named_runtime: false,
};

const SOURCE_SEPARATION: StageDescriptor = StageDescriptor {
    name: StageName::SourceSeparation,
    output_names: source_separation_outputs,
    skippable_without_runtime: true,
    requires_named_runtime: true,
};

const VAD: StageDescriptor = StageDescriptor {
    name: StageName::Vad,
    output_names: vad_outputs,
    skippable_without_runtime: false,
    requires_named_runtime: true,
};

const ASR: StageDescriptor = StageDescriptor {
    name: StageName::Asr,
    output_names: asr_outputs,
    skippable_without_runtime: false,
    requires_named_runtime: true,
};

const ALIGNMENT: StageDescriptor = StageDescriptor {
    name: StageName::Alignment,
    output_names: alignment_outputs,
    skippable_without_runtime: true,
    requires_named_runtime: true,
};

const TRANSLATION: StageDescriptor = StageDescriptor {
    name: StageName::Translation,
    output_names: translation_outputs,
    skippable_without_runtime: false,
    requires_named_runtime: true,
};

const SUBTITLES: StageDescriptor = StageDescriptor {
    name: StageName::Subtitles,
    output_names: subtitles_outputs,
    skippable_without_runtime: false,
    requires_named_runtime: false,
};

const MUX: StageDescriptor = StageDescriptor {
    name: StageName::Mux,
    output_names: mux_outputs,
    skippable_without_runtime: false,
    requires_named_runtime: false,
};

/// The full catalog, in pipeline order. `StageName::ordinal` indexes this
/// slice minus one.
pub const CATALOG: [StageDescriptor; 8] = [
    DEMUX,
    SOURCE_SEPARATION,
    VAD,
    ASR,
    ALIGNMENT,
    TRANSLATION,
    SUBTITLES,
    MUX,
];

/// Looks up a stage's catalog entry.
pub fn describe(name: StageName) -> &'static StageDescriptor {
    &CATALOG[(name.ordinal() - 1) as usize]
}

impl PartialEq for StageDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::language_code::LanguageCode;
    use crate::value_objects::job_id::JobId;
    use crate::value_objects::workflow::Workflow;
    use chrono::{NaiveDate, Utc};

    fn job(workflow: Workflow, target_languages: Vec<LanguageCode>) -> JobRecord {
        let job_id = JobId::new(NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(), "alice", 1).unwrap();
        JobRecord::new(job_id, workflow, None, "/media/a.mp4".into(), target_languages, None, Utc::now(), "alice").unwrap()
    }

    #[test]
    fn catalog_is_indexed_by_ordinal_minus_one() {
        for stage in StageName::ALL {
            assert_eq!(describe(stage).name, stage);
        }
    }

    #[test]
    fn catalog_order_matches_stage_name_ordinals() {
        for (idx, descriptor) in CATALOG.iter().enumerate() {
            assert_eq!(descriptor.name.ordinal() as usize, idx + 1);
        }
    }

    #[test]
    fn artifact_names_match_the_bit_exact_layout() {
        let job = job(Workflow::Subtitle, vec![LanguageCode::new("fr").unwrap()]);
        assert_eq!(describe(StageName::Demux).primary_output(&job), "audio.wav");
        assert_eq!(describe(StageName::Vad).primary_output(&job), "speech_segments.json");
        assert_eq!(describe(StageName::Asr).primary_output(&job), "segments.json");
        assert_eq!(describe(StageName::Alignment).primary_output(&job), "segments_aligned.json");
        assert_eq!(describe(StageName::Translation).outputs(&job), vec!["translation_fr.json"]);
        assert_eq!(describe(StageName::Subtitles).outputs(&job), vec!["a.fr.srt"]);
        assert_eq!(describe(StageName::Mux).outputs(&job), vec!["a_subtitled.mp4"]);
    }

    #[test]
    fn translation_emits_one_file_per_target_language() {
        let job = job(Workflow::Translate, vec![LanguageCode::new("fr").unwrap(), LanguageCode::new("es").unwrap()]);
        assert_eq!(
            describe(StageName::Translation).outputs(&job),
            vec!["translation_fr.json".to_string(), "translation_es.json".to_string()]
        );
    }
}
