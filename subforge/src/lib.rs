// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Subforge
//!
//! Orchestrates transcription, translation, and subtitling jobs over a
//! fixed eight-stage media pipeline: demux, source separation, voice
//! activity detection, ASR, alignment, translation, subtitle
//! formatting, and mux. Each stage runs as an external subprocess
//! (model runtimes are not linked in); this crate owns job
//! preparation, the durable manifest, the content-addressed cache, and
//! the sequential driver that walks a job through its active stages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              subforge_bootstrap              │
//! │   entry point, CLI, signals, platform, exit   │
//! └─────────────────────┬─────────────────────────┘
//!                       │
//! ┌─────────────────────▼─────────────────────────┐
//! │         subforge (this crate)                  │
//! │  application  -> prepare / run / status        │
//! │  driver       -> sequential stage-catalog walk │
//! │  infrastructure -> ports' concrete adapters    │
//! └─────────────────────┬─────────────────────────┘
//!                       │
//! ┌─────────────────────▼─────────────────────────┐
//! │              subforge_domain                   │
//! │  entities, value objects, ports, pure services │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! `subforge_domain` depends on nothing in this crate; this crate
//! depends on nothing in `subforge_bootstrap`. The dependency arrows
//! only point down.
//!
//! ## Modules
//!
//! - [`application`] — the three CLI-facing use cases.
//! - [`driver`] — the stage-catalog walk shared by `run` and `status --gc`.
//! - [`infrastructure`] — filesystem/subprocess adapters for every
//!   domain port, plus config, logging, and metrics.

pub mod application;
pub mod driver;
pub mod infrastructure;

pub use driver::{Driver, DriverResult, RunOptions, StageReport};
