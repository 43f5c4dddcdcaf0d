// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Process-local metrics. No network protocol is in scope, so this
//! exposes a text-dump function rather than an HTTP exporter: `status
//! --metrics` prints the Prometheus text format directly to stdout.

use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Registry, TextEncoder};
use std::sync::OnceLock;

pub struct Metrics {
    pub registry: Registry,
    pub stage_duration_seconds: HistogramVec,
    pub cache_lookups_total: IntCounterVec,
    pub active_jobs: IntGauge,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let stage_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new("subforge_stage_duration_seconds", "Stage execution wall-clock time"),
            &["stage", "outcome"],
        )
        .expect("metric definitions are static and valid");

        let cache_lookups_total = IntCounterVec::new(
            prometheus::Opts::new("subforge_cache_lookups_total", "Cache lookups by layer and result"),
            &["layer", "result"],
        )
        .expect("metric definitions are static and valid");

        let active_jobs = IntGauge::new("subforge_active_jobs", "Jobs currently being driven").expect("metric definitions are static and valid");

        registry.register(Box::new(stage_duration_seconds.clone())).expect("single registration at startup");
        registry.register(Box::new(cache_lookups_total.clone())).expect("single registration at startup");
        registry.register(Box::new(active_jobs.clone())).expect("single registration at startup");

        Self {
            registry,
            stage_duration_seconds,
            cache_lookups_total,
            active_jobs,
        }
    }

    pub fn global() -> &'static Metrics {
        static METRICS: OnceLock<Metrics> = OnceLock::new();
        METRICS.get_or_init(Metrics::new)
    }

    /// Renders the current metric state as Prometheus text format, used by
    /// `status --metrics`.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .expect("text encoding of gathered metrics cannot fail");
        String::from_utf8(buffer).expect("prometheus text encoder emits valid utf-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_metric_names() {
        let metrics = Metrics::global();
        metrics.active_jobs.set(2);
        let rendered = metrics.render();
        assert!(rendered.contains("subforge_active_jobs"));
    }
}
