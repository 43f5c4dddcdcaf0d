// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Repository ports for the two pieces of durable state the orchestrator
//! owns: the per-job manifest (spec §3 "Manifest", C6) and the
//! content-addressed cache index (spec §3 "Cache entry", C7).
//!
//! As with the other ports in [`crate::services`], these traits exist so
//! the domain and application layers can depend on "a manifest can be
//! loaded and saved" without knowing it's backed by a JSON file with an
//! advisory lock and an atomic rename.

use crate::entities::cache_entry::CacheEntry;
use crate::entities::manifest::Manifest;
use crate::error::OrchestratorError;
use crate::value_objects::cache_layer::CacheLayer;
use crate::value_objects::job_id::JobId;
use async_trait::async_trait;

#[async_trait]
pub trait ManifestRepository: Send + Sync {
    async fn load(&self, job_id: &JobId) -> Result<Manifest, OrchestratorError>;

    /// Persists `manifest` durably: write-to-temp, fsync, atomic rename
    /// (spec §3 "Manifest" durability note) under an advisory lock so a
    /// concurrent `status` read never observes a half-written file.
    async fn save(&self, manifest: &Manifest) -> Result<(), OrchestratorError>;

    async fn exists(&self, job_id: &JobId) -> Result<bool, OrchestratorError>;
}

#[async_trait]
pub trait CacheRepository: Send + Sync {
    async fn lookup(&self, layer: CacheLayer, key: &str) -> Result<Option<CacheEntry>, OrchestratorError>;

    async fn insert(&self, entry: CacheEntry) -> Result<(), OrchestratorError>;

    /// Updates `last_accessed_at` for an entry already present, used on
    /// every cache hit so LRU eviction reflects actual use.
    async fn touch(&self, layer: CacheLayer, key: &str) -> Result<(), OrchestratorError>;

    /// Evicts entries whose TTL has elapsed, then evicts the
    /// least-recently-used remaining entries until the layer is back
    /// under `max_size_gb` (spec §4.7 "cache manager").
    async fn purge_expired(&self, layer: CacheLayer, max_size_gb: f64) -> Result<u64, OrchestratorError>;
}
