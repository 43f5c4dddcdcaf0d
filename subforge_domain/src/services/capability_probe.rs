// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Port for probing host capabilities (spec §3 "Capability record", C1).
//!
//! The domain only needs the *result* of probing CPU/GPU/memory; how that
//! probe is carried out (shelling out to `nvidia-smi`, reading
//! `/proc/meminfo`, calling into a platform abstraction) is an
//! infrastructure concern.

use crate::error::OrchestratorError;
use crate::value_objects::capability::CapabilityRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Where a cached capability record is read from and written back to by
/// [`CapabilityProbe::load_or_probe`]'s default implementation.
#[async_trait]
pub trait CapabilityCache: Send + Sync {
    async fn read(&self) -> Option<CapabilityRecord>;
    async fn write(&self, record: &CapabilityRecord);
}

#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    /// Probes the current host. Implementations should be side-effect
    /// free beyond reading system state (no writes), since `status` may
    /// call this opportunistically to refresh a stale record.
    async fn probe(&self) -> Result<CapabilityRecord, OrchestratorError>;

    /// Reads the cached capability record via `cache`; re-probes only if
    /// it is missing or older than `ttl`, then writes the fresh record
    /// back atomically (spec §4.1 `load_or_probe(ttl)`).
    async fn load_or_probe(
        &self,
        cache: &dyn CapabilityCache,
        ttl: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<CapabilityRecord, OrchestratorError> {
        if let Some(cached) = cache.read().await {
            if cached.is_fresh(ttl, now) {
                return Ok(cached);
            }
        }
        let fresh = self.probe().await?;
        cache.write(&fresh).await;
        Ok(fresh)
    }
}
