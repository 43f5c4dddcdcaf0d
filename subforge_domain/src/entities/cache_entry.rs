// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Content-addressed cache entry (spec §3 "Cache entry", C7).

use crate::value_objects::cache_layer::CacheLayer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One cached artifact. `key` is the SHA-256 hex digest produced by
/// [`crate::services::cache_keys`] over the layer's namespace plus its
/// input fingerprint; it is never computed here, only stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub layer: CacheLayer,
    pub key: String,
    pub artifact_path: PathBuf,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(layer: CacheLayer, key: String, artifact_path: PathBuf, size_bytes: u64, now: DateTime<Utc>) -> Self {
        Self {
            layer,
            key,
            artifact_path,
            size_bytes,
            created_at: now,
            last_accessed_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed_at = now;
    }

    /// Whether this entry has outlived its layer's default TTL. Callers
    /// pass the current time rather than relying on `Utc::now()` so the
    /// eviction sweep is deterministic and testable.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.layer.default_ttl_days() {
            None => false,
            Some(days) => now.signed_duration_since(self.created_at) > chrono::Duration::days(days as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(layer: CacheLayer, created_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry::new(layer, "deadbeef".to_string(), PathBuf::from("/cache/deadbeef"), 1024, created_at)
    }

    #[test]
    fn glossary_entries_never_expire() {
        let old = Utc::now() - chrono::Duration::days(3650);
        let e = entry(CacheLayer::Glossary, old);
        assert!(!e.is_expired(Utc::now()));
    }

    #[test]
    fn asr_entries_expire_after_default_ttl() {
        let old = Utc::now() - chrono::Duration::days(200);
        let e = entry(CacheLayer::Asr, old);
        assert!(e.is_expired(Utc::now()));
    }

    #[test]
    fn touch_updates_last_accessed_without_changing_created_at() {
        let created = Utc::now() - chrono::Duration::days(1);
        let mut e = entry(CacheLayer::Metadata, created);
        let now = Utc::now();
        e.touch(now);
        assert_eq!(e.last_accessed_at, now);
        assert_eq!(e.created_at, created);
    }
}
