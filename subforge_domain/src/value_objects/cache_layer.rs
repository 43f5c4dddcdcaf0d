// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The five content-addressed cache layers (spec §3 "Cache entry", C7).
//!
//! Layer mixing is forbidden: a key computed for one layer must never be
//! looked up against another. Keeping the layer as part of the key's
//! namespace (see [`crate::services::cache_keys`]) makes that a type-level
//! property instead of a convention callers must remember.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheLayer {
    Metadata,
    Fingerprint,
    Asr,
    Translation,
    Glossary,
}

impl CacheLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheLayer::Metadata => "metadata",
            CacheLayer::Fingerprint => "fingerprint",
            CacheLayer::Asr => "asr",
            CacheLayer::Translation => "translation",
            CacheLayer::Glossary => "glossary",
        }
    }

    /// Default time-to-live in days. Glossary entries default to "no
    /// expiry" per spec §9 open-question resolution; callers still cap
    /// total glossary size under `max_size_gb` via LRU.
    pub fn default_ttl_days(&self) -> Option<u32> {
        match self {
            CacheLayer::Glossary => None,
            _ => Some(90),
        }
    }
}

impl std::fmt::Display for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
