// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Content-addressed cache key computation (spec §3 "Cache entry", C7).
//!
//! Checksums are a domain concern, not an infrastructure one: the cache
//! key's shape is part of the data model, so it lives here as a pure
//! function over already-loaded bytes/strings rather than behind a port
//! that could be swapped for something with different semantics.

use crate::entities::resolved_params::ResolvedParams;
use crate::value_objects::cache_layer::CacheLayer;
use sha2::{Digest, Sha256};

/// Computes the cache key for one layer.
///
/// The layer name is folded into the digest input (not just used as a
/// directory prefix) so a key can never collide across layers even if
/// the fingerprint and resolved-params inputs happen to coincide.
pub fn compute_key(layer: CacheLayer, fingerprint: &str, resolved_params: &ResolvedParams) -> Result<String, serde_json::Error> {
    let canonical_params = resolved_params.canonical_json()?;
    let mut hasher = Sha256::new();
    hasher.update(layer.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(fingerprint.as_bytes());
    hasher.update(b"\0");
    hasher.update(canonical_params.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// A stable fingerprint for a source file's identity, independent of
/// its path: content hash plus size, so a renamed-but-unchanged file
/// still hits the cache while a same-named-but-edited one does not.
pub fn fingerprint_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::device::{Device, Precision};

    fn params() -> ResolvedParams {
        ResolvedParams::new(Device::Cpu, Precision::Fp16, 4, 60)
    }

    #[test]
    fn same_inputs_produce_the_same_key() {
        let a = compute_key(CacheLayer::Asr, "abc123", &params()).unwrap();
        let b = compute_key(CacheLayer::Asr, "abc123", &params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_layers_never_collide_on_the_same_fingerprint_and_params() {
        let asr = compute_key(CacheLayer::Asr, "abc123", &params()).unwrap();
        let translation = compute_key(CacheLayer::Translation, "abc123", &params()).unwrap();
        assert_ne!(asr, translation);
    }

    #[test]
    fn differing_fingerprint_changes_the_key() {
        let a = compute_key(CacheLayer::Asr, "abc123", &params()).unwrap();
        let b = compute_key(CacheLayer::Asr, "xyz789", &params()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_bytes_is_deterministic() {
        assert_eq!(fingerprint_bytes(b"hello"), fingerprint_bytes(b"hello"));
        assert_ne!(fingerprint_bytes(b"hello"), fingerprint_bytes(b"world"));
    }
}
