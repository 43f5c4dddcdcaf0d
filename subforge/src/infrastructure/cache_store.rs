// /////////////////////////////////////////////////////////////////////////////
// Subforge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Content-addressed cache store (C7, spec §3 "Cache entry", §4.7).
//!
//! One JSON index file per layer under `<cache_dir>/<layer>/index.json`,
//! with payload files stored alongside keyed by their content hash.
//! Insertion copies the source artifact into the store then renames it
//! into place (never a symlink, per spec §4.7: the cache exclusively
//! owns its payloads and a job directory being cleaned up must not take
//! a cached artifact with it).

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use subforge_domain::entities::cache_entry::CacheEntry;
use subforge_domain::error::OrchestratorError;
use subforge_domain::repositories::CacheRepository;
use subforge_domain::value_objects::cache_layer::CacheLayer;
use tokio::sync::Mutex;

#[derive(Default, serde::Serialize, serde::Deserialize)]
struct LayerIndex {
    entries: HashMap<String, CacheEntry>,
}

pub struct FilesystemCacheStore {
    cache_dir: PathBuf,
    locks: Mutex<()>,
}

impl FilesystemCacheStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            locks: Mutex::new(()),
        }
    }

    fn layer_dir(&self, layer: CacheLayer) -> PathBuf {
        self.cache_dir.join(layer.as_str())
    }

    fn index_path(&self, layer: CacheLayer) -> PathBuf {
        self.layer_dir(layer).join("index.json")
    }

    fn payload_path(&self, layer: CacheLayer, key: &str) -> PathBuf {
        self.layer_dir(layer).join(key)
    }

    async fn read_index(&self, layer: CacheLayer) -> Result<LayerIndex, OrchestratorError> {
        let path = self.index_path(layer);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(LayerIndex::default());
        }
        let contents = tokio::fs::read_to_string(&path).await?;
        serde_json::from_str(&contents).map_err(|e| OrchestratorError::CacheCorrupt(format!("layer '{layer}' index: {e}")))
    }

    async fn write_index(&self, layer: CacheLayer, index: &LayerIndex) -> Result<(), OrchestratorError> {
        let dir = self.layer_dir(layer);
        tokio::fs::create_dir_all(&dir).await?;
        let contents = serde_json::to_string_pretty(index)?;
        let tmp = self.index_path(layer).with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, self.index_path(layer)).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheRepository for FilesystemCacheStore {
    async fn lookup(&self, layer: CacheLayer, key: &str) -> Result<Option<CacheEntry>, OrchestratorError> {
        let index = self.read_index(layer).await?;
        match index.entries.get(key) {
            Some(entry) if entry.is_expired(Utc::now()) => Ok(None),
            Some(entry) => Ok(Some(entry.clone())),
            None => Ok(None),
        }
    }

    async fn insert(&self, entry: CacheEntry) -> Result<(), OrchestratorError> {
        let _guard = self.locks.lock().await;

        let dest = self.payload_path(entry.layer, &entry.key);
        if entry.artifact_path != dest {
            tokio::fs::create_dir_all(self.layer_dir(entry.layer)).await?;
            let tmp = dest.with_extension("tmp");
            tokio::fs::copy(&entry.artifact_path, &tmp).await?;
            tokio::fs::rename(&tmp, &dest).await?;
        }

        let mut stored = entry.clone();
        stored.artifact_path = dest;

        let mut index = self.read_index(entry.layer).await?;
        index.entries.insert(entry.key.clone(), stored);
        self.write_index(entry.layer, &index).await
    }

    async fn touch(&self, layer: CacheLayer, key: &str) -> Result<(), OrchestratorError> {
        let _guard = self.locks.lock().await;
        let mut index = self.read_index(layer).await?;
        if let Some(entry) = index.entries.get_mut(key) {
            entry.touch(Utc::now());
        }
        self.write_index(layer, &index).await
    }

    async fn purge_expired(&self, layer: CacheLayer, max_size_gb: f64) -> Result<u64, OrchestratorError> {
        let _guard = self.locks.lock().await;
        let mut index = self.read_index(layer).await?;
        let now = Utc::now();

        let expired_keys: Vec<String> = index
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        let mut evicted = expired_keys.len() as u64;
        for key in expired_keys {
            if let Some(entry) = index.entries.remove(&key) {
                let _ = tokio::fs::remove_file(&entry.artifact_path).await;
            }
        }

        let max_bytes = (max_size_gb * 1024.0 * 1024.0 * 1024.0) as u64;
        let mut total_bytes: u64 = index.entries.values().map(|e| e.size_bytes).sum();
        if total_bytes > max_bytes {
            let mut by_lru: Vec<String> = index.entries.keys().cloned().collect();
            by_lru.sort_by_key(|key| index.entries[key].last_accessed_at);
            for key in by_lru {
                if total_bytes <= max_bytes {
                    break;
                }
                if let Some(entry) = index.entries.remove(&key) {
                    total_bytes = total_bytes.saturating_sub(entry.size_bytes);
                    let _ = tokio::fs::remove_file(&entry.artifact_path).await;
                    evicted += 1;
                }
            }
        }

        self.write_index(layer, &index).await?;
        Ok(evicted)
    }
}
