//! Synthesized-audio cache
//!
//! Clips are keyed by a digest of the text and every voice parameter, stored
//! as one file per clip next to a JSON index. The cache is size-bounded;
//! when an insert pushes it over the limit, the oldest entries go first.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Result;
use crate::speech::VoiceProfile;

/// Index file kept beside the audio files
const INDEX_FILE: &str = "index.json";

/// Default size bound: 100 MiB
pub const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;

/// Per-entry metadata in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    voice_id: String,
    size: u64,
    duration_ms: u64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheIndex {
    entries: HashMap<String, CacheEntry>,
}

/// Cache usage summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub max_bytes: u64,
}

/// Disk-backed audio cache
pub struct AudioCache {
    dir: PathBuf,
    max_bytes: u64,
    index: CacheIndex,
}

impl AudioCache {
    /// Open (or create) a cache directory.
    ///
    /// An unreadable index is treated as empty, not fatal.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_bounded(dir, DEFAULT_MAX_BYTES)
    }

    /// Open with an explicit size bound.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn open_bounded(dir: impl Into<PathBuf>, max_bytes: u64) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let index = match std::fs::read_to_string(dir.join(INDEX_FILE)) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "cache index corrupt, starting empty");
                CacheIndex::default()
            }),
            Err(_) => CacheIndex::default(),
        };

        Ok(Self {
            dir,
            max_bytes,
            index,
        })
    }

    /// Deterministic fingerprint of a (text, voice) pair
    #[must_use]
    pub fn fingerprint(text: &str, voice: &VoiceProfile) -> String {
        let material = format!(
            "{text}|{}|{}|{}|{}",
            voice.voice_id,
            voice.speed,
            voice.pitch,
            voice.engine.as_str()
        );
        hex::encode(Sha256::digest(material.as_bytes()))
    }

    fn clip_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{fingerprint}.mp3"))
    }

    /// Look up cached audio for a (text, voice) pair
    #[must_use]
    pub fn get(&self, text: &str, voice: &VoiceProfile) -> Option<Vec<u8>> {
        let fingerprint = Self::fingerprint(text, voice);
        if !self.index.entries.contains_key(&fingerprint) {
            return None;
        }
        match std::fs::read(self.clip_path(&fingerprint)) {
            Ok(bytes) => {
                tracing::debug!(fingerprint = %fingerprint, "cache hit");
                Some(bytes)
            }
            Err(e) => {
                tracing::warn!(fingerprint = %fingerprint, error = %e, "cache entry unreadable");
                None
            }
        }
    }

    /// Store synthesized audio, evicting oldest entries past the size bound.
    ///
    /// # Errors
    ///
    /// Returns error if the clip or index cannot be written.
    pub fn store(
        &mut self,
        text: &str,
        voice: &VoiceProfile,
        bytes: &[u8],
        duration_ms: u64,
    ) -> Result<String> {
        let fingerprint = Self::fingerprint(text, voice);
        std::fs::write(self.clip_path(&fingerprint), bytes)?;

        self.index.entries.insert(
            fingerprint.clone(),
            CacheEntry {
                voice_id: voice.voice_id.clone(),
                size: bytes.len() as u64,
                duration_ms,
                created_at: Utc::now(),
            },
        );

        self.evict_to_bound();
        self.write_index()?;

        tracing::debug!(fingerprint = %fingerprint, size = bytes.len(), "cached audio");
        Ok(fingerprint)
    }

    /// Evict oldest entries until total size fits the bound
    fn evict_to_bound(&mut self) {
        let mut total: u64 = self.index.entries.values().map(|e| e.size).sum();
        if total <= self.max_bytes {
            return;
        }

        let mut by_age: Vec<(String, DateTime<Utc>)> = self
            .index
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.created_at))
            .collect();
        by_age.sort_by_key(|(_, created)| *created);

        for (fingerprint, _) in by_age {
            if total <= self.max_bytes {
                break;
            }
            if let Some(entry) = self.index.entries.remove(&fingerprint) {
                total = total.saturating_sub(entry.size);
                if let Err(e) = std::fs::remove_file(self.clip_path(&fingerprint)) {
                    tracing::warn!(fingerprint = %fingerprint, error = %e, "evicted file removal failed");
                }
                tracing::debug!(fingerprint = %fingerprint, "evicted cache entry");
            }
        }
    }

    fn write_index(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.index)?;
        std::fs::write(self.dir.join(INDEX_FILE), content)?;
        Ok(())
    }

    /// Current cache usage
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.index.entries.len(),
            total_bytes: self.index.entries.values().map(|e| e.size).sum(),
            max_bytes: self.max_bytes,
        }
    }

    /// Drop all entries and their files
    ///
    /// # Errors
    ///
    /// Returns error if the index cannot be rewritten.
    pub fn clear(&mut self) -> Result<()> {
        for fingerprint in self.index.entries.keys() {
            let _ = std::fs::remove_file(self.clip_path(fingerprint));
        }
        self.index.entries.clear();
        self.write_index()
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
