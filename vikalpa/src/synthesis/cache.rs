//! Generation cache for path and obstacle synthesis.
//!
//! Entries are keyed by a SHA-256 digest of the canonical JSON form of
//! `{kind, params, seed, extra}`. `serde_json` objects keep their keys
//! sorted, so two requests with equal inputs always produce the same key
//! no matter how the parameters were written. Lookup is exact-match only.
//!
//! The cache is an explicit object owned by the caller. It is `Sync`, so
//! one instance can serve parallel evaluations; values are deterministic
//! functions of their key, so a racing double insert stores the same value.

use std::collections::{BTreeMap, HashMap};
use std::path::Path as FsPath;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::{Obstacle, Path};
use crate::error::{Result, VariationError};

/// Persisted file format version.
const CACHE_FORMAT_VERSION: u32 = 1;

/// Cache key: digest of the canonical input serialization.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: String,
}

impl CacheKey {
    /// Build a key from a variation kind, its parameters, a seed and any
    /// further inputs the result depends on (map fingerprint, resolved
    /// references, indices).
    pub fn new<P: Serialize>(
        kind: &str,
        params: &P,
        seed: u64,
        extra: serde_json::Value,
    ) -> Result<Self> {
        let canonical = serde_json::json!({
            "kind": kind,
            "params": serde_json::to_value(params)?,
            "seed": seed,
            "extra": extra,
        });
        let text = serde_json::to_string(&canonical)?;
        let digest = Sha256::digest(text.as_bytes())
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Ok(Self { digest })
    }

    /// Hex digest.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.digest
    }
}

/// A cached synthesis result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CachedValue {
    /// One random path and the attempt that produced it.
    Path { path: Path, attempts: u32 },
    /// All accepted rasterized paths.
    Paths { paths: Vec<Path> },
    /// One obstacle set.
    Obstacles { obstacles: Vec<Obstacle> },
    /// Synthesis exhausted its budget; replayed as a generation error.
    Failure { message: String },
}

impl CachedValue {
    /// Record a failed synthesis so that a hit replays the same error.
    pub fn failure(error: VariationError) -> Self {
        let message = match error {
            VariationError::Generation(message) => message,
            other => other.to_string(),
        };
        CachedValue::Failure { message }
    }

    /// Turn a cached failure back into an error.
    pub fn into_result(self) -> Result<CachedValue> {
        match self {
            CachedValue::Failure { message } => Err(VariationError::Generation(message)),
            other => Ok(other),
        }
    }
}

/// Hit/miss counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    entries: BTreeMap<String, CachedValue>,
}

/// Thread-safe memo table for synthesis results.
#[derive(Debug, Default)]
pub struct GenerationCache {
    entries: RwLock<HashMap<String, CachedValue>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GenerationCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, counting the hit or miss.
    pub fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let found = self.entries.read().get(key.as_str()).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store a value.
    pub fn insert(&self, key: &CacheKey, value: CachedValue) {
        self.entries.write().insert(key.as_str().to_string(), value);
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// The lock is not held while `compute` runs.
    pub fn get_or_insert_with<F>(&self, key: &CacheKey, compute: F) -> CachedValue
    where
        F: FnOnce() -> CachedValue,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Drop all entries and reset counters.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Persist all entries as JSON.
    pub fn save(&self, path: &FsPath) -> Result<()> {
        let file = CacheFile {
            version: CACHE_FORMAT_VERSION,
            entries: self
                .entries
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        let json = serde_json::to_string(&file)?;
        std::fs::write(path, json)?;
        debug!("[GenerationCache] Saved {} entries to {}", file.entries.len(), path.display());
        Ok(())
    }

    /// Load entries persisted by [`GenerationCache::save`].
    pub fn load(path: &FsPath) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let file: CacheFile = serde_json::from_str(&json)?;
        if file.version != CACHE_FORMAT_VERSION {
            return Err(VariationError::Parse(format!(
                "cache format version {} not supported (expected {})",
                file.version, CACHE_FORMAT_VERSION
            )));
        }
        info!("[GenerationCache] Loaded {} entries from {}", file.entries.len(), path.display());
        Ok(Self {
            entries: RwLock::new(file.entries.into_iter().collect()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }
}
