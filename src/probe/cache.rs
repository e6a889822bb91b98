//! Content-addressed memoization of media inspection
//!
//! Entries are keyed by absolute path and validated against the file's
//! modification time and size on every lookup, so a replaced or edited file
//! is always re-probed. The map is bounded; the least recently used entry is
//! evicted when an insert pushes it over capacity.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::model::{CacheKey, MediaMetadata};
use crate::probe::inspector::MediaProbe;

/// One cached inspection result
#[derive(Debug)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub value: MediaMetadata,
    pub inserted_at: DateTime<Utc>,
    last_used: AtomicU64,
}

/// Counters exposed for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub capacity: usize,
}

/// Bounded LRU cache in front of `MediaProbe`
pub struct ProbeCache {
    probe: MediaProbe,
    capacity: usize,
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    in_flight: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProbeCache {
    pub fn new(probe: MediaProbe, capacity: usize) -> Self {
        Self {
            probe,
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// The uncached probe behind this cache
    pub fn probe(&self) -> &MediaProbe {
        &self.probe
    }

    /// Metadata for `path`, probing only when no entry matches its current identity
    pub async fn get(&self, path: &Path) -> Result<MediaMetadata, DomainError> {
        let key = Self::key_for(path).await?;

        if let Some(value) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(path = %key.absolute_path.display(), "Probe cache hit");
            return Ok(value);
        }

        // Concurrent misses on the same key wait here for the first prober
        let gate = self.gate_for(&key);
        let _guard = gate.lock().await;

        if let Some(value) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(path = %key.absolute_path.display(), "Probe cache hit after in-flight probe");
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(path = %key.absolute_path.display(), "Probe cache miss");

        let result = self.probe.inspect(&key.absolute_path).await;
        if let Ok(value) = &result {
            self.insert(key.clone(), value.clone());
        }
        self.release_gate(&key);
        result
    }

    /// Drop every entry; counters are kept
    pub fn clear(&self) {
        self.write_entries().clear();
    }

    /// Drop the entry for one file, if any. Returns whether an entry was removed.
    pub fn invalidate(&self, path: &Path) -> bool {
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut entries = self.write_entries();
        let removed = entries.remove(&absolute).is_some();
        removed || entries.remove(path).is_some()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.len(),
            capacity: self.capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a current entry exists for `path` (does not touch recency)
    pub fn contains(&self, path: &Path) -> bool {
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.read_entries().contains_key(&absolute)
    }

    /// When the entry for `path` was inserted
    pub fn inserted_at(&self, path: &Path) -> Option<DateTime<Utc>> {
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.read_entries().get(&absolute).map(|e| e.inserted_at)
    }

    async fn key_for(path: &Path) -> Result<CacheKey, DomainError> {
        let display = path.display().to_string();
        let absolute = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| DomainError::from_probe_io(&display, &e))?;
        let metadata = tokio::fs::metadata(&absolute)
            .await
            .map_err(|e| DomainError::from_probe_io(&display, &e))?;
        Ok(CacheKey::from_metadata(absolute, &metadata))
    }

    fn lookup(&self, key: &CacheKey) -> Option<MediaMetadata> {
        let entries = self.read_entries();
        let entry = entries.get(&key.absolute_path)?;
        if entry.key != *key {
            return None;
        }
        entry.last_used.store(self.tick(), Ordering::Relaxed);
        Some(entry.value.clone())
    }

    fn insert(&self, key: CacheKey, value: MediaMetadata) {
        let entry = CacheEntry {
            key: key.clone(),
            value,
            inserted_at: Utc::now(),
            last_used: AtomicU64::new(self.tick()),
        };

        let mut entries = self.write_entries();
        entries.insert(key.absolute_path, entry);

        while entries.len() > self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used.load(Ordering::Relaxed))
                .map(|(path, _)| path.clone());
            match oldest {
                Some(path) => {
                    debug!(path = %path.display(), "Evicting least recently used probe entry");
                    entries.remove(&path);
                }
                None => break,
            }
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn gate_for(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        gates.entry(key.clone()).or_default().clone()
    }

    fn release_gate(&self, key: &CacheKey) {
        let mut gates = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        gates.remove(key);
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PathBuf, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
