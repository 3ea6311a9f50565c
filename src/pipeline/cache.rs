//! Analysis result caching.
//!
//! The cache is owned by the caller and keyed by the workbook's content hash
//! plus the configuration fingerprint, so a changed cell or a changed
//! threshold is always a miss. Analysis stays a pure function of its inputs:
//! a disabled or empty cache produces the same results.

use super::Analysis;
use crate::config::{AuditConfig, CacheConfig};
use crate::model::Workbook;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Key for cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalysisCacheKey {
    /// Hash of the workbook contents
    pub workbook_hash: u64,
    /// Fingerprint of the active configuration
    pub config_hash: u64,
}

impl AnalysisCacheKey {
    #[must_use]
    pub fn new(workbook: &Workbook, config: &AuditConfig) -> Self {
        Self {
            workbook_hash: workbook.content_hash(),
            config_hash: config.fingerprint(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedAnalysis {
    analysis: Arc<Analysis>,
    computed_at: Instant,
}

impl CachedAnalysis {
    fn is_valid(&self, ttl: Duration) -> bool {
        self.computed_at.elapsed() < ttl
    }
}

/// Statistics for cache performance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped for capacity or expiry
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 before any lookup.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

/// Thread-safe cache of analysis results.
#[derive(Debug)]
pub struct AnalysisCache {
    entries: RwLock<HashMap<AnalysisCacheKey, CachedAnalysis>>,
    stats: RwLock<CacheStats>,
    max_entries: usize,
    ttl: Duration,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl AnalysisCache {
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
            max_entries: config.max_entries.max(1),
            ttl: config.ttl(),
        }
    }

    /// Cached analysis for `key`, if present and not expired.
    pub fn get(&self, key: &AnalysisCacheKey) -> Option<Arc<Analysis>> {
        let found = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned());

        let mut expired = false;
        let result = match found {
            Some(entry) if entry.is_valid(self.ttl) => Some(entry.analysis),
            Some(_) => {
                expired = true;
                None
            }
            None => None,
        };
        if expired {
            if let Ok(mut entries) = self.entries.write() {
                entries.remove(key);
            }
        }

        if let Ok(mut stats) = self.stats.write() {
            stats.lookups += 1;
            if result.is_some() {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
            if expired {
                stats.evictions += 1;
            }
        }
        result
    }

    /// Store an analysis, evicting the oldest entry when full.
    pub fn put(&self, key: AnalysisCacheKey, analysis: Arc<Analysis>) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        let mut evicted = 0;
        while entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.computed_at)
                .map(|(k, _)| *k);
            let Some(oldest) = oldest else { break };
            entries.remove(&oldest);
            evicted += 1;
        }
        entries.insert(
            key,
            CachedAnalysis {
                analysis,
                computed_at: Instant::now(),
            },
        );
        drop(entries);

        if evicted > 0 {
            tracing::debug!(evicted, "analysis cache full, evicted oldest entries");
            if let Ok(mut stats) = self.stats.write() {
                stats.evictions += evicted;
            }
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.read().map(|s| *s).unwrap_or_default()
    }
}
