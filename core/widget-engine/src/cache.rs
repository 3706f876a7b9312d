//! FILENAME: core/widget-engine/src/cache.rs
//! PURPOSE: Memoizes widget results per (dataset, definition) pair.
//! CONTEXT: Entries are keyed by a structural fingerprint of the inputs, not by
//! object identity, so a changed record or configuration never hits a stale
//! entry. The cache is owned by its caller; there is no interior mutability.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use engine::Record;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};

use crate::definition::WidgetDefinition;
use crate::engine::calculate_widget;
use crate::view::WidgetOutput;

/// Default number of results kept by `WidgetCache::default()`.
pub const DEFAULT_CAPACITY: usize = 64;

/// Fingerprint of one calculation's inputs.
/// Two independent hashes make an accidental collision practically impossible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    record_count: usize,
    fx_hash: u64,
    sip_hash: u64,
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// Computes the fingerprint of a dataset and a definition.
/// Field order within a record does not affect the result.
pub fn fingerprint(records: &[Record], definition: &WidgetDefinition) -> CacheKey {
    let definition_bytes = match serde_json::to_vec(definition) {
        Ok(bytes) => bytes,
        Err(_) => format!("{:?}", definition).into_bytes(),
    };

    let mut fx = FxHasher::default();
    let mut sip = DefaultHasher::new();
    hash_inputs(records, &definition_bytes, &mut fx);
    hash_inputs(records, &definition_bytes, &mut sip);

    CacheKey {
        record_count: records.len(),
        fx_hash: fx.finish(),
        sip_hash: sip.finish(),
    }
}

fn hash_inputs<H: Hasher>(records: &[Record], definition_bytes: &[u8], state: &mut H) {
    definition_bytes.hash(state);
    for record in records {
        let entries = record.sorted_entries();
        entries.len().hash(state);
        for (field, value) in entries {
            field.hash(state);
            value.hash(state);
        }
    }
}

/// Bounded FIFO cache of widget outputs.
#[derive(Debug)]
pub struct WidgetCache {
    capacity: usize,
    entries: FxHashMap<CacheKey, Arc<WidgetOutput>>,
    /// Insertion order, oldest first.
    order: VecDeque<CacheKey>,
    stats: CacheStats,
}

impl Default for WidgetCache {
    fn default() -> Self {
        WidgetCache::new(DEFAULT_CAPACITY)
    }
}

impl WidgetCache {
    /// A capacity of 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        WidgetCache {
            capacity,
            entries: FxHashMap::default(),
            order: VecDeque::with_capacity(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Returns the cached output for these inputs, calculating it on a miss.
    pub fn get_or_calculate(&mut self, records: &[Record], definition: &WidgetDefinition) -> Arc<WidgetOutput> {
        let key = fingerprint(records, definition);

        if let Some(output) = self.entries.get(&key) {
            self.stats.hits += 1;
            log::debug!(target: "CACHE", "hit ({} records)", records.len());
            return Arc::clone(output);
        }

        self.stats.misses += 1;
        let output = Arc::new(calculate_widget(records, definition));

        if self.capacity > 0 {
            while self.entries.len() >= self.capacity {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
                self.stats.evictions += 1;
            }
            self.entries.insert(key, Arc::clone(&output));
            self.order.push_back(key);
        }

        self.stats.entries = self.entries.len();
        log::debug!(
            target: "CACHE",
            "miss ({} records), {} entries cached",
            records.len(),
            self.entries.len()
        );
        output
    }

    /// Drops every cached result.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.stats.entries = 0;
        log::debug!(target: "CACHE", "invalidated");
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
