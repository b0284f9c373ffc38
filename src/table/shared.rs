//! SharedTable implementation
//!
//! Sharded HashMap with one RwLock per shard.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;

use crossbeam::utils::CachePadded;
use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::value::Value;

use super::{EntryKey, TableMeta};

type Shard = HashMap<EntryKey, Value>;

/// The process-wide table shared by every namespace
///
/// ## Concurrency:
/// - Point operations (`get`/`insert`/`remove`/`update_counter`) lock the
///   one shard their key hashes to
/// - Bulk mutations (`match_delete`/`delete_all`/`insert_many`) hold every
///   shard's write lock at once, acquired in ascending index order, so they
///   apply as a single step
/// - Scans read one shard at a time and see a best-effort view
pub struct SharedTable {
    /// Shards, each padded to its own cache line
    shards: Vec<CachePadded<RwLock<Shard>>>,

    /// Routes keys to shards
    hasher: RandomState,

    meta: TableMeta,
}

impl SharedTable {
    /// Create an empty table with `shard_count` shards (at least one)
    pub fn new(shard_count: usize, initial_capacity: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| CachePadded::new(RwLock::new(HashMap::with_capacity(initial_capacity))))
            .collect();

        Self {
            shards,
            hasher: RandomState::new(),
            meta: TableMeta::SHARED,
        }
    }

    pub fn meta(&self) -> TableMeta {
        self.meta
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Get a copy of the value stored under `key` (read lock)
    pub fn get(&self, key: &EntryKey) -> Option<Value> {
        self.shard(key).read().get(key).cloned()
    }

    /// Check whether `key` is present (read lock)
    pub fn contains(&self, key: &EntryKey) -> bool {
        self.shard(key).read().contains_key(key)
    }

    /// Insert or replace, returning the previous value (write lock)
    pub fn insert(&self, key: EntryKey, value: Value) -> Option<Value> {
        self.shard(&key).write().insert(key, value)
    }

    /// Remove `key`, returning its value if it was present (write lock)
    pub fn remove(&self, key: &EntryKey) -> Option<Value> {
        self.shard(key).write().remove(key)
    }

    /// Add `count` to the counter at `key`, seeding it with `initial` if absent
    ///
    /// The read, the addition and the write all happen under one shard write
    /// lock. On error the stored value is left untouched.
    pub fn update_counter(&self, key: EntryKey, count: &Value, initial: &Value) -> Result<Value> {
        let mut shard = self.shard(&key).write();

        let current = shard.get(&key).unwrap_or(initial);
        if !current.is_numeric() {
            return Err(CacheError::NonNumeric {
                key: key.to_string(),
                value: current.to_string(),
            });
        }

        let next = current.checked_add(count).ok_or_else(|| {
            CacheError::CounterOverflow(format!("{} + {} at {}", current, count, key))
        })?;

        shard.insert(key, next.clone());
        Ok(next)
    }

    // =========================================================================
    // Scans
    // =========================================================================

    /// Visit every entry, collecting whatever `f` returns
    ///
    /// Shards are read one after another, so concurrent writers may be
    /// partially reflected. Result order is unspecified.
    pub fn scan<T, F>(&self, mut f: F) -> Vec<T>
    where
        F: FnMut(&EntryKey, &Value) -> Option<T>,
    {
        let mut out = Vec::new();
        for shard in &self.shards {
            let shard = shard.read();
            out.extend(shard.iter().filter_map(|(k, v)| f(k, v)));
        }
        out
    }

    /// Count the entries whose key satisfies `pred`
    pub fn count_matching<F>(&self, pred: F) -> usize
    where
        F: Fn(&EntryKey) -> bool,
    {
        self.shards
            .iter()
            .map(|shard| shard.read().keys().filter(|k| pred(k)).count())
            .sum()
    }

    /// Total number of entries across all namespaces
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    // =========================================================================
    // Bulk Operations
    // =========================================================================

    /// Delete every entry whose key satisfies `pred`, as one atomic step
    ///
    /// Returns the number of entries removed.
    pub fn match_delete<F>(&self, pred: F) -> usize
    where
        F: Fn(&EntryKey) -> bool,
    {
        let mut guards = self.write_all();

        let mut removed = 0;
        for shard in guards.iter_mut() {
            let before = shard.len();
            shard.retain(|k, _| !pred(k));
            removed += before - shard.len();
        }

        debug!(removed, "match_delete");
        removed
    }

    /// Delete every entry in the table, as one atomic step
    pub fn delete_all(&self) -> usize {
        let mut guards = self.write_all();

        let mut removed = 0;
        for shard in guards.iter_mut() {
            removed += shard.len();
            shard.clear();
        }

        debug!(removed, "delete_all");
        removed
    }

    /// Insert a batch of entries, as one atomic step
    ///
    /// Existing entries with the same identity are replaced. Returns the
    /// number of entries written.
    pub fn insert_many(&self, entries: Vec<(EntryKey, Value)>) -> usize {
        // Route outside the locks
        let mut routed: Vec<Vec<(EntryKey, Value)>> = vec![Vec::new(); self.shards.len()];
        for (key, value) in entries {
            let idx = self.shard_index(&key);
            routed[idx].push((key, value));
        }

        let mut guards = self.write_all();

        let mut written = 0;
        for (shard, batch) in guards.iter_mut().zip(routed) {
            written += batch.len();
            shard.extend(batch);
        }

        debug!(written, "insert_many");
        written
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn shard_index(&self, key: &EntryKey) -> usize {
        (self.hasher.hash_one(key) % self.shards.len() as u64) as usize
    }

    fn shard(&self, key: &EntryKey) -> &RwLock<Shard> {
        &self.shards[self.shard_index(key)]
    }

    /// Lock every shard for writing, lowest index first
    fn write_all(&self) -> Vec<RwLockWriteGuard<'_, Shard>> {
        self.shards.iter().map(|shard| shard.write()).collect()
    }
}
