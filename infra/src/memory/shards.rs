//! Fixed set of independently locked hash maps keyed by identifier.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Mutex;

use og_core::errors::{OtpError, OtpResult};
use tracing::warn;

/// Identifier-keyed map split across `shard_count` mutexes
///
/// An identifier always hashes to the same shard. Closures passed in run
/// under that shard's lock and must not block or await.
pub(crate) struct ShardedMap<V> {
    shards: Vec<Mutex<HashMap<String, V>>>,
    hasher: RandomState,
}

impl<V> ShardedMap<V> {
    pub(crate) fn new(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1)).map(|_| Mutex::new(HashMap::new())).collect();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    fn shard_for(&self, key: &str) -> &Mutex<HashMap<String, V>> {
        let index = (self.hasher.hash_one(key) % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    /// Run `f` on the shard owning `key`
    pub(crate) fn with_shard<R>(&self, key: &str, f: impl FnOnce(&mut HashMap<String, V>) -> R) -> OtpResult<R> {
        let mut shard = self
            .shard_for(key)
            .lock()
            .map_err(|_| OtpError::transient("in-memory shard lock poisoned"))?;
        Ok(f(&mut shard))
    }

    /// Remove every entry for which `is_stale` returns true
    ///
    /// Each shard is scanned under its lock without removing anything, then
    /// each stale key is removed under its own lock acquisition after the
    /// predicate is checked again. Foreground calls interleave between
    /// removals. Returns the number of entries removed.
    pub(crate) fn remove_stale(&self, is_stale: impl Fn(&V) -> bool) -> usize {
        let mut removed = 0;
        for index in 0..self.shards.len() {
            for key in self.stale_keys(index, &is_stale) {
                if self.remove_if(index, &key, &is_stale) {
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Keys in shard `index` that look stale; poisoned shards yield none
    pub(crate) fn stale_keys(&self, index: usize, is_stale: impl Fn(&V) -> bool) -> Vec<String> {
        match self.shards[index].lock() {
            Ok(entries) => entries
                .iter()
                .filter(|(_, value)| is_stale(*value))
                .map(|(key, _)| key.clone())
                .collect(),
            Err(_) => {
                warn!(shard = index, "Skipping poisoned shard during sweep");
                Vec::new()
            }
        }
    }

    /// Remove `key` from shard `index` if it is still stale
    pub(crate) fn remove_if(&self, index: usize, key: &str, is_stale: impl Fn(&V) -> bool) -> bool {
        let mut entries = match self.shards[index].lock() {
            Ok(entries) => entries,
            Err(_) => return false,
        };
        if entries.get(key).map_or(false, |value| is_stale(value)) {
            entries.remove(key);
            true
        } else {
            false
        }
    }

    /// Total entries across readable shards
    pub(crate) fn len(&self) -> usize {
        self.shards
            .iter()
            .filter_map(|shard| shard.lock().ok().map(|entries| entries.len()))
            .sum()
    }

    pub(crate) fn shard_count(&self) -> usize {
        self.shards.len()
    }
}
