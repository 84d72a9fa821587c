//! Copy-on-write map split into independently shared shards
//!
//! Snapshots clone their maps on every write batch. Cloning a `ShardedMap`
//! copies one `Arc` per shard; a shard's entries are copied only when a
//! write lands in it while an older snapshot still shares it.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

const SHARD_COUNT: usize = 1024;

/// String-keyed map whose clones share untouched shards
#[derive(Debug, Clone)]
pub struct ShardedMap<V> {
    shards: Vec<Arc<HashMap<String, V>>>,
    len: usize,
}

impl<V> Default for ShardedMap<V> {
    fn default() -> Self {
        let empty = Arc::new(HashMap::new());
        Self {
            shards: vec![empty; SHARD_COUNT],
            len: 0,
        }
    }
}

fn shard_of(key: &str) -> usize {
    (xxh3_64(key.as_bytes()) % SHARD_COUNT as u64) as usize
}

impl<V> ShardedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.shards[shard_of(key)].get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.shards[shard_of(key)].contains_key(key)
    }

    /// Entries in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.shards.iter().flat_map(|shard| shard.iter())
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl<V: Clone> ShardedMap<V> {
    pub fn insert(&mut self, key: String, value: V) -> Option<V> {
        let shard = Arc::make_mut(&mut self.shards[shard_of(&key)]);
        let previous = shard.insert(key, value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Leaves the shard shared when the key is absent
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let idx = shard_of(key);
        if !self.shards[idx].contains_key(key) {
            return None;
        }
        let removed = Arc::make_mut(&mut self.shards[idx]).remove(key);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let idx = shard_of(key);
        if !self.shards[idx].contains_key(key) {
            return None;
        }
        Arc::make_mut(&mut self.shards[idx]).get_mut(key)
    }

    pub fn get_or_insert_with(&mut self, key: &str, default: impl FnOnce() -> V) -> &mut V {
        let shard = Arc::make_mut(&mut self.shards[shard_of(key)]);
        match shard.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.len += 1;
                entry.insert(default())
            }
        }
    }
}

#[cfg(test)]
impl<V> ShardedMap<V> {
    fn shared_shards(&self, other: &Self) -> usize {
        self.shards
            .iter()
            .zip(other.shards.iter())
            .filter(|(a, b)| Arc::ptr_eq(a, b))
            .count()
    }
}
