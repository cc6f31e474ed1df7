//! Sharded expiring store of named decimals
//!
//! Partitions the keyspace into shards by name hash. Each shard is guarded by
//! an RwLock, so every operation on one name is serialized by that shard's
//! lock while names in other shards proceed in parallel.
//!
//! Expiration is checked on every read; the periodic sweep only reclaims
//! memory and is never needed for correctness.

use crate::config::StoreConfig;
use crate::decimal::Decimal;
use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

/// Entry in the store with metadata
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored value
    pub value: Decimal,
    /// When the entry was created
    pub created_at: Instant,
    /// Deadline after which the entry is absent
    pub expires_at: Instant,
    /// Number of writes applied (1 after create)
    pub version: u64,
}

impl Entry {
    /// Create a new entry
    pub fn new(value: Decimal, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl,
            version: 1,
        }
    }

    /// Successor entry holding `value` with a fresh deadline
    fn renewed(&self, value: Decimal, ttl: Duration) -> Self {
        Self {
            value,
            created_at: self.created_at,
            expires_at: Instant::now() + ttl,
            version: self.version + 1,
        }
    }

    /// Check if entry has expired
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// A single shard containing a portion of the keyspace
pub struct Shard {
    data: RwLock<HashMap<String, Entry>>,
}

impl Shard {
    /// Create a new empty shard
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Get an entry by name (returns None if expired)
    pub fn get(&self, key: &str) -> Option<Entry> {
        let guard = self.data.read();
        guard.get(key).and_then(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.clone())
            }
        })
    }

    /// Insert a new entry unless a live one exists
    pub fn create(&self, key: &str, value: Decimal, ttl: Duration) -> Result<(), StoreError> {
        let mut guard = self.data.write();

        if let Some(existing) = guard.get(key) {
            if !existing.is_expired() {
                return Err(StoreError::AlreadyExists(key.to_string()));
            }
        }

        // Absent or expired leftover - replace it
        guard.insert(key.to_string(), Entry::new(value, ttl));
        Ok(())
    }

    /// Replace value and deadline of a live entry
    pub fn set(&self, key: &str, value: Decimal, ttl: Duration) -> Result<(), StoreError> {
        let mut guard = self.data.write();

        let renewed = guard
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.renewed(value, ttl));

        match renewed {
            Some(entry) => {
                // Single insert swaps the whole entry
                guard.insert(key.to_string(), entry);
                Ok(())
            }
            None => {
                // Drop an expired leftover, if any
                guard.remove(key);
                Err(StoreError::NotFound(key.to_string()))
            }
        }
    }

    /// Remove a live entry
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.data.write();
        match guard.remove(key) {
            Some(entry) if !entry.is_expired() => Ok(()),
            _ => Err(StoreError::NotFound(key.to_string())),
        }
    }

    /// Check if name exists (and not expired)
    pub fn exists(&self, key: &str) -> bool {
        let guard = self.data.read();
        guard.get(key).map(|e| !e.is_expired()).unwrap_or(false)
    }

    /// Get entry count (including expired - for stats)
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if shard is empty
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Remove all expired entries, returns count removed
    pub fn cleanup_expired(&self) -> usize {
        let mut guard = self.data.write();
        let before = guard.len();
        guard.retain(|_, entry| !entry.is_expired());
        before - guard.len()
    }
}

impl Default for Shard {
    fn default() -> Self {
        Self::new()
    }
}

/// Sharded store of named decimals with sliding expiration
pub struct NumberStore {
    shards: Vec<Shard>,
    num_shards: usize,
    ttl: Duration,
}

impl NumberStore {
    /// Create a store with default configuration
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    /// Create a store from configuration
    pub fn with_config(config: &StoreConfig) -> Self {
        let num_shards = config.num_shards.max(1);
        let shards = (0..num_shards).map(|_| Shard::new()).collect();
        Self {
            shards,
            num_shards,
            ttl: config.ttl,
        }
    }

    /// Get the shard for a given name
    #[inline]
    fn shard_for_key(&self, key: &str) -> &Shard {
        let hash = Self::hash_key(key);
        let idx = hash as usize % self.num_shards;
        &self.shards[idx]
    }

    /// Hash a name to u64
    #[inline]
    fn hash_key(key: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    /// Get a value by name
    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.shard_for_key(key).get(key).map(|entry| entry.value)
    }

    /// Get a snapshot of the entry stored under a name
    pub fn get_entry(&self, key: &str) -> Option<Entry> {
        self.shard_for_key(key).get(key)
    }

    /// Create a new entry, failing if a live one exists
    pub fn create(&self, key: &str, value: Decimal) -> Result<(), StoreError> {
        self.shard_for_key(key).create(key, value, self.ttl)
    }

    /// Replace an existing entry and reset its deadline
    pub fn set(&self, key: &str, value: Decimal) -> Result<(), StoreError> {
        self.shard_for_key(key).set(key, value, self.ttl)
    }

    /// Delete an existing entry
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.shard_for_key(key).delete(key)
    }

    /// Check if name exists
    pub fn exists(&self, key: &str) -> bool {
        self.shard_for_key(key).exists(key)
    }

    /// Entry lifetime applied by create and set
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get total entry count across all shards (including unswept expired)
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.len()).sum()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.is_empty())
    }

    /// Get number of shards
    pub fn num_shards(&self) -> usize {
        self.num_shards
    }

    /// Cleanup expired entries shard by shard, returns total removed
    pub fn cleanup_expired(&self) -> usize {
        self.shards.iter().map(|s| s.cleanup_expired()).sum()
    }
}

impl Default for NumberStore {
    fn default() -> Self {
        Self::new()
    }
}
