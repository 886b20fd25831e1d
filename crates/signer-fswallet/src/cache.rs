//! Size-aware LRU cache for decrypted signing keys.
//!
//! Entries carry a TTL that every read refreshes; expired entries are
//! reaped lazily on access and eagerly when space is needed. When the total
//! accounted size exceeds the ceiling, least-recently-used entries are
//! evicted first.
//!
//! The cache owns its [`KeyPair`]s behind `Arc`: eviction drops the cache's
//! reference, and the private scalar zeroizes when the last in-flight
//! signing call releases its borrow.

use std::collections::HashMap;
use std::mem::size_of;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use evm_signer_core::KeyPair;

/// An internally synchronized LRU+TTL key cache.
pub struct SignerCache {
    inner: Mutex<Inner>,
    max_size: u64,
    ttl: Duration,
}

struct Inner {
    entries: HashMap<String, Entry>,
    total_size: u64,
    clock: u64,
}

struct Entry {
    keypair: Arc<KeyPair>,
    size: u64,
    expires_at: Instant,
    last_used: u64,
}

impl SignerCache {
    /// Creates a cache with a byte-size ceiling and per-entry TTL.
    #[must_use]
    pub fn new(max_size: u64, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                total_size: 0,
                clock: 0,
            }),
            max_size,
            ttl,
        }
    }

    /// Looks up a key, refreshing its TTL and recency on a hit.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<KeyPair>> {
        let mut inner = self.inner.lock().expect("signer cache poisoned");
        inner.clock += 1;
        let clock = inner.clock;

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.expires_at <= Instant::now(),
            None => return None,
        };
        if expired {
            if let Some(entry) = inner.entries.remove(key) {
                inner.total_size -= entry.size;
            }
            return None;
        }

        let ttl = self.ttl;
        let entry = inner.entries.get_mut(key)?;
        entry.expires_at = Instant::now() + ttl;
        entry.last_used = clock;
        Some(Arc::clone(&entry.keypair))
    }

    /// Inserts a key, evicting least-recently-used entries as needed to
    /// respect the size ceiling.
    pub fn insert(&self, key: String, keypair: Arc<KeyPair>) {
        let size = entry_size(&key);
        let mut inner = self.inner.lock().expect("signer cache poisoned");
        inner.clock += 1;
        let clock = inner.clock;

        if let Some(old) = inner.entries.remove(&key) {
            inner.total_size -= old.size;
        }
        inner.total_size += size;
        inner.entries.insert(
            key,
            Entry {
                keypair,
                size,
                expires_at: Instant::now() + self.ttl,
                last_used: clock,
            },
        );

        // Reap expired entries before touching live ones
        if inner.total_size > self.max_size {
            let now = Instant::now();
            let expired: Vec<String> = inner
                .entries
                .iter()
                .filter(|(_, e)| e.expires_at <= now)
                .map(|(k, _)| k.clone())
                .collect();
            for k in expired {
                if let Some(entry) = inner.entries.remove(&k) {
                    inner.total_size -= entry.size;
                }
            }
        }

        while inner.total_size > self.max_size && inner.entries.len() > 1 {
            let Some(lru_key) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            if let Some(entry) = inner.entries.remove(&lru_key) {
                inner.total_size -= entry.size;
            }
        }
    }

    /// Drops one entry, if present. Used when the file behind an address is
    /// superseded: the stale key must never be served again.
    pub fn remove(&self, key: &str) {
        let mut inner = self.inner.lock().expect("signer cache poisoned");
        if let Some(entry) = inner.entries.remove(key) {
            inner.total_size -= entry.size;
        }
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("signer cache poisoned").entries.len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("signer cache poisoned");
        inner.entries.clear();
        inner.total_size = 0;
    }
}

/// Accounted cost of one cached key: the map entry, the key pair, and the
/// address string keying it.
fn entry_size(key: &str) -> u64 {
    (size_of::<Entry>() + size_of::<KeyPair>() + key.len()) as u64
}
