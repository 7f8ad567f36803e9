// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, warn};

const KEY_PREFIX: &str = "cache:";

/// Default lifetime used when a caller passes no ttl.
pub const DEFAULT_TTL_SECS: u64 = 300;

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "v")]
    pub value: Value,
    #[serde(rename = "t")]
    pub timestamp: i64,
    pub ttl: i64,
}

impl CacheEntry {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp > self.ttl
    }
}

/// TTL cache of JSON values kept in persistent storage.
#[derive(Clone)]
pub struct LocalCache {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache").finish_non_exhaustive()
    }
}

impl LocalCache {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    fn storage_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    /// Returns the value for `key` unless it is missing or expired. Expired
    /// entries are removed on the way out.
    pub fn get(&self, key: &str) -> Option<Value> {
        let storage_key = Self::storage_key(key);
        let raw = self.storage.get_item(&storage_key)?;
        let entry: CacheEntry = serde_json::from_str(&raw).ok()?;

        if entry.is_expired(self.clock.now_ms()) {
            debug!("Cache entry expired: {}", key);
            if let Err(e) = self.storage.remove_item(&storage_key) {
                warn!("Failed to evict cache entry {}: {}", key, e);
            }
            return None;
        }

        if entry.value.is_null() {
            return None;
        }
        Some(entry.value)
    }

    pub fn set(&self, key: &str, value: Value, ttl_ms: i64) {
        let entry = CacheEntry {
            value,
            timestamp: self.clock.now_ms(),
            ttl: ttl_ms,
        };
        let result = serde_json::to_string(&entry)
            .map_err(std::io::Error::from)
            .and_then(|raw| self.storage.set_item(&Self::storage_key(key), &raw));
        if let Err(e) = result {
            warn!("Failed to cache {}: {}", key, e);
        }
    }

    /// Drops every cached response, leaving the rest of the storage alone.
    pub fn clear(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        for key in self.storage.keys() {
            if key.starts_with(KEY_PREFIX) {
                self.storage.remove_item(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

/// Converts a per-call ttl in seconds to milliseconds, defaulting to
/// [`DEFAULT_TTL_SECS`] for a missing or zero ttl.
pub fn ttl_ms(ttl_seconds: Option<u64>) -> i64 {
    let secs = match ttl_seconds {
        Some(0) | None => DEFAULT_TTL_SECS,
        Some(secs) => secs,
    };
    (secs as i64).saturating_mul(1000)
}
