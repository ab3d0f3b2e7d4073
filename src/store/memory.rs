//! In-process store using DashMap
//!
//! Deadlines are measured on the tokio clock, so tests that pause time can
//! step a key through its whole lifetime instantly. Expired keys are removed
//! lazily when touched, or eagerly through [`MemoryStore::cleanup_expired`].

use crate::error::Result;
use crate::store::Store;
use crate::ttl::KeyTtl;
use crate::value::RawValue;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Longest lifetime a key can be given; longer requests are clamped to it
pub const MAX_TTL: Duration = Duration::from_secs(30 * 365 * 86_400);

fn deadline(ttl: Duration) -> Instant {
    Instant::now() + ttl.min(MAX_TTL)
}

/// Stored value with its optional deadline
#[derive(Debug, Clone)]
pub struct StoredValue {
    pub value: RawValue,
    pub expires_at: Option<Instant>,
}

impl StoredValue {
    pub fn new(value: RawValue, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(deadline),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires| Instant::now() >= expires)
    }

    pub fn ttl(&self) -> KeyTtl {
        match self.expires_at {
            Some(expires) => KeyTtl::Expires(expires.saturating_duration_since(Instant::now())),
            None => KeyTtl::Persistent,
        }
    }
}

/// Concurrent in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: DashMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Number of keys, expired ones included until they are cleaned up
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Remove every expired key, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let before = self.data.len();
        self.data.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.data.len())
    }

    pub fn clear(&self) {
        self.data.clear();
    }

    /// Live entry for `key`, evicting it first if it has expired
    fn live_entry(&self, key: &str) -> Option<StoredValue> {
        let entry = self.data.get(key)?.clone();
        if entry.is_expired() {
            self.data.remove_if(key, |_, e| e.is_expired());
            return None;
        }
        Some(entry)
    }
}

fn is_empty_aggregate(value: &RawValue) -> bool {
    match value {
        RawValue::Text(_) => false,
        RawValue::List(items) | RawValue::Set(items) => items.is_empty(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn write(&self, key: &str, value: &RawValue, ttl: Option<Duration>) -> Result<()> {
        if is_empty_aggregate(value) {
            self.data.remove(key);
            return Ok(());
        }
        self.data
            .insert(key.to_string(), StoredValue::new(value.clone(), ttl));
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<RawValue>> {
        Ok(self.live_entry(key).map(|entry| entry.value))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        if self.live_entry(key).is_none() {
            return Ok(false);
        }
        match self.data.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(deadline(ttl));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn persist(&self, key: &str) -> Result<bool> {
        if self.live_entry(key).is_none() {
            return Ok(false);
        }
        match self.data.get_mut(key) {
            Some(mut entry) => Ok(entry.expires_at.take().is_some()),
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        Ok(self
            .live_entry(key)
            .map(|entry| entry.ttl())
            .unwrap_or(KeyTtl::Missing))
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        let mut deleted = 0;
        for key in keys {
            if let Some((_, entry)) = self.data.remove(key) {
                if !entry.is_expired() {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }
}
