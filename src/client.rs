//! TTL-aware key client
//!
//! [`TtlClient`] is the typed facade over a [`Store`]: values go in as
//! [`Value`]s, come back coerced to a requested type, and every key's
//! expiration can be set, replaced, inspected or cleared without rewriting
//! its value. Expiry enforcement belongs to the store.
//!
//! ```rust,no_run
//! use ttlkv::{Coercion, Config, Expiry, TtlClient};
//!
//! # async fn example() -> ttlkv::Result<()> {
//! let client = TtlClient::connect(&Config::default()).await?;
//!
//! client.set("session", "token", Expiry::seconds(30)).await?;
//! client.set("visits", 17i64, Expiry::none()).await?;
//!
//! let visits = client.get("visits", Some(Coercion::Int)).await?;
//! assert_eq!(visits.and_then(|v| v.as_int()), Some(17));
//!
//! client.set_keys_ttl(["session", "visits"], Expiry::millis(5_000)).await?;
//! client.drop_key_ttl("visits").await?;
//! # Ok(())
//! # }
//! ```

use crate::coerce::Coercion;
use crate::config::Config;
use crate::error::Result;
use crate::store::{MemoryStore, RespStore, Store};
use crate::ttl::{Expiry, KeyTtl};
use crate::value::Value;
use tracing::{debug, info};

/// Typed client over a key-value store with expiring keys
#[derive(Debug)]
pub struct TtlClient<S = RespStore> {
    store: S,
}

impl TtlClient<RespStore> {
    /// Build a client for the configured store without connecting yet
    pub fn new(config: &Config) -> Self {
        Self::with_store(RespStore::new(
            config.store.clone(),
            config.network.clone(),
        ))
    }

    /// Build a client and open its connection, failing with
    /// `StoreUnavailable` if the store cannot be reached
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = Self::new(config);
        client.store.connect().await?;
        info!("Client ready for store at {}", client.store.address());
        Ok(client)
    }
}

impl TtlClient<MemoryStore> {
    /// Client over a fresh in-process store
    pub fn in_memory() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl<S: Store> TtlClient<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// `true` when the store answers, `false` when it cannot be reached
    pub async fn ping(&self) -> Result<bool> {
        match self.store.ping().await {
            Ok(()) => Ok(true),
            Err(e) if e.is_unavailable() => {
                debug!("Ping failed: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Store `value` under `key`, replacing any previous value and
    /// expiration. Without an expiry the key persists.
    pub async fn set(&self, key: &str, value: impl Into<Value>, expiry: Expiry) -> Result<()> {
        let value = value.into();
        let ttl = expiry.resolve();
        debug!(key, kind = value.type_name(), ttl = ?ttl, "set");
        self.store.write(key, &value.to_raw(), ttl).await
    }

    /// Read `key`, coercing to `coerce_to` when given.
    ///
    /// Missing and expired keys read as `None`, and so does a stored value
    /// that does not parse as the requested type.
    pub async fn get(&self, key: &str, coerce_to: Option<Coercion>) -> Result<Option<Value>> {
        let Some(raw) = self.store.read(key).await? else {
            debug!(key, "get: absent");
            return Ok(None);
        };

        let value = Value::from_raw(raw, coerce_to);
        if value.is_none() {
            debug!(key, coercion = ?coerce_to, "get: value does not coerce");
        }
        Ok(value)
    }

    /// Attach or replace the expiration of an existing key.
    ///
    /// Returns whether a TTL was applied: missing keys and an empty
    /// [`Expiry`] are silently ignored.
    pub async fn set_key_ttl(&self, key: &str, expiry: Expiry) -> Result<bool> {
        let Some(ttl) = expiry.resolve() else {
            return Ok(false);
        };
        let applied = self.store.expire(key, ttl).await?;
        debug!(key, ttl = ?ttl, applied, "set_key_ttl");
        Ok(applied)
    }

    /// Apply the same expiration to every key of a collection, skipping
    /// missing ones. Returns how many keys received it.
    ///
    /// Keys are updated one request at a time; an error part-way leaves the
    /// keys already processed with their new TTL.
    pub async fn set_keys_ttl<I, K>(&self, keys: I, expiry: Expiry) -> Result<usize>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let Some(ttl) = expiry.resolve() else {
            return Ok(0);
        };

        let mut applied = 0;
        let mut total = 0usize;
        for key in keys {
            total += 1;
            if self.store.expire(key.as_ref(), ttl).await? {
                applied += 1;
            }
        }
        debug!(total, applied, ttl = ?ttl, "set_keys_ttl");
        Ok(applied)
    }

    /// Remove the expiration of `key`. Returns whether one was removed;
    /// keys without a TTL and missing keys are left alone.
    pub async fn drop_key_ttl(&self, key: &str) -> Result<bool> {
        let dropped = self.store.persist(key).await?;
        debug!(key, dropped, "drop_key_ttl");
        Ok(dropped)
    }

    /// Batch form of [`drop_key_ttl`](Self::drop_key_ttl). Returns how many
    /// keys had an expiration removed.
    pub async fn drop_keys_ttl<I, K>(&self, keys: I) -> Result<usize>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut dropped = 0;
        for key in keys {
            if self.store.persist(key.as_ref()).await? {
                dropped += 1;
            }
        }
        debug!(dropped, "drop_keys_ttl");
        Ok(dropped)
    }

    /// Remaining lifetime of `key`
    pub async fn get_key_ttl(&self, key: &str) -> Result<KeyTtl> {
        self.store.ttl(key).await
    }

    /// Delete keys, returning how many existed
    pub async fn delete<I, K>(&self, keys: I) -> Result<u64>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        self.store.delete(&keys).await
    }
}
