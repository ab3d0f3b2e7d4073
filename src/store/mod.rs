//! Backing store abstraction
//!
//! The client only talks to a [`Store`]. [`RespStore`] reaches a
//! Redis-compatible server over TCP; [`MemoryStore`] keeps keys in process
//! and is what the test suites run against.

pub mod memory;
pub mod resp;

pub use memory::MemoryStore;
pub use resp::RespStore;

use crate::error::Result;
use crate::ttl::KeyTtl;
use crate::value::RawValue;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Operations the client needs from a key-value store with expiring keys
#[async_trait]
pub trait Store: Send + Sync {
    /// Liveness check
    async fn ping(&self) -> Result<()>;

    /// Replace `key` with `value`, expiring after `ttl` when given
    async fn write(&self, key: &str, value: &RawValue, ttl: Option<Duration>) -> Result<()>;

    /// Current value of `key`, `None` if missing or expired
    async fn read(&self, key: &str) -> Result<Option<RawValue>>;

    /// Set the time-to-live of an existing key. `false` if the key is missing.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Remove the expiration of a key. `true` if one was removed.
    async fn persist(&self, key: &str) -> Result<bool>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    /// Delete keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> Result<u64>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }

    async fn write(&self, key: &str, value: &RawValue, ttl: Option<Duration>) -> Result<()> {
        (**self).write(key, value, ttl).await
    }

    async fn read(&self, key: &str) -> Result<Option<RawValue>> {
        (**self).read(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        (**self).expire(key, ttl).await
    }

    async fn persist(&self, key: &str) -> Result<bool> {
        (**self).persist(key).await
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        (**self).ttl(key).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        (**self).delete(keys).await
    }
}
