//! ttlkv - a typed TTL-aware client for Redis-compatible key-value stores
//!
//! The client writes typed values, reads them back coerced to a requested
//! type, and manages each key's expiration separately from its value:
//! set, extend, inspect or clear a TTL, one key at a time or in batch.
//! Storage and expiry enforcement stay with the store.

// Core modules
pub mod config;
pub mod error;
pub mod logging;

// Feature modules
pub mod cli;
pub mod client;
pub mod coerce;
pub mod network;
pub mod store;
pub mod ttl;
pub mod value;

// Public API exports
pub use client::TtlClient;
pub use coerce::Coercion;
pub use config::Config;
pub use error::{Result, TtlKvError};
pub use store::{MemoryStore, RespStore, Store};
pub use ttl::{Expiry, KeyTtl};
pub use value::{RawValue, Scalar, Value};
