//! Error types and handling for ttlkv
//!
//! This module defines the error type shared by the client, the store
//! backends and the protocol layer. Absent keys and failed coercions are
//! not errors; they surface as `None` from the read path.

use thiserror::Error;

/// Main error type for ttlkv operations
#[derive(Debug, Error)]
pub enum TtlKvError {
    #[error("Store unavailable at {address}: {message}")]
    StoreUnavailable {
        message: String,
        address: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Store replied with error to {command}: {message}")]
    StoreReply { message: String, command: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Unknown coercion target '{keyword}'")]
    InvalidCoercion { keyword: String },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        field: Option<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, TtlKvError>;

impl TtlKvError {
    /// Build a `StoreUnavailable` error from an underlying failure
    pub fn unavailable<E>(address: impl Into<String>, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TtlKvError::StoreUnavailable {
            message: message.into(),
            address: address.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a `Protocol` error
    pub fn protocol(message: impl Into<String>) -> Self {
        TtlKvError::Protocol {
            message: message.into(),
        }
    }

    /// Build a `Config` error pointing at a configuration field
    pub fn config(message: impl Into<String>, field: &str) -> Self {
        TtlKvError::Config {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Whether the store could not be reached or talked to
    pub fn is_unavailable(&self) -> bool {
        matches!(self, TtlKvError::StoreUnavailable { .. })
    }

    /// Check if the error was caused by caller input rather than the store
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TtlKvError::InvalidCoercion { .. } | TtlKvError::Config { .. }
        )
    }
}
