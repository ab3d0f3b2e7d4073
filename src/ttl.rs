//! Expiration arguments and TTL inspection results
//!
//! Every TTL-taking operation accepts a seconds value and a milliseconds
//! value. Zero counts as "not given". When both are given the one that
//! produces the earlier deadline is used, so a call never outlives the
//! shorter of the two requested lifetimes.

use std::fmt;
use std::time::Duration;

/// Requested expiration for a key, in one or both units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expiry {
    pub seconds: Option<u64>,
    pub milliseconds: Option<u64>,
}

impl Expiry {
    /// No expiration: the key persists
    pub const fn none() -> Self {
        Self {
            seconds: None,
            milliseconds: None,
        }
    }

    pub const fn new(seconds: Option<u64>, milliseconds: Option<u64>) -> Self {
        Self {
            seconds,
            milliseconds,
        }
    }

    pub const fn seconds(seconds: u64) -> Self {
        Self::new(Some(seconds), None)
    }

    pub const fn millis(milliseconds: u64) -> Self {
        Self::new(None, Some(milliseconds))
    }

    pub const fn with_seconds(mut self, seconds: u64) -> Self {
        self.seconds = Some(seconds);
        self
    }

    pub const fn with_millis(mut self, milliseconds: u64) -> Self {
        self.milliseconds = Some(milliseconds);
        self
    }

    /// The effective time-to-live, or `None` when no expiration applies
    pub fn resolve(&self) -> Option<Duration> {
        let seconds = self
            .seconds
            .filter(|s| *s > 0)
            .map(Duration::from_secs);
        let millis = self
            .milliseconds
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        match (seconds, millis) {
            (Some(s), Some(ms)) => Some(s.min(ms)),
            (s, ms) => s.or(ms),
        }
    }

    pub fn is_none(&self) -> bool {
        self.resolve().is_none()
    }
}

impl From<Duration> for Expiry {
    fn from(ttl: Duration) -> Self {
        Self::millis(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX))
    }
}

impl From<Option<Duration>> for Expiry {
    fn from(ttl: Option<Duration>) -> Self {
        ttl.map(Expiry::from).unwrap_or_default()
    }
}

/// Remaining lifetime of a key as reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist (or has already expired)
    Missing,
    /// The key exists and has no expiration
    Persistent,
    /// The key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Interpret a `PTTL`-style reply: -2 missing, -1 persistent, else milliseconds
    pub fn from_millis_reply(reply: i64) -> Self {
        match reply {
            -2 => KeyTtl::Missing,
            r if r < 0 => KeyTtl::Persistent,
            ms => KeyTtl::Expires(Duration::from_millis(ms as u64)),
        }
    }

    /// The same value in `PTTL` reply form
    pub fn as_millis_reply(&self) -> i64 {
        match self {
            KeyTtl::Missing => -2,
            KeyTtl::Persistent => -1,
            KeyTtl::Expires(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn exists(&self) -> bool {
        !matches!(self, KeyTtl::Missing)
    }

    pub fn remaining(&self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for KeyTtl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyTtl::Missing => write!(f, "missing"),
            KeyTtl::Persistent => write!(f, "persistent"),
            KeyTtl::Expires(d) => write!(f, "{}ms", d.as_millis()),
        }
    }
}
