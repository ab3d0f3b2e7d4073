//! Store backend for Redis-compatible servers
//!
//! Each trait operation maps onto one or a few RESP commands. The
//! connection is opened on first use and dropped on any transport failure
//! or unreadable reply; the following call reconnects. Nothing is retried.
//! Aggregate writes run as one `MULTI`/`EXEC` transaction.

use crate::config::{NetworkConfig, StoreConfig};
use crate::error::{Result, TtlKvError};
use crate::network::{RespValue, StoreConnection};
use crate::store::Store;
use crate::ttl::KeyTtl;
use crate::value::RawValue;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Store reached over TCP with the RESP2 protocol
#[derive(Debug)]
pub struct RespStore {
    store: StoreConfig,
    network: NetworkConfig,
    connection: Mutex<Option<StoreConnection>>,
}

impl RespStore {
    /// Create a store handle. No connection is made until the first request.
    pub fn new(store: StoreConfig, network: NetworkConfig) -> Self {
        Self {
            store,
            network,
            connection: Mutex::new(None),
        }
    }

    pub fn address(&self) -> String {
        self.store.address()
    }

    /// Open the connection now instead of on first use
    pub async fn connect(&self) -> Result<()> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(StoreConnection::open(&self.store, &self.network).await?);
        }
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Drop the current connection, if any
    pub async fn disconnect(&self) {
        if let Some(connection) = self.connection.lock().await.take() {
            connection.close().await;
        }
    }

    /// Run a sequence of commands on one connection, returning every reply
    async fn run(&self, commands: &[Vec<String>]) -> Result<Vec<RespValue>> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(StoreConnection::open(&self.store, &self.network).await?);
        }

        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            let Some(connection) = guard.as_mut() else {
                break;
            };
            match connection.request(command).await {
                Ok(reply) => replies.push(reply),
                Err(e) => {
                    self.release_if_broken(&mut guard, &e);
                    return Err(e);
                }
            }
        }
        Ok(replies)
    }

    /// Run commands inside `MULTI`/`EXEC` so the store applies all or none.
    ///
    /// A command the store refuses to queue discards the transaction.
    async fn run_atomic(&self, commands: &[Vec<String>]) -> Result<Vec<RespValue>> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(StoreConnection::open(&self.store, &self.network).await?);
        }
        let Some(connection) = guard.as_mut() else {
            return Err(TtlKvError::protocol("No store connection"));
        };

        let result = transaction(connection, commands).await;
        if let Err(e) = &result {
            self.release_if_broken(&mut guard, e);
        }
        result
    }

    /// Drop the connection after a failure that leaves it unusable
    fn release_if_broken(&self, connection: &mut Option<StoreConnection>, error: &TtlKvError) {
        if error.is_unavailable() || matches!(error, TtlKvError::Protocol { .. }) {
            warn!("Dropping store connection to {}: {}", self.store.address(), error);
            *connection = None;
        }
    }

    async fn run_one(&self, command: Vec<String>) -> Result<RespValue> {
        let mut replies = self.run(std::slice::from_ref(&command)).await?;
        replies
            .pop()
            .ok_or_else(|| TtlKvError::protocol(format!("No reply to {}", command[0])))
    }
}

async fn transaction(
    connection: &mut StoreConnection,
    commands: &[Vec<String>],
) -> Result<Vec<RespValue>> {
    connection.request(&["MULTI"]).await?;
    for command in commands {
        if let Err(e) = connection.request(command).await {
            if matches!(e, TtlKvError::StoreReply { .. }) {
                connection.request(&["DISCARD"]).await?;
            }
            return Err(e);
        }
    }

    match connection.request(&["EXEC"]).await? {
        RespValue::Array(replies) => {
            for (command, reply) in commands.iter().zip(&replies) {
                if let RespValue::Error(message) = reply {
                    return Err(TtlKvError::StoreReply {
                        message: message.clone(),
                        command: command[0].to_ascii_uppercase(),
                    });
                }
            }
            Ok(replies)
        }
        RespValue::BulkString(None) => Err(TtlKvError::StoreReply {
            message: "transaction aborted".to_string(),
            command: "EXEC".to_string(),
        }),
        other => Err(TtlKvError::protocol(format!(
            "Unexpected EXEC reply: {other:?}"
        ))),
    }
}

fn cmd<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

fn millis(ttl: Duration) -> String {
    // PX/PEXPIRE reject zero, the shortest valid lifetime is 1ms
    ttl.as_millis().max(1).to_string()
}

fn expect_integer(command: &str, reply: RespValue) -> Result<i64> {
    match reply {
        RespValue::Integer(i) => Ok(i),
        other => Err(TtlKvError::protocol(format!(
            "Expected integer reply to {command}, got {other:?}"
        ))),
    }
}

fn expect_strings(command: &str, reply: RespValue) -> Result<Vec<String>> {
    match reply {
        RespValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                RespValue::BulkString(Some(s)) | RespValue::SimpleString(s) => Ok(s),
                other => Err(TtlKvError::protocol(format!(
                    "Expected string element in {command} reply, got {other:?}"
                ))),
            })
            .collect(),
        RespValue::BulkString(None) => Ok(Vec::new()),
        other => Err(TtlKvError::protocol(format!(
            "Expected array reply to {command}, got {other:?}"
        ))),
    }
}

#[async_trait]
impl Store for RespStore {
    async fn ping(&self) -> Result<()> {
        match self.run_one(cmd(["PING"])).await? {
            RespValue::SimpleString(_) | RespValue::BulkString(Some(_)) => Ok(()),
            other => Err(TtlKvError::protocol(format!(
                "Unexpected PING reply: {other:?}"
            ))),
        }
    }

    async fn write(&self, key: &str, value: &RawValue, ttl: Option<Duration>) -> Result<()> {
        match value {
            RawValue::Text(text) => {
                let mut set = cmd(["SET", key, text.as_str()]);
                if let Some(ttl) = ttl {
                    set.push("PX".to_string());
                    set.push(millis(ttl));
                }
                self.run_one(set).await?;
            }
            RawValue::List(items) | RawValue::Set(items) if items.is_empty() => {
                self.run_one(cmd(["DEL", key])).await?;
            }
            RawValue::List(items) | RawValue::Set(items) => {
                let verb = if matches!(value, RawValue::List(_)) {
                    "RPUSH"
                } else {
                    "SADD"
                };
                let mut push = cmd([verb, key]);
                push.extend(items.iter().cloned());

                let mut commands = vec![cmd(["DEL", key]), push];
                if let Some(ttl) = ttl {
                    commands.push(cmd(["PEXPIRE".to_string(), key.to_string(), millis(ttl)]));
                }
                self.run_atomic(&commands).await?;
            }
        }
        debug!(key, ttl = ?ttl, "stored value");
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<RawValue>> {
        let kind = match self.run_one(cmd(["TYPE", key])).await? {
            RespValue::SimpleString(kind) | RespValue::BulkString(Some(kind)) => kind,
            other => {
                return Err(TtlKvError::protocol(format!(
                    "Unexpected TYPE reply: {other:?}"
                )))
            }
        };

        match kind.as_str() {
            "none" => Ok(None),
            "string" => match self.run_one(cmd(["GET", key])).await? {
                RespValue::BulkString(value) => Ok(value.map(RawValue::Text)),
                other => Err(TtlKvError::protocol(format!(
                    "Unexpected GET reply: {other:?}"
                ))),
            },
            "list" => {
                let items = expect_strings("LRANGE", self.run_one(cmd(["LRANGE", key, "0", "-1"])).await?)?;
                // An empty reply means the key expired between TYPE and LRANGE
                Ok((!items.is_empty()).then_some(RawValue::List(items)))
            }
            "set" => {
                let items = expect_strings("SMEMBERS", self.run_one(cmd(["SMEMBERS", key])).await?)?;
                Ok((!items.is_empty()).then_some(RawValue::Set(items)))
            }
            other => {
                warn!(key, kind = other, "unsupported store type, reading as absent");
                Ok(None)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let reply = self
            .run_one(cmd(["PEXPIRE".to_string(), key.to_string(), millis(ttl)]))
            .await?;
        Ok(expect_integer("PEXPIRE", reply)? == 1)
    }

    async fn persist(&self, key: &str) -> Result<bool> {
        let reply = self.run_one(cmd(["PERSIST", key])).await?;
        Ok(expect_integer("PERSIST", reply)? == 1)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let reply = self.run_one(cmd(["PTTL", key])).await?;
        Ok(KeyTtl::from_millis_reply(expect_integer("PTTL", reply)?))
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut del = cmd(["DEL"]);
        del.extend(keys.iter().cloned());
        let reply = self.run_one(del).await?;
        Ok(expect_integer("DEL", reply)?.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_never_zero() {
        assert_eq!(millis(Duration::from_micros(10)), "1");
        assert_eq!(millis(Duration::from_secs(5)), "5000");
    }

    #[test]
    fn test_expect_strings() {
        let reply = RespValue::Array(vec![RespValue::bulk("a"), RespValue::bulk("b")]);
        assert_eq!(expect_strings("LRANGE", reply).unwrap(), vec!["a", "b"]);
        assert!(expect_strings("LRANGE", RespValue::Integer(1)).is_err());
        assert!(expect_strings(
            "LRANGE",
            RespValue::Array(vec![RespValue::Integer(3)])
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        // Bind then drop a listener to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let store = RespStore::new(
            StoreConfig {
                host: "127.0.0.1".to_string(),
                port,
                ..StoreConfig::default()
            },
            NetworkConfig::default(),
        );

        let err = store.ping().await.unwrap_err();
        assert!(err.is_unavailable(), "unexpected error: {err:?}");
        assert!(!store.is_connected().await);
    }
}
