//! A single authenticated connection to the backing store
//!
//! One request is in flight at a time: a command is written, then exactly
//! one reply frame is read back. Every I/O step is bounded by the configured
//! timeouts and any failure is reported as `StoreUnavailable`.

use crate::config::{NetworkConfig, StoreConfig};
use crate::error::{Result, TtlKvError};
use crate::network::protocol::{RespCodec, RespValue};
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const READ_BUFFER_SIZE: usize = 4096;

/// Connection to a Redis-compatible store
#[derive(Debug)]
pub struct StoreConnection {
    stream: TcpStream,
    buffer: BytesMut,
    codec: RespCodec,
    address: String,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl StoreConnection {
    /// Connect, authenticate and select the configured database
    pub async fn open(store: &StoreConfig, network: &NetworkConfig) -> Result<Self> {
        let address = store.address();
        debug!("Connecting to store at {}", address);

        let stream = match timeout(network.connect_timeout(), TcpStream::connect(address.as_str())).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(TtlKvError::unavailable(
                    address.clone(),
                    format!("failed to connect: {e}"),
                    e,
                ))
            }
            Err(elapsed) => {
                return Err(TtlKvError::unavailable(
                    address.clone(),
                    "connect timed out",
                    elapsed,
                ))
            }
        };

        if let Err(e) = stream.set_nodelay(network.tcp_nodelay) {
            warn!("Failed to set TCP_NODELAY on {}: {}", address, e);
        }

        let mut connection = Self {
            stream,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
            codec: RespCodec::new(),
            address,
            read_timeout: network.read_timeout(),
            write_timeout: network.write_timeout(),
        };

        connection.handshake(store).await?;
        info!("Connected to store at {} (db {})", connection.address, store.db);
        Ok(connection)
    }

    async fn handshake(&mut self, store: &StoreConfig) -> Result<()> {
        if let Some(password) = &store.password {
            let reply = match &store.username {
                Some(username) => self.request(&["AUTH", username.as_str(), password.as_str()]).await,
                None => self.request(&["AUTH", password.as_str()]).await,
            };
            self.expect_handshake_ok("AUTH", reply)?;
        }

        if store.db != 0 {
            let db = store.db.to_string();
            let reply = self.request(&["SELECT", db.as_str()]).await;
            self.expect_handshake_ok("SELECT", reply)?;
        }

        Ok(())
    }

    fn expect_handshake_ok(&self, command: &str, reply: Result<RespValue>) -> Result<()> {
        match reply {
            Ok(RespValue::SimpleString(_)) => Ok(()),
            Ok(other) => Err(TtlKvError::StoreUnavailable {
                message: format!("unexpected {command} reply: {other:?}"),
                address: self.address.clone(),
                source: None,
            }),
            Err(TtlKvError::StoreReply { message, .. }) => Err(TtlKvError::StoreUnavailable {
                message: format!("{command} rejected: {message}"),
                address: self.address.clone(),
                source: None,
            }),
            Err(e) => Err(e),
        }
    }

    /// Send one command and wait for its reply.
    ///
    /// Error replies from the store come back as `StoreReply`.
    pub async fn request<S: AsRef<str>>(&mut self, parts: &[S]) -> Result<RespValue> {
        let command = parts
            .first()
            .map(|p| p.as_ref().to_ascii_uppercase())
            .unwrap_or_default();
        let frame = self.codec.encode_command(parts);

        match timeout(self.write_timeout, self.stream.write_all(&frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(TtlKvError::unavailable(
                    self.address.clone(),
                    format!("failed to send {command}: {e}"),
                    e,
                ))
            }
            Err(elapsed) => {
                return Err(TtlKvError::unavailable(
                    self.address.clone(),
                    format!("timed out sending {command}"),
                    elapsed,
                ))
            }
        }

        let reply = match timeout(self.read_timeout, self.read_reply()).await {
            Ok(reply) => reply?,
            Err(elapsed) => {
                return Err(TtlKvError::unavailable(
                    self.address.clone(),
                    format!("timed out waiting for {command} reply"),
                    elapsed,
                ))
            }
        };

        debug!(command = %command, reply = ?reply, "store round-trip");

        match reply {
            RespValue::Error(message) => Err(TtlKvError::StoreReply { message, command }),
            other => Ok(other),
        }
    }

    async fn read_reply(&mut self) -> Result<RespValue> {
        loop {
            match self.codec.decode(&mut self.buffer) {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) => {
                    // The stream is out of sync from here on
                    self.buffer.clear();
                    return Err(e);
                }
            }

            match self.stream.read_buf(&mut self.buffer).await {
                Ok(0) => {
                    return Err(TtlKvError::StoreUnavailable {
                        message: "connection closed by store".to_string(),
                        address: self.address.clone(),
                        source: None,
                    })
                }
                Ok(_) => continue,
                Err(e) => {
                    return Err(TtlKvError::unavailable(
                        self.address.clone(),
                        format!("failed to read reply: {e}"),
                        e,
                    ))
                }
            }
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Close the connection
    pub async fn close(mut self) {
        debug!("Closing store connection to {}", self.address);
        if let Err(e) = self.stream.shutdown().await {
            warn!("Error during disconnect: {}", e);
        }
    }
}
