//! Shared helpers for integration tests
//!
//! `FakeStoreServer` speaks enough RESP2 to stand in for a Redis-compatible
//! store: it decodes commands with the crate's own codec and applies them to
//! a `MemoryStore`, recording every command it receives.

#![allow(dead_code)]

use bytes::BytesMut;
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use ttlkv::config::{Config, NetworkConfig, StoreConfig};
use ttlkv::network::{RespCodec, RespValue};
use ttlkv::{KeyTtl, MemoryStore, RawValue, Store};

/// Global mutex so tests touching `TTLKV_*` variables run serially
pub static GLOBAL_CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

/// Remove every `TTLKV_` variable, returning the originals for restoration
pub fn clean_ttlkv_env() -> HashMap<String, String> {
    let original: HashMap<String, String> = env::vars()
        .filter(|(key, _)| key.starts_with("TTLKV_"))
        .collect();
    for key in original.keys() {
        env::remove_var(key);
    }
    original
}

/// Drop any `TTLKV_` variable a test set and put the originals back
pub fn restore_env(original: HashMap<String, String>) {
    for (key, _) in env::vars() {
        if key.starts_with("TTLKV_") {
            env::remove_var(&key);
        }
    }
    for (key, value) in original {
        env::set_var(key, value);
    }
}

/// Behaviour switches for the fake server
#[derive(Debug, Clone, Default)]
pub struct FakeServerOptions {
    /// Require `AUTH` with this password before any other command
    pub password: Option<String>,
    /// Username expected alongside the password
    pub username: Option<String>,
    /// Answer this command (uppercase) with an error reply. Inside a
    /// transaction the error comes back when the command is queued and
    /// `EXEC` then aborts, as Redis does for commands it cannot queue.
    pub failing_command: Option<String>,
}

struct ServerState {
    options: FakeServerOptions,
    store: MemoryStore,
    commands: Mutex<Vec<Vec<String>>>,
    selected_dbs: Mutex<Vec<u32>>,
    close_next: AtomicBool,
    garble_next: AtomicBool,
}

/// RESP server over a `MemoryStore`, listening on an ephemeral port
pub struct FakeStoreServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    handle: JoinHandle<()>,
}

impl FakeStoreServer {
    pub async fn start() -> Self {
        Self::start_with(FakeServerOptions::default()).await
    }

    pub async fn start_with(options: FakeServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ServerState {
            options,
            store: MemoryStore::new(),
            commands: Mutex::new(Vec::new()),
            selected_dbs: Mutex::new(Vec::new()),
            close_next: AtomicBool::new(false),
            garble_next: AtomicBool::new(false),
        });

        let accept_state = state.clone();
        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve_connection(socket, accept_state.clone()));
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Client configuration pointing at this server with short timeouts
    pub fn config(&self) -> Config {
        Config {
            store: StoreConfig {
                host: self.addr.ip().to_string(),
                port: self.addr.port(),
                username: self.state.options.username.clone(),
                password: self.state.options.password.clone(),
                db: 0,
            },
            network: NetworkConfig {
                connect_timeout: 2,
                read_timeout: 2,
                write_timeout: 2,
                ..NetworkConfig::default()
            },
            ..Config::default()
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.state.store
    }

    /// Every command received so far, in order
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.state.commands.lock().unwrap().clone()
    }

    /// Names of the commands received so far
    pub fn command_names(&self) -> Vec<String> {
        self.commands().into_iter().map(|c| c[0].clone()).collect()
    }

    pub fn clear_commands(&self) {
        self.state.commands.lock().unwrap().clear();
    }

    pub fn selected_dbs(&self) -> Vec<u32> {
        self.state.selected_dbs.lock().unwrap().clone()
    }

    /// Close the connection that receives the next command, without replying
    pub fn close_on_next_command(&self) {
        self.state.close_next.store(true, Ordering::SeqCst);
    }

    /// Answer the next command with a bulk string that is not valid UTF-8
    pub fn reply_invalid_utf8_to_next_command(&self) {
        self.state.garble_next.store(true, Ordering::SeqCst);
    }
}

impl Drop for FakeStoreServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Commands queued between `MULTI` and `EXEC`
#[derive(Default)]
struct Transaction {
    queued: Vec<Vec<String>>,
    aborted: bool,
}

async fn serve_connection(mut socket: TcpStream, state: Arc<ServerState>) {
    let codec = RespCodec::new();
    let mut buffer = BytesMut::with_capacity(4096);
    let mut authenticated = state.options.password.is_none();
    let mut transaction: Option<Transaction> = None;

    loop {
        loop {
            let frame = match codec.decode(&mut buffer) {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(_) => return,
            };
            let Some(parts) = command_parts(frame) else {
                return;
            };

            if state.close_next.swap(false, Ordering::SeqCst) {
                return;
            }
            state.commands.lock().unwrap().push(parts.clone());

            let out = if state.garble_next.swap(false, Ordering::SeqCst) {
                BytesMut::from(&b"$2\r\n\xff\xfe\r\n"[..])
            } else {
                let reply = match parts[0].as_str() {
                    "MULTI" | "EXEC" | "DISCARD" => {
                        control(&state, &mut authenticated, &mut transaction, parts).await
                    }
                    _ => match transaction.as_mut() {
                        Some(tx) => queue(&state, tx, parts),
                        None => dispatch(&state, &mut authenticated, parts).await,
                    },
                };
                let mut out = BytesMut::new();
                codec.encode(&reply, &mut out);
                out
            };
            if socket.write_all(&out).await.is_err() {
                return;
            }
        }

        match socket.read_buf(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

fn queue(state: &ServerState, tx: &mut Transaction, parts: Vec<String>) -> RespValue {
    if state.options.failing_command.as_deref() == Some(parts[0].as_str()) {
        tx.aborted = true;
        return error("ERR injected failure");
    }
    tx.queued.push(parts);
    RespValue::SimpleString("QUEUED".to_string())
}

async fn control(
    state: &ServerState,
    authenticated: &mut bool,
    transaction: &mut Option<Transaction>,
    parts: Vec<String>,
) -> RespValue {
    match parts[0].as_str() {
        "MULTI" if transaction.is_some() => error("ERR MULTI calls can not be nested"),
        "MULTI" => {
            *transaction = Some(Transaction::default());
            RespValue::ok()
        }
        "DISCARD" => match transaction.take() {
            Some(_) => RespValue::ok(),
            None => error("ERR DISCARD without MULTI"),
        },
        _ => match transaction.take() {
            None => error("ERR EXEC without MULTI"),
            Some(tx) if tx.aborted => {
                error("EXECABORT Transaction discarded because of previous errors.")
            }
            Some(tx) => {
                let mut replies = Vec::with_capacity(tx.queued.len());
                for command in tx.queued {
                    replies.push(dispatch(state, authenticated, command).await);
                }
                RespValue::Array(replies)
            }
        },
    }
}

fn command_parts(frame: RespValue) -> Option<Vec<String>> {
    let RespValue::Array(items) = frame else {
        return None;
    };
    let mut parts = items
        .into_iter()
        .map(|item| match item {
            RespValue::BulkString(Some(s)) => Some(s),
            _ => None,
        })
        .collect::<Option<Vec<String>>>()?;
    let name = parts.first()?.to_ascii_uppercase();
    parts[0] = name;
    Some(parts)
}

fn error(message: &str) -> RespValue {
    RespValue::Error(message.to_string())
}

fn integer(flag: bool) -> RespValue {
    RespValue::Integer(i64::from(flag))
}

fn strings(items: Vec<String>) -> RespValue {
    RespValue::Array(items.into_iter().map(RespValue::bulk).collect())
}

fn parse_millis(raw: &str) -> Option<Duration> {
    raw.parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

async fn dispatch(state: &ServerState, authenticated: &mut bool, parts: Vec<String>) -> RespValue {
    let name = parts[0].as_str();
    let args = &parts[1..];

    if state.options.failing_command.as_deref() == Some(name) {
        return error("ERR injected failure");
    }

    if name == "AUTH" {
        let (user, pass) = match args {
            [pass] => (None, pass),
            [user, pass] => (Some(user), pass),
            _ => return error("ERR wrong number of arguments for 'auth' command"),
        };
        let user_ok = user == state.options.username.as_ref();
        let pass_ok = state.options.password.as_ref() == Some(pass);
        if user_ok && pass_ok {
            *authenticated = true;
            return RespValue::ok();
        }
        return error("WRONGPASS invalid username-password pair or user is disabled.");
    }

    if !*authenticated {
        return error("NOAUTH Authentication required.");
    }

    let store = &state.store;
    match (name, args) {
        ("PING", []) => RespValue::SimpleString("PONG".to_string()),
        ("SELECT", [db]) => match db.parse::<u32>() {
            Ok(db) if db < 16 => {
                state.selected_dbs.lock().unwrap().push(db);
                RespValue::ok()
            }
            _ => error("ERR DB index is out of range"),
        },
        ("SET", [key, value]) => {
            store
                .write(key, &RawValue::Text(value.clone()), None)
                .await
                .unwrap();
            RespValue::ok()
        }
        ("SET", [key, value, px, ms]) if px.eq_ignore_ascii_case("PX") => {
            let Some(ttl) = parse_millis(ms) else {
                return error("ERR invalid expire time in 'set' command");
            };
            store
                .write(key, &RawValue::Text(value.clone()), Some(ttl))
                .await
                .unwrap();
            RespValue::ok()
        }
        ("GET", [key]) => match store.read(key).await.unwrap() {
            None => RespValue::BulkString(None),
            Some(RawValue::Text(text)) => RespValue::bulk(text),
            Some(_) => error("WRONGTYPE Operation against a key holding the wrong kind of value"),
        },
        ("TYPE", [key]) => {
            let kind = match store.read(key).await.unwrap() {
                None => "none",
                Some(RawValue::Text(_)) => "string",
                Some(RawValue::List(_)) => "list",
                Some(RawValue::Set(_)) => "set",
            };
            RespValue::SimpleString(kind.to_string())
        }
        ("LRANGE", [key, _, _]) => match store.read(key).await.unwrap() {
            None => RespValue::Array(Vec::new()),
            Some(RawValue::List(items)) => strings(items),
            Some(_) => error("WRONGTYPE Operation against a key holding the wrong kind of value"),
        },
        ("SMEMBERS", [key]) => match store.read(key).await.unwrap() {
            None => RespValue::Array(Vec::new()),
            Some(RawValue::Set(items)) => strings(items),
            Some(_) => error("WRONGTYPE Operation against a key holding the wrong kind of value"),
        },
        ("RPUSH", [key, items @ ..]) if !items.is_empty() => {
            let mut list = match store.read(key).await.unwrap() {
                None => Vec::new(),
                Some(RawValue::List(existing)) => existing,
                Some(_) => {
                    return error("WRONGTYPE Operation against a key holding the wrong kind of value")
                }
            };
            list.extend(items.iter().cloned());
            let len = list.len() as i64;
            let ttl = store.ttl(key).await.unwrap().remaining();
            store.write(key, &RawValue::List(list), ttl).await.unwrap();
            RespValue::Integer(len)
        }
        ("SADD", [key, items @ ..]) if !items.is_empty() => {
            let mut set = match store.read(key).await.unwrap() {
                None => Vec::new(),
                Some(RawValue::Set(existing)) => existing,
                Some(_) => {
                    return error("WRONGTYPE Operation against a key holding the wrong kind of value")
                }
            };
            let mut added = 0;
            for item in items {
                if !set.contains(item) {
                    set.push(item.clone());
                    added += 1;
                }
            }
            let ttl = store.ttl(key).await.unwrap().remaining();
            store.write(key, &RawValue::Set(set), ttl).await.unwrap();
            RespValue::Integer(added)
        }
        ("PEXPIRE", [key, ms]) => match parse_millis(ms) {
            Some(ttl) => integer(store.expire(key, ttl).await.unwrap()),
            None => error("ERR invalid expire time in 'pexpire' command"),
        },
        ("PERSIST", [key]) => integer(store.persist(key).await.unwrap()),
        ("PTTL", [key]) => RespValue::Integer(store.ttl(key).await.unwrap().as_millis_reply()),
        ("DEL", keys) if !keys.is_empty() => {
            RespValue::Integer(store.delete(keys).await.unwrap() as i64)
        }
        _ => error(&format!("ERR unknown command '{name}'")),
    }
}

/// Remaining lifetime in whole milliseconds, for range assertions
pub fn remaining_millis(ttl: KeyTtl) -> u128 {
    ttl.remaining().map(|d| d.as_millis()).unwrap_or(0)
}
