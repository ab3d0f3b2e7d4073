//! Network layer for talking to the backing store
//!
//! This module holds the RESP protocol codec and the TCP connection used by
//! the RESP store backend.

pub mod connection;
pub mod protocol;

pub use connection::StoreConnection;
pub use protocol::{RespCodec, RespValue};
