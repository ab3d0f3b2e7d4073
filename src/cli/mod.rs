//! Command Line Interface for ttlkv
//!
//! One-shot commands against a configured store, with output formatted the
//! way a Redis CLI prints replies.

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::{format_key_ttl, format_value, run_command};
