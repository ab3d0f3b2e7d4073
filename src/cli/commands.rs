//! CLI command definitions using clap

use crate::coerce::Coercion;
use crate::config::Config;
use crate::error::Result;
use crate::ttl::Expiry;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// ttlkv CLI client
#[derive(Debug, Parser)]
#[command(name = "ttlkv-cli")]
#[command(about = "Typed, TTL-aware commands against a Redis-compatible store")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to $TTLKV_CONFIG or ./ttlkv.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Store host, overrides the configuration
    #[arg(long)]
    pub host: Option<String>,

    /// Store port, overrides the configuration
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Logical database index, overrides the configuration
    #[arg(short = 'n', long)]
    pub db: Option<u32>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Expiration flags shared by commands that take a TTL
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct TtlArgs {
    /// Time to live in seconds
    #[arg(long)]
    pub ex: Option<u64>,

    /// Time to live in milliseconds
    #[arg(long)]
    pub px: Option<u64>,
}

impl TtlArgs {
    pub fn expiry(&self) -> Expiry {
        Expiry::new(self.ex, self.px)
    }
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check that the store answers
    Ping,
    /// Set a key, optionally with an expiration
    Set {
        key: String,
        value: String,
        #[command(flatten)]
        ttl: TtlArgs,
    },
    /// Get a value, optionally coerced (int, float, bool, str)
    Get {
        key: String,
        #[arg(long = "as")]
        coerce: Option<Coercion>,
    },
    /// Set the expiration of one or more keys
    Expire {
        #[arg(required = true)]
        keys: Vec<String>,
        #[command(flatten)]
        ttl: TtlArgs,
    },
    /// Remove the expiration of one or more keys
    Persist {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Remaining time to live in milliseconds (-1 persistent, -2 missing)
    Ttl { key: String },
    /// Delete keys
    Del {
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

impl Cli {
    /// Configuration from the file given on the command line (or the
    /// default lookup), then environment, then command-line overrides
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load_layers(self.config.as_deref())?;

        if let Some(host) = &self.host {
            config.store.host = host.clone();
        }
        if let Some(port) = self.port {
            config.store.port = port;
        }
        if let Some(db) = self.db {
            config.store.db = db;
        }

        config.validate()?;
        Ok(config)
    }
}
