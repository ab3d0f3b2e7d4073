//! Executes parsed CLI commands and formats the replies

use crate::cli::commands::Commands;
use crate::client::TtlClient;
use crate::error::Result;
use crate::store::Store;
use crate::ttl::KeyTtl;
use crate::value::Value;

/// Run one command and return its printable output
pub async fn run_command<S: Store>(client: &TtlClient<S>, command: &Commands) -> Result<String> {
    let output = match command {
        Commands::Ping => {
            if client.ping().await? {
                "PONG".to_string()
            } else {
                "(error) store unavailable".to_string()
            }
        }
        Commands::Set { key, value, ttl } => {
            client.set(key, value.as_str(), ttl.expiry()).await?;
            "OK".to_string()
        }
        Commands::Get { key, coerce } => format_value(client.get(key, *coerce).await?.as_ref()),
        Commands::Expire { keys, ttl } => {
            let applied = client.set_keys_ttl(keys, ttl.expiry()).await?;
            format!("(integer) {applied}")
        }
        Commands::Persist { keys } => {
            let dropped = client.drop_keys_ttl(keys).await?;
            format!("(integer) {dropped}")
        }
        Commands::Ttl { key } => format_key_ttl(client.get_key_ttl(key).await?),
        Commands::Del { keys } => {
            let deleted = client.delete(keys).await?;
            format!("(integer) {deleted}")
        }
    };
    Ok(output)
}

/// Format a read result for display
pub fn format_value(value: Option<&Value>) -> String {
    match value {
        None => "(nil)".to_string(),
        Some(Value::Scalar(scalar)) => scalar.to_string(),
        Some(Value::List(items)) | Some(Value::Set(items)) => {
            if items.is_empty() {
                "(empty array)".to_string()
            } else {
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| format!("{}) {item}", i + 1))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }
}

/// Format a TTL as a `PTTL` reply
pub fn format_key_ttl(ttl: KeyTtl) -> String {
    format!("(integer) {}", ttl.as_millis_reply())
}
