//! Tests against a real Redis-compatible store
//!
//! Ignored by default. Point `TTLKV_*` variables (or `ttlkv.toml`) at a
//! disposable store and run `cargo test --test live_store -- --ignored`.
//! Keys are prefixed with a random id and deleted afterwards.

use std::time::Duration;
use ttlkv::{Coercion, Config, Expiry, KeyTtl, TtlClient, Value};
use uuid::Uuid;

async fn live_client() -> TtlClient {
    let config = Config::load().expect("invalid live store configuration");
    TtlClient::connect(&config)
        .await
        .expect("live store is not reachable")
}

fn key(prefix: &Uuid, name: &str) -> String {
    format!("ttlkv-test:{prefix}:{name}")
}

#[tokio::test]
#[ignore]
async fn test_live_ping() {
    assert!(live_client().await.ping().await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_live_typed_round_trip_and_expiry() {
    let client = live_client().await;
    let prefix = Uuid::new_v4();
    let (int_key, list_key) = (key(&prefix, "int"), key(&prefix, "list"));

    client.set(&int_key, 99i64, Expiry::millis(800)).await.unwrap();
    client
        .set(&list_key, vec![1.5f64, 2.5], Expiry::seconds(1))
        .await
        .unwrap();

    let int = client.get(&int_key, Some(Coercion::Int)).await.unwrap();
    assert_eq!(int, Some(Value::from(99i64)));
    let list = client.get(&list_key, Some(Coercion::Float)).await.unwrap();
    assert_eq!(list, Some(Value::from(vec![1.5f64, 2.5])));

    tokio::time::sleep(Duration::from_millis(1_200)).await;
    assert_eq!(client.get(&int_key, None).await.unwrap(), None);
    assert_eq!(client.get(&list_key, None).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn test_live_ttl_management() {
    let client = live_client().await;
    let prefix = Uuid::new_v4();
    let keys: Vec<String> = (0..3).map(|i| key(&prefix, &i.to_string())).collect();

    for k in &keys {
        client.set(k, "v", Expiry::none()).await.unwrap();
    }
    assert_eq!(client.set_keys_ttl(&keys, Expiry::seconds(60)).await.unwrap(), 3);
    assert!(client.get_key_ttl(&keys[0]).await.unwrap().remaining().is_some());

    assert_eq!(client.drop_keys_ttl(&keys).await.unwrap(), 3);
    assert_eq!(client.get_key_ttl(&keys[0]).await.unwrap(), KeyTtl::Persistent);

    assert_eq!(client.delete(&keys).await.unwrap(), 3);
    assert_eq!(client.get_key_ttl(&keys[0]).await.unwrap(), KeyTtl::Missing);
}
