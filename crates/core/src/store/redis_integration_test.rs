// Copyright © 2026 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Runs against a live server: `cargo test -- --ignored`.
//! `REDIS_TEST_URL` overrides the default `redis://localhost:6379`.

use super::{KeyValueStore, RedisStore, StoreKind};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

fn redis_url() -> String {
    std::env::var("REDIS_TEST_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string())
}

/// A prefix no other test run shares.
fn unique_prefix(name: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("aeroguard:test:{}:{}:{}:", name, std::process::id(), nanos)
}

async fn connect_store(prefix: &str) -> RedisStore {
    RedisStore::connect(
        &redis_url(),
        prefix,
        Duration::from_secs(2),
        Duration::from_secs(2),
    )
    .await
    .expect("Failed to connect to test Redis")
}

async fn raw_connection() -> MultiplexedConnection {
    redis::Client::open(redis_url())
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_get_set_delete() {
    let prefix = unique_prefix("roundtrip");
    let store = connect_store(&prefix).await;
    assert_eq!(store.kind(), StoreKind::Shared);

    assert_eq!(store.get("ratelimit:login:203.0.113.5").await.unwrap(), None);

    store
        .set("ratelimit:login:203.0.113.5", "3".to_string(), 60)
        .await
        .unwrap();
    assert_eq!(
        store.get("ratelimit:login:203.0.113.5").await.unwrap(),
        Some("3".to_string())
    );

    // stored under the prefix
    let mut raw = raw_connection().await;
    let stored: Option<String> = raw
        .get(format!("{}ratelimit:login:203.0.113.5", prefix))
        .await
        .unwrap();
    assert_eq!(stored, Some("3".to_string()));

    store.delete("ratelimit:login:203.0.113.5").await.unwrap();
    assert_eq!(store.get("ratelimit:login:203.0.113.5").await.unwrap(), None);

    // deleting a missing key is not an error
    store.delete("ratelimit:login:203.0.113.5").await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_ttl_is_applied_and_clamped() {
    let prefix = unique_prefix("ttl");
    let store = connect_store(&prefix).await;
    let mut raw = raw_connection().await;

    store.set("catalog:airports:all", "[]".to_string(), 120).await.unwrap();
    let ttl: i64 = raw
        .ttl(format!("{}catalog:airports:all", prefix))
        .await
        .unwrap();
    assert!((1..=120).contains(&ttl), "unexpected TTL {}", ttl);

    // zero becomes one second, never a key without expiry
    store.set("catalog:firs:all", "[]".to_string(), 0).await.unwrap();
    let ttl: i64 = raw.ttl(format!("{}catalog:firs:all", prefix)).await.unwrap();
    assert_eq!(ttl, 1);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(store.get("catalog:firs:all").await.unwrap(), None);

    store.reset_all().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_delete_pattern_stays_in_prefix() {
    let prefix = unique_prefix("pattern");
    let other_prefix = unique_prefix("pattern-other");
    let store = connect_store(&prefix).await;
    let other = connect_store(&other_prefix).await;

    store.set("catalog:airports:all", "1".to_string(), 60).await.unwrap();
    store.set("catalog:airports:LFPG", "2".to_string(), 60).await.unwrap();
    store.set("catalog:firs:all", "3".to_string(), 60).await.unwrap();
    store.set("catalog:a?c", "4".to_string(), 60).await.unwrap();
    store.set("catalog:abc", "5".to_string(), 60).await.unwrap();
    other.set("catalog:airports:all", "6".to_string(), 60).await.unwrap();

    assert_eq!(store.delete_pattern("catalog:airports:*").await.unwrap(), 2);
    assert_eq!(store.get("catalog:firs:all").await.unwrap(), Some("3".to_string()));
    assert_eq!(
        other.get("catalog:airports:all").await.unwrap(),
        Some("6".to_string())
    );

    // `?` matches only itself, as in the local store
    assert_eq!(store.delete_pattern("catalog:a?c").await.unwrap(), 1);
    assert_eq!(store.get("catalog:abc").await.unwrap(), Some("5".to_string()));

    assert_eq!(store.delete_pattern("nothing:*").await.unwrap(), 0);

    store.reset_all().await.unwrap();
    other.reset_all().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_reset_all_spares_foreign_keys() {
    let prefix = unique_prefix("reset");
    let store = connect_store(&prefix).await;
    let mut raw = raw_connection().await;
    let foreign_key = format!("{}foreign", unique_prefix("outside"));

    store.set("ratelimit:login:x", "1".to_string(), 60).await.unwrap();
    store.set("ratelimit:block:login:x", "{}".to_string(), 60).await.unwrap();
    let _: () = raw.set_ex(&foreign_key, "keep", 60).await.unwrap();

    store.reset_all().await.unwrap();

    assert_eq!(store.get("ratelimit:login:x").await.unwrap(), None);
    assert_eq!(store.get("ratelimit:block:login:x").await.unwrap(), None);
    let foreign: Option<String> = raw.get(&foreign_key).await.unwrap();
    assert_eq!(foreign, Some("keep".to_string()));

    let _: usize = raw.del(&foreign_key).await.unwrap();
}
