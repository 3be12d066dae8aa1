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

//! Behavior with a store that fails every call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cache::CacheService;
use crate::clock::ManualClock;
use crate::config::Config;
use crate::context::GuardContext;
use crate::rate_limit::{
    EscalationPolicy, RateLimitConfig, RateLimitDecision, RateLimitStatus, RateLimiterService,
    FAIL_OPEN_REMAINING,
};
use crate::store::{KeyValueStore, MockKeyValueStore, StoreKind};
use crate::types::CoreError;

use super::START_MS;

fn broken_store() -> MockKeyValueStore {
    let mut store = MockKeyValueStore::new();
    store
        .expect_get()
        .returning(|_| Err(CoreError::StoreUnavailable("connection refused".to_string())));
    store
        .expect_set()
        .returning(|_, _, _| Err(CoreError::Timeout));
    store
        .expect_delete()
        .returning(|_| Err(CoreError::StoreOperation("READONLY".to_string())));
    store
        .expect_delete_pattern()
        .returning(|_| Err(CoreError::Timeout));
    store
        .expect_reset_all()
        .returning(|| Err(CoreError::StoreUnavailable("connection reset".to_string())));
    store.expect_kind().return_const(StoreKind::Shared);
    store
}

fn services(store: MockKeyValueStore) -> (Arc<CacheService>, RateLimiterService) {
    let store: Arc<dyn KeyValueStore> = Arc::new(store);
    let clock = Arc::new(ManualClock::new(START_MS));
    let cache = Arc::new(CacheService::new(store, 300));
    let limiter = RateLimiterService::new(
        cache.clone(),
        clock,
        RateLimitConfig::default(),
        EscalationPolicy::AsObserved,
    );
    (cache, limiter)
}

#[tokio::test]
async fn test_check_fails_open() {
    let (_, limiter) = services(broken_store());

    for _ in 0..10 {
        limiter.record_failure("203.0.113.5", "login", None).await;
        let decision = limiter.check("203.0.113.5", "login", None).await;
        assert_eq!(decision, RateLimitDecision::allowed(FAIL_OPEN_REMAINING));
    }

    let metrics = limiter.metrics();
    assert_eq!(metrics.fail_open, 10);
    assert_eq!(metrics.denied, 0);
    assert_eq!(metrics.failures_recorded, 0);
}

#[tokio::test]
async fn test_status_and_reset_swallow_errors() {
    let (_, limiter) = services(broken_store());

    assert_eq!(
        limiter.get_status("203.0.113.5", "login").await,
        RateLimitStatus::default()
    );
    limiter.record_success("203.0.113.5", "login").await;
    limiter.reset("203.0.113.5", "login").await;
    assert_eq!(limiter.metrics().successes_recorded, 0);
}

#[tokio::test]
async fn test_get_or_set_returns_factory_result() {
    let (cache, _) = services(broken_store());
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let calls = calls.clone();
        let value = cache
            .get_or_set(
                "catalog:airports:all",
                || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    vec!["LFPG".to_string()]
                },
                Some(3600),
            )
            .await;
        assert_eq!(value, vec!["LFPG".to_string()]);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(cache.drain_pending_writes().await, 3);

    let metrics = cache.metrics();
    assert_eq!(metrics.failed_writes, 3);
    assert_eq!(metrics.errors, 3);
    assert_eq!(metrics.hits, 0);
}

#[tokio::test]
async fn test_cache_operations_never_raise() {
    let (cache, _) = services(broken_store());

    let value: Option<String> = cache.get("anything").await;
    assert!(value.is_none());
    cache.set("anything", &42u32, None).await;
    cache.delete("anything").await;
    assert_eq!(cache.delete_pattern("catalog:*").await, 0);
    cache.reset().await;
}

#[tokio::test]
async fn test_failed_block_write_fails_open() {
    let mut store = MockKeyValueStore::new();
    store.expect_get().returning(|key| {
        if key.starts_with("ratelimit:block:") {
            Ok(None)
        } else {
            Ok(Some("7".to_string()))
        }
    });
    store
        .expect_set()
        .returning(|_, _, _| Err(CoreError::Timeout));
    store.expect_kind().return_const(StoreKind::Shared);

    let (_, limiter) = services(store);
    let decision = limiter.check("203.0.113.5", "login", None).await;
    assert_eq!(decision, RateLimitDecision::fail_open());
}

#[tokio::test]
async fn test_corrupt_counter_fails_open() {
    let mut store = MockKeyValueStore::new();
    store.expect_get().returning(|key| {
        if key.starts_with("ratelimit:block:") {
            Ok(None)
        } else {
            Ok(Some("not-a-number".to_string()))
        }
    });
    store.expect_kind().return_const(StoreKind::Shared);

    let (_, limiter) = services(store);
    assert!(limiter.check("203.0.113.5", "login", None).await.allowed);
}

#[tokio::test]
async fn test_context_over_broken_store() {
    let context = GuardContext::from_store(
        Config::default(),
        Arc::new(broken_store()),
        Arc::new(ManualClock::new(START_MS)),
    );
    assert_eq!(context.store_kind(), StoreKind::Shared);

    let limiter = context.rate_limiter();
    assert!(limiter.check("203.0.113.5", "login", None).await.allowed);

    let cache = context.cache();
    let value = cache.get_or_set("k", || async { 7u32 }, None).await;
    assert_eq!(value, 7);
    context.shutdown().await;
}
