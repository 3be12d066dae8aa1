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

//! Fault-absorbing cache over a [`KeyValueStore`].
//!
//! Nothing public on [`CacheService`] returns a store error. Failed reads
//! behave as misses, failed writes and deletes as no-ops; every swallowed
//! failure is logged at `warn` and counted in [`CacheMetrics`].
//!
//! Concurrent misses on the same key are not coalesced: two callers racing
//! on a cold key may both run their factory, and the last write wins.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::metrics::{CacheMetrics, CacheMetricsSnapshot};
use crate::store::{KeyValueStore, StoreKind};
use crate::types::{CoreError, Result};

pub struct CacheService {
    store: Arc<dyn KeyValueStore>,
    default_ttl_seconds: u64,
    /// Detached cache-aside writes, kept only so shutdown can wait for them.
    pending_writes: Mutex<JoinSet<()>>,
    metrics: Arc<CacheMetrics>,
}

impl CacheService {
    pub fn new(store: Arc<dyn KeyValueStore>, default_ttl_seconds: u64) -> Self {
        Self {
            store,
            default_ttl_seconds: default_ttl_seconds.max(1),
            pending_writes: Mutex::new(JoinSet::new()),
            metrics: Arc::new(CacheMetrics::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    pub fn default_ttl_seconds(&self) -> u64 {
        self.default_ttl_seconds
    }

    pub fn metrics(&self) -> CacheMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// `None` and `Some(0)` both mean the configured default.
    fn resolve_ttl(&self, ttl_seconds: Option<u64>) -> u64 {
        match ttl_seconds {
            Some(ttl) if ttl > 0 => ttl,
            _ => self.default_ttl_seconds,
        }
    }

    /// Cache-aside lookup.
    ///
    /// On a hit the cached value is returned. On a miss, a store error or an
    /// undecodable entry, `factory` runs and its result is returned at once;
    /// the store is populated in the background without the caller waiting.
    pub async fn get_or_set<T, F, Fut>(&self, key: &str, factory: F, ttl_seconds: Option<u64>) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(value) = self.get(key).await {
            return value;
        }

        let value = factory().await;
        self.populate_detached(key, &value, self.resolve_ttl(ttl_seconds));
        value
    }

    /// Same as [`get_or_set`](Self::get_or_set).
    pub async fn wrap<T, F, Fut>(&self, key: &str, factory: F, ttl_seconds: Option<u64>) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.get_or_set(key, factory, ttl_seconds).await
    }

    /// Cache-aside for fallible loaders. A factory error is returned as is
    /// and nothing is cached.
    pub async fn try_get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        factory: F,
        ttl_seconds: Option<u64>,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let value = factory().await?;
        self.populate_detached(key, &value, self.resolve_ttl(ttl_seconds));
        Ok(value)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key).await {
            Ok(Some(value)) => {
                self.metrics.record_hit();
                debug!(key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                self.metrics.record_miss();
                debug!(key, "Cache miss");
                None
            }
            Err(e) => {
                self.metrics.record_error();
                self.metrics.record_miss();
                warn!(key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Writes through and waits for the store. Failures are logged only.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) {
        let ttl = self.resolve_ttl(ttl_seconds);
        match self.try_set(key, value, ttl).await {
            Ok(()) => {
                self.metrics.record_write();
                debug!(key, ttl, "Cache set");
            }
            Err(e) => {
                self.metrics.record_failed_write();
                warn!(key, error = %e, "Cache write failed");
            }
        }
    }

    pub async fn delete(&self, key: &str) {
        match self.try_delete(key).await {
            Ok(()) => {
                self.metrics.record_delete();
                debug!(key, "Cache entry deleted");
            }
            Err(e) => {
                self.metrics.record_error();
                warn!(key, error = %e, "Cache delete failed");
            }
        }
    }

    /// Deletes every key matching a `*` glob. Returns 0 when the store fails.
    pub async fn delete_pattern(&self, pattern: &str) -> usize {
        match self.store.delete_pattern(pattern).await {
            Ok(removed) => {
                debug!(pattern, removed, "Cache entries deleted by pattern");
                removed
            }
            Err(e) => {
                self.metrics.record_error();
                warn!(pattern, error = %e, "Cache pattern delete failed");
                0
            }
        }
    }

    /// Drops every entry this subsystem owns.
    pub async fn reset(&self) {
        if let Err(e) = self.store.reset_all().await {
            self.metrics.record_error();
            warn!(error = %e, "Cache reset failed");
        }
    }

    /// Waits for every background write spawned so far. Returns how many
    /// were awaited.
    pub async fn drain_pending_writes(&self) -> usize {
        let mut pending = std::mem::take(&mut *self.pending_writes.lock());
        let mut drained = 0;
        while let Some(joined) = pending.join_next().await {
            drained += 1;
            if let Err(e) = joined {
                warn!(error = %e, "Background cache write task did not complete");
            }
        }
        drained
    }

    pub(crate) async fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn try_set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw, ttl_seconds).await
    }

    pub(crate) async fn try_delete(&self, key: &str) -> Result<()> {
        self.store.delete(key).await
    }

    fn populate_detached<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                self.metrics.record_failed_write();
                warn!(key, error = %CoreError::from(e), "Value not cacheable, skipping write");
                return;
            }
        };

        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let key = key.to_string();

        let mut pending = self.pending_writes.lock();
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            match store.set(&key, raw, ttl_seconds).await {
                Ok(()) => {
                    metrics.record_write();
                    debug!(key = %key, ttl = ttl_seconds, "Cache populated");
                }
                Err(e) => {
                    metrics.record_failed_write();
                    warn!(key = %key, error = %e, "Background cache write failed");
                }
            }
        });
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("store", &self.store.kind())
            .field("default_ttl_seconds", &self.default_ttl_seconds)
            .finish()
    }
}
