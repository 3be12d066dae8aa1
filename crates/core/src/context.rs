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

//! Process-wide wiring of store, cache and limiter.
//!
//! Built once at startup and handed to consumers as `Arc`s. There is no
//! global instance.

use std::sync::Arc;
use tracing::info;

use crate::cache::CacheService;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::rate_limit::RateLimiterService;
use crate::store::{select_store, KeyValueStore, StoreKind};
use crate::types::Result;

pub struct GuardContext {
    config: Config,
    clock: Arc<dyn Clock>,
    store_kind: StoreKind,
    cache: Arc<CacheService>,
    rate_limiter: Arc<RateLimiterService>,
}

impl GuardContext {
    /// Validates `config`, selects the backend and builds both services.
    ///
    /// Only configuration errors are returned; an unreachable shared store
    /// results in a context running on the local store.
    pub async fn initialize(config: Config) -> Result<Self> {
        Self::initialize_with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn initialize_with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let selection = select_store(&config.cache, clock.clone()).await;
        info!(
            store = %selection.kind,
            attempts = selection.attempts,
            "Cache backend selected"
        );
        Ok(Self::from_store(config, selection.store, clock))
    }

    /// Builds a context over an existing store, skipping selection.
    pub fn from_store(config: Config, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let store_kind = store.kind();
        let cache = Arc::new(CacheService::new(store, config.cache.default_ttl_seconds));
        let rate_limiter = Arc::new(RateLimiterService::new(
            cache.clone(),
            clock.clone(),
            config.rate_limit.defaults,
            config.rate_limit.escalation,
        ));

        Self {
            config,
            clock,
            store_kind,
            cache,
            rate_limiter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store_kind
    }

    pub fn cache(&self) -> Arc<CacheService> {
        self.cache.clone()
    }

    pub fn rate_limiter(&self) -> Arc<RateLimiterService> {
        self.rate_limiter.clone()
    }

    /// Waits for outstanding background cache writes.
    pub async fn shutdown(&self) {
        let drained = self.cache.drain_pending_writes().await;
        info!(drained, store = %self.store_kind, "Guard context shut down");
    }
}

impl std::fmt::Debug for GuardContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardContext")
            .field("store_kind", &self.store_kind)
            .field("cache", &self.cache)
            .field("rate_limiter", &self.rate_limiter)
            .finish()
    }
}
