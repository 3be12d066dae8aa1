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

use crate::models::{HealthResponse, MetricsResponse, RateLimitTarget};
use aeroguard_core::{GuardContext, RateLimitDecision, RateLimitOverride, RateLimitStatus};
use std::sync::Arc;
use tracing::info;

pub struct ApiHandlers {
    context: Arc<GuardContext>,
    start_time: std::time::Instant,
}

impl ApiHandlers {
    pub fn new(context: Arc<GuardContext>) -> Self {
        Self {
            context,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn health(&self) -> HealthResponse {
        let kind = self.context.store_kind();
        HealthResponse {
            // running on the local store still serves requests, just unshared
            status: if kind.is_shared() { "healthy" } else { "degraded" }.to_string(),
            store: kind.to_string(),
            shared: kind.is_shared(),
        }
    }

    pub fn metrics(&self) -> MetricsResponse {
        let cache = self.context.cache().metrics();
        MetricsResponse {
            store: self.context.store_kind().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            cache_hit_rate: cache.hit_rate(),
            cache,
            rate_limit: self.context.rate_limiter().metrics(),
        }
    }

    pub async fn check(
        &self,
        target: &RateLimitTarget,
        overrides: Option<&RateLimitOverride>,
    ) -> RateLimitDecision {
        self.context
            .rate_limiter()
            .check(&target.identifier, &target.action, overrides)
            .await
    }

    pub async fn record_failure(&self, target: &RateLimitTarget, window_seconds: Option<u64>) {
        self.context
            .rate_limiter()
            .record_failure(&target.identifier, &target.action, window_seconds)
            .await
    }

    pub async fn record_success(&self, target: &RateLimitTarget) {
        self.context
            .rate_limiter()
            .record_success(&target.identifier, &target.action)
            .await
    }

    pub async fn reset(&self, target: &RateLimitTarget) {
        self.context
            .rate_limiter()
            .reset(&target.identifier, &target.action)
            .await
    }

    pub async fn status(&self, target: &RateLimitTarget) -> RateLimitStatus {
        self.context
            .rate_limiter()
            .get_status(&target.identifier, &target.action)
            .await
    }

    pub async fn invalidate_key(&self, key: &str) {
        info!(key, "Invalidating cache entry");
        self.context.cache().delete(key).await
    }

    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        let removed = self.context.cache().delete_pattern(pattern).await;
        info!(pattern, removed, "Invalidated cache entries by pattern");
        removed
    }
}
