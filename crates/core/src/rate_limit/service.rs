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

//! Brute-force limiter keyed by `(identifier, action)`.
//!
//! Per pair the limiter is OPEN (no state), COUNTING (failures below the
//! threshold) or BLOCKED (an unexpired block record). Callers run
//! [`check`](RateLimiterService::check) before authenticating, then report
//! the outcome with `record_failure` or `record_success`.
//!
//! Counting is a plain read-modify-write through the cache. Concurrent
//! failures for one pair can both read `N` and both write `N + 1`, so the
//! count is approximate. Store faults never deny a caller: `check` fails
//! open and the recording calls become no-ops.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::metrics::{RateLimitMetrics, RateLimitMetricsSnapshot};
use super::types::{
    BlockRecord, EscalationPolicy, RateLimitConfig, RateLimitDecision, RateLimitOverride,
    RateLimitStatus,
};
use crate::cache::keys::{attempt_key, block_key, infraction_key};
use crate::cache::CacheService;
use crate::clock::Clock;
use crate::types::Result;

pub struct RateLimiterService {
    cache: Arc<CacheService>,
    clock: Arc<dyn Clock>,
    defaults: RateLimitConfig,
    escalation: EscalationPolicy,
    metrics: RateLimitMetrics,
}

/// Whole seconds until `until_ms`, rounded up.
fn seconds_until(until_ms: i64, now_ms: i64) -> u64 {
    let remaining_ms = until_ms.saturating_sub(now_ms).max(0) as u64;
    remaining_ms.div_ceil(1000)
}

impl RateLimiterService {
    pub fn new(
        cache: Arc<CacheService>,
        clock: Arc<dyn Clock>,
        defaults: RateLimitConfig,
        escalation: EscalationPolicy,
    ) -> Self {
        Self {
            cache,
            clock,
            defaults,
            escalation,
            metrics: RateLimitMetrics::new(),
        }
    }

    pub fn defaults(&self) -> &RateLimitConfig {
        &self.defaults
    }

    pub fn escalation(&self) -> EscalationPolicy {
        self.escalation
    }

    pub fn metrics(&self) -> RateLimitMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Decides whether `identifier` may attempt `action` now.
    ///
    /// `overrides` replaces any subset of the configured defaults for this
    /// call; see [`RateLimitConfig::with_override`] for how the block length
    /// resolves. Never increments the counter.
    pub async fn check(
        &self,
        identifier: &str,
        action: &str,
        overrides: Option<&RateLimitOverride>,
    ) -> RateLimitDecision {
        let config = match overrides {
            Some(overrides) => self.defaults.with_override(overrides),
            None => self.defaults,
        };
        self.check_with_config(identifier, action, &config).await
    }

    pub async fn check_with_config(
        &self,
        identifier: &str,
        action: &str,
        config: &RateLimitConfig,
    ) -> RateLimitDecision {
        let decision = match self.evaluate(identifier, action, config).await {
            Ok(decision) => decision,
            Err(e) => {
                self.metrics.record_fail_open();
                warn!(identifier, action, error = %e, "Rate limit check failed, allowing request");
                RateLimitDecision::fail_open()
            }
        };
        self.metrics.record_check(decision.allowed);
        decision
    }

    async fn evaluate(
        &self,
        identifier: &str,
        action: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitDecision> {
        let now = self.clock.now_millis();

        if let Some(record) = self
            .cache
            .try_get::<BlockRecord>(&block_key(action, identifier))
            .await?
        {
            if record.until_epoch_ms > now {
                let retry_after = seconds_until(record.until_epoch_ms, now);
                debug!(identifier, action, retry_after, "Identifier is blocked");
                return Ok(RateLimitDecision::blocked(retry_after));
            }
        }

        let attempts: u32 = self
            .cache
            .try_get(&attempt_key(action, identifier))
            .await?
            .unwrap_or(0);

        if attempts >= config.max_attempts {
            let block_seconds = self.impose_block(identifier, action, config, now).await?;
            return Ok(RateLimitDecision::blocked(block_seconds));
        }

        let remaining = config
            .max_attempts
            .saturating_sub(attempts)
            .saturating_sub(1);
        Ok(RateLimitDecision::allowed(remaining))
    }

    /// Writes a new block record and returns its length in seconds.
    async fn impose_block(
        &self,
        identifier: &str,
        action: &str,
        config: &RateLimitConfig,
        now: i64,
    ) -> Result<u64> {
        let block_key = block_key(action, identifier);

        let previous = match self.escalation {
            EscalationPolicy::AsObserved => self
                .cache
                .try_get::<BlockRecord>(&block_key)
                .await?
                .map(|record| record.infraction_count)
                .unwrap_or(0),
            EscalationPolicy::Persistent { .. } => self
                .cache
                .try_get::<u32>(&infraction_key(action, identifier))
                .await?
                .unwrap_or(0),
        };

        let infraction_count = previous.saturating_add(1);
        let block_seconds = config.block_duration(infraction_count);
        let until_epoch_ms =
            now.saturating_add(i64::try_from(block_seconds.saturating_mul(1000)).unwrap_or(i64::MAX));

        let record = BlockRecord {
            until_epoch_ms,
            infraction_count,
        };
        self.cache.try_set(&block_key, &record, block_seconds).await?;

        if let EscalationPolicy::Persistent {
            history_ttl_seconds,
        } = self.escalation
        {
            self.cache
                .try_set(
                    &infraction_key(action, identifier),
                    &infraction_count,
                    history_ttl_seconds.max(block_seconds),
                )
                .await?;
        }

        self.metrics.record_block();
        warn!(
            identifier,
            action, infraction_count, block_seconds, "Too many failed attempts, identifier blocked"
        );
        Ok(block_seconds)
    }

    /// Counts one failed attempt and restarts the inactivity window.
    ///
    /// `window_seconds` of `None` or `Some(0)` uses the configured window.
    pub async fn record_failure(&self, identifier: &str, action: &str, window_seconds: Option<u64>) {
        let window = window_seconds
            .filter(|w| *w > 0)
            .unwrap_or(self.defaults.window_seconds);

        match self.increment_attempts(identifier, action, window).await {
            Ok(attempts) => {
                self.metrics.record_failure();
                debug!(identifier, action, attempts, window, "Failed attempt recorded");
            }
            Err(e) => {
                warn!(identifier, action, error = %e, "Could not record failed attempt");
            }
        }
    }

    async fn increment_attempts(&self, identifier: &str, action: &str, window: u64) -> Result<u32> {
        let key = attempt_key(action, identifier);
        let attempts = self
            .cache
            .try_get::<u32>(&key)
            .await?
            .unwrap_or(0)
            .saturating_add(1);
        self.cache.try_set(&key, &attempts, window).await?;
        Ok(attempts)
    }

    /// Clears the counter and any block for the pair.
    ///
    /// Each key is deleted independently so one failing delete does not
    /// leave the others behind.
    pub async fn record_success(&self, identifier: &str, action: &str) {
        let mut keys = vec![attempt_key(action, identifier), block_key(action, identifier)];
        if matches!(self.escalation, EscalationPolicy::Persistent { .. }) {
            keys.push(infraction_key(action, identifier));
        }

        let mut cleared = true;
        for key in &keys {
            if let Err(e) = self.cache.try_delete(key).await {
                cleared = false;
                warn!(identifier, action, key = %key, error = %e, "Could not clear rate limit state");
            }
        }

        if cleared {
            self.metrics.record_success();
            debug!(identifier, action, "Rate limit state cleared");
        }
    }

    /// Administrative unblock; same effect as a successful attempt.
    pub async fn reset(&self, identifier: &str, action: &str) {
        info!(identifier, action, "Resetting rate limit");
        self.record_success(identifier, action).await;
    }

    /// Read-only snapshot. Store faults yield the empty status.
    pub async fn get_status(&self, identifier: &str, action: &str) -> RateLimitStatus {
        match self.read_status(identifier, action).await {
            Ok(status) => status,
            Err(e) => {
                warn!(identifier, action, error = %e, "Could not read rate limit status");
                RateLimitStatus::default()
            }
        }
    }

    async fn read_status(&self, identifier: &str, action: &str) -> Result<RateLimitStatus> {
        let now = self.clock.now_millis();
        let attempts: u32 = self
            .cache
            .try_get(&attempt_key(action, identifier))
            .await?
            .unwrap_or(0);

        let retry_after = self
            .cache
            .try_get::<BlockRecord>(&block_key(action, identifier))
            .await?
            .filter(|record| record.until_epoch_ms > now)
            .map(|record| seconds_until(record.until_epoch_ms, now));

        Ok(RateLimitStatus {
            attempts,
            blocked: retry_after.is_some(),
            retry_after,
        })
    }
}

impl std::fmt::Debug for RateLimiterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterService")
            .field("defaults", &self.defaults)
            .field("escalation", &self.escalation)
            .finish()
    }
}
