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

use serde::{Deserialize, Serialize};

use crate::types::{CoreError, Result};

/// Longest lockout the progressive schedule will produce.
pub const MAX_BLOCK_SECONDS: u64 = 7200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    /// Inactivity window: the counter's TTL is reset on every failure.
    pub window_seconds: u64,
    /// Fixed lockout length. `None` or `Some(0)` selects the progressive
    /// schedule `window * 2^(n-1)`, capped at [`MAX_BLOCK_SECONDS`].
    pub block_seconds: Option<u64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,
            block_seconds: Some(300),
        }
    }
}

impl RateLimitConfig {
    /// Resolves a per-call override against these defaults.
    ///
    /// Attempts and window fall back to the defaults when unset or zero.
    /// The block length never does: an override without `block_seconds`
    /// selects the progressive schedule for its own window.
    pub fn with_override(mut self, overrides: &RateLimitOverride) -> Self {
        if let Some(max_attempts) = overrides.max_attempts.filter(|v| *v > 0) {
            self.max_attempts = max_attempts;
        }
        if let Some(window_seconds) = overrides.window_seconds.filter(|v| *v > 0) {
            self.window_seconds = window_seconds;
        }
        self.block_seconds = overrides.block_seconds;
        self
    }

    /// Lockout length for the `infraction_count`-th block (1-based).
    pub fn block_duration(&self, infraction_count: u32) -> u64 {
        if let Some(fixed) = self.block_seconds.filter(|s| *s > 0) {
            return fixed;
        }

        let exponent = infraction_count.saturating_sub(1).min(63);
        let multiplier = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        self.window_seconds
            .saturating_mul(multiplier)
            .min(MAX_BLOCK_SECONDS)
    }
}

/// Per-call overrides resolved against the configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitOverride {
    pub max_attempts: Option<u32>,
    pub window_seconds: Option<u64>,
    pub block_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub until_epoch_ms: i64,
    pub infraction_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    pub fn allowed(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining,
            blocked: false,
            retry_after: None,
        }
    }

    pub fn blocked(retry_after: u64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            blocked: true,
            retry_after: Some(retry_after),
        }
    }

    /// Returned when the store fails mid-check.
    pub fn fail_open() -> Self {
        Self::allowed(super::FAIL_OPEN_REMAINING)
    }

    /// `Err(RateLimitExceeded)` for a denied decision.
    pub fn into_result(self) -> Result<Self> {
        if self.allowed {
            Ok(self)
        } else {
            Err(CoreError::RateLimitExceeded {
                retry_after: self.retry_after.unwrap_or(0),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub attempts: u32,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// How the infraction count feeding the progressive schedule is tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EscalationPolicy {
    /// Read from the block record being replaced. That record has usually
    /// expired by the time a new block is imposed, so escalation seldom
    /// goes past the first step.
    #[default]
    AsObserved,
    /// Kept under a separate key that outlives individual blocks, so
    /// repeated lockouts compound.
    Persistent { history_ttl_seconds: u64 },
}
