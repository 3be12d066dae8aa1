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

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RateLimitMetrics {
    checks: AtomicU64,
    denied: AtomicU64,
    blocks_imposed: AtomicU64,
    failures_recorded: AtomicU64,
    successes_recorded: AtomicU64,
    /// Checks answered permissively because the store failed.
    fail_open: AtomicU64,
}

impl RateLimitMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_check(&self, allowed: bool) {
        self.checks.fetch_add(1, Ordering::Relaxed);
        if !allowed {
            self.denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_block(&self) {
        self.blocks_imposed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self) {
        self.successes_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fail_open(&self) {
        self.fail_open.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RateLimitMetricsSnapshot {
        RateLimitMetricsSnapshot {
            checks: self.checks.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            blocks_imposed: self.blocks_imposed.load(Ordering::Relaxed),
            failures_recorded: self.failures_recorded.load(Ordering::Relaxed),
            successes_recorded: self.successes_recorded.load(Ordering::Relaxed),
            fail_open: self.fail_open.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitMetricsSnapshot {
    pub checks: u64,
    pub denied: u64,
    pub blocks_imposed: u64,
    pub failures_recorded: u64,
    pub successes_recorded: u64,
    pub fail_open: u64,
}

impl RateLimitMetricsSnapshot {
    pub fn denial_rate(&self) -> f64 {
        if self.checks == 0 {
            0.0
        } else {
            self.denied as f64 / self.checks as f64
        }
    }
}
