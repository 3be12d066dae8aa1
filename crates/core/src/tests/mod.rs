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

mod fail_open_tests;

use std::sync::Arc;

use crate::cache::CacheService;
use crate::clock::ManualClock;
use crate::rate_limit::{EscalationPolicy, RateLimitConfig, RateLimiterService};
use crate::store::{KeyValueStore, LocalStore};

/// 2023-11-14T22:13:20Z
pub(crate) const START_MS: i64 = 1_700_000_000_000;

pub(crate) struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<LocalStore>,
    pub cache: Arc<CacheService>,
    pub limiter: RateLimiterService,
}

pub(crate) fn harness(defaults: RateLimitConfig, escalation: EscalationPolicy) -> Harness {
    let clock = Arc::new(ManualClock::new(START_MS));
    let store = Arc::new(LocalStore::new(1000, clock.clone()));
    let store_dyn: Arc<dyn KeyValueStore> = store.clone();
    let cache = Arc::new(CacheService::new(store_dyn, 300));
    let limiter = RateLimiterService::new(cache.clone(), clock.clone(), defaults, escalation);
    Harness {
        clock,
        store,
        cache,
        limiter,
    }
}
