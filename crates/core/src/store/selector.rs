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

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{KeyValueStore, LocalStore, RedisStore, StoreKind};
use crate::clock::Clock;
use crate::config::CacheConfig;

const BACKOFF_STEP_MS: u64 = 100;

pub struct StoreSelection {
    pub store: Arc<dyn KeyValueStore>,
    pub kind: StoreKind,
    /// Connection attempts made against the shared store.
    pub attempts: u32,
}

impl std::fmt::Debug for StoreSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSelection")
            .field("kind", &self.kind)
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// Delay before retry `attempt` (1-based): 100ms per attempt, capped.
pub fn backoff_delay(attempt: u32, cap_ms: u64) -> Duration {
    Duration::from_millis((attempt as u64).saturating_mul(BACKOFF_STEP_MS).min(cap_ms))
}

/// Picks the backend for the lifetime of the process.
///
/// Never fails: if the shared store cannot be reached after the configured
/// retries, the bounded local store is returned instead. The choice is not
/// revisited later.
pub async fn select_store(config: &CacheConfig, clock: Arc<dyn Clock>) -> StoreSelection {
    let local = || -> Arc<dyn KeyValueStore> {
        Arc::new(LocalStore::new(config.local_max_entries, clock.clone()))
    };

    if !config.enabled {
        info!(
            max_entries = config.local_max_entries,
            "Shared cache disabled, using in-process store"
        );
        return StoreSelection {
            store: local(),
            kind: StoreKind::Local,
            attempts: 0,
        };
    }

    let url = config.redis_url();
    let max_attempts = config.reconnect_attempts.saturating_add(1);
    let mut attempt = 0;

    while attempt < max_attempts {
        attempt += 1;
        match RedisStore::connect(
            &url,
            &config.key_prefix,
            config.connect_timeout(),
            config.operation_timeout(),
        )
        .await
        {
            Ok(store) => {
                info!(attempt, "Using shared Redis store");
                return StoreSelection {
                    store: Arc::new(store),
                    kind: StoreKind::Shared,
                    attempts: attempt,
                };
            }
            Err(e) => {
                warn!(attempt, max_attempts, error = %e, "Redis connection attempt failed");
                if attempt < max_attempts {
                    tokio::time::sleep(backoff_delay(attempt, config.reconnect_backoff_cap_ms))
                        .await;
                }
            }
        }
    }

    warn!(
        attempts = attempt,
        max_entries = config.local_max_entries,
        "Redis unavailable, falling back to in-process store; cache and rate-limit state is NOT shared across instances"
    );

    StoreSelection {
        store: local(),
        kind: StoreKind::Local,
        attempts: attempt,
    }
}
