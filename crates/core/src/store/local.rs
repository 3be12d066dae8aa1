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

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use super::{glob_matches, KeyValueStore, StoreKind};
use crate::clock::Clock;
use crate::types::Result;

#[derive(Debug, Clone)]
struct LocalEntry {
    value: String,
    expires_at_ms: i64,
}

/// Bounded in-process store.
///
/// State held here is private to this process. Counters kept in it are not
/// seen by other instances behind the same load balancer.
pub struct LocalStore {
    entries: Mutex<LruCache<String, LocalEntry>>,
    clock: Arc<dyn Clock>,
}

impl LocalStore {
    pub fn new(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
        }
    }

    /// Live and not-yet-evicted expired entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_expired(entries: &mut LruCache<String, LocalEntry>, now_ms: i64) {
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.expires_at_ms <= now_ms)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            entries.pop(&key);
        }
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("len", &self.len())
            .field("cap", &self.entries.lock().cap())
            .finish()
    }
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at_ms > now => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> Result<()> {
        let now = self.clock.now_millis();
        let ttl_ms = i64::try_from(ttl_seconds.max(1).saturating_mul(1000)).unwrap_or(i64::MAX);
        let entry = LocalEntry {
            value,
            expires_at_ms: now.saturating_add(ttl_ms),
        };

        let mut entries = self.entries.lock();
        if entries.len() >= entries.cap().get() && !entries.contains(key) {
            Self::purge_expired(&mut entries, now);
        }
        entries.put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().pop(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();
        let matching: Vec<(String, bool)> = entries
            .iter()
            .filter(|(key, _)| glob_matches(pattern, key))
            .map(|(key, entry)| (key.clone(), entry.expires_at_ms > now))
            .collect();

        let mut removed = 0;
        for (key, live) in &matching {
            entries.pop(key);
            if *live {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn reset_all(&self) -> Result<()> {
        self.entries.lock().clear();
        Ok(())
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }
}
