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

//! Key-value backends behind the cache.
//!
//! Two implementations exist: [`RedisStore`], shared by every process
//! pointing at the same server, and [`LocalStore`], a bounded in-process
//! LRU used when the shared store cannot be reached. Which one a process
//! uses is decided once at startup by [`select_store`].

mod local;
mod redis_store;
mod selector;

#[cfg(test)]
mod redis_integration_test;

pub use local::LocalStore;
pub use redis_store::RedisStore;
pub use selector::{backoff_delay, select_store, StoreSelection};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Shared,
    Local,
}

impl StoreKind {
    pub fn is_shared(&self) -> bool {
        matches!(self, StoreKind::Shared)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Shared => "shared",
            StoreKind::Local => "local",
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String values with a per-entry TTL.
///
/// Values are opaque to the store; the cache layer owns encoding. A TTL of
/// zero is stored as one second so nothing is written without expiry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> Result<()>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Removes every key matching a glob where `*` matches any run of
    /// characters. `*` is the only wildcard: `?`, `[` and `]` match
    /// themselves on every backend. Returns how many live keys were removed.
    async fn delete_pattern(&self, pattern: &str) -> Result<usize>;

    async fn reset_all(&self) -> Result<()>;

    fn kind(&self) -> StoreKind;
}

/// `*`-only glob match, the subset both backends agree on.
pub(crate) fn glob_matches(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if key.len() < first.len() + last.len() || !key.starts_with(first) || !key.ends_with(last) {
        return false;
    }

    let mut rest = &key[first.len()..key.len() - last.len()];

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    true
}
