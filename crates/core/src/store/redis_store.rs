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
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use super::{KeyValueStore, StoreKind};
use crate::types::{CoreError, Result};

const SCAN_BATCH: usize = 100;

/// Escapes Redis glob metacharacters other than `*` so `SCAN MATCH`
/// agrees with the local store's matcher.
fn escape_match_pattern(pattern: &str, keep_star: bool) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '*' if keep_star => escaped.push('*'),
            '*' | '?' | '[' | ']' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Shared store backed by a single multiplexed Redis connection.
///
/// All keys are namespaced under `key_prefix`, so several deployments can
/// share one server and `reset_all` only touches this deployment's keys.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
    key_prefix: String,
    operation_timeout: Duration,
}

impl RedisStore {
    /// Opens a connection and verifies it with `PING`.
    pub async fn connect(
        url: &str,
        key_prefix: &str,
        connect_timeout: Duration,
        operation_timeout: Duration,
    ) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CoreError::ConfigurationError(format!("Invalid Redis URL: {}", e)))?;

        let mut connection =
            tokio::time::timeout(connect_timeout, client.get_multiplexed_async_connection())
                .await
                .map_err(|_| {
                    CoreError::StoreUnavailable(format!(
                        "connect to {} timed out after {:?}",
                        url, connect_timeout
                    ))
                })?
                .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        let pong: String = tokio::time::timeout(
            connect_timeout,
            redis::cmd("PING").query_async(&mut connection),
        )
        .await
        .map_err(|_| CoreError::StoreUnavailable("PING timed out".to_string()))?
        .map_err(|e| CoreError::StoreUnavailable(e.to_string()))?;

        info!(response = %pong, prefix = key_prefix, "Connected to Redis");

        Ok(Self {
            connection,
            key_prefix: key_prefix.to_string(),
            operation_timeout,
        })
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result.map_err(|e| {
                debug!(op, error = %e, "Redis command failed");
                CoreError::from(e)
            }),
            Err(_) => {
                debug!(op, timeout = ?self.operation_timeout, "Redis command timed out");
                Err(CoreError::Timeout)
            }
        }
    }

    fn match_pattern(&self, pattern: &str) -> String {
        format!(
            "{}{}",
            escape_match_pattern(&self.key_prefix, false),
            escape_match_pattern(pattern, true)
        )
    }

    async fn scan_keys(&self, full_pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        let mut cursor: u64 = 0;
        let mut found = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = self
                .run(
                    "SCAN",
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(full_pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn),
                )
                .await?;
            found.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(found)
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("key_prefix", &self.key_prefix)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let full_key = self.prefixed(key);
        self.run("GET", conn.get::<_, Option<String>>(&full_key))
            .await
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.connection.clone();
        let full_key = self.prefixed(key);
        self.run(
            "SETEX",
            conn.set_ex::<_, _, ()>(&full_key, value, ttl_seconds.max(1)),
        )
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let full_key = self.prefixed(key);
        self.run("DEL", conn.del::<_, usize>(&full_key)).await?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize> {
        let keys = self.scan_keys(&self.match_pattern(pattern)).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();
        let mut removed = 0;
        for chunk in keys.chunks(SCAN_BATCH) {
            removed += self.run("DEL", conn.del::<_, usize>(chunk)).await?;
        }
        debug!(pattern, removed, "Deleted keys by pattern");
        Ok(removed)
    }

    async fn reset_all(&self) -> Result<()> {
        let removed = self.delete_pattern("*").await?;
        info!(prefix = %self.key_prefix, removed, "Cleared Redis namespace");
        Ok(())
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Shared
    }
}
