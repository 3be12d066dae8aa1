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

use crate::rate_limit::{EscalationPolicy, RateLimitConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Configuration file error: {0}")]
    FileError(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub host: String,
    pub http_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "aeroguard".to_string(),
            host: "0.0.0.0".to_string(),
            http_port: 8080,
        }
    }
}

impl AppConfig {
    pub fn http_addr(&self) -> ConfigResult<SocketAddr> {
        format!("{}:{}", self.host, self.http_port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{}:{}", self.host, self.http_port)))
    }
}

/// Cache backend settings.
///
/// When `enabled` is false the shared store is never contacted and the
/// process runs on the bounded local store from the start.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub redis_host: String,
    pub redis_port: u16,
    /// Full connection URL; takes precedence over host/port when set.
    pub redis_url: Option<String>,
    pub key_prefix: String,
    pub default_ttl_seconds: u64,
    pub reconnect_attempts: u32,
    pub reconnect_backoff_cap_ms: u64,
    pub connect_timeout_ms: u64,
    pub operation_timeout_ms: u64,
    pub local_max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_url: None,
            key_prefix: "aeroguard:".to_string(),
            default_ttl_seconds: 300,
            reconnect_attempts: 3,
            reconnect_backoff_cap_ms: 3000,
            connect_timeout_ms: 5000,
            operation_timeout_ms: 2000,
            local_max_entries: 100,
        }
    }
}

impl CacheConfig {
    pub fn redis_url(&self) -> String {
        match &self.redis_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("redis://{}:{}", self.redis_host, self.redis_port),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Applied to every `check` that does not override them.
    pub defaults: RateLimitConfig,
    pub escalation: EscalationPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingConfig,
}

fn env_parse<T: FromStr>(name: &str) -> ConfigResult<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(None),
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> ConfigResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileError(e.to_string()))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    pub fn load_from_env() -> ConfigResult<Self> {
        Config::default().apply_env()
    }

    /// Overlays recognized environment variables on top of `self`.
    pub fn apply_env(mut self) -> ConfigResult<Self> {
        if let Ok(host) = std::env::var("APP_HOST") {
            self.app.host = host;
        }
        if let Some(port) = env_parse("APP_HTTP_PORT")? {
            self.app.http_port = port;
        }

        if let Ok(flag) = std::env::var("CACHE_ENABLED") {
            self.cache.enabled = flag.trim().eq_ignore_ascii_case("true");
        }
        if let Ok(host) = std::env::var("REDIS_HOST") {
            self.cache.redis_host = host;
        }
        if let Some(port) = env_parse("REDIS_PORT")? {
            self.cache.redis_port = port;
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.cache.redis_url = Some(url);
        }
        if let Some(ttl) = env_parse("REDIS_TTL")? {
            self.cache.default_ttl_seconds = ttl;
        }
        if let Ok(prefix) = std::env::var("REDIS_KEY_PREFIX") {
            self.cache.key_prefix = prefix;
        }
        if let Some(attempts) = env_parse("REDIS_RECONNECT_ATTEMPTS")? {
            self.cache.reconnect_attempts = attempts;
        }
        if let Some(cap) = env_parse("REDIS_RECONNECT_BACKOFF_CAP_MS")? {
            self.cache.reconnect_backoff_cap_ms = cap;
        }
        if let Some(timeout) = env_parse("REDIS_CONNECT_TIMEOUT_MS")? {
            self.cache.connect_timeout_ms = timeout;
        }
        if let Some(entries) = env_parse("CACHE_LOCAL_MAX_ENTRIES")? {
            self.cache.local_max_entries = entries;
        }

        if let Some(max_attempts) = env_parse("RATE_LIMIT_MAX_ATTEMPTS")? {
            self.rate_limit.defaults.max_attempts = max_attempts;
        }
        if let Some(window) = env_parse("RATE_LIMIT_WINDOW_SECONDS")? {
            self.rate_limit.defaults.window_seconds = window;
        }
        if let Some(block) = env_parse::<u64>("RATE_LIMIT_BLOCK_SECONDS")? {
            // 0 selects the progressive block duration
            self.rate_limit.defaults.block_seconds = (block > 0).then_some(block);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(self)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.cache.default_ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "cache.default_ttl_seconds must be positive".to_string(),
            ));
        }
        if self.cache.local_max_entries == 0 {
            return Err(ConfigError::InvalidValue(
                "cache.local_max_entries must be positive".to_string(),
            ));
        }
        if self.cache.connect_timeout_ms == 0 || self.cache.operation_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "cache timeouts must be positive".to_string(),
            ));
        }
        if self.rate_limit.defaults.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "rate_limit.defaults.max_attempts must be positive".to_string(),
            ));
        }
        if self.rate_limit.defaults.window_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "rate_limit.defaults.window_seconds must be positive".to_string(),
            ));
        }
        if self.cache.enabled && self.cache.redis_url().is_empty() {
            return Err(ConfigError::MissingRequired("cache.redis_url".to_string()));
        }
        Ok(())
    }
}
