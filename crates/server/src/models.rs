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

use aeroguard_core::{CacheMetricsSnapshot, RateLimitMetricsSnapshot};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// `(action, identifier)` pair taken from the request path.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateLimitTarget {
    #[validate(length(min = 1, max = 256))]
    pub action: String,

    #[validate(length(min = 1, max = 256))]
    pub identifier: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RecordFailureRequest {
    #[validate(range(min = 1, max = 86400))]
    pub window_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheKeyPath {
    #[validate(length(min = 1, max = 256))]
    pub key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CachePatternQuery {
    #[validate(length(min = 1, max = 256))]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheInvalidationResponse {
    pub pattern: String,
    pub removed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub shared: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub store: String,
    pub uptime_seconds: u64,
    pub cache_hit_rate: f64,
    pub cache: CacheMetricsSnapshot,
    pub rate_limit: RateLimitMetricsSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub message: String,
    pub details: Option<String>,
}
