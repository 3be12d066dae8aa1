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

mod metrics;
mod service;
mod types;

pub use metrics::{RateLimitMetrics, RateLimitMetricsSnapshot};
pub use service::RateLimiterService;
pub use types::*;

/// Action used when a caller does not name one.
pub const DEFAULT_ACTION: &str = "login";

/// `remaining` reported when a check fails open.
pub const FAIL_OPEN_REMAINING: u32 = 999;
