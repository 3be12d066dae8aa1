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

//! Key layout for rate-limit state.
//!
//! ```text
//! ratelimit:{action}:{identifier}              attempt counter
//! ratelimit:block:{action}:{identifier}        active lockout
//! ratelimit:infractions:{action}:{identifier}  escalation history (opt-in)
//! ```
//!
//! These are logical keys. The shared store writes them under
//! `cache.key_prefix` (default `aeroguard:`), so the counter for a login
//! from `203.0.113.5` lives at `aeroguard:ratelimit:login:203.0.113.5` in
//! Redis. Set the prefix to `""` to store the bare layout.

pub const RATE_LIMIT_DOMAIN: &str = "ratelimit";

pub fn attempt_key(action: &str, identifier: &str) -> String {
    format!("{}:{}:{}", RATE_LIMIT_DOMAIN, action, identifier)
}

pub fn block_key(action: &str, identifier: &str) -> String {
    format!("{}:block:{}:{}", RATE_LIMIT_DOMAIN, action, identifier)
}

pub fn infraction_key(action: &str, identifier: &str) -> String {
    format!("{}:infractions:{}:{}", RATE_LIMIT_DOMAIN, action, identifier)
}
