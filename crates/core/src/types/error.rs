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

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error, Display, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The shared backend could not be reached.
    #[display("Store unavailable: {}", _0)]
    StoreUnavailable(String),

    /// A single operation failed against an otherwise live store.
    #[display("Store operation failed: {}", _0)]
    StoreOperation(String),

    #[display("Serialization error: {}", _0)]
    Serialization(String),

    #[display("Store operation timed out")]
    Timeout,

    #[display("Configuration error: {}", _0)]
    ConfigurationError(String),

    /// Not a fault: the normal outcome for a blocked identifier.
    #[display("Rate limit exceeded, retry after {} seconds", retry_after)]
    RateLimitExceeded { retry_after: u64 },

    #[display("Invalid input: {}", _0)]
    InvalidInput(String),

    #[display("I/O error: {}", _0)]
    IoError(String),
}

impl CoreError {
    pub fn to_http_response(&self) -> (u16, ErrorResponse) {
        let code = match self {
            CoreError::InvalidInput(_) => ERROR_CODE_INVALID_REQUEST,
            CoreError::RateLimitExceeded { .. } => ERROR_CODE_RATE_LIMIT,
            CoreError::StoreUnavailable(_) | CoreError::Timeout => ERROR_CODE_SERVICE_UNAVAILABLE,
            _ => ERROR_CODE_INTERNAL_ERROR,
        };

        let response = match self {
            CoreError::RateLimitExceeded { retry_after } => ErrorResponse::with_details(
                code,
                self.to_string(),
                serde_json::json!({ "retry_after": retry_after }),
            ),
            _ => ErrorResponse::new(code, self.to_string()),
        };

        (code as u16, response)
    }
}

impl From<redis::RedisError> for CoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_refusal() || e.is_io_error() {
            CoreError::StoreUnavailable(e.to_string())
        } else {
            CoreError::StoreOperation(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::IoError(e.to_string())
    }
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::ConfigurationError(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: i32, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
        }
    }

    pub fn with_details(code: i32, message: String, details: serde_json::Value) -> Self {
        Self {
            code,
            message,
            details: Some(details),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

pub const ERROR_CODE_INVALID_REQUEST: i32 = 400;
pub const ERROR_CODE_RATE_LIMIT: i32 = 429;
pub const ERROR_CODE_INTERNAL_ERROR: i32 = 500;
pub const ERROR_CODE_SERVICE_UNAVAILABLE: i32 = 503;
