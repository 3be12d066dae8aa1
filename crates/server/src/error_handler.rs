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

use crate::models::ErrorResponse;
use aeroguard_core::types::error::CoreError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use validator::ValidationErrors;

/// Convert CoreError to HTTP response
pub fn handle_core_error(error: CoreError) -> Response {
    let (status_code, core_response) = error.to_http_response();

    let status = match status_code {
        400 => StatusCode::BAD_REQUEST,
        429 => StatusCode::TOO_MANY_REQUESTS,
        503 => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let response = ErrorResponse {
        code: core_response.code,
        message: core_response.message,
        details: core_response.details.map(|d| d.to_string()),
    };

    match error {
        CoreError::RateLimitExceeded { retry_after } => (
            status,
            [(header::RETRY_AFTER, retry_after.to_string())],
            Json(response),
        )
            .into_response(),
        _ => (status, Json(response)).into_response(),
    }
}

pub fn handle_validation_error(errors: ValidationErrors) -> Response {
    handle_core_error(CoreError::InvalidInput(format!(
        "Validation error: {}",
        errors
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_core_error_invalid_input() {
        let response = handle_core_error(CoreError::InvalidInput("empty identifier".to_string()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_handle_core_error_rate_limit_sets_retry_after() {
        let response = handle_core_error(CoreError::RateLimitExceeded { retry_after: 42 });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            "42"
        );
    }

    #[test]
    fn test_handle_core_error_store_unavailable() {
        let response = handle_core_error(CoreError::StoreUnavailable("refused".to_string()));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_handle_core_error_serialization() {
        let response = handle_core_error(CoreError::Serialization("bad json".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
