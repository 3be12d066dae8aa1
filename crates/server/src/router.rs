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

use crate::error_handler::{handle_core_error, handle_validation_error};
use crate::handlers::ApiHandlers;
use crate::models::{
    CacheInvalidationResponse, CacheKeyPath, CachePatternQuery, HealthResponse, MetricsResponse,
    RateLimitTarget, RecordFailureRequest,
};
use aeroguard_core::{CoreError, RateLimitDecision, RateLimitOverride, RateLimitStatus};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use validator::Validate;

#[derive(Clone)]
pub struct AppState {
    pub handlers: Arc<ApiHandlers>,
}

pub fn create_router(handlers: Arc<ApiHandlers>) -> Router {
    let app_state = AppState { handlers };

    let rate_limit_routes = Router::new()
        .route(
            "/api/v1/rate-limit/{action}/{identifier}",
            get(handle_status).delete(handle_reset),
        )
        .route(
            "/api/v1/rate-limit/{action}/{identifier}/check",
            post(handle_check),
        )
        .route(
            "/api/v1/rate-limit/{action}/{identifier}/failure",
            post(handle_failure),
        )
        .route(
            "/api/v1/rate-limit/{action}/{identifier}/success",
            post(handle_success),
        );

    let cache_routes = Router::new()
        .route("/api/v1/cache", delete(handle_invalidate_pattern))
        .route("/api/v1/cache/{key}", delete(handle_invalidate_key));

    Router::new()
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .merge(rate_limit_routes)
        .merge(cache_routes)
        .with_state(app_state)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// An empty body means "no body"; anything else must be valid JSON.
fn parse_optional_body<T: DeserializeOwned>(body: &Bytes) -> Result<Option<T>, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some).map_err(|e| {
        handle_core_error(CoreError::InvalidInput(format!(
            "Malformed request body: {}",
            e
        )))
    })
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.handlers.health())
}

async fn handle_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(state.handlers.metrics())
}

async fn handle_status(
    State(state): State<AppState>,
    Path(target): Path<RateLimitTarget>,
) -> Result<Json<RateLimitStatus>, Response> {
    target.validate().map_err(handle_validation_error)?;
    Ok(Json(state.handlers.status(&target).await))
}

async fn handle_check(
    State(state): State<AppState>,
    Path(target): Path<RateLimitTarget>,
    body: Bytes,
) -> Result<Json<RateLimitDecision>, Response> {
    target.validate().map_err(handle_validation_error)?;
    let overrides: Option<RateLimitOverride> = parse_optional_body(&body)?;

    let decision = state.handlers.check(&target, overrides.as_ref()).await;
    if decision.blocked {
        tracing::info!(
            action = %target.action,
            identifier = %target.identifier,
            retry_after = decision.retry_after,
            "Rejected blocked identifier"
        );
    }

    let decision = decision.into_result().map_err(handle_core_error)?;
    Ok(Json(decision))
}

async fn handle_failure(
    State(state): State<AppState>,
    Path(target): Path<RateLimitTarget>,
    body: Bytes,
) -> Result<StatusCode, Response> {
    target.validate().map_err(handle_validation_error)?;
    let request: RecordFailureRequest = parse_optional_body(&body)?.unwrap_or_default();
    request.validate().map_err(handle_validation_error)?;

    state
        .handlers
        .record_failure(&target, request.window_seconds)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_success(
    State(state): State<AppState>,
    Path(target): Path<RateLimitTarget>,
) -> Result<StatusCode, Response> {
    target.validate().map_err(handle_validation_error)?;
    state.handlers.record_success(&target).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_reset(
    State(state): State<AppState>,
    Path(target): Path<RateLimitTarget>,
) -> Result<StatusCode, Response> {
    target.validate().map_err(handle_validation_error)?;
    state.handlers.reset(&target).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_invalidate_key(
    State(state): State<AppState>,
    Path(path): Path<CacheKeyPath>,
) -> Result<StatusCode, Response> {
    path.validate().map_err(handle_validation_error)?;
    state.handlers.invalidate_key(&path.key).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_invalidate_pattern(
    State(state): State<AppState>,
    Query(query): Query<CachePatternQuery>,
) -> Result<Json<CacheInvalidationResponse>, Response> {
    query.validate().map_err(handle_validation_error)?;
    let pattern = query.pattern.ok_or_else(|| {
        handle_core_error(CoreError::InvalidInput(
            "Query parameter 'pattern' is required".to_string(),
        ))
    })?;

    let removed = state.handlers.invalidate_pattern(&pattern).await;
    Ok(Json(CacheInvalidationResponse { pattern, removed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorResponse;
    use aeroguard_core::{Config, GuardContext, KeyValueStore, LocalStore, ManualClock};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const START_MS: i64 = 1_700_000_000_000;

    fn app() -> (Router, Arc<GuardContext>) {
        let clock = Arc::new(ManualClock::new(START_MS));
        let store: Arc<dyn KeyValueStore> = Arc::new(LocalStore::new(100, clock.clone()));
        let context = Arc::new(GuardContext::from_store(Config::default(), store, clock));
        let router = create_router(Arc::new(ApiHandlers::new(context.clone())));
        (router, context)
    }

    async fn send(router: &Router, method: &str, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        router.clone().oneshot(request).await.unwrap()
    }

    async fn json_body<T: DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_local_store() {
        let (router, _) = app();
        let response = send(&router, "GET", "/health", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );

        let health: HealthResponse = json_body(response).await;
        assert_eq!(health.store, "local");
        assert!(!health.shared);
        assert_eq!(health.status, "degraded");
    }

    #[tokio::test]
    async fn test_lockout_flow_over_http() {
        let (router, _) = app();
        let base = "/api/v1/rate-limit/login/203.0.113.5";

        for _ in 0..5 {
            let response = send(&router, "POST", &format!("{}/failure", base), "").await;
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }

        let response = send(&router, "POST", &format!("{}/check", base), "").await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "300");
        let error: ErrorResponse = json_body(response).await;
        assert_eq!(error.code, 429);
        assert_eq!(error.details.as_deref(), Some(r#"{"retry_after":300}"#));

        let response = send(&router, "GET", base, "").await;
        let status: RateLimitStatus = json_body(response).await;
        assert_eq!(status.attempts, 5);
        assert!(status.blocked);

        let response = send(&router, "DELETE", base, "").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&router, "POST", &format!("{}/check", base), "").await;
        assert_eq!(response.status(), StatusCode::OK);
        let decision: RateLimitDecision = json_body(response).await;
        assert_eq!(decision, RateLimitDecision::allowed(4));
    }

    #[tokio::test]
    async fn test_success_clears_state() {
        let (router, _) = app();
        let base = "/api/v1/rate-limit/login/user@example.com";

        send(&router, "POST", &format!("{}/failure", base), "").await;
        let response = send(&router, "POST", &format!("{}/success", base), "").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let status: RateLimitStatus = json_body(send(&router, "GET", base, "").await).await;
        assert_eq!(status, RateLimitStatus::default());
    }

    #[tokio::test]
    async fn test_check_with_override_body() {
        let (router, _) = app();
        let base = "/api/v1/rate-limit/otp/203.0.113.5";

        send(&router, "POST", &format!("{}/failure", base), r#"{"window_seconds":60}"#).await;
        let response = send(
            &router,
            "POST",
            &format!("{}/check", base),
            r#"{"max_attempts":1,"block_seconds":30}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "30");
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let (router, _) = app();

        let response = send(
            &router,
            "POST",
            "/api/v1/rate-limit/login/203.0.113.5/check",
            "{not json",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let long_identifier = "a".repeat(300);
        let response = send(
            &router,
            "GET",
            &format!("/api/v1/rate-limit/login/{}", long_identifier),
            "",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &router,
            "POST",
            "/api/v1/rate-limit/login/203.0.113.5/failure",
            r#"{"window_seconds":0}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cache_invalidation() {
        let (router, context) = app();
        let cache = context.cache();
        cache.set("catalog:airports:all", &vec!["LFPG"], None).await;
        cache.set("catalog:airports:LFPG", &"Paris", None).await;
        cache.set("catalog:firs:all", &vec!["LFFF"], None).await;

        let response = send(&router, "DELETE", "/api/v1/cache/catalog:firs:all", "").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let firs: Option<Vec<String>> = cache.get("catalog:firs:all").await;
        assert!(firs.is_none());

        let response = send(&router, "DELETE", "/api/v1/cache?pattern=catalog:airports:*", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: CacheInvalidationResponse = json_body(response).await;
        assert_eq!(body.removed, 2);

        let response = send(&router, "DELETE", "/api/v1/cache", "").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_counts_checks() {
        let (router, _) = app();
        send(&router, "POST", "/api/v1/rate-limit/login/203.0.113.5/check", "").await;

        let response = send(&router, "GET", "/metrics", "").await;
        assert_eq!(response.status(), StatusCode::OK);
        let metrics: serde_json::Value = json_body(response).await;
        assert_eq!(metrics["rate_limit"]["checks"], 1);
        assert_eq!(metrics["store"], "local");
    }
}
