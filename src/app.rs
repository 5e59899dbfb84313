//! Router assembly and request-level middleware.

use crate::config::Config;
use crate::errors::AppError;
use crate::handlers::{self, AppState};
use crate::openapi;
use anyhow::Context;
use axum::{
    body::to_bytes,
    extract::{DefaultBodyLimit, Request},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

/// Largest middleware rejection body carried over into the JSON detail.
const REJECTION_BODY_LIMIT: usize = 1024;

/// Prediction endpoints with the upload size limit applied.
///
/// Returned unfinished so the binary can stack the rate limiter on top.
pub fn prediction_routes(config: &Config) -> Router<Arc<AppState>> {
    Router::new()
        .route("/predict", post(handlers::predict))
        .route("/predict-csv", post(handlers::predict_csv))
        // Json and Multipart both read through this limit and reject with 413.
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
}

/// Applies the per-IP rate limiter to the given routes.
pub fn rate_limited(
    routes: Router<Arc<AppState>>,
    config: &Config,
) -> anyhow::Result<Router<Arc<AppState>>> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            // One quota element replenished every 1000/N ms, i.e. N requests per second
            .per_millisecond((1000 / config.rate_limit_per_second).max(1))
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .context("invalid rate limit configuration")?,
    );

    Ok(routes.layer(GovernorLayer {
        config: governor_conf,
    }))
}

/// Builds the full application router around the given prediction routes.
pub fn router(state: Arc<AppState>, prediction: Router<Arc<AppState>>) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/docs", get(openapi::serve_swagger_ui))
        .route("/api-docs/openapi.json", get(openapi::serve_openapi_spec))
        .merge(prediction)
        .with_state(state)
        .layer(middleware::from_fn(log_requests))
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::map_response(json_error_bodies))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Router with default prediction routes and no rate limiting.
pub fn build_router(state: Arc<AppState>) -> Router {
    let prediction = prediction_routes(&state.config);
    router(state, prediction)
}

/// Logs every request and its response status under a request id.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        "Incoming request: {} {}",
        request.method(),
        request.uri()
    );

    let response = next.run(request).await;

    tracing::info!(%request_id, "Response status: {}", response.status());
    response
}

/// Rewrites plain 408/413/429 rejections produced by the middleware stack
/// (timeout, body limit, rate limiter) into the JSON error body.
pub async fn json_error_bodies(response: Response) -> Response {
    let status = response.status();
    if !matches!(
        status,
        StatusCode::REQUEST_TIMEOUT | StatusCode::PAYLOAD_TOO_LARGE | StatusCode::TOO_MANY_REQUESTS
    ) {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if is_json {
        return response;
    }

    let (parts, body) = response.into_parts();
    let text = to_bytes(body, REJECTION_BODY_LIMIT)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default();
    let detail = if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request rejected")
            .to_string()
    } else {
        text
    };

    let error = match status {
        StatusCode::REQUEST_TIMEOUT => AppError::Timeout(detail),
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(detail),
        _ => AppError::TooManyRequests(detail),
    };

    let mut converted = error.into_response();
    // Keep limiter hints such as retry-after.
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            converted.headers_mut().insert(name.clone(), value.clone());
        }
    }
    converted
}
