//! HTTP handlers for bing-create-service.

pub mod create;
pub mod tasks;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use service_core::error::{AppError, ErrorResponse};

use crate::dtos::{ApiResponse, HealthResponse, OptionsResponse};
use crate::services::get_metrics;
use crate::startup::AppState;

/// Service info and endpoint map.
pub async fn info() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "service": "bing-create-service",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "info": "GET /",
            "health": "GET /health",
            "ready": "GET /ready",
            "metrics": "GET /metrics",
            "options": "GET /options",
            "create": "POST /create",
            "create_image": "POST /create/image",
            "create_video": "POST /create/video",
            "get_task": "GET /task/:taskId",
        },
        "timestamp": chrono::Utc::now(),
    }))
}

pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let bing = state.generation.bing();
    let session_active = bing.is_session_active().await;

    Json(ApiResponse::ok(HealthResponse {
        status: "ok",
        cookie: if bing.has_cookie() { "set" } else { "not set" },
        session: if session_active { "active" } else { "inactive" },
        active_tasks: state.generation.tasks().len(),
    }))
}

/// Ready once a credential is configured; generation cannot work without one.
pub async fn readiness_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    if !state.generation.bing().has_cookie() {
        tracing::debug!("Readiness check failed: BING_COOKIE_U not set");
        return Err(AppError::ServiceUnavailable);
    }
    Ok((StatusCode::OK, Json(json!({ "status": "ready" }))))
}

pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

pub async fn options() -> Json<ApiResponse<OptionsResponse>> {
    Json(ApiResponse::ok(OptionsResponse::catalog()))
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Not found", "invalid_request_error")),
    )
        .into_response()
}
