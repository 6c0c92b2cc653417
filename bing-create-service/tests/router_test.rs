use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use bing_create_service::config::{BingConfig, BingCreateConfig, TaskConfig};
use bing_create_service::services::{BingClient, GenerationService, TaskRegistry};
use bing_create_service::{build_router, AppState};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

fn router() -> axum::Router {
    let config = BingCreateConfig {
        common: service_core::config::Config::default(),
        bing: BingConfig::default(),
        tasks: TaskConfig::default(),
        otlp_endpoint: None,
    };
    let bing = BingClient::new(config.bing.clone()).expect("client");
    build_router(AppState {
        config: Arc::new(config),
        generation: GenerationService::new(bing, TaskRegistry::new()),
    })
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_video_without_cookie_is_auth_error() {
    let response = router()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/create/video")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"query":"waves"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "auth_error");
    assert_eq!(
        body["error"]["message"],
        "Cookie _U is not set. Configure BING_COOKIE_U."
    );
}

#[tokio::test]
async fn cors_preflight_is_allowed() {
    let response = router()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/create/image")
                .header("origin", "https://example.org")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn wrong_method_on_known_route_is_not_200() {
    let response = router()
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/create/image")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn metrics_endpoint_renders_text() {
    let response = router()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
}
