//! Application startup and lifecycle management.

use crate::config::BingCreateConfig;
use crate::handlers;
use crate::services::bing::{Sleeper, TokioSleeper};
use crate::services::{BingClient, GenerationService, TaskRegistry};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BingCreateConfig>,
    pub generation: GenerationService,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::info))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route("/options", get(handlers::options))
        .route("/create", post(handlers::create::create))
        .route("/create/image", post(handlers::create::create_image))
        .route("/create/video", post(handlers::create::create_video))
        .route("/task/:task_id", get(handlers::tasks::get_task))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(CorsLayer::permissive())
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    pub async fn build(config: BingCreateConfig) -> Result<Self, AppError> {
        Self::build_with_sleeper(config, Arc::new(TokioSleeper)).await
    }

    /// Build with a custom poll sleeper; tests pass one that returns at once.
    pub async fn build_with_sleeper(
        config: BingCreateConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, AppError> {
        let bing = BingClient::with_sleeper(config.bing.clone(), sleeper)?;

        if bing.has_cookie() {
            match bing.setup().await {
                Ok(()) => tracing::info!("Bing session ready"),
                Err(e) => tracing::warn!(error = %e, "Bing session setup failed, will retry on first request"),
            }
        } else {
            tracing::warn!("BING_COOKIE_U is not set - generation requests will fail until it is configured");
        }

        let state = AppState {
            config: Arc::new(config.clone()),
            generation: GenerationService::new(bing, TaskRegistry::new()),
        };

        // Port 0 binds a random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(port = http_port, "bing-create-service listening");

        Ok(Self {
            http_port,
            listener,
            state,
        })
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        if let Some(ttl) = self.state.config.tasks.ttl {
            spawn_task_sweeper(self.state.generation.tasks().clone(), ttl);
        }

        let router = build_router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

/// Periodically evict finished video tasks older than `ttl`.
fn spawn_task_sweeper(tasks: TaskRegistry, ttl: Duration) {
    let period = (ttl / 2).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            tasks.evict_expired(ttl);
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
