use bing_create_service::{config::BingCreateConfig, services::init_metrics, Application};
use service_core::error::AppError;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = BingCreateConfig::load()?;

    init_tracing(
        "bing-create-service",
        "info,bing_create_service=debug",
        config.otlp_endpoint.as_deref(),
    );

    // Must run before any metric is recorded
    init_metrics();

    tracing::info!(
        environment = %config.common.environment,
        base_url = %config.bing.base_url,
        "Starting bing-create-service"
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
