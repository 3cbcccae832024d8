use anyhow::Context;
use restaurant_service::config::RestaurantConfig;
use restaurant_service::services::init_metrics;
use restaurant_service::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RestaurantConfig::load().context("Failed to load configuration")?;

    init_tracing("restaurant-service", &config.common.log_level);
    init_metrics()?;

    tracing::info!(
        environment = %config.environment,
        dataset = %config.dataset.path,
        "Starting restaurant-service"
    );

    let application = Application::build(config)
        .await
        .context("Failed to build application")?;
    application.run_until_stopped().await?;

    Ok(())
}
