//! Application startup and lifecycle management.
//!
//! Loads the restaurant dataset, wires the language model provider into the
//! assistant, and serves the HTTP API.

use crate::config::{ProviderKind, RestaurantConfig};
use crate::handlers::{
    health::{health_check, readiness_check},
    metrics::metrics,
    query::answer_query,
    restaurants::{get_restaurant, similar_restaurants, statistics},
    tools::{list_tools, run_tool},
};
use crate::services::providers::anthropic::AnthropicProvider;
use crate::services::providers::mock::MockProvider;
use crate::services::providers::TextProvider;
use crate::services::{Assistant, Catalog, RestaurantSearch};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub search: RestaurantSearch,
    pub assistant: Arc<Assistant>,
}

/// Build the HTTP router with every route and middleware layer.
pub fn build_router(state: AppState, rate_limiter: IpRateLimiter) -> Router {
    // Rate limit only the endpoints that do real work.
    let api = Router::new()
        .route("/query", post(answer_query))
        .route("/tools", get(list_tools))
        .route("/tools/:name", post(run_tool))
        .route("/restaurants/:name", get(get_restaurant))
        .route("/restaurants/:name/similar", get(similar_restaurants))
        .route("/statistics", get(statistics))
        .layer(from_fn_with_state(rate_limiter, ip_rate_limit_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .merge(api)
        .layer(CorsLayer::permissive())
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Construct the configured language model provider.
pub fn build_provider(config: &RestaurantConfig) -> Result<Arc<dyn TextProvider>, AppError> {
    let provider: Arc<dyn TextProvider> = match config.assistant.provider {
        ProviderKind::Anthropic => Arc::new(
            AnthropicProvider::new(config.anthropic_config())
                .map_err(|e| AppError::ConfigError(e.into()))?,
        ),
        ProviderKind::Mock => Arc::new(MockProvider::new(true)),
    };

    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        "Initialized language model provider"
    );

    Ok(provider)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: RestaurantConfig) -> Result<Self, AppError> {
        let catalog = Catalog::load(&config.dataset.path).await.map_err(|e| {
            tracing::error!("Failed to load restaurant dataset: {}", e);
            AppError::ConfigError(e.into())
        })?;

        let search = RestaurantSearch::new(Arc::new(catalog));
        let provider = build_provider(&config)?;
        let assistant = Assistant::new(provider, search.clone(), config.assistant_settings());

        let rate_limiter = create_ip_rate_limiter(config.rate_limit.per_minute, 60);

        // Bind listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        let state = AppState {
            search,
            assistant: Arc::new(assistant),
        };
        let router = build_router(state, rate_limiter);

        tracing::info!("Restaurant service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let service = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(self.listener, service)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
