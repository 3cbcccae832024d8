use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Health check endpoint for Docker/K8s liveness probes.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "restaurant-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness check: the catalog is loaded and the language model provider is usable.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let restaurants = state.search.catalog().len();
    let provider = state.assistant.provider();

    match provider.health_check().await {
        Ok(_) if restaurants > 0 => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "restaurants": restaurants,
                "provider": provider.name(),
                "model": provider.model()
            })),
        ),
        Ok(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unavailable",
                "error": "restaurant catalog is empty"
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, provider = provider.name(), "Provider health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "provider": provider.name(),
                    "error": e.to_string()
                })),
            )
        }
    }
}
