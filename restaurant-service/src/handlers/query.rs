//! Natural-language query endpoint.

use crate::models::AssistantReply;
use crate::startup::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    /// Blank queries are rejected by the assistant with 400.
    #[validate(length(max = 500, message = "Query must be at most 500 characters"))]
    pub query: String,
}

/// Answer a restaurant question.
///
/// POST /query
pub async fn answer_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<AssistantReply>, AppError> {
    req.validate()?;

    let result = state.assistant.answer(&req.query).await;
    let outcome = match &result {
        Ok(reply) if reply.fallback => "fallback",
        Ok(_) => "ok",
        Err(_) => "error",
    };
    metrics::counter!("assistant_queries_total", "outcome" => outcome).increment(1);

    Ok(Json(result?))
}
