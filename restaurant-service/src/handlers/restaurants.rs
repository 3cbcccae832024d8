use crate::services::search::{Recommendations, RestaurantDetails, Statistics, DEFAULT_SIMILAR_LIMIT};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    pub limit: Option<usize>,
}

/// GET /restaurants/:name
pub async fn get_restaurant(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RestaurantDetails>, AppError> {
    Ok(Json(state.search.get_restaurant_details(&name)?))
}

/// GET /restaurants/:name/similar
pub async fn similar_restaurants(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<Recommendations>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_SIMILAR_LIMIT);
    Ok(Json(state.search.recommend_similar_restaurants(&name, limit)?))
}

/// GET /statistics
pub async fn statistics(State(state): State<AppState>) -> Json<Statistics> {
    Json(state.search.get_statistics())
}
