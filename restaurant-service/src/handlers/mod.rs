//! HTTP handlers for the restaurant assistant.

pub mod health;
pub mod metrics;
pub mod query;
pub mod restaurants;
pub mod tools;

use crate::services::{AssistantError, SearchError, ToolError};
use service_core::error::AppError;

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidRequest(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            SearchError::NotFound(name) => {
                AppError::NotFound(anyhow::anyhow!("Restaurant not found: {}", name))
            }
            SearchError::Serialization(e) => AppError::InternalError(e.into()),
        }
    }
}

impl From<AssistantError> for AppError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::InvalidRequest(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            AssistantError::Search(e) => e.into(),
        }
    }
}

impl From<ToolError> for AppError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::UnknownTool(_) => AppError::NotFound(err.into()),
            ToolError::InvalidInput { .. } => AppError::BadRequest(err.into()),
        }
    }
}
