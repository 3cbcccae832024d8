pub mod assistant;
pub mod catalog;
#[cfg(test)]
pub mod fixtures;
pub mod metrics;
pub mod providers;
pub mod search;
pub mod tools;

pub use assistant::{Assistant, AssistantError, AssistantSettings};
pub use catalog::{Catalog, CatalogError};
pub use metrics::{get_metrics, init_metrics};
pub use search::{RestaurantSearch, SearchError};
pub use tools::{tool_definitions, ToolCall, ToolDefinition, ToolError};
