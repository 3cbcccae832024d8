//! Tools the language model can choose from, and their typed dispatch.
//!
//! The model only picks a tool and fills in its input. Every tool maps onto a
//! [`RestaurantSearch`] operation, so the retrieval itself stays deterministic.

use crate::services::search::{RestaurantSearch, SearchError, DEFAULT_LIMIT, DEFAULT_SIMILAR_LIMIT};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const SEARCH_RESTAURANTS: &str = "search_restaurants";
pub const SEARCH_BY_CATEGORY: &str = "search_by_category";
pub const SEARCH_BY_MENU: &str = "search_by_menu";
pub const SEARCH_BY_PRICE_RANGE: &str = "search_by_price_range";
pub const GET_RESTAURANT_DETAILS: &str = "get_restaurant_details";
pub const GET_STATISTICS: &str = "get_statistics";
pub const RECOMMEND_SIMILAR_RESTAURANTS: &str = "recommend_similar_restaurants";

pub const TOOL_NAMES: [&str; 7] = [
    SEARCH_RESTAURANTS,
    SEARCH_BY_CATEGORY,
    SEARCH_BY_MENU,
    SEARCH_BY_PRICE_RANGE,
    GET_RESTAURANT_DETAILS,
    GET_STATISTICS,
    RECOMMEND_SIMILAR_RESTAURANTS,
];

/// Query used when an unrecognized tool arrives without any usable keyword.
pub const DEFAULT_FALLBACK_QUERY: &str = "맛집";

/// Error type for tool parsing.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid input for {tool}: {message}")]
    InvalidInput { tool: String, message: String },
}

/// A tool as advertised to the Anthropic Messages API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

/// Definitions for every restaurant tool.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            SEARCH_RESTAURANTS,
            "Unified search over Yeouido restaurants by restaurant name, category or menu item.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search text, e.g. '중식당', '갈비찜', '매운 음식', '스타벅스'"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default 10)",
                        "default": DEFAULT_LIMIT
                    },
                    "include_details": {
                        "type": "boolean",
                        "description": "Include full menus in the results (default false)",
                        "default": false
                    }
                },
                "required": ["query"]
            }),
        ),
        ToolDefinition::new(
            SEARCH_BY_CATEGORY,
            "List restaurants in a category.",
            json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "description": "Restaurant category, e.g. '중식당', '일식당', '한식', '카페'"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default 10)",
                        "default": DEFAULT_LIMIT
                    }
                },
                "required": ["category"]
            }),
        ),
        ToolDefinition::new(
            SEARCH_BY_MENU,
            "Find restaurants serving a dish.",
            json!({
                "type": "object",
                "properties": {
                    "menu_keyword": {
                        "type": "string",
                        "description": "Dish keyword, e.g. '갈비찜', '짬뽕', '파스타', '스시'"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default 10)",
                        "default": DEFAULT_LIMIT
                    }
                },
                "required": ["menu_keyword"]
            }),
        ),
        ToolDefinition::new(
            SEARCH_BY_PRICE_RANGE,
            "Find restaurants with menu items inside a price range in Korean won. At least one bound is required.",
            json!({
                "type": "object",
                "properties": {
                    "min_price": {
                        "type": "integer",
                        "description": "Minimum price in won"
                    },
                    "max_price": {
                        "type": "integer",
                        "description": "Maximum price in won"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default 10)",
                        "default": DEFAULT_LIMIT
                    }
                }
            }),
        ),
        ToolDefinition::new(
            GET_RESTAURANT_DETAILS,
            "Full details for one restaurant, including its whole menu and prices.",
            json!({
                "type": "object",
                "properties": {
                    "restaurant_name": {
                        "type": "string",
                        "description": "Name of the restaurant"
                    }
                },
                "required": ["restaurant_name"]
            }),
        ),
        ToolDefinition::new(
            GET_STATISTICS,
            "Dataset statistics: restaurant count, menu count and category distribution.",
            json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        ),
        ToolDefinition::new(
            RECOMMEND_SIMILAR_RESTAURANTS,
            "Recommend restaurants similar to a given restaurant.",
            json!({
                "type": "object",
                "properties": {
                    "restaurant_name": {
                        "type": "string",
                        "description": "Restaurant to base the recommendation on"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of recommendations (default 5)",
                        "default": DEFAULT_SIMILAR_LIMIT
                    }
                },
                "required": ["restaurant_name"]
            }),
        ),
    ]
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_similar_limit() -> usize {
    DEFAULT_SIMILAR_LIMIT
}

/// A tool invocation with typed input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "params", rename_all = "snake_case")]
pub enum ToolCall {
    SearchRestaurants {
        query: String,
        #[serde(default = "default_limit")]
        limit: usize,
        #[serde(default)]
        include_details: bool,
    },
    SearchByCategory {
        category: String,
        #[serde(default = "default_limit")]
        limit: usize,
    },
    SearchByMenu {
        menu_keyword: String,
        #[serde(default = "default_limit")]
        limit: usize,
    },
    SearchByPriceRange {
        #[serde(default)]
        min_price: Option<u32>,
        #[serde(default)]
        max_price: Option<u32>,
        #[serde(default = "default_limit")]
        limit: usize,
    },
    GetRestaurantDetails {
        restaurant_name: String,
    },
    GetStatistics {},
    RecommendSimilarRestaurants {
        restaurant_name: String,
        #[serde(default = "default_similar_limit")]
        limit: usize,
    },
}

impl ToolCall {
    /// Default unified search for `query`.
    pub fn search(query: impl Into<String>) -> Self {
        ToolCall::SearchRestaurants {
            query: query.into(),
            limit: DEFAULT_LIMIT,
            include_details: false,
        }
    }

    /// Parse a model-selected tool. Unknown tool names degrade to a unified
    /// search on the input's `keyword` field, then its `query` field.
    pub fn parse(name: &str, input: &Value) -> Result<Self, ToolError> {
        match Self::parse_strict(name, input) {
            Err(ToolError::UnknownTool(_)) => {
                let query = ["keyword", "query"]
                    .iter()
                    .find_map(|key| input.get(*key).and_then(Value::as_str))
                    .filter(|q| !q.trim().is_empty())
                    .unwrap_or(DEFAULT_FALLBACK_QUERY);

                tracing::warn!(tool = name, query, "Unknown tool requested, using unified search");
                Ok(Self::search(query))
            }
            other => other,
        }
    }

    /// Parse a tool by name, rejecting names that are not in [`TOOL_NAMES`].
    pub fn parse_strict(name: &str, input: &Value) -> Result<Self, ToolError> {
        if !TOOL_NAMES.contains(&name) {
            return Err(ToolError::UnknownTool(name.to_string()));
        }

        let params = if input.is_null() { json!({}) } else { input.clone() };

        serde_json::from_value(json!({ "action": name, "params": params })).map_err(|e| {
            ToolError::InvalidInput {
                tool: name.to_string(),
                message: e.to_string(),
            }
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::SearchRestaurants { .. } => SEARCH_RESTAURANTS,
            ToolCall::SearchByCategory { .. } => SEARCH_BY_CATEGORY,
            ToolCall::SearchByMenu { .. } => SEARCH_BY_MENU,
            ToolCall::SearchByPriceRange { .. } => SEARCH_BY_PRICE_RANGE,
            ToolCall::GetRestaurantDetails { .. } => GET_RESTAURANT_DETAILS,
            ToolCall::GetStatistics {} => GET_STATISTICS,
            ToolCall::RecommendSimilarRestaurants { .. } => RECOMMEND_SIMILAR_RESTAURANTS,
        }
    }

    /// The tool input with defaults filled in.
    pub fn params(&self) -> Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("params").map(Value::take))
            .unwrap_or_else(|| json!({}))
    }

    /// Run the tool against the catalog.
    pub fn execute(&self, search: &RestaurantSearch) -> Result<Value, SearchError> {
        let value = match self {
            ToolCall::SearchRestaurants {
                query,
                limit,
                include_details,
            } => serde_json::to_value(search.search_restaurants(query, *limit, *include_details)?)?,
            ToolCall::SearchByCategory { category, limit } => {
                serde_json::to_value(search.search_by_category(category, *limit)?)?
            }
            ToolCall::SearchByMenu {
                menu_keyword,
                limit,
            } => serde_json::to_value(search.search_by_menu(menu_keyword, *limit)?)?,
            ToolCall::SearchByPriceRange {
                min_price,
                max_price,
                limit,
            } => serde_json::to_value(search.search_by_price_range(*min_price, *max_price, *limit)?)?,
            ToolCall::GetRestaurantDetails { restaurant_name } => {
                serde_json::to_value(search.get_restaurant_details(restaurant_name)?)?
            }
            ToolCall::GetStatistics {} => serde_json::to_value(search.get_statistics())?,
            ToolCall::RecommendSimilarRestaurants {
                restaurant_name,
                limit,
            } => serde_json::to_value(search.recommend_similar_restaurants(restaurant_name, *limit)?)?,
        };

        Ok(value)
    }
}
