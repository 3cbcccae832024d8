//! Domain models for the restaurant service.

pub mod reply;
pub mod restaurant;

pub use reply::{AssistantReply, TokenUsage};
pub use restaurant::{parse_price, MenuItem, Restaurant};
