//! Mock provider implementation for development and testing.
//!
//! Routes queries to tools with fixed keyword rules instead of a model call,
//! so the whole pipeline runs offline and deterministically.

use super::{
    FinishReason, GenerationParams, ProviderError, ProviderResponse, RetrievedContext,
    TextProvider, ToolSelection, ToolUse,
};
use crate::models::TokenUsage;
use crate::services::tools::{
    ToolDefinition, GET_RESTAURANT_DETAILS, GET_STATISTICS, RECOMMEND_SIMILAR_RESTAURANTS,
    SEARCH_BY_CATEGORY, SEARCH_BY_MENU, SEARCH_BY_PRICE_RANGE, SEARCH_RESTAURANTS,
};
use async_trait::async_trait;
use serde_json::{json, Value};

const STATISTICS_KEYWORDS: [&str; 4] = ["통계", "몇 개", "몇개", "statistics"];
const SIMILAR_KEYWORDS: [&str; 4] = ["비슷한", "유사한", "같은 곳", "similar"];
const DETAILS_KEYWORDS: [&str; 4] = ["상세", "메뉴판", "정보", "details"];
const MENU_KEYWORDS: [&str; 3] = ["먹고 싶", "파는", "먹을 수"];
const PRICE_KEYWORDS: [&str; 5] = ["가격", "이하", "이상", "저렴", "싼 곳"];
const CATEGORIES: [&str; 12] = [
    "중식당", "일식당", "한식", "중식", "일식", "양식", "카페", "이탈리안", "분식", "베트남",
    "술집", "디저트",
];
const PARTICLES: [&str; 9] = ["이랑", "과", "와", "랑", "의", "은", "는", "을", "를"];

/// Price used for "cheap" queries that name no amount.
const CHEAP_PRICE: u32 = 10_000;

/// Mock text provider.
pub struct MockProvider {
    enabled: bool,
}

impl MockProvider {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn ensure_enabled(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock provider not enabled".to_string(),
            ))
        }
    }
}

fn strip_particle(text: &str) -> &str {
    let text = text.trim();
    PARTICLES
        .iter()
        .find_map(|p| text.strip_suffix(p).filter(|rest| !rest.trim().is_empty()))
        .map(str::trim)
        .unwrap_or(text)
}

/// Text in front of the first keyword found, without a trailing particle.
fn subject_before<'a>(query: &'a str, keywords: &[&str]) -> Option<&'a str> {
    keywords
        .iter()
        .find_map(|k| query.find(k))
        .map(|idx| strip_particle(&query[..idx]))
        .filter(|s| !s.is_empty())
}

/// First amount in the query, in won. Understands `15,000원` and `2만원`.
fn parse_amount(query: &str) -> Option<u32> {
    let start = query.find(|c: char| c.is_ascii_digit())?;
    let rest = &query[start..];
    let digits: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();
    let value: u32 = digits.parse().ok()?;

    let unit = rest.trim_start_matches(|c: char| c.is_ascii_digit() || c == ',');
    let multiplier = if unit.starts_with('만') {
        10_000
    } else if unit.starts_with('천') {
        1_000
    } else {
        1
    };
    value.checked_mul(multiplier)
}

/// Pick a tool and its input for `query`.
fn route(query: &str) -> (&'static str, Value) {
    let q = query.trim();
    let lower = q.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if contains_any(&STATISTICS_KEYWORDS) {
        return (GET_STATISTICS, json!({}));
    }

    if let Some(name) = subject_before(q, &SIMILAR_KEYWORDS) {
        return (RECOMMEND_SIMILAR_RESTAURANTS, json!({ "restaurant_name": name }));
    }

    if let Some(name) = subject_before(q, &DETAILS_KEYWORDS) {
        return (GET_RESTAURANT_DETAILS, json!({ "restaurant_name": name }));
    }

    if contains_any(&PRICE_KEYWORDS) || parse_amount(q).is_some_and(|_| q.contains('원')) {
        let amount = parse_amount(q);
        let params = match amount {
            Some(price) if q.contains("이상") => json!({ "min_price": price }),
            Some(price) => json!({ "max_price": price }),
            None => json!({ "max_price": CHEAP_PRICE }),
        };
        return (SEARCH_BY_PRICE_RANGE, params);
    }

    if let Some(keyword) = subject_before(q, &MENU_KEYWORDS) {
        return (SEARCH_BY_MENU, json!({ "menu_keyword": keyword }));
    }

    if let Some(category) = CATEGORIES.iter().find(|c| q.contains(**c)) {
        return (SEARCH_BY_CATEGORY, json!({ "category": category }));
    }

    (SEARCH_RESTAURANTS, json!({ "query": q }))
}

fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() / 4) as u32
}

#[async_trait]
impl TextProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-router"
    }

    async fn select_tool(
        &self,
        query: &str,
        tools: &[ToolDefinition],
        _params: &GenerationParams,
    ) -> Result<ToolSelection, ProviderError> {
        self.ensure_enabled()?;

        let (name, input) = route(query);
        let tool_use = tools.iter().any(|t| t.name == name).then(|| ToolUse {
            id: "toolu_mock".to_string(),
            name: name.to_string(),
            input,
        });

        Ok(ToolSelection {
            finish_reason: if tool_use.is_some() {
                FinishReason::ToolUse
            } else {
                FinishReason::Complete
            },
            tool_use,
            text: None,
            usage: TokenUsage::new(estimate_tokens(query), 10),
        })
    }

    async fn generate(
        &self,
        prompt: &str,
        context: &[RetrievedContext],
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.ensure_enabled()?;

        let context_len: usize = context.iter().map(|c| c.content.len()).sum();
        let context_tokens: u32 = context.iter().map(|c| estimate_tokens(&c.content)).sum();

        Ok(ProviderResponse {
            text: Some(format!(
                "Mock answer for: {} ({} context blocks, {} bytes)",
                prompt,
                context.len(),
                context_len
            )),
            usage: TokenUsage::new(estimate_tokens(prompt) + context_tokens, 10),
            finish_reason: FinishReason::Complete,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.ensure_enabled()
    }
}
