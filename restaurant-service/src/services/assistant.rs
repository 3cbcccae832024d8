//! The retrieval-augmented answer pipeline.
//!
//! A query flows through three steps: the model picks a tool, the tool runs
//! against the catalog, and the model optionally turns the retrieved data
//! into a recommendation. Only the retrieval step can fail the request. Model
//! failures degrade to a unified search and an answer without prose.

use crate::models::{AssistantReply, TokenUsage};
use crate::services::metrics;
use crate::services::providers::{GenerationParams, RetrievedContext, TextProvider};
use crate::services::search::{RestaurantSearch, SearchError};
use crate::services::tools::{tool_definitions, ToolCall, ToolDefinition, TOOL_NAMES};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

const TOOL_SELECTION_PROMPT: &str = "당신은 서울 여의도 맛집 안내 도우미입니다. \
사용자의 질문을 읽고 제공된 도구 중 가장 알맞은 도구 하나를 골라 호출하세요. \
식당 이름, 카테고리, 메뉴가 섞인 질문은 search_restaurants, \
특정 음식 종류는 search_by_category, 특정 메뉴는 search_by_menu, \
예산이 언급되면 search_by_price_range, 특정 식당의 메뉴나 가격은 get_restaurant_details, \
전체 현황은 get_statistics, 비슷한 식당 추천은 recommend_similar_restaurants를 사용하세요.";

const ANSWER_PROMPT: &str = "당신은 서울 여의도 맛집 안내 도우미입니다. \
앞에 주어진 검색 결과만을 근거로 사용자의 질문에 한국어로 간결하게 답하세요. \
식당 이름과 대표 메뉴, 가격을 구체적으로 언급하고, 결과에 없는 식당이나 메뉴는 지어내지 마세요. \
검색 결과가 비어 있으면 찾지 못했다고 솔직하게 알려주세요.";

const ANSWER_TEMPERATURE: f32 = 0.3;

/// Error type for the assistant pipeline.
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    /// Ask the model to write a recommendation from the retrieved data.
    pub compose_answer: bool,

    /// Output token cap for each model call.
    pub max_tokens: u32,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            compose_answer: true,
            max_tokens: 1000,
        }
    }
}

/// Restaurant assistant.
pub struct Assistant {
    provider: Arc<dyn TextProvider>,
    search: RestaurantSearch,
    tools: Vec<ToolDefinition>,
    settings: AssistantSettings,
}

impl Assistant {
    pub fn new(
        provider: Arc<dyn TextProvider>,
        search: RestaurantSearch,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            provider,
            search,
            tools: tool_definitions(),
            settings,
        }
    }

    pub fn provider(&self) -> &dyn TextProvider {
        self.provider.as_ref()
    }

    /// Answer a natural-language restaurant question.
    pub async fn answer(&self, query: &str) -> Result<AssistantReply, AssistantError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AssistantError::InvalidRequest(
                "query must not be blank".to_string(),
            ));
        }

        let mut usage = TokenUsage::default();
        let (mut call, mut fallback) = self.choose_tool(query, &mut usage).await;

        let result = match self.run_tool(&call) {
            Err(SearchError::InvalidRequest(reason)) if !fallback => {
                tracing::warn!(
                    tool = call.name(),
                    reason = %reason,
                    "Model-selected tool input rejected, using unified search"
                );
                call = ToolCall::search(query);
                fallback = true;
                self.run_tool(&call)?
            }
            other => other?,
        };

        metrics::record_tool_selection(call.name(), fallback);

        let answer = if self.settings.compose_answer {
            self.compose(query, &call, &result, &mut usage).await
        } else {
            None
        };

        tracing::info!(
            action = call.name(),
            fallback,
            answered = answer.is_some(),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Query answered"
        );

        Ok(AssistantReply {
            query: query.to_string(),
            action: call.name().to_string(),
            params: call.params(),
            result,
            answer,
            fallback,
            usage,
        })
    }

    /// Ask the model for a tool. Returns the call and whether it is the fallback.
    async fn choose_tool(&self, query: &str, usage: &mut TokenUsage) -> (ToolCall, bool) {
        let params = GenerationParams {
            system: Some(TOOL_SELECTION_PROMPT.to_string()),
            max_tokens: Some(self.settings.max_tokens),
            ..Default::default()
        };

        let start = Instant::now();
        let selection = self.provider.select_tool(query, &self.tools, &params).await;
        self.record_latency("select_tool", start);

        let selection = match selection {
            Ok(selection) => selection,
            Err(e) => {
                metrics::record_provider_error(self.provider.name(), e.kind());
                tracing::warn!(error = %e, "Tool selection failed, using unified search");
                return (ToolCall::search(query), true);
            }
        };

        self.record_usage(usage, selection.usage);

        let Some(tool_use) = selection.tool_use else {
            tracing::warn!("Model returned no tool_use block, using unified search");
            return (ToolCall::search(query), true);
        };

        match ToolCall::parse(&tool_use.name, &tool_use.input) {
            Ok(call) => {
                let known = TOOL_NAMES.contains(&tool_use.name.as_str());
                tracing::debug!(tool = %tool_use.name, input = %tool_use.input, "Tool selected");
                (call, !known)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Malformed tool input, using unified search");
                (ToolCall::search(query), true)
            }
        }
    }

    fn run_tool(&self, call: &ToolCall) -> Result<Value, SearchError> {
        let result = call.execute(&self.search);
        metrics::record_tool_execution(call.name(), result.is_ok());
        result
    }

    /// Turn the tool result into a recommendation. Failures only drop the prose.
    async fn compose(
        &self,
        query: &str,
        call: &ToolCall,
        result: &Value,
        usage: &mut TokenUsage,
    ) -> Option<String> {
        let context = [RetrievedContext {
            source: call.name().to_string(),
            content: result.to_string(),
        }];
        let params = GenerationParams {
            system: Some(ANSWER_PROMPT.to_string()),
            max_tokens: Some(self.settings.max_tokens),
            temperature: Some(ANSWER_TEMPERATURE),
            ..Default::default()
        };

        let start = Instant::now();
        let response = self.provider.generate(query, &context, &params).await;
        self.record_latency("generate", start);

        match response {
            Ok(response) => {
                self.record_usage(usage, response.usage);
                response.text.filter(|text| !text.trim().is_empty())
            }
            Err(e) => {
                metrics::record_provider_error(self.provider.name(), e.kind());
                tracing::warn!(error = %e, "Answer composition failed, returning retrieval only");
                None
            }
        }
    }

    fn record_latency(&self, operation: &str, start: Instant) {
        metrics::record_provider_latency(
            self.provider.name(),
            self.provider.model(),
            operation,
            start.elapsed().as_secs_f64(),
        );
    }

    fn record_usage(&self, total: &mut TokenUsage, usage: TokenUsage) {
        total.add(usage);
        metrics::record_tokens(self.provider.model(), usage.input_tokens, usage.output_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::sample_catalog;
    use crate::services::providers::mock::MockProvider;
    use crate::services::providers::{
        FinishReason, ProviderError, ProviderResponse, ToolSelection, ToolUse,
    };
    use async_trait::async_trait;
    use serde_json::json;

    /// Provider that always selects the same tool and cannot compose answers.
    struct ScriptedProvider {
        tool_use: Option<ToolUse>,
    }

    impl ScriptedProvider {
        fn selecting(name: &str, input: Value) -> Self {
            Self {
                tool_use: Some(ToolUse {
                    id: "toolu_test".to_string(),
                    name: name.to_string(),
                    input,
                }),
            }
        }
    }

    #[async_trait]
    impl TextProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn select_tool(
            &self,
            _query: &str,
            _tools: &[ToolDefinition],
            _params: &GenerationParams,
        ) -> Result<ToolSelection, ProviderError> {
            Ok(ToolSelection {
                tool_use: self.tool_use.clone(),
                text: None,
                usage: TokenUsage::new(100, 20),
                finish_reason: FinishReason::ToolUse,
            })
        }

        async fn generate(
            &self,
            _prompt: &str,
            _context: &[RetrievedContext],
            _params: &GenerationParams,
        ) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::RateLimited)
        }

        async fn health_check(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn assistant(provider: impl TextProvider + 'static) -> Assistant {
        Assistant::new(
            Arc::new(provider),
            RestaurantSearch::new(Arc::new(sample_catalog())),
            AssistantSettings::default(),
        )
    }

    #[tokio::test]
    async fn answers_with_selected_tool_and_composed_text() {
        let reply = assistant(MockProvider::new(true))
            .answer("짬뽕 먹고 싶어")
            .await
            .unwrap();

        assert_eq!(reply.action, "search_by_menu");
        assert_eq!(reply.params, json!({"menu_keyword": "짬뽕", "limit": 10}));
        assert!(!reply.fallback);
        assert_eq!(reply.result["total"], 2);
        assert!(reply
            .answer
            .as_deref()
            .unwrap()
            .starts_with("Mock answer for: 짬뽕 먹고 싶어"));
        assert!(reply.usage.output_tokens >= 20);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_unified_search() {
        let reply = assistant(MockProvider::new(false))
            .answer("  갈비찜  ")
            .await
            .unwrap();

        assert_eq!(reply.query, "갈비찜");
        assert_eq!(reply.action, "search_restaurants");
        assert_eq!(
            reply.params,
            json!({"query": "갈비찜", "limit": 10, "include_details": false})
        );
        assert!(reply.fallback);
        assert_eq!(reply.result["total"], 2);
        assert!(reply.answer.is_none());
        assert_eq!(reply.usage, TokenUsage::default());
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        for query in ["", "   "] {
            let err = assistant(MockProvider::new(true))
                .answer(query)
                .await
                .unwrap_err();
            assert!(matches!(err, AssistantError::InvalidRequest(_)));
        }
    }

    #[tokio::test]
    async fn reply_echoes_trimmed_query() {
        let reply = assistant(MockProvider::new(true))
            .answer("\n 짬뽕 먹고 싶어 \t")
            .await
            .unwrap();

        assert_eq!(reply.query, "짬뽕 먹고 싶어");
        assert_eq!(reply.action, "search_by_menu");
    }

    #[tokio::test]
    async fn answer_composition_can_be_disabled() {
        let assistant = Assistant::new(
            Arc::new(MockProvider::new(true)),
            RestaurantSearch::new(Arc::new(sample_catalog())),
            AssistantSettings {
                compose_answer: false,
                max_tokens: 200,
            },
        );

        let reply = assistant.answer("통계 알려줘").await.unwrap();
        assert_eq!(reply.action, "get_statistics");
        assert_eq!(reply.result["total_restaurants"], 13);
        assert!(reply.answer.is_none());
    }

    #[tokio::test]
    async fn missing_tool_use_falls_back_to_the_query() {
        let reply = assistant(ScriptedProvider { tool_use: None })
            .answer("라멘")
            .await
            .unwrap();

        assert!(reply.fallback);
        assert_eq!(reply.params["query"], "라멘");
        assert_eq!(reply.usage, TokenUsage::new(100, 20));
    }

    #[tokio::test]
    async fn malformed_tool_input_falls_back() {
        let reply = assistant(ScriptedProvider::selecting(
            "search_by_category",
            json!({"limit": 3}),
        ))
        .answer("카페")
        .await
        .unwrap();

        assert!(reply.fallback);
        assert_eq!(reply.action, "search_restaurants");
        assert_eq!(reply.params["query"], "카페");
    }

    #[tokio::test]
    async fn unknown_tool_uses_its_keyword() {
        let reply = assistant(ScriptedProvider::selecting(
            "find_food",
            json!({"keyword": "쌀국수"}),
        ))
        .answer("베트남 음식 먹고 싶다")
        .await
        .unwrap();

        assert!(reply.fallback);
        assert_eq!(reply.action, "search_restaurants");
        assert_eq!(reply.params["query"], "쌀국수");
        assert_eq!(reply.result["total"], 1);
    }

    #[tokio::test]
    async fn rejected_tool_input_falls_back() {
        let reply = assistant(ScriptedProvider::selecting(
            "search_by_price_range",
            json!({"min_price": 50000, "max_price": 10000}),
        ))
        .answer("스시")
        .await
        .unwrap();

        assert!(reply.fallback);
        assert_eq!(reply.action, "search_restaurants");
        assert_eq!(reply.params["query"], "스시");
    }

    #[tokio::test]
    async fn composition_failure_keeps_retrieval() {
        let reply = assistant(ScriptedProvider::selecting(
            "search_by_category",
            json!({"category": "카페"}),
        ))
        .answer("카페 추천")
        .await
        .unwrap();

        assert!(!reply.fallback);
        assert_eq!(reply.result["total"], 2);
        assert!(reply.answer.is_none());
    }

    #[tokio::test]
    async fn unknown_restaurant_details_is_not_found() {
        let err = assistant(ScriptedProvider::selecting(
            "get_restaurant_details",
            json!({"restaurant_name": "없는식당"}),
        ))
        .answer("없는식당 메뉴")
        .await
        .unwrap_err();

        assert!(matches!(err, AssistantError::Search(SearchError::NotFound(_))));
    }
}
