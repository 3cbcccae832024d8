//! Integration tests for the assistant and catalog endpoints.

mod common;

use common::TestApp;
use serde_json::{json, Value};

#[tokio::test]
async fn query_returns_tool_result_and_answer() {
    let app = TestApp::spawn().await;

    let response = app.query("짬뽕 먹고 싶어").await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["query"], "짬뽕 먹고 싶어");
    assert_eq!(body["action"], "search_by_menu");
    assert_eq!(body["params"]["menu_keyword"], "짬뽕");
    assert_eq!(body["fallback"], false);
    assert_eq!(body["result"]["total"], 2);
    assert!(body["answer"].as_str().unwrap().starts_with("Mock answer for:"));
    assert!(body["usage"]["input_tokens"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn statistics_question_uses_statistics_tool() {
    let app = TestApp::spawn().await;

    let body: Value = app.query("통계 알려줘").await.json().await.unwrap();
    assert_eq!(body["action"], "get_statistics");
    assert_eq!(body["result"]["total_restaurants"], 13);
    assert_eq!(body["result"]["total_menus"], 34);
}

#[tokio::test]
async fn answer_is_omitted_when_composition_is_disabled() {
    let app = TestApp::spawn_with(&[("ASSISTANT_COMPOSE_ANSWER", "false")]).await;

    let body: Value = app.query("근처 카페").await.json().await.unwrap();
    assert_eq!(body["action"], "search_by_category");
    assert_eq!(body["result"]["total"], 2);
    assert!(body.get("answer").is_none());
}

#[tokio::test]
async fn provider_outage_falls_back_to_unified_search() {
    let app = TestApp::spawn_with(&[
        ("ASSISTANT_PROVIDER", "anthropic"),
        ("ANTHROPIC_API_KEY", "test-key"),
        ("ANTHROPIC_BASE_URL", "http://127.0.0.1:1/v1"),
        ("ASSISTANT_RETRY_MAX_ELAPSED_SECS", "0"),
    ])
    .await;

    let response = app.query("갈비찜").await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["fallback"], true);
    assert_eq!(body["action"], "search_restaurants");
    assert_eq!(body["params"]["query"], "갈비찜");
    assert_eq!(body["result"]["results"][0]["name"], "여의도 갈비집");
    assert!(body.get("answer").is_none());
}

#[tokio::test]
async fn blank_query_is_a_bad_request() {
    let app = TestApp::spawn().await;

    for query in ["", "   ", "\t\n"] {
        let response = app.query(query).await;
        assert_eq!(response.status().as_u16(), 400, "query {:?}", query);

        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("blank"));
    }
}

#[tokio::test]
async fn query_length_is_validated() {
    let app = TestApp::spawn().await;

    let longest = app.query(&format!("짬뽕{}", " ".repeat(498))).await;
    assert_eq!(longest.status().as_u16(), 200);

    let too_long = app.query(&"맛".repeat(501)).await;
    assert_eq!(too_long.status().as_u16(), 422);

    let missing = app.post_json("/query", &json!({"q": "짬뽕"})).await;
    assert_eq!(missing.status().as_u16(), 422);
}

#[tokio::test]
async fn unknown_restaurant_in_query_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app.query("없는식당 메뉴판 보여줘").await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn lists_tool_definitions() {
    let app = TestApp::spawn().await;

    let tools: Vec<Value> = app.get("/tools").await.json().await.unwrap();
    assert_eq!(tools.len(), 7);
    assert!(tools
        .iter()
        .all(|t| t["input_schema"]["type"] == "object" && t["description"].is_string()));
}

#[tokio::test]
async fn runs_tools_directly() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json("/tools/search_by_category", &json!({"category": "카페"}))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["action"], "search_by_category");
    assert_eq!(body["params"], json!({"category": "카페", "limit": 10}));
    assert_eq!(body["result"]["total"], 2);

    // No body at all is treated as empty input
    let response = app
        .client
        .post(format!("{}/tools/get_statistics", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"]["total_restaurants"], 13);
}

#[tokio::test]
async fn tool_errors_map_to_http_status() {
    let app = TestApp::spawn().await;

    let unknown = app.post_json("/tools/drop_tables", &json!({})).await;
    assert_eq!(unknown.status().as_u16(), 404);

    let garbage = app
        .client
        .post(format!("{}/tools/get_statistics", app.address))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status().as_u16(), 400);

    let plain_text = app
        .client
        .post(format!("{}/tools/search_by_category", app.address))
        .header("content-type", "text/plain")
        .body("카페")
        .send()
        .await
        .unwrap();
    assert_eq!(plain_text.status().as_u16(), 400);

    let malformed = app
        .post_json("/tools/search_by_category", &json!({"limit": "many"}))
        .await;
    assert_eq!(malformed.status().as_u16(), 400);

    let no_bounds = app.post_json("/tools/search_by_price_range", &json!({})).await;
    assert_eq!(no_bounds.status().as_u16(), 400);
}

#[tokio::test]
async fn restaurant_details_and_similar() {
    let app = TestApp::spawn().await;

    let response = app.get("/restaurants/스시 한강").await;
    assert_eq!(response.status().as_u16(), 200);
    let details: Value = response.json().await.unwrap();
    assert_eq!(details["name"], "스시 한강");
    assert_eq!(details["category"], "일식당");
    assert!(details["menu_count"].as_u64().unwrap() > 0);

    let response = app.get("/restaurants/여의도 한정식/similar?limit=1").await;
    assert_eq!(response.status().as_u16(), 200);
    let similar: Value = response.json().await.unwrap();
    assert_eq!(similar["base_category"], "한식");
    assert_eq!(similar["recommendations"].as_array().unwrap().len(), 1);

    let missing = app.get("/restaurants/없는식당").await;
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn statistics_endpoint() {
    let app = TestApp::spawn().await;

    let stats: Value = app.get("/statistics").await.json().await.unwrap();
    assert_eq!(stats["total_restaurants"], 13);
    assert_eq!(stats["categories"]["카페"], 2);
}

#[tokio::test]
async fn requests_beyond_the_limit_are_rejected() {
    let app = TestApp::spawn_with(&[("RATE_LIMIT_PER_MINUTE", "2")]).await;

    assert_eq!(app.get("/statistics").await.status().as_u16(), 200);
    assert_eq!(app.get("/statistics").await.status().as_u16(), 200);

    let limited = app.get("/statistics").await;
    assert_eq!(limited.status().as_u16(), 429);
    assert!(limited.headers().contains_key("retry-after"));

    // Operational endpoints are not rate limited
    assert_eq!(app.get("/health").await.status().as_u16(), 200);
}

#[tokio::test]
async fn metrics_include_assistant_counters() {
    restaurant_service::services::init_metrics().expect("Failed to init metrics");
    let app = TestApp::spawn().await;

    app.query("통계 알려줘").await;

    let response = app.get("/metrics").await;
    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("assistant_tool_selections_total"));
    assert!(body.contains("assistant_tool_executions_total"));
}
