//! Direct tool access without the language model.

use crate::services::{tool_definitions, ToolCall, ToolDefinition};
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap},
    Json,
};
use serde_json::{json, Value};
use service_core::error::AppError;

/// List the tools offered to the model.
///
/// GET /tools
pub async fn list_tools() -> Json<Vec<ToolDefinition>> {
    Json(tool_definitions())
}

/// Run one tool against the catalog. An empty body counts as `{}`.
///
/// POST /tools/:name
pub async fn run_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let input = tool_input(&headers, &body)?;
    let call = ToolCall::parse_strict(&name, &input)?;

    tracing::debug!(tool = call.name(), "Running tool directly");
    let result = call.execute(&state.search)?;

    Ok(Json(json!({
        "action": call.name(),
        "params": call.params(),
        "result": result
    })))
}

/// Decode the tool input. Any non-empty body must be JSON.
fn tool_input(headers: &HeaderMap, body: &Bytes) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if !is_json {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Expected request with `Content-Type: application/json`"
        )));
    }

    let Json(value) = Json::<Value>::from_bytes(body)
        .map_err(|rejection| AppError::BadRequest(anyhow::anyhow!(rejection.body_text())))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[test]
    fn empty_body_is_empty_input() {
        assert_eq!(tool_input(&HeaderMap::new(), &Bytes::new()).unwrap(), json!({}));
        assert_eq!(
            tool_input(&json_headers(), &Bytes::from_static(b" \n")).unwrap(),
            json!({})
        );
    }

    #[test]
    fn json_body_is_decoded() {
        let input = tool_input(&json_headers(), &Bytes::from_static(r#"{"category": "카페"}"#.as_bytes()))
            .unwrap();
        assert_eq!(input, json!({"category": "카페"}));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = tool_input(&json_headers(), &Bytes::from_static(b"{not json")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn non_json_content_type_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let err = tool_input(&headers, &Bytes::from_static(b"{}")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
