//! OpenAI-compatible chat-completions backend
//!
//! Works against any endpoint speaking the chat-completions dialect with
//! function tools (Gemini's OpenAI endpoint by default).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::types::{BackendReply, GenerateRequest, Message, Role, ToolCall};
use super::ReasoningBackend;
use crate::error::{VigilError, VigilResult};
use crate::logic::config::BackendConfig;

// ============================================================================
// CONSTANTS
// ============================================================================

/// First retry delay; doubled on every further attempt
const BASE_BACKOFF_MS: u64 = 500;

/// Upper bound for a single backoff sleep
const MAX_BACKOFF_MS: u64 = 8_000;

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

enum AttemptError {
    /// Transport error, 429 or 5xx
    Transient(String),
    Fatal(String),
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct OpenAiCompatBackend {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl OpenAiCompatBackend {
    pub fn new(config: &BackendConfig) -> VigilResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VigilError::Backend(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/chat/completions", config.url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    fn build_body(&self, request: &GenerateRequest) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(wire_message).collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });

        if request.tools.is_empty() {
            body["response_format"] = json!({ "type": "json_object" });
        } else {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }

        body
    }

    async fn attempt(&self, body: &Value) -> Result<BackendReply, AttemptError> {
        let mut req = self.http_client.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let response = req
            .send()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let msg = format!("status {}: {}", status.as_u16(), truncate(&error_text, 300));
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                AttemptError::Transient(msg)
            } else {
                AttemptError::Fatal(msg)
            });
        }

        let envelope: ChatResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Fatal(format!("undecodable response: {}", e)))?;

        parse_reply(envelope).map_err(AttemptError::Fatal)
    }
}

#[async_trait]
impl ReasoningBackend for OpenAiCompatBackend {
    async fn generate(&self, request: &GenerateRequest) -> VigilResult<BackendReply> {
        let body = self.build_body(request);
        log::debug!(
            "[{}] Sending {} messages, {} tools",
            request.stage,
            request.messages.len(),
            request.tools.len()
        );

        let mut attempt = 0u32;
        loop {
            match self.attempt(&body).await {
                Ok(reply) => return Ok(reply),
                Err(AttemptError::Transient(msg)) if attempt < self.max_retries => {
                    let delay = backoff_delay(attempt);
                    log::warn!(
                        "[{}] Backend call failed ({}), retrying in {:?}",
                        request.stage,
                        msg,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(AttemptError::Transient(msg)) | Err(AttemptError::Fatal(msg)) => {
                    log::error!("[{}] Backend call failed: {}", request.stage, msg);
                    return Err(VigilError::Backend(msg));
                }
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} @ {}", self.model, self.endpoint)
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn wire_message(message: &Message) -> Value {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    if !message.tool_calls.is_empty() {
        let calls: Vec<Value> = message
            .tool_calls
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "type": "function",
                    "function": { "name": c.name, "arguments": c.arguments.to_string() },
                })
            })
            .collect();
        return json!({ "role": role, "content": Value::Null, "tool_calls": calls });
    }

    match &message.tool_call_id {
        Some(id) => json!({ "role": role, "tool_call_id": id, "content": message.content }),
        None => json!({ "role": role, "content": message.content }),
    }
}

fn parse_reply(envelope: ChatResponse) -> Result<BackendReply, String> {
    let choice = envelope
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| "response contained no choices".to_string())?;

    let calls = choice.message.tool_calls.unwrap_or_default();
    if !calls.is_empty() {
        let calls = calls
            .into_iter()
            .enumerate()
            .map(|(i, c)| {
                let raw = c.function.arguments.unwrap_or_default();
                // Unparseable arguments are handed on as-is; validation rejects them later
                let arguments = if raw.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
                };
                ToolCall {
                    id: c.id.unwrap_or_else(|| format!("call_{}", i)),
                    name: c.function.name,
                    arguments,
                }
            })
            .collect();
        return Ok(BackendReply::ToolCalls(calls));
    }

    Ok(BackendReply::Final(choice.message.content.unwrap_or_default()))
}

fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::backend::types::Stage;
    use crate::logic::tools::ToolKind;

    fn backend(url: &str) -> OpenAiCompatBackend {
        let config = BackendConfig {
            url: url.to_string(),
            max_retries: 0,
            timeout_secs: 2,
            ..BackendConfig::default()
        };
        OpenAiCompatBackend::new(&config).unwrap()
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
        assert_eq!(backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(10), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[test]
    fn test_body_uses_json_mode_without_tools() {
        let b = backend("http://localhost:1/v1/");
        assert_eq!(b.endpoint, "http://localhost:1/v1/chat/completions");

        let req = GenerateRequest::new(Stage::AttackerProfile, "sys", "go", json!({}));
        let body = b.build_body(&req);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_body_advertises_tools() {
        let b = backend("http://localhost:1");
        let req = GenerateRequest::new(Stage::IncidentResponse, "sys", "go", json!({}))
            .with_tools(vec![ToolKind::BlockIpAddress.definition()]);
        let body = b.build_body(&req);
        assert_eq!(body["tools"][0]["function"]["name"], "blockIpAddress");
        assert_eq!(body["tools"][0]["type"], "function");
    }

    #[test]
    fn test_tool_turn_round_trips_to_wire() {
        let call = ToolCall::new("call_1", "runWhois", json!({ "target": "example.com" }));
        let wire = wire_message(&Message::tool_requests(vec![call]));
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], "{\"target\":\"example.com\"}");

        let wire = wire_message(&Message::tool_result("call_1", "No match"));
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_1");
    }

    #[test]
    fn test_parse_tool_calls_and_final() {
        let envelope: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": null, "tool_calls": [
                { "id": "a", "type": "function", "function": { "name": "runDig", "arguments": "{\"domain\":\"x.org\"}" } },
                { "type": "function", "function": { "name": "runWhois", "arguments": "not json" } }
            ]}}]
        }))
        .unwrap();

        match parse_reply(envelope).unwrap() {
            BackendReply::ToolCalls(calls) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].arguments["domain"], "x.org");
                assert_eq!(calls[1].id, "call_1");
                assert_eq!(calls[1].arguments, Value::String("not json".into()));
            }
            other => panic!("Expected tool calls, got {:?}", other),
        }

        let envelope: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "{\"isMalicious\": false}" } }]
        }))
        .unwrap();
        assert_eq!(
            parse_reply(envelope).unwrap(),
            BackendReply::Final("{\"isMalicious\": false}".into())
        );
    }

    #[test]
    fn test_empty_choices_is_error() {
        let envelope = ChatResponse { choices: vec![] };
        assert!(parse_reply(envelope).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_backend_error() {
        let b = backend("http://127.0.0.1:9");
        let req = GenerateRequest::new(Stage::ThreatReasoning, "sys", "go", json!({}));
        match b.generate(&req).await {
            Err(VigilError::Backend(_)) => {}
            other => panic!("Expected Backend error, got {:?}", other),
        }
    }
}
