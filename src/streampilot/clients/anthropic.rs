//! Anthropic Messages API client.
//!
//! Speaks the native Messages endpoint, including tool use: the capability
//! set is rendered as `tools` with JSON-schema `input_schema` objects,
//! `tool_use` content blocks come back as action requests carrying the
//! provider-assigned ids, and action results are rendered as `tool_result`
//! blocks correlated by `tool_use_id`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use streampilot::clients::anthropic::AnthropicClient;
//! use streampilot::model_provider::ModelProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = std::env::var("ANTHROPIC_API_KEY")?;
//!     let client = AnthropicClient::new(&key, "claude-3-5-sonnet-20241022");
//!     let reply = client.invoke(&[], &[]).await?;
//!     println!("{}", reply.answer_text());
//!     Ok(())
//! }
//! ```

use crate::streampilot::action_registry::ActionSpec;
use crate::streampilot::conversation::{ActionRequest, ConversationTurn, TurnContent};
use crate::streampilot::executor::{ActionOutcome, ActionResult};
use crate::streampilot::model_provider::{ModelProvider, ModelReply, ProviderError};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Client for Anthropic's Messages API.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    system_prompt: Option<String>,
}

impl AnthropicClient {
    /// Create a client from an API key and model identifier.
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: None,
        }
    }

    /// Point the client at a custom Messages-compatible base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the completion budget per invocation.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Steer the model with a system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Share an existing HTTP client (connection pooling).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl ModelProvider for AnthropicClient {
    async fn invoke(
        &self,
        history: &[ConversationTurn],
        actions: &[ActionSpec],
    ) -> Result<ModelReply, ProviderError> {
        let body = build_request_body(
            &self.model,
            self.max_tokens,
            self.system_prompt.as_deref(),
            history,
            actions,
        );
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        log::debug!("invoking {} with {} turns", self.model, history.len());

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Connection(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ProviderError::Connection(err.to_string()))?;

        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            log::error!(
                "AnthropicClient::invoke(): status {} from {}: {}",
                status.as_u16(),
                url,
                text
            );
            return Err(ProviderError::Status(status.as_u16(), text));
        }

        let value: Value =
            serde_json::from_str(&text).map_err(|err| ProviderError::Malformed(err.to_string()))?;
        parse_reply(&value)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Render the turn log and capability set into a Messages request body.
fn build_request_body(
    model: &str,
    max_tokens: u32,
    system: Option<&str>,
    history: &[ConversationTurn],
    actions: &[ActionSpec],
) -> Value {
    let mut body = json!({
        "model": model,
        "max_tokens": max_tokens,
        "messages": render_turns(history),
    });
    if let Some(system) = system {
        body["system"] = json!(system);
    }
    if !actions.is_empty() {
        body["tools"] = Value::Array(render_tools(actions));
        body["tool_choice"] = json!({ "type": "auto" });
    }
    body
}

fn render_turns(history: &[ConversationTurn]) -> Vec<Value> {
    history
        .iter()
        .map(|turn| match &turn.content {
            TurnContent::Text(text) => json!({ "role": "user", "content": text }),
            // The raw payload goes back verbatim so the model sees its own
            // earlier tokens, tool_use blocks included.
            TurnContent::ModelReply { raw, .. } => json!({ "role": "assistant", "content": raw }),
            TurnContent::Results(results) => json!({
                "role": "user",
                "content": results.iter().map(render_result_block).collect::<Vec<Value>>(),
            }),
        })
        .collect()
}

fn render_result_block(result: &ActionResult) -> Value {
    match &result.outcome {
        ActionOutcome::Success { payload } => json!({
            "type": "tool_result",
            "tool_use_id": result.request_id,
            "content": payload.to_string(),
        }),
        ActionOutcome::Failure { kind, message } => json!({
            "type": "tool_result",
            "tool_use_id": result.request_id,
            "content": format!("{}: {}", kind, message),
            "is_error": true,
        }),
    }
}

fn render_tools(actions: &[ActionSpec]) -> Vec<Value> {
    actions
        .iter()
        .map(|spec| {
            let mut properties = Map::new();
            let mut required: Vec<Value> = Vec::new();
            for param in &spec.parameters {
                let mut prop = Map::new();
                prop.insert("type".to_string(), json!(param.kind.schema_name()));
                if let Some(description) = &param.description {
                    prop.insert("description".to_string(), json!(description));
                }
                properties.insert(param.name.clone(), Value::Object(prop));
                if param.required {
                    required.push(json!(param.name));
                }
            }
            json!({
                "name": spec.name,
                "description": spec.description,
                "input_schema": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                },
            })
        })
        .collect()
}

/// Extract text segments and tool-use requests from a Messages response.
fn parse_reply(value: &Value) -> Result<ModelReply, ProviderError> {
    let content = value
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Malformed("response missing content array".to_string()))?;

    let mut segments = Vec::new();
    let mut requests = Vec::new();
    for block in content {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    segments.push(text.to_string());
                }
            }
            Some("tool_use") => {
                let request_id = block
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ProviderError::Malformed("tool_use block missing id".to_string())
                    })?
                    .to_string();
                let action_name = block
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ProviderError::Malformed("tool_use block missing name".to_string())
                    })?
                    .to_string();
                let arguments = block.get("input").cloned().unwrap_or(Value::Null);
                requests.push(ActionRequest {
                    request_id,
                    action_name,
                    arguments,
                });
            }
            // Unknown block types (thinking etc.) still replay through `raw`;
            // there is nothing to extract from them here.
            _ => {}
        }
    }

    Ok(ModelReply {
        segments,
        requests,
        raw: Value::Array(content.clone()),
    })
}
