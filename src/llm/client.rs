use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Failures of the LLM collaborator itself
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Transport-level failure (connection, timeout, TLS)
    #[error("request failed: {0}")]
    Request(String),
    /// The provider answered with a non-success status
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    /// The response envelope could not be read
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Tool definition offered to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// One prompt round-trip
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    /// Tool the model may call; `None` for a plain text answer
    pub tool: Option<ToolDefinition>,
}

impl CompletionRequest {
    pub fn text(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            tool: None,
        }
    }

    pub fn with_tool(system: impl Into<String>, user: impl Into<String>, tool: ToolDefinition) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            tool: Some(tool),
        }
    }
}

/// A structured tool invocation returned by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    /// Concatenated text blocks
    pub text: String,
    /// Tool invocations in the order the model emitted them
    pub tool_calls: Vec<ToolCall>,
}

impl CompletionResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }
}

/// The single capability the engine needs from a language model.
///
/// Retries, timeouts and model selection are the implementor's concern.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Configuration for the Anthropic API client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key (from ANTHROPIC_API_KEY env var)
    pub api_key: String,
    /// Model to use (e.g., "claude-sonnet-4-20250514")
    pub model: String,
    /// Temperature (0-1, lower = more deterministic)
    pub temperature: f64,
    /// Maximum tokens in response
    pub max_tokens: u32,
}

impl AnthropicConfig {
    pub const DEFAULT_MODEL: &'static str = "claude-sonnet-4-20250514";

    /// Create config from environment variables.
    ///
    /// `ANTHROPIC_API_KEY` is required; `ANTHROPIC_MODEL` overrides the model.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set")?;
        let model =
            std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string());

        Ok(Self::new(api_key, model))
    }

    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            temperature: 0.0,
            max_tokens: 4096,
        }
    }
}

/// Anthropic Messages API client
pub struct AnthropicClient {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn build_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            system: Some(request.system.clone()),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.user.clone(),
            }],
            tools: request.tool.iter().cloned().collect(),
            // Let the model decide; answering without a call means "nothing to fix"
            tool_choice: request.tool.as_ref().map(|_| ToolChoice {
                choice_type: "auto".to_string(),
            }),
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.build_request(request);

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        debug!(
            "Anthropic response: {} content blocks, stop_reason={:?}",
            response.content.len(),
            response.stop_reason
        );

        Ok(response.into_completion())
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    choice_type: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

impl AnthropicResponse {
    fn into_completion(self) -> CompletionResponse {
        let mut completion = CompletionResponse::default();

        for block in self.content {
            match block.content_type.as_str() {
                "text" => completion.text.push_str(&block.text),
                "tool_use" => completion.tool_calls.push(ToolCall {
                    id: block.id.unwrap_or_default(),
                    name: block.name.unwrap_or_default(),
                    input: block.input.unwrap_or(serde_json::Value::Null),
                }),
                _ => {}
            }
        }

        completion
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    input: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AnthropicClient {
        AnthropicClient::new(AnthropicConfig::new(
            "test-key".to_string(),
            AnthropicConfig::DEFAULT_MODEL.to_string(),
        ))
    }

    #[test]
    fn test_text_request_has_no_tools() {
        let request = client().build_request(&CompletionRequest::text("sys", "user"));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["system"], "sys");
        assert_eq!(json["messages"][0]["content"], "user");
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
    }

    #[test]
    fn test_tool_request_uses_auto_choice() {
        let tool = ToolDefinition {
            name: "correct_speaker_role".to_string(),
            description: "fix".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        };
        let request = client().build_request(&CompletionRequest::with_tool("sys", "user", tool));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["tools"][0]["name"], "correct_speaker_role");
        assert_eq!(json["tool_choice"]["type"], "auto");
    }

    #[test]
    fn test_response_collects_text_and_tool_calls() {
        let raw = r#"{
            "content": [
                {"type": "text", "text": "One fix needed."},
                {"type": "tool_use", "id": "toolu_1", "name": "correct_speaker_role",
                 "input": {"current_role": "Customer", "utterance_prefix": "Of course", "correct_role": "Agent"}}
            ],
            "stop_reason": "tool_use"
        }"#;
        let response: AnthropicResponse = serde_json::from_str(raw).unwrap();
        let completion = response.into_completion();

        assert_eq!(completion.text, "One fix needed.");
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].id, "toolu_1");
        assert_eq!(completion.tool_calls[0].input["correct_role"], "Agent");
    }
}
