//! Deterministic `LlmClient` for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, ToolCall};

/// Replays queued responses in order and records every request it sees
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Result<CompletionResponse, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A client answering one request with plain text
    pub fn text(body: &str) -> Self {
        Self::new(vec![Ok(CompletionResponse::from_text(body))])
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Request("no scripted response left".to_string())))
    }
}

/// Response carrying `correct_speaker_role` calls built from
/// `(current_role, utterance_prefix, correct_role)` triples
pub fn corrections(calls: &[(&str, &str, &str)]) -> CompletionResponse {
    CompletionResponse {
        text: String::new(),
        tool_calls: calls
            .iter()
            .enumerate()
            .map(|(i, (current, prefix, correct))| ToolCall {
                id: format!("toolu_{}", i),
                name: "correct_speaker_role".to_string(),
                input: serde_json::json!({
                    "current_role": current,
                    "utterance_prefix": prefix,
                    "correct_role": correct,
                    "reasoning": "scripted"
                }),
            })
            .collect(),
    }
}

/// Response with no tool calls: the model considers the transcript correct
pub fn no_corrections() -> CompletionResponse {
    CompletionResponse::from_text("The classification looks correct. No corrections needed.")
}
