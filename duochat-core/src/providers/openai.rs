//! OpenAI provider implementation
//!
//! Speaks the chat-completions API: the system context is prepended as a
//! `system` message and the credential is sent as a bearer token.

use crate::config::{ProviderConfig, SecretString};
use crate::http::error::extract_error_message;
use crate::http::{HttpExecutor, WireAuth, WireOutcome, WireRequest};
use crate::protocol::types::{DispatchRequest, MessageRole};
use crate::providers::adapter::{
    classify_non_success, require_credential, Classification, ProviderAdapter, ProviderError,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Reason recorded when a 2xx response carries no choices
pub const NO_CHOICES_REASON: &str = "The response contained no completion choices.";

const EMPTY_REPLY: &str = "Sorry, I couldn't get a response from OpenAI.";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Secondary provider adapter
pub struct OpenAIAdapter {
    name: String,
    base_url: String,
    model: String,
    credential: Option<SecretString>,
    http: Arc<dyn HttpExecutor>,
}

impl OpenAIAdapter {
    /// Create a new OpenAI adapter from its configuration
    pub fn new(config: &ProviderConfig, http: Arc<dyn HttpExecutor>) -> Self {
        Self {
            name: config.name.clone(),
            base_url: config.base_url().to_string(),
            model: config.model().to_string(),
            credential: config.credential().cloned(),
            http,
        }
    }

    fn wire_role(role: MessageRole) -> &'static str {
        match role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    fn parse_success(body: &str) -> Classification {
        let json: Value = match serde_json::from_str(body) {
            Ok(json) => json,
            Err(e) => {
                return Classification::RetryableFailure(format!("Invalid response format: {}", e))
            }
        };

        if let Some(message) = extract_error_message(&json) {
            return Classification::FatalFailure(message);
        }

        let response: ChatCompletionResponse = match serde_json::from_value(json) {
            Ok(response) => response,
            Err(e) => {
                return Classification::RetryableFailure(format!("Invalid response format: {}", e))
            }
        };

        let Some(first) = response.choices.and_then(|c| c.into_iter().next()) else {
            return Classification::FatalFailure(NO_CHOICES_REASON.to_string());
        };

        let text = first
            .message
            .and_then(|message| message.content)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string());

        Classification::Success(text)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAIAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn credential(&self) -> Result<&SecretString, ProviderError> {
        require_credential(&self.name, self.credential.as_ref())
    }

    fn serialize(&self, request: &DispatchRequest, credential: &SecretString) -> WireRequest {
        let mut messages = Vec::with_capacity(request.history.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: request.context.as_str(),
        });
        messages.extend(request.history.iter().map(|message| ChatMessage {
            role: Self::wire_role(message.role),
            content: &message.text,
        }));

        let payload = ChatCompletionRequest {
            model: &self.model,
            messages,
        };

        WireRequest::post(
            format!("{}/chat/completions", self.base_url),
            WireAuth::Bearer(credential.clone()),
            serde_json::to_value(&payload).unwrap_or(Value::Null),
        )
    }

    async fn send(&self, request: WireRequest) -> WireOutcome {
        self.http.execute(request).await
    }

    fn classify(&self, outcome: WireOutcome) -> Classification {
        if let Some(failure) = classify_non_success(&outcome) {
            return failure;
        }
        match outcome {
            WireOutcome::Response { body, .. } => Self::parse_success(&body),
            WireOutcome::Transport(reason) => Classification::RetryableFailure(reason),
        }
    }
}
