//! Gemini provider implementation
//!
//! Speaks the `generateContent` API: assistant turns use the `model` role,
//! the system context goes into the dedicated `systemInstruction` field and
//! the credential travels as the `key` query parameter.

use crate::config::{ProviderConfig, SecretString};
use crate::http::error::extract_error_message;
use crate::http::{HttpExecutor, WireAuth, WireOutcome, WireRequest};
use crate::protocol::types::{DispatchRequest, Message, MessageRole};
use crate::providers::adapter::{
    classify_non_success, require_credential, Classification, ProviderAdapter, ProviderError,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Reason recorded when a 2xx response carries no candidates
pub const BLOCKED_REASON: &str = "The response was blocked due to safety settings.";

/// Reply used when a candidate is present but carries no text
const EMPTY_REPLY: &str = "Sorry, I couldn't get a response.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Primary provider adapter
pub struct GeminiAdapter {
    name: String,
    base_url: String,
    model: String,
    credential: Option<SecretString>,
    http: Arc<dyn HttpExecutor>,
}

impl GeminiAdapter {
    /// Create a new Gemini adapter from its configuration
    pub fn new(config: &ProviderConfig, http: Arc<dyn HttpExecutor>) -> Self {
        Self {
            name: config.name.clone(),
            base_url: config.base_url().to_string(),
            model: config.model().to_string(),
            credential: config.credential().cloned(),
            http,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn wire_role(role: MessageRole) -> &'static str {
        match role {
            MessageRole::User => "user",
            MessageRole::Assistant => "model",
        }
    }

    fn content(message: &Message) -> Content<'_> {
        Content {
            role: Self::wire_role(message.role),
            parts: [Part {
                text: &message.text,
            }],
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

        let response: GenerateContentResponse = match serde_json::from_value(json) {
            Ok(response) => response,
            Err(e) => {
                return Classification::RetryableFailure(format!("Invalid response format: {}", e))
            }
        };

        let Some(first) = response.candidates.and_then(|c| c.into_iter().next()) else {
            return Classification::FatalFailure(BLOCKED_REASON.to_string());
        };

        let text = first
            .content
            .and_then(|content| content.parts)
            .and_then(|parts| parts.into_iter().next())
            .and_then(|part| part.text)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string());

        Classification::Success(text)
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn credential(&self) -> Result<&SecretString, ProviderError> {
        require_credential(&self.name, self.credential.as_ref())
    }

    fn serialize(&self, request: &DispatchRequest, credential: &SecretString) -> WireRequest {
        let payload = GenerateContentRequest {
            contents: request.history.iter().map(Self::content).collect(),
            system_instruction: SystemInstruction {
                parts: [Part {
                    text: request.context.as_str(),
                }],
            },
        };

        WireRequest::post(
            self.endpoint(),
            WireAuth::QueryParam {
                name: "key",
                value: credential.clone(),
            },
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
