//! Core conversation types
//!
//! These are the provider-agnostic values that flow between the conversation
//! store and the dispatcher. Provider adapters translate them into their own
//! wire vocabulary; nothing in here knows about a specific backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Text submitted by the user (typed or recognized speech)
    User,
    /// Reply produced by a provider, or the aggregated failure notice
    Assistant,
}

impl MessageRole {
    /// Label used when sharing a conversation as plain text
    pub fn transcript_label(&self) -> &'static str {
        match self {
            MessageRole::User => "User",
            MessageRole::Assistant => "Bot",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single entry in a conversation log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Plain text content
    pub text: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

/// Ephemeral system-level instruction attached to every outgoing request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemContext(String);

impl SystemContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a provider needs for one dispatch: the history snapshot
/// captured when the dispatch started and the generated system context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub history: Vec<Message>,
    pub context: SystemContext,
}

impl DispatchRequest {
    pub fn new(history: Vec<Message>, context: SystemContext) -> Self {
        Self { history, context }
    }
}
