//! HTTP layer for talking to completion providers
//!
//! This module implements the transport shared by every provider adapter:
//! - Connection pooling and client management
//! - Credential placement (query parameter or bearer token)
//! - Separation of transport failures from HTTP responses
//! - Request ID generation and correlation

pub mod client;
pub mod error;

use crate::config::SecretString;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// How the provider credential travels with a request
#[derive(Debug, Clone, PartialEq)]
pub enum WireAuth {
    /// Credential appended as a URL query parameter
    QueryParam {
        name: &'static str,
        value: SecretString,
    },
    /// Credential sent as an `Authorization: Bearer` header
    Bearer(SecretString),
}

/// A provider-specific request, ready to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    /// Unique request ID for log correlation
    pub request_id: Uuid,

    /// Full endpoint URL, without the credential
    pub url: String,

    /// Credential placement
    pub auth: WireAuth,

    /// JSON request body
    pub body: Value,
}

impl WireRequest {
    /// Create a POST request with a fresh request ID
    pub fn post(url: impl Into<String>, auth: WireAuth, body: Value) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            url: url.into(),
            auth,
            body,
        }
    }
}

/// What came back from a send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireOutcome {
    /// No HTTP response at all (connection error, timeout, unreadable body)
    Transport(String),

    /// An HTTP response with any status
    Response { status: u16, body: String },
}

impl WireOutcome {
    pub fn response(status: u16, body: impl Into<String>) -> Self {
        WireOutcome::Response {
            status,
            body: body.into(),
        }
    }
}

/// Trait for HTTP executors
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Execute a JSON POST request. Never fails: transport problems are
    /// reported as [`WireOutcome::Transport`].
    async fn execute(&self, request: WireRequest) -> WireOutcome;
}
