//! Provider adapter trait and failure classification
//!
//! An adapter owns everything provider-specific: how the history and the
//! system context are laid out on the wire, where the credential goes, and
//! how a response is turned into text or a classified failure. The
//! dispatcher only ever sees [`Classification`] values.

use crate::config::{ProviderConfig, ProviderType, SecretString};
use crate::http::{HttpExecutor, WireOutcome, WireRequest};
use crate::protocol::types::DispatchRequest;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result of classifying one wire outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Usable output; carries the reply text
    Success(String),
    /// Rate limiting, 5xx, or transport failure: worth another attempt
    RetryableFailure(String),
    /// Any other failure: abandon this provider immediately
    FatalFailure(String),
}

impl Classification {
    /// Failure reason, if this is a failure
    pub fn reason(&self) -> Option<&str> {
        match self {
            Classification::Success(_) => None,
            Classification::RetryableFailure(reason) | Classification::FatalFailure(reason) => {
                Some(reason)
            }
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Classification::Success(_) => None,
            Classification::RetryableFailure(_) => Some(FailureKind::Retryable),
            Classification::FatalFailure(_) => Some(FailureKind::Fatal),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Classification::RetryableFailure(_))
    }
}

/// Coarse failure category, used in attempt logs and failure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Config,
    Retryable,
    Fatal,
}

/// Terminal failure of a single provider within one dispatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// No credential configured; the provider is never contacted
    #[error("{provider} API key is not configured.")]
    MissingCredential { provider: String },

    /// Retryable failures until the attempt budget ran out
    #[error("{0}")]
    Exhausted(String),

    /// Non-retryable failure
    #[error("{0}")]
    Fatal(String),
}

impl ProviderError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::MissingCredential { .. } => FailureKind::Config,
            ProviderError::Exhausted(_) => FailureKind::Retryable,
            ProviderError::Fatal(_) => FailureKind::Fatal,
        }
    }
}

/// Capability implemented once per completion backend
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider label used in logs and failure reports
    fn name(&self) -> &str;

    /// The configured credential, or [`ProviderError::MissingCredential`]
    fn credential(&self) -> Result<&SecretString, ProviderError>;

    /// Build the provider-specific request for a dispatch
    fn serialize(&self, request: &DispatchRequest, credential: &SecretString) -> WireRequest;

    /// Perform the network call
    async fn send(&self, request: WireRequest) -> WireOutcome;

    /// Map a wire outcome to success or a classified failure
    fn classify(&self, outcome: WireOutcome) -> Classification;
}

/// Create the adapter for a provider configuration
pub fn create_adapter(
    config: &ProviderConfig,
    http: Arc<dyn HttpExecutor>,
) -> Box<dyn ProviderAdapter> {
    match config.provider_type {
        ProviderType::Gemini => Box::new(crate::providers::GeminiAdapter::new(config, http)),
        ProviderType::OpenAI => Box::new(crate::providers::OpenAIAdapter::new(config, http)),
    }
}

/// Shared credential check used by the concrete adapters
pub(crate) fn require_credential<'a>(
    name: &str,
    credential: Option<&'a SecretString>,
) -> Result<&'a SecretString, ProviderError> {
    credential
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ProviderError::MissingCredential {
            provider: name.to_string(),
        })
}

/// Shared classification of outcomes that are not a 2xx response; returns
/// `None` when the body should be parsed as a success.
pub(crate) fn classify_non_success(outcome: &WireOutcome) -> Option<Classification> {
    match outcome {
        WireOutcome::Transport(reason) => Some(Classification::RetryableFailure(reason.clone())),
        WireOutcome::Response { status, body } => crate::http::error::classify_status(*status, body),
    }
}
