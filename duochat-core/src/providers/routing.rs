//! Ordered fallback chain with per-provider retries
//!
//! The orchestrator walks its providers in priority order. Each provider is
//! wrapped in a bounded retry loop driven by [`RetryPolicy`]; the first
//! success ends the dispatch, otherwise the provider's terminal error is
//! recorded and the next provider is tried. When every provider has failed
//! the recorded errors are folded into a single assistant message.

use crate::config::{ConfigError, DuochatConfig, ValidationError};
use crate::context::ContextInjector;
use crate::http::client::HttpClient;
use crate::http::HttpExecutor;
use crate::protocol::types::{DispatchRequest, Message};
use crate::providers::adapter::{
    create_adapter, Classification, FailureKind, ProviderAdapter, ProviderError,
};
use crate::providers::retry::RetryPolicy;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// One attempt against one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Provider name
    pub provider: String,

    /// Zero-based attempt index within this provider
    pub attempt: u32,

    /// Backoff waited before this attempt
    pub delay: Duration,

    /// `None` when the attempt succeeded
    pub failure: Option<FailureKind>,
}

/// Terminal error of one provider, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ProviderError,
    /// Attempts actually sent; zero for a missing credential
    pub attempts: u32,
}

/// Every provider in the chain failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub failures: Vec<ProviderFailure>,
}

impl FailureReport {
    /// The visible assistant message appended to the conversation
    pub fn to_message(&self) -> Message {
        Message::assistant(self.to_string())
    }

    /// Recorded reason for a provider, if it was attempted
    pub fn reason_for(&self, provider: &str) -> Option<String> {
        self.failures
            .iter()
            .find(|f| f.provider == provider)
            .map(|f| f.error.to_string())
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.failures.len() {
            1 => "the service",
            2 => "both services",
            _ => "all services",
        };
        writeln!(f, "Sorry, {} failed. Please try again later.", scope)?;
        for failure in &self.failures {
            write!(f, "\n{} Error: {}", failure.provider, failure.error)?;
        }
        Ok(())
    }
}

/// Either the assistant reply or the aggregated failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Success { message: Message, provider: String },
    Failure(FailureReport),
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchResult::Success { .. })
    }

    /// The assistant message to append, whichever way the dispatch ended
    pub fn to_message(&self) -> Message {
        match self {
            DispatchResult::Success { message, .. } => message.clone(),
            DispatchResult::Failure(report) => report.to_message(),
        }
    }
}

/// Result of a dispatch together with its attempt log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub result: DispatchResult,

    /// Every attempt made, in order
    pub attempts: Vec<AttemptRecord>,

    /// Whether any provider after the first was consulted
    pub used_fallback: bool,
}

impl DispatchOutcome {
    /// Attempts made against one provider
    pub fn attempts_for(&self, provider: &str) -> usize {
        self.attempts.iter().filter(|a| a.provider == provider).count()
    }

    /// Sum of all backoff delays waited
    pub fn total_delay(&self) -> Duration {
        self.attempts.iter().map(|a| a.delay).sum()
    }
}

/// Sequences provider adapters and applies the retry policy to each
pub struct RequestOrchestrator {
    providers: Vec<Box<dyn ProviderAdapter>>,
    retry_policy: RetryPolicy,
    injector: ContextInjector,
}

impl RequestOrchestrator {
    /// Build the fallback chain described by a configuration
    pub fn from_config(config: &DuochatConfig) -> Result<Self, ConfigError> {
        let http: Arc<dyn HttpExecutor> = Arc::new(HttpClient::from_config(&config.connection)?);
        Self::from_config_with_executor(config, http)
    }

    /// Same as [`from_config`](Self::from_config) with a caller-supplied transport
    pub fn from_config_with_executor(
        config: &DuochatConfig,
        http: Arc<dyn HttpExecutor>,
    ) -> Result<Self, ConfigError> {
        let mut builder =
            OrchestratorBuilder::new().retry_policy(RetryPolicy::from(&config.retry));
        for provider in config.enabled_providers() {
            builder = builder.provider(create_adapter(provider, Arc::clone(&http)));
        }
        builder.build()
    }

    /// Provider names in fallback order
    pub fn providers(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Produce the next assistant message for a history snapshot.
    ///
    /// Never fails: provider errors are recorded and, if no provider
    /// succeeds, returned as a [`FailureReport`].
    pub async fn dispatch(&self, history: Vec<Message>) -> DispatchOutcome {
        let request = DispatchRequest::new(history, self.injector.build());
        let mut attempts = Vec::new();
        let mut failures = Vec::new();

        for (index, provider) in self.providers.iter().enumerate() {
            if index > 0 {
                info!(provider = provider.name(), "falling back to next provider");
            }

            match self.try_provider(provider.as_ref(), &request, &mut attempts).await {
                Ok(text) => {
                    info!(
                        provider = provider.name(),
                        attempts = attempts.len(),
                        "dispatch succeeded"
                    );
                    return DispatchOutcome {
                        result: DispatchResult::Success {
                            message: Message::assistant(text),
                            provider: provider.name().to_string(),
                        },
                        attempts,
                        used_fallback: index > 0,
                    };
                }
                Err(failure) => {
                    warn!(
                        provider = %failure.provider,
                        attempts = failure.attempts,
                        "provider failed: {}",
                        failure.error
                    );
                    failures.push(failure);
                }
            }
        }

        let report = FailureReport { failures };
        error!("all providers failed: {:?}", report.failures);
        DispatchOutcome {
            result: DispatchResult::Failure(report),
            attempts,
            used_fallback: self.providers.len() > 1,
        }
    }

    /// Run the retry loop for one provider
    async fn try_provider(
        &self,
        provider: &dyn ProviderAdapter,
        request: &DispatchRequest,
        log: &mut Vec<AttemptRecord>,
    ) -> Result<String, ProviderFailure> {
        let name = provider.name();
        let credential = provider.credential().map_err(|error| ProviderFailure {
            provider: name.to_string(),
            error,
            attempts: 0,
        })?;

        let mut attempt = 0;
        loop {
            let delay = self.retry_policy.delay_before_attempt(attempt);
            if !delay.is_zero() {
                debug!(provider = name, attempt, ?delay, "backing off");
                tokio::time::sleep(delay).await;
            }

            let wire = provider.serialize(request, credential);
            let outcome = provider.send(wire).await;
            let classification = provider.classify(outcome);

            log.push(AttemptRecord {
                provider: name.to_string(),
                attempt,
                delay,
                failure: classification.failure_kind(),
            });

            if self.retry_policy.should_retry(attempt, &classification) {
                warn!(
                    provider = name,
                    attempt = attempt + 1,
                    "attempt failed, retrying: {}",
                    classification.reason().unwrap_or_default()
                );
                attempt += 1;
                continue;
            }

            let attempts = attempt + 1;
            return match classification {
                Classification::Success(text) => Ok(text),
                Classification::RetryableFailure(reason) => Err(ProviderFailure {
                    provider: name.to_string(),
                    error: ProviderError::Exhausted(reason),
                    attempts,
                }),
                Classification::FatalFailure(reason) => Err(ProviderFailure {
                    provider: name.to_string(),
                    error: ProviderError::Fatal(reason),
                    attempts,
                }),
            };
        }
    }
}

/// Builder for the fallback chain
pub struct OrchestratorBuilder {
    providers: Vec<Box<dyn ProviderAdapter>>,
    retry_policy: RetryPolicy,
    injector: ContextInjector,
}

impl OrchestratorBuilder {
    /// Create a new builder with the default retry policy
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            retry_policy: RetryPolicy::default(),
            injector: ContextInjector::new(),
        }
    }

    /// Append a provider to the end of the chain
    pub fn provider(mut self, provider: Box<dyn ProviderAdapter>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Build the orchestrator; at least one provider is required
    pub fn build(self) -> Result<RequestOrchestrator, ConfigError> {
        if self.providers.is_empty() {
            return Err(ValidationError::required("providers").into());
        }

        Ok(RequestOrchestrator {
            providers: self.providers,
            retry_policy: self.retry_policy,
            injector: self.injector,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
