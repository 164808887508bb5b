//! Scripted provider used by the dispatcher and session tests

#![allow(dead_code)]

use async_trait::async_trait;
use duochat_core::config::SecretString;
use duochat_core::http::error::classify_status;
use duochat_core::http::{WireAuth, WireOutcome, WireRequest};
use duochat_core::protocol::DispatchRequest;
use duochat_core::providers::{Classification, ProviderAdapter, ProviderError};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Provider that replays a fixed list of outcomes, one per attempt.
/// A `200` outcome's body is returned verbatim as the reply text.
pub struct ScriptedProvider {
    name: String,
    credential: Option<SecretString>,
    script: Mutex<VecDeque<WireOutcome>>,
    latency: Duration,
    pub calls: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<DispatchRequest>>>,
}

impl ScriptedProvider {
    pub fn new(name: &str, script: Vec<WireOutcome>) -> Self {
        Self {
            name: name.to_string(),
            credential: Some(SecretString::new("test-key")),
            script: Mutex::new(script.into()),
            latency: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn without_credential(mut self) -> Self {
        self.credential = None;
        self
    }

    /// Simulated network latency per send
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

pub fn ok(text: &str) -> WireOutcome {
    WireOutcome::response(200, text)
}

pub fn status(code: u16, message: &str) -> WireOutcome {
    WireOutcome::response(code, json!({"error": {"message": message}}).to_string())
}

pub fn transport(reason: &str) -> WireOutcome {
    WireOutcome::Transport(reason.to_string())
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn credential(&self) -> Result<&SecretString, ProviderError> {
        self.credential
            .as_ref()
            .ok_or_else(|| ProviderError::MissingCredential {
                provider: self.name.clone(),
            })
    }

    fn serialize(&self, request: &DispatchRequest, credential: &SecretString) -> WireRequest {
        self.requests.lock().unwrap().push(request.clone());
        WireRequest::post(
            format!("scripted://{}", self.name),
            WireAuth::Bearer(credential.clone()),
            json!({ "messages": request.history.len() }),
        )
    }

    async fn send(&self, _request: WireRequest) -> WireOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| transport("script exhausted"))
    }

    fn classify(&self, outcome: WireOutcome) -> Classification {
        match outcome {
            WireOutcome::Transport(reason) => Classification::RetryableFailure(reason),
            WireOutcome::Response { status, body } => match classify_status(status, &body) {
                Some(failure) => failure,
                None => Classification::Success(body),
            },
        }
    }
}
