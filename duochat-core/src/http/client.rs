//! HTTP client implementation using reqwest

use crate::config::{ConfigError, ConnectionConfig};
use crate::http::{HttpExecutor, WireAuth, WireOutcome, WireRequest};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum response size (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("duochat/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: Arc<Client>,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(&ConnectionConfig::default())
    }

    /// Create a new HTTP client from connection settings
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, ConfigError> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| ConfigError::HttpClient {
                message: e.to_string(),
            })?;

        Ok(Self {
            client: Arc::new(client),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }
}

#[async_trait]
impl HttpExecutor for HttpClient {
    async fn execute(&self, request: WireRequest) -> WireOutcome {
        let request_id = request.request_id;
        debug!(%request_id, url = %request.url, "sending request");

        let mut builder = self
            .client
            .post(&request.url)
            .header("X-Request-ID", request_id.to_string())
            .json(&request.body);

        builder = match &request.auth {
            WireAuth::QueryParam { name, value } => {
                builder.query(&[(*name, value.expose_secret())])
            }
            WireAuth::Bearer(token) => builder.bearer_auth(token.expose_secret()),
        };

        // Errors are stripped of their URL: it may carry the credential.
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connect"
                } else {
                    "request"
                };
                let e = e.without_url();
                warn!(%request_id, kind, "transport failure: {}", e);
                return WireOutcome::Transport(e.to_string());
            }
        };

        let status = response.status().as_u16();
        debug!(%request_id, status, "response received");

        if let Some(length) = response.content_length() {
            if length > self.max_response_size as u64 {
                return WireOutcome::Transport(format!(
                    "Response size {} exceeds maximum {}",
                    length, self.max_response_size
                ));
            }
        }

        match response.text().await {
            Ok(body) if body.len() > self.max_response_size => WireOutcome::Transport(format!(
                "Response size {} exceeds maximum {}",
                body.len(),
                self.max_response_size
            )),
            Ok(body) => WireOutcome::Response { status, body },
            Err(e) => {
                let e = e.without_url();
                warn!(%request_id, "failed to read response body: {}", e);
                WireOutcome::Transport(format!("Failed to read response body: {}", e))
            }
        }
    }
}
