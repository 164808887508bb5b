//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::{SafeLogging, SecretString};
use serde::{Deserialize, Serialize};

/// Root configuration structure for duochat
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DuochatConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Providers in fallback order: the first entry is tried first
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Per-provider retry behaviour
    #[serde(default)]
    pub retry: RetryConfig,

    /// Global connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Narration of assistant replies
    #[serde(default)]
    pub speech: SpeechConfig,
}

impl Default for DuochatConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            providers: default_providers(),
            retry: RetryConfig::default(),
            connection: ConnectionConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}

/// Supported configuration schema version
pub const CONFIG_VERSION: &str = "0.1";

/// Completion provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider label used in logs and failure reports
    pub name: String,

    /// Wire protocol spoken by this provider
    #[serde(rename = "type")]
    pub provider_type: ProviderType,

    /// Literal credential (supports `${VAR}` interpolation). An unset
    /// interpolated variable fails the load; use `api_key_env` for keys
    /// that may be absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Environment variable holding the credential. A missing variable
    /// leaves the provider unconfigured instead of failing the load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Whether this provider takes part in the fallback chain
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ProviderConfig {
    /// Default configuration for a provider type, reading its credential
    /// from the conventional environment variable.
    pub fn for_type(provider_type: ProviderType) -> Self {
        Self {
            name: provider_type.display_name().to_string(),
            provider_type,
            api_key: None,
            api_key_env: Some(provider_type.default_key_env().to_string()),
            base_url: None,
            model: None,
            enabled: true,
        }
    }

    /// Set a literal credential
    pub fn with_api_key(mut self, key: impl Into<SecretString>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Point the provider at a different host (used by tests and proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Effective base URL, without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider_type.default_base_url())
            .trim_end_matches('/')
    }

    /// Effective model identifier
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider_type.default_model())
    }

    /// Credential if one is configured and non-empty
    pub fn credential(&self) -> Option<&SecretString> {
        self.api_key.as_ref().filter(|key| !key.is_empty())
    }

    /// Validate provider configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::required(format!("{}.name", path)));
        }

        if self.model().trim().is_empty() {
            return Err(ValidationError::required(format!("{}.model", path)));
        }

        match url::Url::parse(self.base_url()) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::new(
                        format!("{}.base_url", path),
                        ValidationErrorKind::InvalidUrl {
                            message: format!(
                                "URL scheme must be http or https, got: {}",
                                url.scheme()
                            ),
                        },
                    ));
                }
            }
            Err(e) => {
                return Err(ValidationError::new(
                    format!("{}.base_url", path),
                    ValidationErrorKind::InvalidUrl {
                        message: e.to_string(),
                    },
                ));
            }
        }

        Ok(())
    }
}

impl SafeLogging for ProviderConfig {
    fn safe_for_logging(&self) -> String {
        let credential = match self.credential() {
            Some(key) => key.partial_redact(),
            None => "[MISSING]".to_string(),
        };
        format!(
            "{} ({}) model={} base_url={} api_key={}",
            self.name,
            self.provider_type.display_name(),
            self.model(),
            self.base_url(),
            credential
        )
    }
}

/// Supported provider wire protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// `generateContent` API with a dedicated system instruction field
    Gemini,
    /// Chat-completions API with a leading system message
    OpenAI,
}

impl ProviderType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "Gemini",
            ProviderType::OpenAI => "OpenAI",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderType::OpenAI => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "gemini-2.5-flash",
            ProviderType::OpenAI => "gpt-3.5-turbo",
        }
    }

    pub fn default_key_env(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "GEMINI_API_KEY",
            ProviderType::OpenAI => "OPENAI_API_KEY",
        }
    }
}

/// Retry policy configuration, applied to every provider in the chain
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Attempts per provider, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay in milliseconds; attempt n waits `base * 2^n`
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
        }
    }
}

impl RetryConfig {
    /// Validate retry configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if !(1..=10).contains(&self.max_attempts) {
            return Err(ValidationError::out_of_range(
                format!("{}.max_attempts", path),
                "Must be between 1 and 10",
            ));
        }

        if self.base_delay_ms > 60_000 {
            return Err(ValidationError::out_of_range(
                format!("{}.base_delay_ms", path),
                "Must not exceed 60000",
            ));
        }

        Ok(())
    }
}

/// Connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_idle_per_host: default_max_idle(),
        }
    }
}

impl ConnectionConfig {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.connect_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.connect_timeout_ms", path),
                "Must be greater than 0",
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.request_timeout_ms", path),
                "Must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Speech narration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechConfig {
    /// Whether successful replies are narrated at session start
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// Default value functions for serde
fn default_true() -> bool { true }
fn default_max_attempts() -> u32 { 3 }
fn default_base_delay() -> u64 { 1000 }
fn default_connect_timeout() -> u64 { 10000 }
fn default_request_timeout() -> u64 { 60000 }
fn default_max_idle() -> usize { 10 }

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::for_type(ProviderType::Gemini),
        ProviderConfig::for_type(ProviderType::OpenAI),
    ]
}

impl DuochatConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::required("version"));
        }

        if self.version != CONFIG_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::InvalidVersion {
                    expected: CONFIG_VERSION.to_string(),
                    actual: self.version.clone(),
                },
            ));
        }

        if self.providers.is_empty() {
            return Err(ValidationError::required("providers"));
        }

        let mut seen_names = std::collections::HashSet::new();
        for (i, provider) in self.providers.iter().enumerate() {
            if !seen_names.insert(&provider.name) {
                return Err(ValidationError::new(
                    format!("providers[{}].name", i),
                    ValidationErrorKind::DuplicateValue {
                        value: provider.name.clone(),
                    },
                ));
            }

            provider.validate(&format!("providers[{}]", i))?;
        }

        self.retry.validate("retry")?;
        self.connection.validate("connection")?;

        Ok(())
    }

    /// Enabled providers in fallback order
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }
}
