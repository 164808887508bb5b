//! Configuration module for duochat
//!
//! Provides the configuration schema, loaders for YAML / JSON files and the
//! environment, and validation. Provider credentials are resolved here but a
//! missing credential is never a load error: the affected provider reports a
//! configuration failure when the dispatcher reaches it.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    ConnectionConfig, DuochatConfig, ProviderConfig, ProviderType, RetryConfig, SpeechConfig,
    CONFIG_VERSION,
};
pub use secrets::{SafeLogging, SecretString};
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;
use tracing::info;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<DuochatConfig> {
    let path = path.as_ref();
    let content = read_config(path)?;
    let interpolated = env::interpolate_env_vars(&content)?;

    let config: DuochatConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    finish(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<DuochatConfig> {
    let path = path.as_ref();
    let content = read_config(path)?;
    let interpolated = env::interpolate_env_vars(&content)?;

    let config: DuochatConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    finish(config)
}

/// Build the default two-provider configuration, taking credentials from
/// `GEMINI_API_KEY` and `OPENAI_API_KEY`.
pub fn from_env() -> ConfigResult<DuochatConfig> {
    finish(DuochatConfig::default())
}

fn read_config(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn finish(mut config: DuochatConfig) -> ConfigResult<DuochatConfig> {
    env::resolve_credentials(&mut config);
    ConfigValidator::new().validate(&config)?;

    for provider in config.enabled_providers() {
        info!("provider configured: {}", provider.safe_for_logging());
    }
    Ok(config)
}
