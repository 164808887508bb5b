//! Environment variable interpolation and credential resolution

use super::error::ConfigError;
use super::schema::DuochatConfig;
use super::secrets::SecretString;
use regex::Regex;
use std::env;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
    })
}

/// Interpolate `${VAR}` references in a configuration string.
///
/// Every referenced variable must be set; the first missing one is reported.
/// Lines that are YAML comments are left untouched. Credentials that may be
/// absent belong in `api_key_env`, which leaves the provider unconfigured
/// instead of failing the load.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(content.len());

    for line in content.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            continue;
        }

        let mut interpolated = line.to_string();
        for cap in env_var_pattern().captures_iter(line) {
            let full_match = &cap[0];
            let var_name = &cap[1];

            match env::var(var_name) {
                Ok(value) => {
                    interpolated = interpolated.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarNotFound {
                        var: var_name.to_string(),
                    });
                }
            }
        }
        result.push_str(&interpolated);
    }

    Ok(result)
}

/// Fill in credentials from `api_key_env` for providers without a literal key.
///
/// A missing or empty variable leaves the provider without a credential; the
/// dispatcher reports that as a configuration error for that provider only.
pub fn resolve_credentials(config: &mut DuochatConfig) {
    for provider in &mut config.providers {
        if provider.credential().is_some() {
            continue;
        }

        let Some(var_name) = provider.api_key_env.as_deref() else {
            continue;
        };

        match env::var(var_name) {
            Ok(value) if !value.trim().is_empty() => {
                debug!(provider = %provider.name, var = var_name, "resolved credential from environment");
                provider.api_key = Some(SecretString::new(value));
            }
            _ => {
                warn!(provider = %provider.name, var = var_name, "credential not set; provider will be skipped");
                provider.api_key = None;
            }
        }
    }
}

/// Check that a string is a well-formed environment variable name
pub fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
