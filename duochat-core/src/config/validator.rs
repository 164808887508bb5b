//! Configuration validation utilities

use super::env::is_valid_var_name;
use super::error::{ValidationError, ValidationErrorKind};
use super::schema::DuochatConfig;
use tracing::warn;

/// Configuration validator with cross-field rules on top of the
/// per-section checks in the schema.
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &DuochatConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.validate_chain(config)?;
        self.validate_credential_sources(config)?;

        Ok(())
    }

    /// At least one provider must take part in the fallback chain
    fn validate_chain(&self, config: &DuochatConfig) -> Result<(), ValidationError> {
        if config.enabled_providers().next().is_none() {
            return Err(ValidationError::new(
                "providers",
                ValidationErrorKind::Custom {
                    message: "At least one provider must be enabled".to_string(),
                },
            ));
        }
        Ok(())
    }

    fn validate_credential_sources(&self, config: &DuochatConfig) -> Result<(), ValidationError> {
        for (i, provider) in config.providers.iter().enumerate() {
            if let Some(var_name) = &provider.api_key_env {
                if !is_valid_var_name(var_name) {
                    return Err(ValidationError::new(
                        format!("providers[{}].api_key_env", i),
                        ValidationErrorKind::Custom {
                            message: format!("'{}' is not a valid environment variable name", var_name),
                        },
                    ));
                }
            }

            if provider.api_key.is_none() && provider.api_key_env.is_none() {
                // Not fatal: the provider reports a configuration error when dispatched.
                warn!(provider = %provider.name, "no credential source configured");
            }
        }
        Ok(())
    }
}
