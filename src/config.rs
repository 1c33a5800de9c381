//! Provider configuration.
//!
//! The host passes the `provider "langfuse" { ... }` block as JSON. Both
//! attributes are optional: `host` defaults to the hosted Langfuse endpoint
//! and `admin_api_key` falls back to the `LANGFUSE_ADMIN_KEY` environment
//! variable.

use serde::Deserialize;

use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// Base URL used when `host` is not configured.
pub const DEFAULT_HOST: &str = "https://app.langfuse.com";

/// Environment variable consulted when `admin_api_key` is not configured.
pub const ADMIN_KEY_ENV: &str = "LANGFUSE_ADMIN_KEY";

/// Raw provider configuration as supplied by the host.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Base URI of the Langfuse instance.
    #[serde(default)]
    pub host: Option<String>,
    /// Admin API key, only needed when managing organizations.
    #[serde(default)]
    pub admin_api_key: Option<String>,
}

/// Configuration after defaults and environment fallbacks are applied.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Base URL every request is resolved against.
    pub host: String,
    /// Admin API key, if one was configured or found in the environment.
    pub admin_api_key: Option<String>,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("host", &self.host)
            .field(
                "admin_api_key",
                &self.admin_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl ProviderConfig {
    /// Parse the host-supplied configuration. A null config is treated as empty.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| {
            ProviderError::Configuration(format!("invalid provider configuration: {}", e))
        })
    }

    /// Apply defaults, reading the admin key from the process environment.
    pub fn resolve(self) -> ResolvedConfig {
        self.resolve_with_env(|name| std::env::var(name).ok())
    }

    /// Apply defaults using `env` to look up environment variables.
    pub fn resolve_with_env<F>(self, env: F) -> ResolvedConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = non_empty(self.host).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let admin_api_key = non_empty(self.admin_api_key).or_else(|| non_empty(env(ADMIN_KEY_ENV)));

        ResolvedConfig {
            host,
            admin_api_key,
        }
    }

    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "host",
                Attribute::optional_string().with_description(format!(
                    "Base URI of the Langfuse instance (defaults to {}).",
                    DEFAULT_HOST
                )),
            )
            .with_attribute(
                "admin_api_key",
                Attribute::optional_string().sensitive().with_description(format!(
                    "Admin API key. Only needed when managing organizations. Can also come from {}.",
                    ADMIN_KEY_ENV
                )),
            )
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_unset() {
        let resolved = ProviderConfig::default().resolve_with_env(|_| None);

        assert_eq!(resolved.host, DEFAULT_HOST);
        assert!(resolved.admin_api_key.is_none());
    }

    #[test]
    fn test_admin_key_from_environment() {
        let resolved = ProviderConfig::default().resolve_with_env(|name| {
            (name == ADMIN_KEY_ENV).then(|| "env-admin-key".to_string())
        });

        assert_eq!(resolved.admin_api_key.as_deref(), Some("env-admin-key"));
    }

    #[test]
    fn test_explicit_values_win() {
        let config = ProviderConfig::from_value(json!({
            "host": "http://localhost:3000",
            "admin_api_key": "explicit"
        }))
        .unwrap();
        let resolved = config.resolve_with_env(|_| Some("env-admin-key".to_string()));

        assert_eq!(resolved.host, "http://localhost:3000");
        assert_eq!(resolved.admin_api_key.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_empty_strings_are_unset() {
        let config = ProviderConfig::from_value(json!({"host": "", "admin_api_key": " "})).unwrap();
        let resolved = config.resolve_with_env(|_| None);

        assert_eq!(resolved.host, DEFAULT_HOST);
        assert!(resolved.admin_api_key.is_none());
    }

    #[test]
    fn test_null_and_invalid_config() {
        assert!(ProviderConfig::from_value(serde_json::Value::Null).is_ok());

        let err = ProviderConfig::from_value(json!({"host": 42})).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_admin_key() {
        let resolved = ResolvedConfig {
            host: DEFAULT_HOST.to_string(),
            admin_api_key: Some("super-secret".to_string()),
        };
        let debug = format!("{:?}", resolved);
        assert!(!debug.contains("super-secret"));
    }
}
