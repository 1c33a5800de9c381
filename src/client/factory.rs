//! Builds API clients from provider configuration.

use std::sync::Arc;

use super::admin::{AdminClient, HttpAdminClient};
use super::organization::{HttpOrganizationClient, OrganizationClient};
use crate::config::{ResolvedConfig, ADMIN_KEY_ENV};
use crate::error::ProviderError;

/// Hands out API clients to resource adapters.
///
/// Organization-scoped resources carry their own key pair in state, so a
/// client is built per request for those.
pub trait ClientFactory: Send + Sync {
    /// Client for the admin API. Fails when no admin key is configured.
    fn for_admin(&self) -> Result<Arc<dyn AdminClient>, ProviderError>;

    /// Client authenticated with an organization's key pair.
    fn for_scoped_keys(&self, public_key: &str, private_key: &str) -> Arc<dyn OrganizationClient>;
}

/// [`ClientFactory`] producing HTTP clients that share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    host: String,
    admin_api_key: Option<String>,
    http: reqwest::Client,
}

impl HttpClientFactory {
    pub fn new(config: &ResolvedConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            host: config.host.clone(),
            admin_api_key: config.admin_api_key.clone(),
            http,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl ClientFactory for HttpClientFactory {
    fn for_admin(&self) -> Result<Arc<dyn AdminClient>, ProviderError> {
        let key = self.admin_api_key.as_deref().ok_or_else(|| {
            ProviderError::Configuration(format!(
                "admin_api_key must be set in the provider configuration or via {} to manage organizations",
                ADMIN_KEY_ENV
            ))
        })?;
        Ok(Arc::new(HttpAdminClient::new(
            self.http.clone(),
            &self.host,
            key,
        )))
    }

    fn for_scoped_keys(&self, public_key: &str, private_key: &str) -> Arc<dyn OrganizationClient> {
        Arc::new(HttpOrganizationClient::new(
            self.http.clone(),
            &self.host,
            public_key,
            private_key,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(admin_api_key: Option<&str>) -> ResolvedConfig {
        ResolvedConfig {
            host: "http://localhost:3000".to_string(),
            admin_api_key: admin_api_key.map(str::to_string),
        }
    }

    #[test]
    fn test_admin_client_requires_key() {
        let factory = HttpClientFactory::new(&config(None)).unwrap();
        let err = factory.for_admin().err().unwrap();
        assert!(matches!(err, ProviderError::Configuration(ref msg) if msg.contains(ADMIN_KEY_ENV)));

        let factory = HttpClientFactory::new(&config(Some("admin-key"))).unwrap();
        assert!(factory.for_admin().is_ok());
        assert_eq!(factory.host(), "http://localhost:3000");
    }

    #[test]
    fn test_scoped_clients_need_no_admin_key() {
        let factory = HttpClientFactory::new(&config(None)).unwrap();
        let _client = factory.for_scoped_keys("pk-lf-1", "sk-lf-1");
    }
}
