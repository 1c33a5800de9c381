//! Admin API: organizations and their API keys.

use async_trait::async_trait;
use reqwest::Method;

use super::error::ApiError;
use super::http::{Credentials, HttpTransport};
use super::models::{ApiKey, ApiKeyList, Organization, OrganizationRequest};

/// Operations that require the instance admin key.
#[async_trait]
pub trait AdminClient: Send + Sync {
    async fn create_organization(
        &self,
        request: &OrganizationRequest,
    ) -> Result<Organization, ApiError>;

    async fn get_organization(&self, organization_id: &str) -> Result<Organization, ApiError>;

    async fn update_organization(
        &self,
        organization_id: &str,
        request: &OrganizationRequest,
    ) -> Result<Organization, ApiError>;

    async fn delete_organization(&self, organization_id: &str) -> Result<(), ApiError>;

    /// Create an organization-scoped key pair. The secret is only returned here.
    async fn create_organization_api_key(&self, organization_id: &str)
        -> Result<ApiKey, ApiError>;

    async fn list_organization_api_keys(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ApiKey>, ApiError>;

    async fn delete_organization_api_key(
        &self,
        organization_id: &str,
        api_key_id: &str,
    ) -> Result<(), ApiError>;
}

/// [`AdminClient`] backed by the Langfuse HTTP admin API.
///
/// The admin API takes the admin key as a bearer token, not basic auth.
#[derive(Debug, Clone)]
pub struct HttpAdminClient {
    transport: HttpTransport,
}

impl HttpAdminClient {
    pub fn new(http: reqwest::Client, base_url: &str, admin_api_key: &str) -> Self {
        Self {
            transport: HttpTransport::new(
                http,
                base_url,
                Credentials::Bearer(admin_api_key.to_string()),
            ),
        }
    }
}

fn organization_path(organization_id: &str) -> String {
    format!("api/admin/organizations/{}", organization_id)
}

fn api_keys_path(organization_id: &str) -> String {
    format!("{}/apiKeys", organization_path(organization_id))
}

#[async_trait]
impl AdminClient for HttpAdminClient {
    async fn create_organization(
        &self,
        request: &OrganizationRequest,
    ) -> Result<Organization, ApiError> {
        self.transport
            .send(
                "create_organization",
                Method::POST,
                "api/admin/organizations",
                Some(request),
            )
            .await
    }

    async fn get_organization(&self, organization_id: &str) -> Result<Organization, ApiError> {
        self.transport
            .send::<(), _>(
                "get_organization",
                Method::GET,
                &organization_path(organization_id),
                None,
            )
            .await
    }

    async fn update_organization(
        &self,
        organization_id: &str,
        request: &OrganizationRequest,
    ) -> Result<Organization, ApiError> {
        self.transport
            .send(
                "update_organization",
                Method::PUT,
                &organization_path(organization_id),
                Some(request),
            )
            .await
    }

    async fn delete_organization(&self, organization_id: &str) -> Result<(), ApiError> {
        self.transport
            .send_acknowledged::<()>(
                "delete_organization",
                Method::DELETE,
                &organization_path(organization_id),
                None,
            )
            .await
    }

    async fn create_organization_api_key(
        &self,
        organization_id: &str,
    ) -> Result<ApiKey, ApiError> {
        self.transport
            .send::<(), _>(
                "create_organization_api_key",
                Method::POST,
                &api_keys_path(organization_id),
                None,
            )
            .await
    }

    async fn list_organization_api_keys(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ApiKey>, ApiError> {
        let list: ApiKeyList = self
            .transport
            .send::<(), _>(
                "list_organization_api_keys",
                Method::GET,
                &api_keys_path(organization_id),
                None,
            )
            .await?;
        Ok(list.api_keys)
    }

    async fn delete_organization_api_key(
        &self,
        organization_id: &str,
        api_key_id: &str,
    ) -> Result<(), ApiError> {
        self.transport
            .send_acknowledged::<()>(
                "delete_organization_api_key",
                Method::DELETE,
                &format!("{}/{}", api_keys_path(organization_id), api_key_id),
                None,
            )
            .await
    }
}
