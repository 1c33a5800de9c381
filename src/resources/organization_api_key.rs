use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{existing_id, import_not_supported, Resource};
use crate::client::ClientFactory;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationApiKeyState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    pub organization_id: String,
}

/// `langfuse_organization_api_key`, an organization-scoped key pair issued
/// through the admin API.
pub struct OrganizationApiKeyResource {
    factory: Arc<dyn ClientFactory>,
}

#[async_trait]
impl Resource for OrganizationApiKeyResource {
    const TYPE_NAME: &'static str = "langfuse_organization_api_key";

    type State = OrganizationApiKeyState;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("An organization-scoped API key pair. Requires the admin API key.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("public_key", Attribute::computed_string().sensitive())
            .with_attribute(
                "secret_key",
                Attribute::computed_string()
                    .sensitive()
                    .with_description("Only available right after creation."),
            )
            .with_attribute(
                "organization_id",
                Attribute::required_string().with_force_new(),
            )
    }

    fn configure(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory }
    }

    async fn create(
        &self,
        planned: OrganizationApiKeyState,
    ) -> Result<OrganizationApiKeyState, ProviderError> {
        let admin = self.factory.for_admin()?;
        let key = admin
            .create_organization_api_key(&planned.organization_id)
            .await
            .map_err(|e| {
                ProviderError::failed(
                    "Error creating organization API key",
                    format!("organization {}: {}", planned.organization_id, e),
                )
            })?;

        info!(organization_id = %planned.organization_id, api_key_id = %key.id, "Created organization API key");
        Ok(OrganizationApiKeyState {
            id: Some(key.id),
            public_key: Some(key.public_key),
            secret_key: Some(key.secret_key),
            organization_id: planned.organization_id,
        })
    }

    async fn read(
        &self,
        current: OrganizationApiKeyState,
    ) -> Result<Option<OrganizationApiKeyState>, ProviderError> {
        let id = existing_id(&current.id, Self::TYPE_NAME)?;
        let admin = self.factory.for_admin()?;

        let keys = match admin
            .list_organization_api_keys(&current.organization_id)
            .await
        {
            Ok(keys) => keys,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => {
                return Err(ProviderError::failed(
                    "Error reading organization API key",
                    format!("organization {}: {}", current.organization_id, e),
                ))
            }
        };

        let Some(key) = keys.into_iter().find(|key| key.id == id) else {
            info!(api_key_id = id, "Organization API key no longer exists");
            return Ok(None);
        };

        Ok(Some(OrganizationApiKeyState {
            public_key: Some(key.public_key),
            ..current
        }))
    }

    async fn update(
        &self,
        prior: OrganizationApiKeyState,
        planned: OrganizationApiKeyState,
    ) -> Result<OrganizationApiKeyState, ProviderError> {
        // Every configurable attribute forces replacement, so there is
        // nothing to send.
        Ok(OrganizationApiKeyState {
            organization_id: planned.organization_id,
            ..prior
        })
    }

    async fn delete(
        &self,
        current: OrganizationApiKeyState,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let id = existing_id(&current.id, Self::TYPE_NAME)?;
        let admin = self.factory.for_admin()?;

        match admin
            .delete_organization_api_key(&current.organization_id, id)
            .await
        {
            Ok(()) => {
                info!(api_key_id = id, "Deleted organization API key");
                Ok(Vec::new())
            }
            Err(e) if e.is_not_found() => {
                debug!(api_key_id = id, "Organization API key already deleted");
                Ok(Vec::new())
            }
            Err(e) => Err(ProviderError::failed(
                "Error deleting organization API key",
                format!("API key {}: {}", id, e),
            )),
        }
    }

    async fn import(&self, _id: &str) -> Result<OrganizationApiKeyState, ProviderError> {
        Err(import_not_supported(Self::TYPE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AdminClient, OrganizationRequest};
    use crate::testing::FakeLangfuse;

    async fn setup() -> (FakeLangfuse, OrganizationApiKeyResource, String) {
        let fake = FakeLangfuse::new();
        let org = fake
            .create_organization(&OrganizationRequest {
                name: "Acme".to_string(),
                metadata: Default::default(),
            })
            .await
            .unwrap();
        fake.clear_calls();
        let resource = OrganizationApiKeyResource::configure(Arc::new(fake.clone()));
        (fake, resource, org.id)
    }

    fn planned(organization_id: &str) -> OrganizationApiKeyState {
        OrganizationApiKeyState {
            organization_id: organization_id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_captures_secret_and_read_preserves_it() {
        let (_fake, keys, org_id) = setup().await;

        let created = keys.create(planned(&org_id)).await.unwrap();
        let secret = created.secret_key.clone().unwrap();
        assert!(!secret.is_empty());

        let read = keys.read(created.clone()).await.unwrap().unwrap();
        assert_eq!(read.secret_key.as_deref(), Some(secret.as_str()));
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn test_read_of_deleted_key_is_none() {
        let (fake, keys, org_id) = setup().await;
        let created = keys.create(planned(&org_id)).await.unwrap();

        fake.delete_organization_api_key(&org_id, created.id.as_deref().unwrap())
            .await
            .unwrap();

        assert_eq!(keys.read(created).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let (fake, keys, org_id) = setup().await;
        let created = keys.create(planned(&org_id)).await.unwrap();

        assert!(keys.delete(created.clone()).await.unwrap().is_empty());
        assert!(fake
            .list_organization_api_keys(&org_id)
            .await
            .unwrap()
            .is_empty());

        // Deleting again is a no-op.
        assert!(keys.delete(created).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_not_supported() {
        let (fake, keys, _) = setup().await;

        let err = keys.import("key-1").await.unwrap_err();
        assert_eq!(err.summary(), "Import not supported");
        assert!(fake.calls().is_empty());
    }
}
