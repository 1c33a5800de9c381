use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{existing_id, recorded_metadata, Resource};
use crate::client::{ClientFactory, Metadata, Organization, OrganizationRequest};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Remote delete failures containing this text leave the organization in
/// place but still release it from management.
const EXISTING_PROJECTS: &str = "existing projects";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationState {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl From<Organization> for OrganizationState {
    fn from(org: Organization) -> Self {
        Self {
            id: Some(org.id),
            name: org.name,
            metadata: recorded_metadata(org.metadata),
        }
    }
}

impl OrganizationState {
    fn request(&self) -> OrganizationRequest {
        OrganizationRequest {
            name: self.name.clone(),
            metadata: self.metadata.clone().unwrap_or_default(),
        }
    }
}

/// `langfuse_organization`, managed through the admin API.
pub struct OrganizationResource {
    factory: Arc<dyn ClientFactory>,
}

#[async_trait]
impl Resource for OrganizationResource {
    const TYPE_NAME: &'static str = "langfuse_organization";

    type State = OrganizationState;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A Langfuse organization. Requires the admin API key.")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("Organization ID."),
            )
            .with_attribute(
                "name",
                Attribute::required_string().with_description("Display name."),
            )
            .with_attribute(
                "metadata",
                Attribute::optional_string_map().with_description("Free-form string metadata."),
            )
    }

    fn configure(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory }
    }

    async fn create(&self, planned: OrganizationState) -> Result<OrganizationState, ProviderError> {
        let admin = self.factory.for_admin()?;
        let org = admin
            .create_organization(&planned.request())
            .await
            .map_err(|e| ProviderError::failed("Error creating organization", e.to_string()))?;

        info!(organization_id = %org.id, name = %org.name, "Created organization");
        Ok(org.into())
    }

    async fn read(
        &self,
        current: OrganizationState,
    ) -> Result<Option<OrganizationState>, ProviderError> {
        let id = existing_id(&current.id, Self::TYPE_NAME)?;
        let admin = self.factory.for_admin()?;

        match admin.get_organization(id).await {
            Ok(org) => Ok(Some(org.into())),
            Err(e) if e.is_not_found() => {
                info!(organization_id = id, "Organization no longer exists");
                Ok(None)
            }
            Err(e) => Err(ProviderError::failed(
                "Error reading organization",
                format!("organization {}: {}", id, e),
            )),
        }
    }

    async fn update(
        &self,
        prior: OrganizationState,
        planned: OrganizationState,
    ) -> Result<OrganizationState, ProviderError> {
        let id = existing_id(&prior.id, Self::TYPE_NAME)?;
        let admin = self.factory.for_admin()?;

        let org = admin
            .update_organization(id, &planned.request())
            .await
            .map_err(|e| {
                ProviderError::failed(
                    "Error updating organization",
                    format!("organization {}: {}", id, e),
                )
            })?;

        info!(organization_id = id, "Updated organization");
        Ok(org.into())
    }

    async fn delete(&self, current: OrganizationState) -> Result<Vec<Diagnostic>, ProviderError> {
        let id = existing_id(&current.id, Self::TYPE_NAME)?;
        let admin = self.factory.for_admin()?;

        match admin.delete_organization(id).await {
            Ok(()) => {
                info!(organization_id = id, "Deleted organization");
                Ok(Vec::new())
            }
            Err(e) if e.remote_message_contains(EXISTING_PROJECTS) => {
                warn!(organization_id = id, error = %e, "Organization still has projects, skipping deletion");
                Ok(vec![Diagnostic::warning("Organization deletion skipped").with_detail(
                    format!(
                        "Organization {} still has existing projects and was left in place. It is no longer managed. Error: {}",
                        id, e
                    ),
                )])
            }
            Err(e) if e.is_not_found() => {
                debug!(organization_id = id, "Organization already deleted");
                Ok(Vec::new())
            }
            Err(e) => Err(ProviderError::failed(
                "Error deleting organization",
                format!("organization {}: {}", id, e),
            )),
        }
    }

    async fn import(&self, id: &str) -> Result<OrganizationState, ProviderError> {
        let admin = self.factory.for_admin()?;
        let org = admin.get_organization(id).await.map_err(|e| {
            ProviderError::failed(
                "Error importing organization",
                format!("Could not read organization {}: {}", id, e),
            )
        })?;

        Ok(org.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiError;
    use crate::testing::FakeLangfuse;

    fn resource(fake: &FakeLangfuse) -> OrganizationResource {
        OrganizationResource::configure(Arc::new(fake.clone()))
    }

    fn acme() -> OrganizationState {
        OrganizationState {
            id: None,
            name: "Acme".to_string(),
            metadata: Some([("team".to_string(), "platform".to_string())].into()),
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let fake = FakeLangfuse::new();
        fake.queue_ids(["org-123"]);
        let orgs = resource(&fake);

        let created = orgs.create(acme()).await.unwrap();
        assert_eq!(created.id.as_deref(), Some("org-123"));

        let read = orgs.read(created.clone()).await.unwrap().unwrap();
        assert_eq!(read, created);

        let renamed = OrganizationState {
            name: "Acme Corp".to_string(),
            ..created.clone()
        };
        let updated = orgs.update(created, renamed).await.unwrap();
        let read = orgs.read(updated).await.unwrap().unwrap();
        assert_eq!(read.name, "Acme Corp");
        assert_eq!(read.metadata, acme().metadata);

        let diagnostics = orgs.delete(read).await.unwrap();
        assert!(diagnostics.is_empty());
        assert!(fake.organization("org-123").is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_metadata() {
        let fake = FakeLangfuse::new();
        let orgs = resource(&fake);
        let created = orgs.create(acme()).await.unwrap();

        let cleared = OrganizationState {
            metadata: None,
            ..created.clone()
        };
        let updated = orgs.update(created, cleared).await.unwrap();

        assert_eq!(updated.metadata, None);
        let remote = fake.organization(updated.id.as_deref().unwrap()).unwrap();
        assert_eq!(remote.metadata, Some(Metadata::new()));
    }

    #[tokio::test]
    async fn test_delete_with_existing_projects_warns() {
        let fake = FakeLangfuse::new();
        let orgs = resource(&fake);
        let created = orgs.create(acme()).await.unwrap();
        fake.fail_next(
            "delete_organization",
            ApiError::Status {
                status: 400,
                message: "Cannot delete organization with existing projects".to_string(),
            },
        );

        let diagnostics = orgs.delete(created).await.unwrap();

        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].is_error());
        assert_eq!(diagnostics[0].summary, "Organization deletion skipped");
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("Cannot delete organization with existing projects"));
    }

    #[tokio::test]
    async fn test_delete_failure_is_error() {
        let fake = FakeLangfuse::new();
        let orgs = resource(&fake);
        let created = orgs.create(acme()).await.unwrap();
        fake.fail_next(
            "delete_organization",
            ApiError::Status {
                status: 403,
                message: "Forbidden".to_string(),
            },
        );

        let err = orgs.delete(created).await.unwrap_err();
        assert_eq!(err.summary(), "Error deleting organization");
        assert!(err.detail().contains("Forbidden"));
    }

    #[tokio::test]
    async fn test_create_failure_carries_remote_message() {
        let fake = FakeLangfuse::new();
        fake.fail_next(
            "create_organization",
            ApiError::Status {
                status: 400,
                message: "name too long".to_string(),
            },
        );

        let err = resource(&fake).create(acme()).await.unwrap_err();
        assert_eq!(err.summary(), "Error creating organization");
        assert!(err.detail().contains("name too long"));
    }

    #[tokio::test]
    async fn test_import_by_id() {
        let fake = FakeLangfuse::new();
        let orgs = resource(&fake);
        let created = orgs.create(acme()).await.unwrap();

        let imported = orgs.import(created.id.as_deref().unwrap()).await.unwrap();
        assert_eq!(imported, created);

        let err = orgs.import("org-missing").await.unwrap_err();
        assert_eq!(err.summary(), "Error importing organization");
        assert!(err.detail().contains("org-missing"));
    }

    #[tokio::test]
    async fn test_requires_admin_key() {
        let fake = FakeLangfuse::new().without_admin_key();

        let err = resource(&fake).create(acme()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(fake.calls().is_empty());
    }
}
