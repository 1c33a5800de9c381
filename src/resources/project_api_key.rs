use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{existing_id, import_not_supported, Resource};
use crate::client::{ClientFactory, OrganizationClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectApiKeyState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    pub project_id: String,
    pub organization_public_key: String,
    pub organization_private_key: String,
}

/// `langfuse_project_api_key`, a project-scoped key pair.
pub struct ProjectApiKeyResource {
    factory: Arc<dyn ClientFactory>,
}

impl ProjectApiKeyResource {
    fn client(&self, state: &ProjectApiKeyState) -> Arc<dyn OrganizationClient> {
        self.factory
            .for_scoped_keys(&state.organization_public_key, &state.organization_private_key)
    }
}

#[async_trait]
impl Resource for ProjectApiKeyResource {
    const TYPE_NAME: &'static str = "langfuse_project_api_key";

    type State = ProjectApiKeyState;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A project-scoped API key pair.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("public_key", Attribute::computed_string().sensitive())
            .with_attribute("secret_key", Attribute::computed_string().sensitive())
            .with_attribute("project_id", Attribute::required_string().with_force_new())
            .with_attribute(
                "organization_public_key",
                Attribute::required_string().sensitive().with_force_new(),
            )
            .with_attribute(
                "organization_private_key",
                Attribute::required_string().sensitive().with_force_new(),
            )
    }

    fn configure(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory }
    }

    async fn create(&self, planned: ProjectApiKeyState) -> Result<ProjectApiKeyState, ProviderError> {
        let key = self
            .client(&planned)
            .create_project_api_key(&planned.project_id)
            .await
            .map_err(|e| {
                ProviderError::failed(
                    "Error creating project API key",
                    format!("project {}: {}", planned.project_id, e),
                )
            })?;

        info!(project_id = %planned.project_id, api_key_id = %key.id, "Created project API key");
        Ok(ProjectApiKeyState {
            id: Some(key.id),
            public_key: Some(key.public_key),
            secret_key: Some(key.secret_key),
            ..planned
        })
    }

    async fn read(
        &self,
        current: ProjectApiKeyState,
    ) -> Result<Option<ProjectApiKeyState>, ProviderError> {
        let id = existing_id(&current.id, Self::TYPE_NAME)?;

        let keys = match self
            .client(&current)
            .list_project_api_keys(&current.project_id)
            .await
        {
            Ok(keys) => keys,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => {
                return Err(ProviderError::failed(
                    "Error reading project API key",
                    format!("project {}: {}", current.project_id, e),
                ))
            }
        };

        let Some(key) = keys.into_iter().find(|key| key.id == id) else {
            info!(api_key_id = id, "Project API key no longer exists");
            return Ok(None);
        };

        Ok(Some(ProjectApiKeyState {
            public_key: Some(key.public_key),
            ..current
        }))
    }

    async fn update(
        &self,
        prior: ProjectApiKeyState,
        _planned: ProjectApiKeyState,
    ) -> Result<ProjectApiKeyState, ProviderError> {
        // All configurable attributes force replacement.
        Ok(prior)
    }

    async fn delete(&self, current: ProjectApiKeyState) -> Result<Vec<Diagnostic>, ProviderError> {
        let id = existing_id(&current.id, Self::TYPE_NAME)?;

        match self
            .client(&current)
            .delete_project_api_key(&current.project_id, id)
            .await
        {
            Ok(()) => {
                info!(api_key_id = id, "Deleted project API key");
                Ok(Vec::new())
            }
            Err(e) if e.is_not_found() => {
                debug!(api_key_id = id, "Project API key already deleted");
                Ok(Vec::new())
            }
            Err(e) => Err(ProviderError::failed(
                "Error deleting project API key",
                format!("API key {} of project {}: {}", id, current.project_id, e),
            )),
        }
    }

    async fn import(&self, _id: &str) -> Result<ProjectApiKeyState, ProviderError> {
        Err(import_not_supported(Self::TYPE_NAME))
    }
}
