use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{existing_id, recorded_metadata, Resource};
use crate::client::{
    ApiError, ClientFactory, Metadata, OrganizationClient, Project, ProjectRequest,
};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Shape of a project import ID.
pub const PROJECT_IMPORT_FORMAT: &str =
    "project_id,organization_id,organization_public_key,organization_private_key";

/// Durable record of a project.
///
/// `retention_days` is write-only remotely: it is sent on create and update
/// but never read back, so the record keeps the configured value. Imports
/// record the default of 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub retention_days: Option<i64>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    pub organization_id: String,
    pub organization_public_key: String,
    pub organization_private_key: String,
}

impl ProjectState {
    fn request(&self) -> ProjectRequest {
        ProjectRequest {
            name: self.name.clone(),
            retention: self.retention_days.unwrap_or(0),
            metadata: self.metadata.clone().unwrap_or_default(),
        }
    }

    /// Take the remote's view of the project, keeping everything it does not report.
    fn refreshed(self, project: Project) -> Self {
        Self {
            id: Some(project.id),
            name: project.name,
            metadata: recorded_metadata(project.metadata),
            ..self
        }
    }
}

/// `langfuse_project`, managed with the owning organization's key pair.
pub struct ProjectResource {
    factory: Arc<dyn ClientFactory>,
}

impl ProjectResource {
    fn client(&self, state: &ProjectState) -> Arc<dyn OrganizationClient> {
        self.factory
            .for_scoped_keys(&state.organization_public_key, &state.organization_private_key)
    }
}

/// Find a project through the organization's project list.
async fn find_project(
    client: &dyn OrganizationClient,
    project_id: &str,
) -> Result<Option<Project>, ApiError> {
    let projects = client.list_projects().await?;
    Ok(projects.into_iter().find(|p| p.id == project_id))
}

#[async_trait]
impl Resource for ProjectResource {
    const TYPE_NAME: &'static str = "langfuse_project";

    type State = ProjectState;

    fn schema() -> Schema {
        Schema::v0()
            .with_description("A project inside a Langfuse organization.")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "retention_days",
                Attribute::optional_int64().with_description(
                    "Days to keep data, 0 or unset keeps it indefinitely. Not returned by the API.",
                ),
            )
            .with_attribute("metadata", Attribute::optional_string_map())
            .with_attribute(
                "organization_id",
                Attribute::required_string().with_force_new(),
            )
            .with_attribute(
                "organization_public_key",
                Attribute::required_string().sensitive(),
            )
            .with_attribute(
                "organization_private_key",
                Attribute::required_string().sensitive(),
            )
    }

    fn configure(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory }
    }

    async fn create(&self, planned: ProjectState) -> Result<ProjectState, ProviderError> {
        let project = self
            .client(&planned)
            .create_project(&planned.request())
            .await
            .map_err(|e| {
                ProviderError::failed(
                    "Error creating project",
                    format!("organization {}: {}", planned.organization_id, e),
                )
            })?;

        info!(project_id = %project.id, organization_id = %planned.organization_id, "Created project");
        Ok(planned.refreshed(project))
    }

    async fn read(&self, current: ProjectState) -> Result<Option<ProjectState>, ProviderError> {
        let id = existing_id(&current.id, Self::TYPE_NAME)?;
        let client = self.client(&current);

        match find_project(client.as_ref(), id).await {
            Ok(Some(project)) => Ok(Some(current.refreshed(project))),
            Ok(None) => {
                info!(project_id = id, "Project no longer exists");
                Ok(None)
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(ProviderError::failed(
                "Error reading project",
                format!("project {}: {}", id, e),
            )),
        }
    }

    async fn update(
        &self,
        prior: ProjectState,
        planned: ProjectState,
    ) -> Result<ProjectState, ProviderError> {
        let id = existing_id(&prior.id, Self::TYPE_NAME)?;

        let project = self
            .client(&planned)
            .update_project(id, &planned.request())
            .await
            .map_err(|e| {
                ProviderError::failed("Error updating project", format!("project {}: {}", id, e))
            })?;

        info!(project_id = id, "Updated project");
        Ok(planned.refreshed(project))
    }

    async fn delete(&self, current: ProjectState) -> Result<Vec<Diagnostic>, ProviderError> {
        let id = existing_id(&current.id, Self::TYPE_NAME)?;

        match self.client(&current).delete_project(id).await {
            Ok(()) => {
                info!(project_id = id, "Deleted project");
                Ok(Vec::new())
            }
            Err(e) if e.is_not_found() => {
                debug!(project_id = id, "Project already deleted");
                Ok(Vec::new())
            }
            Err(e) => Err(ProviderError::failed(
                "Error deleting project",
                format!("project {}: {}", id, e),
            )),
        }
    }

    async fn import(&self, id: &str) -> Result<ProjectState, ProviderError> {
        let parts: Vec<&str> = id.split(',').collect();
        let &[project_id, organization_id, public_key, private_key] = parts.as_slice() else {
            return Err(ProviderError::failed(
                "Invalid import format",
                format!("Import ID must be in format: {}", PROJECT_IMPORT_FORMAT),
            ));
        };

        let state = ProjectState {
            id: Some(project_id.to_string()),
            organization_id: organization_id.to_string(),
            organization_public_key: public_key.to_string(),
            organization_private_key: private_key.to_string(),
            retention_days: Some(0),
            ..Default::default()
        };

        let client = self.client(&state);
        let project = match find_project(client.as_ref(), project_id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                return Err(ProviderError::failed(
                    "Error importing project",
                    format!(
                        "Could not read project {}: not found in organization {}",
                        project_id, organization_id
                    ),
                ))
            }
            Err(e) => {
                return Err(ProviderError::failed(
                    "Error importing project",
                    format!("Could not read project {}: {}", project_id, e),
                ))
            }
        };

        Ok(state.refreshed(project))
    }
}
