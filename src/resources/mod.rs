//! Resource adapters.
//!
//! Each managed kind implements [`Resource`] over its own typed state.
//! [`ResourceKind`] is the closed set of kinds the provider knows; it maps a
//! host type name to an adapter and moves state in and out of JSON.

mod organization;
mod organization_api_key;
mod organization_membership;
mod project;
mod project_api_key;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::{ClientFactory, Metadata};
use crate::error::ProviderError;
use crate::schema::{Diagnostic, Schema};

pub use organization::{OrganizationResource, OrganizationState};
pub use organization_api_key::{OrganizationApiKeyResource, OrganizationApiKeyState};
pub use organization_membership::{MembershipState, OrganizationMembershipResource};
pub use project::{ProjectResource, ProjectState, PROJECT_IMPORT_FORMAT};
pub use project_api_key::{ProjectApiKeyResource, ProjectApiKeyState};

/// One managed resource kind.
///
/// Adapters hold nothing but the client factory, so a fresh value is built
/// for every operation.
#[async_trait]
pub trait Resource: Sized + Send + Sync {
    /// Host-facing type name, e.g. `langfuse_project`.
    const TYPE_NAME: &'static str;

    /// The durable record kept by the host.
    type State: Serialize + DeserializeOwned + Send + Sync;

    fn schema() -> Schema;

    fn configure(factory: Arc<dyn ClientFactory>) -> Self;

    async fn create(&self, planned: Self::State) -> Result<Self::State, ProviderError>;

    /// Refresh the record. `Ok(None)` means the object is gone remotely.
    async fn read(&self, current: Self::State) -> Result<Option<Self::State>, ProviderError>;

    async fn update(
        &self,
        prior: Self::State,
        planned: Self::State,
    ) -> Result<Self::State, ProviderError>;

    /// Delete the object. Warnings come back as diagnostics.
    async fn delete(&self, current: Self::State) -> Result<Vec<Diagnostic>, ProviderError>;

    async fn import(&self, id: &str) -> Result<Self::State, ProviderError>;
}

/// The resource kinds served by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Organization,
    OrganizationApiKey,
    Project,
    ProjectApiKey,
    OrganizationMembership,
}

macro_rules! with_resource {
    ($kind:expr, $resource:ident => $body:expr) => {
        match $kind {
            ResourceKind::Organization => {
                type $resource = OrganizationResource;
                $body
            }
            ResourceKind::OrganizationApiKey => {
                type $resource = OrganizationApiKeyResource;
                $body
            }
            ResourceKind::Project => {
                type $resource = ProjectResource;
                $body
            }
            ResourceKind::ProjectApiKey => {
                type $resource = ProjectApiKeyResource;
                $body
            }
            ResourceKind::OrganizationMembership => {
                type $resource = OrganizationMembershipResource;
                $body
            }
        }
    };
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Organization,
        ResourceKind::OrganizationApiKey,
        ResourceKind::Project,
        ResourceKind::ProjectApiKey,
        ResourceKind::OrganizationMembership,
    ];

    pub fn from_type_name(type_name: &str) -> Result<Self, ProviderError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_name() == type_name)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    pub fn type_name(self) -> &'static str {
        with_resource!(self, R => R::TYPE_NAME)
    }

    pub fn schema(self) -> Schema {
        with_resource!(self, R => R::schema())
    }

    pub async fn create(
        self,
        factory: Arc<dyn ClientFactory>,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        with_resource!(self, R => {
            let planned = decode_state::<R>(planned)?;
            encode_state(&R::configure(factory).create(planned).await?)
        })
    }

    /// Refresh a record; a vanished object comes back as `Value::Null`.
    pub async fn read(
        self,
        factory: Arc<dyn ClientFactory>,
        current: Value,
    ) -> Result<Value, ProviderError> {
        with_resource!(self, R => {
            let current = decode_state::<R>(current)?;
            match R::configure(factory).read(current).await? {
                Some(state) => encode_state(&state),
                None => Ok(Value::Null),
            }
        })
    }

    pub async fn update(
        self,
        factory: Arc<dyn ClientFactory>,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        with_resource!(self, R => {
            let prior = decode_state::<R>(prior)?;
            let planned = decode_state::<R>(planned)?;
            encode_state(&R::configure(factory).update(prior, planned).await?)
        })
    }

    pub async fn delete(
        self,
        factory: Arc<dyn ClientFactory>,
        current: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        with_resource!(self, R => {
            let current = decode_state::<R>(current)?;
            R::configure(factory).delete(current).await
        })
    }

    pub async fn import(
        self,
        factory: Arc<dyn ClientFactory>,
        id: &str,
    ) -> Result<Value, ProviderError> {
        with_resource!(self, R => {
            encode_state(&R::configure(factory).import(id).await?)
        })
    }
}

fn decode_state<R: Resource>(value: Value) -> Result<R::State, ProviderError> {
    serde_json::from_value(value)
        .map_err(|e| ProviderError::Validation(format!("invalid {} state: {}", R::TYPE_NAME, e)))
}

fn encode_state<S: Serialize>(state: &S) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(state)?)
}

/// Empty remote metadata is recorded as absent.
pub(crate) fn recorded_metadata(metadata: Option<Metadata>) -> Option<Metadata> {
    metadata.filter(|m| !m.is_empty())
}

/// The ID of a record that must already exist remotely.
pub(crate) fn existing_id<'a>(
    id: &'a Option<String>,
    type_name: &str,
) -> Result<&'a str, ProviderError> {
    id.as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::Validation(format!("{} state has no id", type_name)))
}

pub(crate) fn import_not_supported(type_name: &str) -> ProviderError {
    ProviderError::failed(
        "Import not supported",
        format!(
            "{} cannot be imported because its secret key is only returned on creation",
            type_name
        ),
    )
}
