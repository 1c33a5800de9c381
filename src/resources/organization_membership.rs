use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{existing_id, Resource};
use crate::client::{ClientFactory, OrganizationMembership};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::workflow::{resolve_id, MembershipWorkflow, Role};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub organization_public_key: String,
    #[serde(default)]
    pub organization_private_key: String,
}

impl MembershipState {
    /// Record `membership`, keeping known values for fields the remote left empty.
    fn with_membership(self, membership: OrganizationMembership) -> Self {
        let keep = |remote: String, known: String| if remote.is_empty() { known } else { remote };
        let keep_opt = |remote: String, known: Option<String>| {
            if remote.is_empty() {
                known
            } else {
                Some(remote)
            }
        };

        let id = resolve_id(&membership.id, &membership.user_id);
        Self {
            id: keep_opt(id, self.id),
            email: keep(membership.email, self.email),
            role: keep(membership.role, self.role),
            status: keep_opt(membership.status, self.status),
            user_id: keep_opt(membership.user_id, self.user_id),
            username: keep_opt(membership.username, self.username),
            organization_public_key: self.organization_public_key,
            organization_private_key: self.organization_private_key,
        }
    }

    fn has_credentials(&self) -> bool {
        !self.organization_public_key.is_empty() && !self.organization_private_key.is_empty()
    }
}

/// `langfuse_organization_membership`, a user's role in an organization.
pub struct OrganizationMembershipResource {
    factory: Arc<dyn ClientFactory>,
}

impl OrganizationMembershipResource {
    fn workflow(&self, state: &MembershipState) -> MembershipWorkflow {
        MembershipWorkflow::new(
            self.factory
                .for_scoped_keys(&state.organization_public_key, &state.organization_private_key),
        )
    }
}

#[async_trait]
impl Resource for OrganizationMembershipResource {
    const TYPE_NAME: &'static str = "langfuse_organization_membership";

    type State = MembershipState;

    fn schema() -> Schema {
        Schema::v0()
            .with_description(
                "A user's membership of an organization. Unknown emails are provisioned via SCIM.",
            )
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_description("Membership ID, or the user ID when the API omits it."),
            )
            .with_attribute("email", Attribute::required_string().with_force_new())
            .with_attribute(
                "role",
                Attribute::required_string().with_allowed_values(Role::names()),
            )
            .with_attribute("status", Attribute::computed_string())
            .with_attribute("user_id", Attribute::computed_string())
            .with_attribute("username", Attribute::computed_string())
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

    async fn create(&self, planned: MembershipState) -> Result<MembershipState, ProviderError> {
        let role: Role = planned.role.parse()?;

        let membership = self
            .workflow(&planned)
            .provision(&planned.email, role)
            .await?;

        info!(email = %planned.email, role = %role, "Created organization membership");
        Ok(planned.with_membership(membership))
    }

    async fn read(&self, current: MembershipState) -> Result<Option<MembershipState>, ProviderError> {
        let id = existing_id(&current.id, Self::TYPE_NAME)?;
        if !current.has_credentials() {
            // Freshly imported records carry only the ID until the
            // configuration supplies the key pair.
            debug!(membership_id = id, "No organization credentials yet, skipping refresh");
            return Ok(Some(current));
        }

        let found = self.workflow(&current).find(id).await?;
        match found {
            Some(membership) => Ok(Some(current.with_membership(membership))),
            None => {
                info!(membership_id = id, "Membership no longer exists");
                Ok(None)
            }
        }
    }

    async fn update(
        &self,
        prior: MembershipState,
        planned: MembershipState,
    ) -> Result<MembershipState, ProviderError> {
        let role: Role = planned.role.parse()?;
        let id = existing_id(&prior.id, Self::TYPE_NAME)?;

        let membership = self
            .workflow(&planned)
            .assign_role(id, prior.user_id.as_deref(), role)
            .await?;

        info!(membership_id = id, role = %role, "Updated organization membership");
        let base = MembershipState {
            id: prior.id.clone(),
            status: prior.status.clone(),
            user_id: prior.user_id.clone(),
            username: prior.username.clone(),
            ..planned
        };
        Ok(base.with_membership(membership))
    }

    async fn delete(&self, current: MembershipState) -> Result<Vec<Diagnostic>, ProviderError> {
        let id = existing_id(&current.id, Self::TYPE_NAME)?;
        let user_id = resolve_id(current.user_id.as_deref().unwrap_or_default(), id);

        self.workflow(&current).remove(&user_id).await?;
        info!(user_id = %user_id, "Removed organization membership");
        Ok(Vec::new())
    }

    async fn import(&self, id: &str) -> Result<MembershipState, ProviderError> {
        Ok(MembershipState {
            id: Some(id.to_string()),
            ..Default::default()
        })
    }
}
