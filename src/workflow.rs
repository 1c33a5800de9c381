//! Organization membership provisioning.
//!
//! Langfuse has no "add member by email" call. Adding someone means listing
//! the organization's memberships, creating a SCIM user when the email is
//! unknown (which joins the organization at a default role), then assigning
//! the declared role. This module owns that sequence so the resource
//! adapter only maps records.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info};

use crate::client::{
    ApiError, OrganizationClient, OrganizationMembership, ScimUserRequest,
    UpdateMembershipRequest,
};
use crate::error::ProviderError;

/// Organization role of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Owner, Role::Admin, Role::Member, Role::Viewer];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Admin => "ADMIN",
            Role::Member => "MEMBER",
            Role::Viewer => "VIEWER",
        }
    }

    /// Wire names of every role, in declaration order.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|role| role.as_str()).collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ProviderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| ProviderError::InvalidAttribute {
                summary: "Invalid Role".to_string(),
                detail: format!(
                    "Role must be one of: {}. Got: {}",
                    Self::names().join(", "),
                    value
                ),
                attribute: "role".to_string(),
            })
    }
}

/// `primary` unless it is empty, else `secondary`.
///
/// The remote sometimes omits a membership's own ID; the user ID is the
/// stand-in.
pub fn resolve_id(primary: &str, secondary: &str) -> String {
    if primary.is_empty() {
        secondary.to_string()
    } else {
        primary.to_string()
    }
}

/// Whether a rejected removal's message says the member is already gone.
///
/// The remove endpoint answers `success: false` with messages such as
/// "Member removed successfully".
pub fn removal_acknowledged(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("deleted") || message.contains("removed")
}

/// Membership operations against one organization.
pub struct MembershipWorkflow {
    client: Arc<dyn OrganizationClient>,
}

impl MembershipWorkflow {
    pub fn new(client: Arc<dyn OrganizationClient>) -> Self {
        Self { client }
    }

    /// Make `email` a member of the organization with `role`.
    ///
    /// Issues exactly one role update whether or not the user was already a
    /// member.
    pub async fn provision(
        &self,
        email: &str,
        role: Role,
    ) -> Result<OrganizationMembership, ProviderError> {
        let memberships = self
            .client
            .list_memberships()
            .await
            .map_err(|e| ProviderError::failed("Error listing current memberships", e.to_string()))?;

        if let Some(existing) = memberships.into_iter().find(|m| m.email == email) {
            debug!(email, user_id = %existing.user_id, "User is already a member");
            return self
                .update_role(existing, role, "Error updating membership role")
                .await;
        }

        let user = self
            .client
            .create_scim_user(&ScimUserRequest::for_email(email))
            .await
            .map_err(|e| {
                ProviderError::failed(
                    "Error creating user via SCIM",
                    format!(
                        "Failed to create user with email {}: {}. User may already exist in Langfuse system.",
                        email, e
                    ),
                )
            })?;
        info!(email, user_id = %user.id, "Created user via SCIM");

        let memberships = self.client.list_memberships().await.map_err(|e| {
            ProviderError::failed(
                "Error listing memberships after SCIM user creation",
                e.to_string(),
            )
        })?;
        let joined = memberships
            .into_iter()
            .find(|m| m.user_id == user.id)
            .ok_or_else(|| {
                ProviderError::failed(
                    "Error finding new membership",
                    format!(
                        "User was created via SCIM but membership not found in organization. UserID: {}",
                        user.id
                    ),
                )
            })?;

        self.update_role(joined, role, "Error updating membership role")
            .await
    }

    /// Look a membership up by its own ID or by its user ID.
    pub async fn find(&self, id: &str) -> Result<Option<OrganizationMembership>, ProviderError> {
        if id.is_empty() {
            return Ok(None);
        }

        let memberships = self
            .client
            .list_memberships()
            .await
            .map_err(|e| ProviderError::failed("Error reading membership", e.to_string()))?;

        Ok(memberships
            .into_iter()
            .find(|m| m.id == id || m.user_id == id))
    }

    /// Change the role of an existing membership.
    ///
    /// The membership is always looked up first, matching `membership_id`
    /// or the known `user_id`; a membership that is gone is an error rather
    /// than a blind role write.
    pub async fn assign_role(
        &self,
        membership_id: &str,
        user_id: Option<&str>,
        role: Role,
    ) -> Result<OrganizationMembership, ProviderError> {
        let user_id = user_id.filter(|id| !id.is_empty());

        let memberships = self.client.list_memberships().await.map_err(|e| {
            ProviderError::failed(
                "Error updating membership",
                format!("failed to get current membership {}: {}", membership_id, e),
            )
        })?;
        let mut known = memberships
            .into_iter()
            .find(|m| {
                (!membership_id.is_empty() && (m.id == membership_id || m.user_id == membership_id))
                    || user_id.is_some_and(|user_id| m.user_id == user_id)
            })
            .ok_or_else(|| {
                ProviderError::failed(
                    "Error updating membership",
                    format!(
                        "Membership {} no longer exists in the organization",
                        membership_id
                    ),
                )
            })?;
        if let Some(user_id) = user_id {
            known.user_id = user_id.to_string();
        }

        let mut updated = self
            .update_role(known, role, "Error updating membership")
            .await?;
        if updated.id.is_empty() {
            updated.id = membership_id.to_string();
        }
        Ok(updated)
    }

    /// Remove the user from the organization. The user account itself stays.
    pub async fn remove(&self, user_id: &str) -> Result<(), ProviderError> {
        match self.client.remove_membership(user_id).await {
            Ok(()) => Ok(()),
            Err(ApiError::Rejected { message }) if removal_acknowledged(&message) => {
                debug!(user_id, message = %message, "Treating rejected removal as done");
                Ok(())
            }
            Err(e) => Err(ProviderError::failed(
                "Error removing member",
                format!("failed to remove member with ID {}: {}", user_id, e),
            )),
        }
    }

    async fn update_role(
        &self,
        known: OrganizationMembership,
        role: Role,
        summary: &str,
    ) -> Result<OrganizationMembership, ProviderError> {
        let request = UpdateMembershipRequest {
            user_id: known.user_id.clone(),
            role: role.as_str().to_string(),
        };
        let updated = self.client.update_membership(&request).await.map_err(|e| {
            ProviderError::failed(summary, format!("user {}: {}", known.user_id, e))
        })?;
        info!(user_id = %known.user_id, role = %role, "Assigned membership role");

        Ok(merge(updated, known, role))
    }
}

/// Fill fields the update response left empty from what was already known.
fn merge(
    mut updated: OrganizationMembership,
    known: OrganizationMembership,
    role: Role,
) -> OrganizationMembership {
    let fill = |field: &mut String, fallback: String| {
        if field.is_empty() {
            *field = fallback;
        }
    };
    fill(&mut updated.id, known.id);
    fill(&mut updated.email, known.email);
    fill(&mut updated.status, known.status);
    fill(&mut updated.user_id, known.user_id);
    fill(&mut updated.username, known.username);
    fill(&mut updated.role, role.as_str().to_string());
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLangfuse;

    fn workflow(fake: &FakeLangfuse) -> MembershipWorkflow {
        MembershipWorkflow::new(Arc::new(fake.clone()))
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("VIEWER".parse::<Role>().unwrap(), Role::Viewer);

        let err = "SUPERUSER".parse::<Role>().unwrap_err();
        assert_eq!(err.summary(), "Invalid Role");
        assert_eq!(
            err.detail(),
            "Role must be one of: OWNER, ADMIN, MEMBER, VIEWER. Got: SUPERUSER"
        );
        assert!(matches!(err, ProviderError::InvalidAttribute { ref attribute, .. } if attribute == "role"));

        assert!("viewer".parse::<Role>().is_err());
    }

    #[test]
    fn test_resolve_id() {
        assert_eq!(resolve_id("m-1", "u-42"), "m-1");
        assert_eq!(resolve_id("", "u-42"), "u-42");
        assert_eq!(resolve_id("", ""), "");
    }

    #[test]
    fn test_removal_acknowledged() {
        assert!(removal_acknowledged("Member removed successfully"));
        assert!(removal_acknowledged("Membership DELETED"));
        assert!(!removal_acknowledged("Insufficient permissions"));
        assert!(!removal_acknowledged(""));
    }

    #[tokio::test]
    async fn test_provision_existing_member_updates_role_once() {
        let fake = FakeLangfuse::new();
        let existing = fake.add_member("ada@example.com", "VIEWER");

        let membership = workflow(&fake)
            .provision("ada@example.com", Role::Admin)
            .await
            .unwrap();

        assert_eq!(membership.user_id, existing.user_id);
        assert_eq!(membership.role, "ADMIN");
        assert_eq!(fake.call_count("update_membership"), 1);
        assert_eq!(fake.call_count("create_scim_user"), 0);
        assert_eq!(fake.memberships().len(), 1);
    }

    #[tokio::test]
    async fn test_provision_new_user_via_scim() {
        let fake = FakeLangfuse::new();

        let membership = workflow(&fake)
            .provision("grace@example.com", Role::Member)
            .await
            .unwrap();

        assert_eq!(membership.email, "grace@example.com");
        assert_eq!(membership.role, "MEMBER");
        assert_eq!(
            fake.calls(),
            vec![
                "list_memberships",
                "create_scim_user",
                "list_memberships",
                "update_membership"
            ]
        );
    }

    #[tokio::test]
    async fn test_provision_scim_conflict_is_distinct_error() {
        let fake = FakeLangfuse::new();
        fake.add_user("outsider@example.com");

        let err = workflow(&fake)
            .provision("outsider@example.com", Role::Member)
            .await
            .unwrap_err();

        assert_eq!(err.summary(), "Error creating user via SCIM");
        assert!(err.detail().contains("outsider@example.com"));
        assert!(err.detail().contains("User may already exist"));
        assert_eq!(fake.call_count("update_membership"), 0);
    }

    #[tokio::test]
    async fn test_provision_list_failure() {
        let fake = FakeLangfuse::new();
        fake.fail_next(
            "list_memberships",
            ApiError::Status {
                status: 500,
                message: "unavailable".to_string(),
            },
        );

        let err = workflow(&fake)
            .provision("grace@example.com", Role::Member)
            .await
            .unwrap_err();

        assert_eq!(err.summary(), "Error listing current memberships");
        assert_eq!(fake.call_count("create_scim_user"), 0);
    }

    #[tokio::test]
    async fn test_provision_missing_new_membership() {
        let fake = FakeLangfuse::new().scim_users_stay_outside();
        fake.queue_ids(["u-7"]);

        let err = workflow(&fake)
            .provision("grace@example.com", Role::Member)
            .await
            .unwrap_err();

        assert_eq!(err.summary(), "Error finding new membership");
        assert!(err.detail().ends_with("UserID: u-7"));
        assert_eq!(fake.call_count("update_membership"), 0);
    }

    #[tokio::test]
    async fn test_fallback_id_when_remote_omits_membership_id() {
        let fake = FakeLangfuse::new().omitting_membership_ids();
        fake.queue_ids(["u-42"]);

        let membership = workflow(&fake)
            .provision("ada@example.com", Role::Viewer)
            .await
            .unwrap();

        assert_eq!(membership.id, "");
        assert_eq!(resolve_id(&membership.id, &membership.user_id), "u-42");
    }

    #[tokio::test]
    async fn test_find_matches_id_or_user_id() {
        let fake = FakeLangfuse::new();
        let member = fake.add_member("ada@example.com", "ADMIN");
        let flow = workflow(&fake);

        assert_eq!(flow.find(&member.id).await.unwrap(), Some(member.clone()));
        assert_eq!(flow.find(&member.user_id).await.unwrap(), Some(member));
        assert_eq!(flow.find("nobody").await.unwrap(), None);
        assert_eq!(flow.find("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_assign_role_resolves_user_id() {
        let fake = FakeLangfuse::new().omitting_membership_ids();
        let member = fake.add_member("ada@example.com", "ADMIN");
        let flow = workflow(&fake);

        let updated = flow
            .assign_role(&member.user_id, None, Role::Viewer)
            .await
            .unwrap();

        assert_eq!(updated.role, "VIEWER");
        assert_eq!(updated.id, member.user_id);
        assert_eq!(fake.call_count("list_memberships"), 1);

        fake.clear_calls();
        flow.assign_role("m-x", Some(&member.user_id), Role::Owner)
            .await
            .unwrap();
        assert_eq!(fake.calls(), vec!["list_memberships", "update_membership"]);
    }

    #[tokio::test]
    async fn test_assign_role_checks_membership_even_with_user_id() {
        let fake = FakeLangfuse::new();
        let member = fake.add_member("ada@example.com", "ADMIN");
        fake.drop_member(&member.user_id);
        fake.clear_calls();

        let err = workflow(&fake)
            .assign_role(&member.id, Some(&member.user_id), Role::Owner)
            .await
            .unwrap_err();

        assert_eq!(err.summary(), "Error updating membership");
        assert_eq!(fake.calls(), vec!["list_memberships"]);
        assert!(fake.memberships().is_empty());
    }

    #[tokio::test]
    async fn test_assign_role_list_failure() {
        let fake = FakeLangfuse::new();
        let member = fake.add_member("ada@example.com", "ADMIN");
        fake.fail_next(
            "list_memberships",
            ApiError::Status {
                status: 500,
                message: "boom".to_string(),
            },
        );

        let err = workflow(&fake)
            .assign_role(&member.id, Some(&member.user_id), Role::Owner)
            .await
            .unwrap_err();

        assert_eq!(err.summary(), "Error updating membership");
        assert!(err.detail().contains("failed to get current membership"));
        assert_eq!(fake.call_count("update_membership"), 0);
    }

    #[tokio::test]
    async fn test_assign_role_to_vanished_membership() {
        let fake = FakeLangfuse::new();

        let err = workflow(&fake)
            .assign_role("m-404", None, Role::Owner)
            .await
            .unwrap_err();

        assert_eq!(err.summary(), "Error updating membership");
        assert!(err.detail().contains("m-404"));
    }

    #[tokio::test]
    async fn test_remove_tolerates_acknowledged_rejection() {
        let fake = FakeLangfuse::new();
        let member = fake.add_member("ada@example.com", "ADMIN");
        fake.fail_next(
            "remove_membership",
            ApiError::Rejected {
                message: "Member removed successfully".to_string(),
            },
        );

        workflow(&fake).remove(&member.user_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_surfaces_other_failures() {
        let fake = FakeLangfuse::new();
        fake.fail_next(
            "remove_membership",
            ApiError::Rejected {
                message: "Insufficient permissions".to_string(),
            },
        );

        let err = workflow(&fake).remove("u-1").await.unwrap_err();
        assert_eq!(err.summary(), "Error removing member");
        assert!(err.detail().contains("u-1"));
        assert!(err.detail().contains("Insufficient permissions"));
    }
}
