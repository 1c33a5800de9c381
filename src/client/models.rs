//! Request and response bodies of the Langfuse admin and public APIs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form string metadata attached to organizations and projects.
pub type Metadata = BTreeMap<String, String>;

/// An organization as returned by the admin API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Body of organization create and update calls. Both replace the whole object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRequest {
    pub name: String,
    pub metadata: Metadata,
}

/// An API key. `secret_key` is only populated in the creation response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub secret_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiKeyList {
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

/// A project as returned by the public API.
///
/// The list endpoint never returns the real retention, so `retention_days`
/// is informational at best.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub retention_days: Option<i64>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// Body of project create and update calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRequest {
    pub name: String,
    /// Retention in days, 0 keeps data indefinitely.
    pub retention: i64,
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectList {
    #[serde(default)]
    pub projects: Vec<Project>,
}

/// A user's membership of an organization.
///
/// The remote does not always fill `id`; `user_id` is the reliable key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMembership {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MembershipList {
    #[serde(default)]
    pub memberships: Vec<OrganizationMembership>,
}

/// Body of the membership role update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMembershipRequest {
    pub user_id: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RemoveMembershipRequest<'a> {
    pub user_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScimEmail {
    pub value: String,
    pub primary: bool,
}

/// SCIM user creation body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUserRequest {
    pub user_name: String,
    pub emails: Vec<ScimEmail>,
    pub active: bool,
}

impl ScimUserRequest {
    /// An active user whose user name and primary email are both `email`.
    pub fn for_email(email: &str) -> Self {
        Self {
            user_name: email.to_string(),
            emails: vec![ScimEmail {
                value: email.to_string(),
                primary: true,
            }],
            active: true,
        }
    }
}

/// SCIM user as returned on creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub active: bool,
}

/// `{success, message}` envelope returned by delete calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

fn default_success() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scim_request_wire_shape() {
        let body = serde_json::to_value(ScimUserRequest::for_email("ada@example.com")).unwrap();
        assert_eq!(
            body,
            json!({
                "userName": "ada@example.com",
                "emails": [{"value": "ada@example.com", "primary": true}],
                "active": true
            })
        );
    }

    #[test]
    fn membership_tolerates_missing_fields() {
        let membership: OrganizationMembership = serde_json::from_value(json!({
            "userId": "u-42",
            "email": "ada@example.com",
            "role": "MEMBER"
        }))
        .unwrap();
        assert_eq!(membership.id, "");
        assert_eq!(membership.user_id, "u-42");
    }

    #[test]
    fn null_metadata_is_none() {
        let org: Organization =
            serde_json::from_value(json!({"id": "org-1", "name": "Acme", "metadata": null}))
                .unwrap();
        assert!(org.metadata.is_none());
    }

    #[test]
    fn envelope_defaults_to_success() {
        let envelope: Envelope = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.success);

        let envelope: Envelope =
            serde_json::from_value(json!({"success": false, "message": "Member removed"}))
                .unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message, "Member removed");
    }
}
