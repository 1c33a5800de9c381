//! Public API scoped to one organization's key pair: projects, project API
//! keys, memberships and SCIM users.

use async_trait::async_trait;
use reqwest::Method;

use super::error::ApiError;
use super::http::{Credentials, HttpTransport};
use super::models::{
    ApiKey, ApiKeyList, MembershipList, OrganizationMembership, Project, ProjectList,
    ProjectRequest, RemoveMembershipRequest, ScimUser, ScimUserRequest, UpdateMembershipRequest,
};

const PROJECTS: &str = "api/public/projects";
const ORGANIZATION_PROJECTS: &str = "api/public/organizations/projects";
const MEMBERSHIPS: &str = "api/public/organizations/memberships";
const SCIM_USERS: &str = "api/public/scim/Users";

/// Operations authenticated with an organization's public/private key pair.
#[async_trait]
pub trait OrganizationClient: Send + Sync {
    /// All projects of the organization.
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;

    async fn create_project(&self, request: &ProjectRequest) -> Result<Project, ApiError>;

    async fn update_project(
        &self,
        project_id: &str,
        request: &ProjectRequest,
    ) -> Result<Project, ApiError>;

    async fn delete_project(&self, project_id: &str) -> Result<(), ApiError>;

    async fn create_project_api_key(&self, project_id: &str) -> Result<ApiKey, ApiError>;

    async fn list_project_api_keys(&self, project_id: &str) -> Result<Vec<ApiKey>, ApiError>;

    async fn delete_project_api_key(
        &self,
        project_id: &str,
        api_key_id: &str,
    ) -> Result<(), ApiError>;

    async fn list_memberships(&self) -> Result<Vec<OrganizationMembership>, ApiError>;

    /// Set a user's role. Also adds an existing user to the organization.
    async fn update_membership(
        &self,
        request: &UpdateMembershipRequest,
    ) -> Result<OrganizationMembership, ApiError>;

    async fn remove_membership(&self, user_id: &str) -> Result<(), ApiError>;

    async fn create_scim_user(&self, request: &ScimUserRequest) -> Result<ScimUser, ApiError>;
}

/// [`OrganizationClient`] backed by the Langfuse HTTP public API.
#[derive(Debug, Clone)]
pub struct HttpOrganizationClient {
    transport: HttpTransport,
}

impl HttpOrganizationClient {
    pub fn new(http: reqwest::Client, base_url: &str, public_key: &str, private_key: &str) -> Self {
        Self {
            transport: HttpTransport::new(
                http,
                base_url,
                Credentials::Basic {
                    public_key: public_key.to_string(),
                    private_key: private_key.to_string(),
                },
            ),
        }
    }
}

fn project_path(project_id: &str) -> String {
    format!("{}/{}", PROJECTS, project_id)
}

fn project_keys_path(project_id: &str) -> String {
    format!("{}/apiKeys", project_path(project_id))
}

#[async_trait]
impl OrganizationClient for HttpOrganizationClient {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let list: ProjectList = self
            .transport
            .send::<(), _>("list_projects", Method::GET, ORGANIZATION_PROJECTS, None)
            .await?;
        Ok(list.projects)
    }

    async fn create_project(&self, request: &ProjectRequest) -> Result<Project, ApiError> {
        self.transport
            .send("create_project", Method::POST, PROJECTS, Some(request))
            .await
    }

    async fn update_project(
        &self,
        project_id: &str,
        request: &ProjectRequest,
    ) -> Result<Project, ApiError> {
        self.transport
            .send(
                "update_project",
                Method::PUT,
                &project_path(project_id),
                Some(request),
            )
            .await
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), ApiError> {
        self.transport
            .send_acknowledged::<()>(
                "delete_project",
                Method::DELETE,
                &project_path(project_id),
                None,
            )
            .await
    }

    async fn create_project_api_key(&self, project_id: &str) -> Result<ApiKey, ApiError> {
        self.transport
            .send::<(), _>(
                "create_project_api_key",
                Method::POST,
                &project_keys_path(project_id),
                None,
            )
            .await
    }

    async fn list_project_api_keys(&self, project_id: &str) -> Result<Vec<ApiKey>, ApiError> {
        let list: ApiKeyList = self
            .transport
            .send::<(), _>(
                "list_project_api_keys",
                Method::GET,
                &project_keys_path(project_id),
                None,
            )
            .await?;
        Ok(list.api_keys)
    }

    async fn delete_project_api_key(
        &self,
        project_id: &str,
        api_key_id: &str,
    ) -> Result<(), ApiError> {
        self.transport
            .send_acknowledged::<()>(
                "delete_project_api_key",
                Method::DELETE,
                &format!("{}/{}", project_keys_path(project_id), api_key_id),
                None,
            )
            .await
    }

    async fn list_memberships(&self) -> Result<Vec<OrganizationMembership>, ApiError> {
        let list: MembershipList = self
            .transport
            .send::<(), _>("list_memberships", Method::GET, MEMBERSHIPS, None)
            .await?;
        Ok(list.memberships)
    }

    async fn update_membership(
        &self,
        request: &UpdateMembershipRequest,
    ) -> Result<OrganizationMembership, ApiError> {
        self.transport
            .send("update_membership", Method::PUT, MEMBERSHIPS, Some(request))
            .await
    }

    async fn remove_membership(&self, user_id: &str) -> Result<(), ApiError> {
        self.transport
            .send_acknowledged(
                "remove_membership",
                Method::DELETE,
                MEMBERSHIPS,
                Some(&RemoveMembershipRequest { user_id }),
            )
            .await
    }

    async fn create_scim_user(&self, request: &ScimUserRequest) -> Result<ScimUser, ApiError> {
        self.transport
            .send("create_scim_user", Method::POST, SCIM_USERS, Some(request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::http::test_server;
    use axum::http::StatusCode;
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn client(router: Router) -> HttpOrganizationClient {
        let base_url = test_server::spawn(router).await;
        HttpOrganizationClient::new(reqwest::Client::new(), &base_url, "pk-lf-org", "sk-lf-org")
    }

    #[tokio::test]
    async fn test_project_lifecycle() {
        let router = Router::new()
            .route(
                "/api/public/organizations/projects",
                get(|| async {
                    Json(json!({"projects": [{"id": "proj-1", "name": "web", "metadata": null}]}))
                }),
            )
            .route(
                "/api/public/projects",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["retention"], 30);
                    Json(json!({"id": "proj-1", "name": body["name"], "metadata": body["metadata"]}))
                }),
            )
            .route(
                "/api/public/projects/:id",
                put(|Json(body): Json<Value>| async move {
                    Json(json!({"id": "proj-1", "name": body["name"]}))
                })
                .delete(|| async {
                    Json(json!({"success": true, "message": "Project deletion has been initiated"}))
                }),
            );
        let client = client(router).await;

        let request = ProjectRequest {
            name: "web".to_string(),
            retention: 30,
            metadata: Default::default(),
        };
        let created = client.create_project(&request).await.unwrap();
        assert_eq!(created.id, "proj-1");

        let projects = client.list_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].retention_days, None);

        let renamed = ProjectRequest {
            name: "web-2".to_string(),
            ..request
        };
        let updated = client.update_project("proj-1", &renamed).await.unwrap();
        assert_eq!(updated.name, "web-2");

        client.delete_project("proj-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_membership_calls() {
        let router = Router::new()
            .route(
                "/api/public/organizations/memberships",
                get(|| async {
                    Json(json!({"memberships": [
                        {"id": "m-1", "email": "ada@example.com", "role": "ADMIN", "status": "ACTIVE", "userId": "u-1", "username": "ada"}
                    ]}))
                })
                .put(|Json(body): Json<Value>| async move {
                    Json(json!({"userId": body["userId"], "role": body["role"], "email": "ada@example.com"}))
                })
                .delete(|Json(body): Json<Value>| async move {
                    Json(json!({"success": false, "message": format!("Member {} removed", body["userId"].as_str().unwrap_or_default())}))
                }),
            )
            .route(
                "/api/public/scim/Users",
                post(|Json(body): Json<Value>| async move {
                    if body["userName"] == "taken@example.com" {
                        return (StatusCode::CONFLICT, Json(json!({"detail": "exists"})));
                    }
                    (StatusCode::CREATED, Json(json!({"id": "u-2", "userName": body["userName"], "active": true})))
                }),
            );
        let client = client(router).await;

        let memberships = client.list_memberships().await.unwrap();
        assert_eq!(memberships[0].user_id, "u-1");
        assert_eq!(memberships[0].username, "ada");

        let updated = client
            .update_membership(&UpdateMembershipRequest {
                user_id: "u-1".to_string(),
                role: "VIEWER".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(updated.role, "VIEWER");
        assert_eq!(updated.id, "");

        let err = client.remove_membership("u-1").await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Rejected {
                message: "Member u-1 removed".to_string()
            }
        );

        let user = client
            .create_scim_user(&ScimUserRequest::for_email("new@example.com"))
            .await
            .unwrap();
        assert_eq!(user.id, "u-2");

        let err = client
            .create_scim_user(&ScimUserRequest::for_email("taken@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_project_api_keys() {
        let router = Router::new()
            .route(
                "/api/public/projects/:id/apiKeys",
                get(|| async { Json(json!({"apiKeys": [{"id": "key-1", "publicKey": "pk-lf-1"}]})) })
                    .post(|| async {
                        Json(json!({"id": "key-1", "publicKey": "pk-lf-1", "secretKey": "sk-lf-1"}))
                    }),
            )
            .route(
                "/api/public/projects/:id/apiKeys/:key_id",
                axum::routing::delete(|| async { Json(json!({"success": true})) }),
            );
        let client = client(router).await;

        let created = client.create_project_api_key("proj-1").await.unwrap();
        assert_eq!(created.secret_key, "sk-lf-1");

        let listed = client.list_project_api_keys("proj-1").await.unwrap();
        assert_eq!(listed[0].id, "key-1");

        client.delete_project_api_key("proj-1", "key-1").await.unwrap();
    }
}
