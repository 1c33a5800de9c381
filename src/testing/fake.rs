//! In-memory stand-in for a Langfuse instance.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::client::{
    AdminClient, ApiError, ApiKey, ClientFactory, Organization, OrganizationClient,
    OrganizationMembership, OrganizationRequest, Project, ProjectRequest, ScimUser,
    ScimUserRequest, UpdateMembershipRequest,
};
use crate::error::ProviderError;

/// Role a SCIM-created user is given when it joins the organization.
pub const DEFAULT_SCIM_ROLE: &str = "NONE";

/// A fake Langfuse remote implementing both client traits and
/// [`ClientFactory`].
///
/// Clones share state, so a test keeps one handle for inspection and hands
/// another to the provider. Every gateway call is recorded by operation
/// name; [`FakeLangfuse::fail_next`] scripts the next call of an operation
/// to fail without touching the stored data.
///
/// Projects and memberships live in a single organization regardless of the
/// key pair used; the key pairs handed to [`ClientFactory::for_scoped_keys`]
/// are recorded for inspection.
#[derive(Clone, Default)]
pub struct FakeLangfuse {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    organizations: BTreeMap<String, Organization>,
    organization_keys: BTreeMap<String, Vec<ApiKey>>,
    projects: BTreeMap<String, Project>,
    project_keys: BTreeMap<String, Vec<ApiKey>>,
    memberships: Vec<OrganizationMembership>,
    users: BTreeMap<String, String>,
    calls: Vec<String>,
    scoped_keys: Vec<(String, String)>,
    failures: HashMap<String, VecDeque<ApiError>>,
    queued_ids: VecDeque<String>,
    next_id: u64,
    admin_disabled: bool,
    omit_membership_ids: bool,
    scim_users_stay_outside: bool,
}

impl FakeState {
    fn record(&mut self, operation: &str) -> Result<(), ApiError> {
        self.calls.push(operation.to_string());
        match self
            .failures
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn id(&mut self, prefix: &str) -> String {
        if let Some(id) = self.queued_ids.pop_front() {
            return id;
        }
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn new_key(&mut self) -> ApiKey {
        let id = self.id("key");
        ApiKey {
            public_key: format!("pk-lf-{}", id),
            secret_key: format!("sk-lf-{}", id),
            id,
        }
    }

    fn as_returned(&self, membership: &OrganizationMembership) -> OrganizationMembership {
        let mut membership = membership.clone();
        if self.omit_membership_ids {
            membership.id.clear();
        }
        membership
    }
}

fn not_found(what: &str, id: &str) -> ApiError {
    ApiError::NotFound {
        message: format!("{} {} not found", what, id),
    }
}

fn listed(keys: &[ApiKey]) -> Vec<ApiKey> {
    keys.iter()
        .map(|key| ApiKey {
            secret_key: String::new(),
            ..key.clone()
        })
        .collect()
}

impl FakeLangfuse {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `for_admin` fail as if no admin key was configured.
    pub fn without_admin_key(self) -> Self {
        self.lock().admin_disabled = true;
        self
    }

    /// Blank the `id` of memberships in list and update responses.
    pub fn omitting_membership_ids(self) -> Self {
        self.lock().omit_membership_ids = true;
        self
    }

    /// SCIM-created users do not join the organization.
    pub fn scim_users_stay_outside(self) -> Self {
        self.lock().scim_users_stay_outside = true;
        self
    }

    /// IDs handed out, in order, before falling back to generated ones.
    pub fn queue_ids<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().queued_ids.extend(ids.into_iter().map(Into::into));
    }

    /// Fail the next call of `operation` with `error`.
    pub fn fail_next(&self, operation: &str, error: ApiError) {
        self.lock()
            .failures
            .entry(operation.to_string())
            .or_default()
            .push_back(error);
    }

    /// Add an existing member to the organization.
    pub fn add_member(&self, email: &str, role: &str) -> OrganizationMembership {
        let mut state = self.lock();
        let user_id = state.id("u");
        let membership = OrganizationMembership {
            id: state.id("m"),
            email: email.to_string(),
            role: role.to_string(),
            status: "ACTIVE".to_string(),
            user_id: user_id.clone(),
            username: email.split('@').next().unwrap_or_default().to_string(),
        };
        state.users.insert(email.to_string(), user_id);
        state.memberships.push(membership.clone());
        membership
    }

    /// Register a user account that is not a member of the organization.
    pub fn add_user(&self, email: &str) -> String {
        let mut state = self.lock();
        let user_id = state.id("u");
        state.users.insert(email.to_string(), user_id.clone());
        user_id
    }

    /// Drop a membership behind the provider's back.
    pub fn drop_member(&self, user_id: &str) {
        self.lock().memberships.retain(|m| m.user_id != user_id);
    }

    pub fn memberships(&self) -> Vec<OrganizationMembership> {
        self.lock().memberships.clone()
    }

    pub fn organization(&self, id: &str) -> Option<Organization> {
        self.lock().organizations.get(id).cloned()
    }

    pub fn project(&self, id: &str) -> Option<Project> {
        self.lock().projects.get(id).cloned()
    }

    /// Remove a project behind the provider's back.
    pub fn drop_project(&self, id: &str) {
        self.lock().projects.remove(id);
    }

    /// Names of every gateway operation called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == operation).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Key pairs passed to `for_scoped_keys`, in order.
    pub fn scoped_keys(&self) -> Vec<(String, String)> {
        self.lock().scoped_keys.clone()
    }
}

impl ClientFactory for FakeLangfuse {
    fn for_admin(&self) -> Result<Arc<dyn AdminClient>, ProviderError> {
        if self.lock().admin_disabled {
            return Err(ProviderError::Configuration(
                "admin_api_key must be set to manage organizations".to_string(),
            ));
        }
        Ok(Arc::new(self.clone()))
    }

    fn for_scoped_keys(&self, public_key: &str, private_key: &str) -> Arc<dyn OrganizationClient> {
        self.lock()
            .scoped_keys
            .push((public_key.to_string(), private_key.to_string()));
        Arc::new(self.clone())
    }
}

#[async_trait]
impl AdminClient for FakeLangfuse {
    async fn create_organization(
        &self,
        request: &OrganizationRequest,
    ) -> Result<Organization, ApiError> {
        let mut state = self.lock();
        state.record("create_organization")?;
        let organization = Organization {
            id: state.id("org"),
            name: request.name.clone(),
            metadata: Some(request.metadata.clone()),
        };
        state
            .organizations
            .insert(organization.id.clone(), organization.clone());
        Ok(organization)
    }

    async fn get_organization(&self, organization_id: &str) -> Result<Organization, ApiError> {
        let mut state = self.lock();
        state.record("get_organization")?;
        state
            .organizations
            .get(organization_id)
            .cloned()
            .ok_or_else(|| not_found("Organization", organization_id))
    }

    async fn update_organization(
        &self,
        organization_id: &str,
        request: &OrganizationRequest,
    ) -> Result<Organization, ApiError> {
        let mut state = self.lock();
        state.record("update_organization")?;
        let organization = state
            .organizations
            .get_mut(organization_id)
            .ok_or_else(|| not_found("Organization", organization_id))?;
        organization.name = request.name.clone();
        organization.metadata = Some(request.metadata.clone());
        Ok(organization.clone())
    }

    async fn delete_organization(&self, organization_id: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.record("delete_organization")?;
        state
            .organizations
            .remove(organization_id)
            .map(|_| ())
            .ok_or_else(|| not_found("Organization", organization_id))
    }

    async fn create_organization_api_key(
        &self,
        organization_id: &str,
    ) -> Result<ApiKey, ApiError> {
        let mut state = self.lock();
        state.record("create_organization_api_key")?;
        if !state.organizations.contains_key(organization_id) {
            return Err(not_found("Organization", organization_id));
        }
        let key = state.new_key();
        state
            .organization_keys
            .entry(organization_id.to_string())
            .or_default()
            .push(key.clone());
        Ok(key)
    }

    async fn list_organization_api_keys(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ApiKey>, ApiError> {
        let mut state = self.lock();
        state.record("list_organization_api_keys")?;
        if !state.organizations.contains_key(organization_id) {
            return Err(not_found("Organization", organization_id));
        }
        Ok(state
            .organization_keys
            .get(organization_id)
            .map(|keys| listed(keys))
            .unwrap_or_default())
    }

    async fn delete_organization_api_key(
        &self,
        organization_id: &str,
        api_key_id: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.record("delete_organization_api_key")?;
        let keys = state
            .organization_keys
            .get_mut(organization_id)
            .ok_or_else(|| not_found("API key", api_key_id))?;
        let before = keys.len();
        keys.retain(|key| key.id != api_key_id);
        if keys.len() == before {
            return Err(not_found("API key", api_key_id));
        }
        Ok(())
    }
}

#[async_trait]
impl OrganizationClient for FakeLangfuse {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let mut state = self.lock();
        state.record("list_projects")?;
        Ok(state.projects.values().cloned().collect())
    }

    async fn create_project(&self, request: &ProjectRequest) -> Result<Project, ApiError> {
        let mut state = self.lock();
        state.record("create_project")?;
        // Retention is accepted but never reported back.
        let project = Project {
            id: state.id("proj"),
            name: request.name.clone(),
            retention_days: Some(0),
            metadata: Some(request.metadata.clone()),
        };
        state.projects.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        project_id: &str,
        request: &ProjectRequest,
    ) -> Result<Project, ApiError> {
        let mut state = self.lock();
        state.record("update_project")?;
        let project = state
            .projects
            .get_mut(project_id)
            .ok_or_else(|| not_found("Project", project_id))?;
        project.name = request.name.clone();
        project.metadata = Some(request.metadata.clone());
        Ok(project.clone())
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.record("delete_project")?;
        state
            .projects
            .remove(project_id)
            .map(|_| ())
            .ok_or_else(|| not_found("Project", project_id))
    }

    async fn create_project_api_key(&self, project_id: &str) -> Result<ApiKey, ApiError> {
        let mut state = self.lock();
        state.record("create_project_api_key")?;
        if !state.projects.contains_key(project_id) {
            return Err(not_found("Project", project_id));
        }
        let key = state.new_key();
        state
            .project_keys
            .entry(project_id.to_string())
            .or_default()
            .push(key.clone());
        Ok(key)
    }

    async fn list_project_api_keys(&self, project_id: &str) -> Result<Vec<ApiKey>, ApiError> {
        let mut state = self.lock();
        state.record("list_project_api_keys")?;
        if !state.projects.contains_key(project_id) {
            return Err(not_found("Project", project_id));
        }
        Ok(state
            .project_keys
            .get(project_id)
            .map(|keys| listed(keys))
            .unwrap_or_default())
    }

    async fn delete_project_api_key(
        &self,
        project_id: &str,
        api_key_id: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.record("delete_project_api_key")?;
        let keys = state
            .project_keys
            .get_mut(project_id)
            .ok_or_else(|| not_found("API key", api_key_id))?;
        let before = keys.len();
        keys.retain(|key| key.id != api_key_id);
        if keys.len() == before {
            return Err(not_found("API key", api_key_id));
        }
        Ok(())
    }

    async fn list_memberships(&self) -> Result<Vec<OrganizationMembership>, ApiError> {
        let mut state = self.lock();
        state.record("list_memberships")?;
        Ok(state
            .memberships
            .iter()
            .map(|m| state.as_returned(m))
            .collect())
    }

    async fn update_membership(
        &self,
        request: &UpdateMembershipRequest,
    ) -> Result<OrganizationMembership, ApiError> {
        let mut state = self.lock();
        state.record("update_membership")?;

        if let Some(index) = state
            .memberships
            .iter()
            .position(|m| m.user_id == request.user_id)
        {
            state.memberships[index].role = request.role.clone();
            let membership = state.memberships[index].clone();
            return Ok(state.as_returned(&membership));
        }

        // Assigning a role to a known user adds them to the organization.
        let email = state
            .users
            .iter()
            .find(|(_, user_id)| **user_id == request.user_id)
            .map(|(email, _)| email.clone())
            .ok_or_else(|| not_found("User", &request.user_id))?;
        let membership = OrganizationMembership {
            id: state.id("m"),
            username: email.split('@').next().unwrap_or_default().to_string(),
            email,
            role: request.role.clone(),
            status: "ACTIVE".to_string(),
            user_id: request.user_id.clone(),
        };
        state.memberships.push(membership.clone());
        Ok(state.as_returned(&membership))
    }

    async fn remove_membership(&self, user_id: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.record("remove_membership")?;
        let before = state.memberships.len();
        state.memberships.retain(|m| m.user_id != user_id);
        if state.memberships.len() == before {
            return Err(not_found("Membership for user", user_id));
        }
        Ok(())
    }

    async fn create_scim_user(&self, request: &ScimUserRequest) -> Result<ScimUser, ApiError> {
        let mut state = self.lock();
        state.record("create_scim_user")?;
        if state.users.contains_key(&request.user_name) {
            return Err(ApiError::Status {
                status: 409,
                message: format!("User with userName {} already exists", request.user_name),
            });
        }

        let user_id = state.id("u");
        state
            .users
            .insert(request.user_name.clone(), user_id.clone());
        if state.scim_users_stay_outside {
            return Ok(ScimUser {
                id: user_id,
                user_name: request.user_name.clone(),
                active: request.active,
            });
        }
        let membership = OrganizationMembership {
            id: state.id("m"),
            email: request.user_name.clone(),
            role: DEFAULT_SCIM_ROLE.to_string(),
            status: "ACTIVE".to_string(),
            user_id: user_id.clone(),
            username: request
                .user_name
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        state.memberships.push(membership);

        Ok(ScimUser {
            id: user_id,
            user_name: request.user_name.clone(),
            active: request.active,
        })
    }
}
