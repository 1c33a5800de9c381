//! Test harness for the provider.
//!
//! [`ProviderTester`] drives a [`ProviderService`] the way a host would,
//! and [`FakeLangfuse`] stands in for the remote so the whole lifecycle runs
//! in memory.
//!
//! # Example
//!
//! ```ignore
//! use hemmer_provider_langfuse::testing::{FakeLangfuse, ProviderTester};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_organization() {
//!     let fake = FakeLangfuse::new();
//!     let tester = ProviderTester::with_fake(&fake);
//!     tester.configure(json!({"admin_api_key": "admin"})).await.unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("langfuse_organization", json!({"name": "Acme"}))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["name"], "Acme");
//! }
//! ```

mod fake;

use std::sync::Arc;

use serde_json::Value;

pub use fake::{FakeLangfuse, DEFAULT_SCIM_ROLE};

use crate::error::ProviderError;
use crate::provider::{LangfuseProvider, ProviderService};
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::types::{ImportedResource, PlanResult};

/// Wraps a [`ProviderService`] with host-shaped helpers.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl ProviderTester<LangfuseProvider> {
    /// A tester for the Langfuse provider backed by `fake`.
    pub fn with_fake(fake: &FakeLangfuse) -> Self {
        Self::new(LangfuseProvider::with_client_factory(Arc::new(fake.clone())))
    }
}

impl<P: ProviderService> ProviderTester<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration, failing on any error diagnostic.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics).map(drop)
    }

    /// Configure the provider. Warnings are returned, errors fail.
    pub async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics).map(drop)
    }

    /// Plan a creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read a resource; `Value::Null` means it is gone.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource, returning any warnings.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Plan, create, then read back. Returns the state after the read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Plan, update, then read back. Returns the state after the read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// Plan then delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// Create, update and delete. Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated.clone()).await?;
        Ok(updated)
    }
}

/// Failure of a tester operation.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("{}", render_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = format!("Operation failed with {} diagnostic(s):", diagnostics.len());
    for diag in diagnostics {
        out.push_str(&format!("\n  [{:?}] {}", diag.severity, diag.summary));
        if let Some(detail) = &diag.detail {
            out.push_str(&format!(": {}", detail));
        }
        if let Some(attr) = &diag.attribute {
            out.push_str(&format!(" (at {})", attr));
        }
    }
    out
}

/// Fail on error diagnostics, passing the rest through.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<Vec<Diagnostic>, TestError> {
    if diagnostics.iter().any(Diagnostic::is_error) {
        Err(TestError::Diagnostics(
            diagnostics.into_iter().filter(Diagnostic::is_error).collect(),
        ))
    } else {
        Ok(diagnostics)
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan creates the resource.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty() && !plan.requires_replace,
        "Expected an in-place update, got {} change(s) with requires_replace={}",
        plan.changes.len(),
        plan.requires_replace
    );
}

/// Assert that a plan changes the attribute at `path`.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}'. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that some diagnostic of `severity` mentions `substring` in its
/// summary or detail.
pub fn assert_diagnostic_contains(
    diagnostics: &[Diagnostic],
    severity: DiagnosticSeverity,
    substring: &str,
) {
    let found = diagnostics.iter().any(|d| {
        d.severity == severity
            && (d.summary.contains(substring)
                || d.detail.as_deref().is_some_and(|detail| detail.contains(substring)))
    });
    assert!(
        found,
        "Expected a {:?} diagnostic containing '{}', got: {:?}",
        severity,
        substring,
        diagnostics.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiError;
    use serde_json::json;

    const ORG: &str = "langfuse_organization";
    const PROJECT: &str = "langfuse_project";
    const MEMBERSHIP: &str = "langfuse_organization_membership";

    async fn configured(fake: &FakeLangfuse) -> ProviderTester<LangfuseProvider> {
        let tester = ProviderTester::with_fake(fake);
        tester
            .configure(json!({"admin_api_key": "admin"}))
            .await
            .unwrap();
        tester
    }

    fn org_keys(extra: Value) -> Value {
        let mut config = json!({
            "organization_id": "org-1",
            "organization_public_key": "pk-lf-org",
            "organization_private_key": "sk-lf-org"
        });
        if let (Some(config), Value::Object(extra)) = (config.as_object_mut(), extra) {
            config.extend(extra);
        }
        config
    }

    #[test]
    fn test_resource_types() {
        let fake = FakeLangfuse::new();
        let tester = ProviderTester::with_fake(&fake);

        assert_eq!(tester.resource_types().len(), 5);
        assert!(tester.schema().resources.contains_key(PROJECT));
    }

    #[test]
    fn test_configure_blocking() {
        let fake = FakeLangfuse::new();
        let tester = ProviderTester::with_fake(&fake);

        let diagnostics =
            tokio_test::block_on(tester.configure(json!({"admin_api_key": "admin"}))).unwrap();
        assert_no_errors(&diagnostics);
        tokio_test::block_on(tester.stop()).unwrap();
    }

    #[tokio::test]
    async fn test_configure_rejects_wrong_types() {
        let fake = FakeLangfuse::new();
        let tester = ProviderTester::with_fake(&fake);

        let err = tester.configure(json!({"host": 1})).await.unwrap_err();
        assert!(matches!(err, TestError::Diagnostics(_)));
        assert!(err.to_string().contains("host"));
    }

    #[tokio::test]
    async fn test_organization_crud() {
        let fake = FakeLangfuse::new();
        fake.queue_ids(["org-123"]);
        let tester = configured(&fake).await;

        let config = json!({"name": "Acme", "metadata": {"tier": "gold"}});
        let plan = tester.plan_create(ORG, config.clone()).await.unwrap();
        assert_plan_creates(&plan);

        let state = tester
            .lifecycle_crud(ORG, config, json!({"name": "Acme Corp", "metadata": {"tier": "gold"}}))
            .await
            .unwrap();

        assert_eq!(state["id"], "org-123");
        assert_eq!(state["name"], "Acme Corp");
        assert!(fake.organization("org-123").is_none());
    }

    #[tokio::test]
    async fn test_plan_rename_is_in_place() {
        let fake = FakeLangfuse::new();
        let tester = configured(&fake).await;
        let state = tester
            .lifecycle_create(PROJECT, org_keys(json!({"name": "web"})))
            .await
            .unwrap();

        let plan = tester
            .plan_update(PROJECT, state.clone(), org_keys(json!({"name": "web-2"})))
            .await
            .unwrap();
        assert_plan_updates_in_place(&plan);
        assert_plan_changes_attribute(&plan, "name");
        assert_eq!(plan.planned_state["id"], state["id"]);

        let plan = tester
            .plan_update(PROJECT, state.clone(), org_keys(json!({"name": "web"})))
            .await
            .unwrap();
        assert_plan_no_changes(&plan);

        let mut moved = org_keys(json!({"name": "web"}));
        moved["organization_id"] = json!("org-2");
        let plan = tester.plan_update(PROJECT, state, moved).await.unwrap();
        assert_plan_replaces(&plan);
    }

    #[tokio::test]
    async fn test_read_of_vanished_project_is_null() {
        let fake = FakeLangfuse::new();
        let tester = configured(&fake).await;
        let state = tester
            .lifecycle_create(PROJECT, org_keys(json!({"name": "web"})))
            .await
            .unwrap();

        fake.drop_project(state["id"].as_str().unwrap());

        assert!(tester.read(PROJECT, state).await.unwrap().is_null());
    }

    #[tokio::test]
    async fn test_organization_delete_warning() {
        let fake = FakeLangfuse::new();
        let tester = configured(&fake).await;
        let state = tester
            .lifecycle_create(ORG, json!({"name": "Acme"}))
            .await
            .unwrap();
        fake.fail_next(
            "delete_organization",
            ApiError::Rejected {
                message: "Cannot delete organization with existing projects".to_string(),
            },
        );

        let diagnostics = tester.lifecycle_delete(ORG, state).await.unwrap();

        assert_no_errors(&diagnostics);
        assert_diagnostic_contains(
            &diagnostics,
            DiagnosticSeverity::Warning,
            "existing projects",
        );
    }

    #[tokio::test]
    async fn test_membership_via_scim() {
        let fake = FakeLangfuse::new();
        let tester = configured(&fake).await;

        let config = json!({
            "email": "grace@example.com",
            "role": "MEMBER",
            "organization_public_key": "pk-lf-org",
            "organization_private_key": "sk-lf-org"
        });
        tester
            .validate_resource_config(MEMBERSHIP, config.clone())
            .await
            .unwrap();

        let state = tester.lifecycle_create(MEMBERSHIP, config).await.unwrap();

        assert_eq!(state["email"], "grace@example.com");
        assert_eq!(state["role"], "MEMBER");
        assert_eq!(fake.call_count("create_scim_user"), 1);
        assert_eq!(fake.memberships()[0].role, "MEMBER");
        assert_ne!(fake.memberships()[0].role, DEFAULT_SCIM_ROLE);
    }

    #[tokio::test]
    async fn test_project_import() {
        let fake = FakeLangfuse::new();
        let tester = configured(&fake).await;
        let state = tester
            .lifecycle_create(PROJECT, org_keys(json!({"name": "web", "retention_days": 30})))
            .await
            .unwrap();
        let id = format!("{},org-1,pk-lf-org,sk-lf-org", state["id"].as_str().unwrap());

        let imported = tester.import_resource(PROJECT, &id).await.unwrap();

        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].state["name"], "web");
        assert_eq!(imported[0].state["retention_days"], 0);

        let err = tester.import_resource(PROJECT, "web").await.unwrap_err();
        assert_eq!(err.summary(), "Invalid import format");
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        assert_no_errors(&[Diagnostic::error("An error")]);
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("field1"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = err.to_string();
        assert!(display.contains("First error"));
        assert!(display.contains("field1"));
        assert!(display.contains("More info"));
    }
}
