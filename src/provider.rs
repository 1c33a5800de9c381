//! The host-facing provider surface.
//!
//! [`ProviderService`] is what a plugin host drives: schema discovery,
//! configuration, planning and the resource lifecycle, all in terms of JSON
//! state. [`LangfuseProvider`] implements it by dispatching each call to the
//! matching resource adapter.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{ClientFactory, HttpClientFactory};
use crate::config::{ProviderConfig, ResolvedConfig, ADMIN_KEY_ENV};
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::resources::ResourceKind;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};
use crate::validation;

/// Provider type name, the prefix of every resource type.
pub const PROVIDER_TYPE_NAME: &str = "langfuse";

/// Operations a plugin host invokes on a provider.
///
/// # Example
///
/// ```ignore
/// use hemmer_provider_langfuse::{LangfuseProvider, ProviderService};
/// use serde_json::json;
///
/// let provider = LangfuseProvider::new();
/// provider.configure(json!({"host": "https://cloud.langfuse.com"})).await?;
/// let state = provider
///     .create("langfuse_organization", json!({"name": "Acme"}))
///     .await?;
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: self.schema().resources.keys().cloned().collect(),
            ..Default::default()
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validation::validate(&self.schema().provider, &config))
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self
            .schema()
            .resources
            .remove(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
        Ok(validation::validate(&schema, &config))
    }

    /// Upgrade resource state from an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// Plan changes for a resource.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(&self, resource_type: &str, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Read the current state of a resource. A null state means the
    /// resource is gone and should be dropped.
    async fn read(&self, resource_type: &str, current_state: Value)
        -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource. Warnings are returned as diagnostics.
    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError>;
}

/// Builds the client factory from resolved configuration.
pub type FactoryBuilder =
    Box<dyn Fn(&ResolvedConfig) -> Result<Arc<dyn ClientFactory>, ProviderError> + Send + Sync>;

/// Langfuse provider.
///
/// Stateless apart from the client factory, which `configure` installs and
/// every operation reads.
pub struct LangfuseProvider {
    build_factory: FactoryBuilder,
    factory: RwLock<Option<Arc<dyn ClientFactory>>>,
}

impl Default for LangfuseProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LangfuseProvider {
    /// A provider talking to Langfuse over HTTP once configured.
    pub fn new() -> Self {
        Self::with_factory_builder(|config| {
            let factory: Arc<dyn ClientFactory> = Arc::new(HttpClientFactory::new(config)?);
            Ok(factory)
        })
    }

    /// A provider whose clients come from `build` at configure time.
    pub fn with_factory_builder<F>(build: F) -> Self
    where
        F: Fn(&ResolvedConfig) -> Result<Arc<dyn ClientFactory>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            build_factory: Box::new(build),
            factory: RwLock::new(None),
        }
    }

    /// A provider that hands out clients from `factory` regardless of
    /// configuration.
    pub fn with_client_factory(factory: Arc<dyn ClientFactory>) -> Self {
        Self::with_factory_builder(move |_| Ok(factory.clone()))
    }

    fn client_factory(&self) -> Result<Arc<dyn ClientFactory>, ProviderError> {
        self.factory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                ProviderError::Configuration("provider has not been configured".to_string())
            })
    }
}

#[async_trait::async_trait]
impl ProviderService for LangfuseProvider {
    fn schema(&self) -> ProviderSchema {
        ResourceKind::ALL.into_iter().fold(
            ProviderSchema::new().with_provider_config(ProviderConfig::schema()),
            |schema, kind| schema.with_resource(kind.type_name(), kind.schema()),
        )
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            resources: ResourceKind::ALL
                .iter()
                .map(|kind| kind.type_name().to_string())
                .collect(),
        }
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = if config.is_null() { Value::Object(Default::default()) } else { config };
        let mut diagnostics = validation::validate(&ProviderConfig::schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            warn!(diagnostics = diagnostics.len(), "Provider configuration is invalid");
            return Ok(diagnostics);
        }

        let resolved = ProviderConfig::from_value(config)?.resolve();
        if resolved.admin_api_key.is_none() {
            diagnostics.push(
                Diagnostic::warning("No admin API key configured").with_detail(format!(
                    "Organizations and organization API keys need admin_api_key or {}.",
                    ADMIN_KEY_ENV
                )),
            );
        }

        let factory = (self.build_factory)(&resolved)?;
        *self.factory.write().unwrap_or_else(PoisonError::into_inner) = Some(factory);

        info!(
            host = %resolved.host,
            admin = resolved.admin_api_key.is_some(),
            "Configured Langfuse provider"
        );
        Ok(diagnostics)
    }

    #[instrument(skip(self), name = "provider.stop")]
    async fn stop(&self) -> Result<(), ProviderError> {
        self.factory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        info!("Provider stopped");
        Ok(())
    }

    #[instrument(skip(self, config), name = "provider.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        let diagnostics = validation::validate(&kind.schema(), &config);
        if !diagnostics.is_empty() {
            debug!(resource_type, diagnostics = diagnostics.len(), "Resource configuration has diagnostics");
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, state), name = "provider.upgrade_resource_state")]
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        let current = kind.schema().version;
        if version < 0 || version as u64 > current {
            return Err(ProviderError::Validation(format!(
                "cannot upgrade {} state from schema version {} (current is {})",
                resource_type, version, current
            )));
        }
        Ok(state)
    }

    #[instrument(skip(self, prior_state, proposed_state, config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let _ = config;
        let kind = ResourceKind::from_type_name(resource_type)?;
        let result = plan_resource(&kind.schema(), prior_state.as_ref(), &proposed_state);
        debug!(
            resource_type,
            changes = result.changes.len(),
            requires_replace = result.requires_replace,
            "Plan completed"
        );
        Ok(result)
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        kind.create(self.client_factory()?, planned_state)
            .await
            .inspect_err(|e| error!(resource_type, error = %e, "Create failed"))
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        let state = kind
            .read(self.client_factory()?, current_state)
            .await
            .inspect_err(|e| error!(resource_type, error = %e, "Read failed"))?;
        if state.is_null() {
            info!(resource_type, "Resource no longer exists, dropping it");
        }
        Ok(state)
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        kind.update(self.client_factory()?, prior_state, planned_state)
            .await
            .inspect_err(|e| error!(resource_type, error = %e, "Update failed"))
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        let diagnostics = kind
            .delete(self.client_factory()?, current_state)
            .await
            .inspect_err(|e| error!(resource_type, error = %e, "Delete failed"))?;
        if !diagnostics.is_empty() {
            warn!(resource_type, diagnostics = diagnostics.len(), "Delete completed with warnings");
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, id), name = "provider.import_resource")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let kind = ResourceKind::from_type_name(resource_type)?;
        let state = kind
            .import(self.client_factory()?, id)
            .await
            .inspect_err(|e| error!(resource_type, error = %e, "Import failed"))?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }
}
