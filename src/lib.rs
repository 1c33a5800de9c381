//! Hemmer provider for Langfuse
//!
//! Manages Langfuse organizations, projects, their API keys and
//! organization memberships as declarative resources.
//!
//! # Overview
//!
//! - **Provider surface**: [`ProviderService`], implemented by [`LangfuseProvider`]
//! - **Schemas**: one per resource type, plus the provider configuration block
//! - **Planning**: schema-driven diffs with force-new replacement
//! - **Clients**: typed HTTP clients for the admin, project and SCIM APIs
//! - **Testing**: [`testing::ProviderTester`] and an in-memory fake remote
//!
//! # Resources
//!
//! | Type | Authenticated with |
//! |------|--------------------|
//! | `langfuse_organization` | admin API key |
//! | `langfuse_organization_api_key` | admin API key |
//! | `langfuse_project` | organization key pair |
//! | `langfuse_project_api_key` | organization key pair |
//! | `langfuse_organization_membership` | organization key pair |
//!
//! # Quick Start
//!
//! ```ignore
//! use hemmer_provider_langfuse::{init_logging, LangfuseProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = LangfuseProvider::new();
//!     provider
//!         .configure(json!({"host": "https://cloud.langfuse.com"}))
//!         .await?;
//!
//!     let org = provider
//!         .create("langfuse_organization", json!({"name": "Acme"}))
//!         .await?;
//!     tracing::info!(id = %org["id"], "created");
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! - `host`: base URI, defaults to [`config::DEFAULT_HOST`]
//! - `admin_api_key`: admin key, falls back to the `LANGFUSE_ADMIN_KEY`
//!   environment variable

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod testing;
pub mod types;
pub mod validation;
pub mod workflow;

// Re-export main types at crate root
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{LangfuseProvider, ProviderService};
pub use schema::ProviderSchema;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

pub use async_trait::async_trait;

pub use serde_json;
pub use tracing;
