//! Gateway to the Langfuse HTTP APIs.
//!
//! Two client traits split the remote surface by credential: [`AdminClient`]
//! uses the instance admin key, [`OrganizationClient`] an organization's
//! public/private key pair. Resource adapters only see the traits, so tests
//! can swap in an in-memory fake through [`ClientFactory`].

mod admin;
mod error;
mod factory;
mod http;
mod models;
mod organization;

pub use admin::{AdminClient, HttpAdminClient};
pub use error::ApiError;
pub use factory::{ClientFactory, HttpClientFactory};
pub use models::{
    ApiKey, Metadata, Organization, OrganizationMembership, OrganizationRequest, Project,
    ProjectRequest, ScimEmail, ScimUser, ScimUserRequest, UpdateMembershipRequest,
};
pub use organization::{HttpOrganizationClient, OrganizationClient};
