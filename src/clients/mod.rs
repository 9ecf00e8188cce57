//! Access to the Azure Active Directory APIs.
//!
//! The stack, bottom up:
//!
//! - [`Transport`] executes requests ([`HttpTransport`] or [`InMemoryDirectory`])
//! - [`GraphClient`] addresses collections for one [`ApiVersion`], follows
//!   pagination and translates payloads through [`dialect`]
//! - per-entity clients in [`crate::services`] wrap a [`GraphClient`]
//! - [`Client`] bundles them with the caller's identity and the lock registry

pub mod auth;
pub mod client;
pub mod config;
pub mod dialect;
pub mod graph;
pub mod in_memory;
pub mod transport;

pub use auth::{Authorizer, Claims, ClientSecretCredential, StaticToken};
pub use client::{Client, ClientBuilder};
pub use config::{Environment, ProviderConfig};
pub use graph::{ApiVersion, GraphClient};
pub use in_memory::{InMemoryDirectory, RecordedRequest};
pub use transport::{ApiError, ApiRequest, ApiResponse, ApiResult, HttpTransport, Method, Transport};
