//! Azure Active Directory resource provider for Rust.
//!
//! Manages groups, applications, service principals, application credentials
//! and domain lookups against either the legacy AAD Graph API or Microsoft
//! Graph, behind one typed model.
//!
//! # Core Components
//!
//! - [`Provider`] - Registry dispatching create/read/update/delete/import by type name
//! - [`Client`] - Typed per-entity clients, the caller's identity and the lock registry
//! - [`ResourceData`] - Planned and prior attribute values handed to handlers
//! - [`NamedLocks`] - Serializes read-modify-write cycles on list-valued fields
//!
//! # Quick Start
//!
//! ```rust
//! use azuread_provider::clients::{Claims, InMemoryDirectory};
//! use azuread_provider::{Client, Provider, ProviderConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProviderConfig::new(
//!     "00000000-0000-0000-0000-000000000001",
//!     "00000000-0000-0000-0000-000000000002",
//! );
//! let client = Client::builder(config)
//!     .transport(Arc::new(InMemoryDirectory::new()))
//!     .claims(Claims::default())
//!     .build()
//!     .await?;
//!
//! let provider = Provider::new(client);
//! let config = json!({"name": "developers", "description": "Everyone who ships"});
//! let group = provider
//!     .create("azuread_group", config.as_object().unwrap())
//!     .await?;
//! assert_eq!(group.get_str("name"), Some("developers"));
//! # Ok(())
//! # }
//! ```

pub mod clients;
pub mod error;
pub mod helpers;
pub mod ids;
pub mod locks;
pub mod models;
pub mod provider;
pub mod schema;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use clients::{ApiVersion, Client, ClientBuilder, Environment, ProviderConfig};
pub use error::{Diagnostic, ProviderError, ProviderResult, ValidationError};
pub use ids::{CredentialId, CredentialKind, ObjectId};
pub use locks::NamedLocks;
pub use provider::{DataSourceHandler, Provider, ResourceHandler, ResourceState};
pub use schema::{Attribute, AttributeType, Schema};
pub use state::ResourceData;
