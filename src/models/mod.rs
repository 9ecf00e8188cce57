//! Typed directory entities.
//!
//! Field names follow the Microsoft Graph JSON schema, which is the canonical
//! shape inside the crate. AAD Graph payloads are translated to and from this
//! shape by [`crate::clients::dialect`]. Absent fields are omitted when
//! serializing so that models double as PATCH bodies.

pub mod application;
pub mod credentials;
pub mod directory_object;
pub mod domain;
pub mod group;
pub mod service_principal;

pub use application::{
    AppRole, Application, ApplicationApi, ApplicationWeb, ImplicitGrantSettings, OptionalClaim,
    OptionalClaims, PermissionScope, RequiredResourceAccess, ResourceAccess, SignInAudience,
};
pub use credentials::{KeyCredential, PasswordCredential};
pub use directory_object::DirectoryObject;
pub use domain::Domain;
pub use group::Group;
pub use service_principal::ServicePrincipal;
