//! Helpers shared by the resource and data source handlers.

pub mod credentials;
pub mod duration;
pub mod filter;
pub mod flatten;
pub mod sets;

pub use credentials::{key_credential_for_resource, password_credential_for_resource};
pub use filter::odata_eq;
pub use sets::SetDiff;
