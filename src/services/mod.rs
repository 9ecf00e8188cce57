//! Resource and data source handlers, grouped by directory service.
//!
//! Each service module owns a typed client over [`crate::clients::GraphClient`]
//! and the handlers that drive it.

pub mod applications;
pub mod domains;
pub mod groups;
pub mod serviceprincipals;
