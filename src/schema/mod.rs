//! Attribute schemas for resources and data sources.
//!
//! Each handler describes its configuration surface with a [`Schema`]. The
//! schema drives validation of user configuration before any API call is made
//! and tells [`crate::state::ResourceData`] which attributes are computed,
//! defaulted or set-valued.
//!
//! # Examples
//!
//! ```rust
//! use azuread_provider::schema::{Attribute, Schema, Validator};
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .with(Attribute::required_string("name").force_new())
//!     .with(Attribute::optional_string_set("members").computed().with_validator(Validator::Uuid));
//!
//! let config = json!({ "name": "acctestGroup-1", "members": [] });
//! assert!(schema.validate(config.as_object().unwrap()).is_ok());
//! ```

pub mod types;
pub mod validation;

pub use types::{Attribute, AttributeType, Schema, Validator};
pub use validation::validate_value;
