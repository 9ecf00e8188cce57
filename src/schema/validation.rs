//! Validation of user configuration against a [`Schema`].
//!
//! Validation runs before handlers touch the API so that malformed input is
//! reported as a [`ValidationError`] naming the offending attribute.

use super::types::{Attribute, AttributeType, Schema, Validator};
use crate::error::{ValidationError, ValidationResult};
use crate::helpers::duration::parse_duration;
use serde_json::{Map, Value};
use uuid::Uuid;

impl Schema {
    /// Validate a configuration object.
    pub fn validate(&self, config: &Map<String, Value>) -> ValidationResult<()> {
        for (name, value) in config {
            let Some(attribute) = self.attribute(name) else {
                return Err(ValidationError::UnknownAttribute {
                    attribute: name.clone(),
                });
            };
            if !attribute.is_configurable() && !value.is_null() {
                return Err(ValidationError::ComputedAttribute {
                    attribute: name.clone(),
                });
            }
        }

        for attribute in &self.attributes {
            let value = config.get(attribute.name).filter(|v| !v.is_null());

            if attribute.required && value.is_none() {
                return Err(ValidationError::missing_required(attribute.name));
            }

            let Some(value) = value else {
                continue;
            };

            validate_value(attribute, value)?;

            for other in attribute.conflicts_with {
                if is_set(config, other) {
                    return Err(ValidationError::Conflicting {
                        attribute: attribute.name.to_string(),
                        other: other.to_string(),
                    });
                }
            }
        }

        self.validate_exactly_one_of(config)
    }

    fn validate_exactly_one_of(&self, config: &Map<String, Value>) -> ValidationResult<()> {
        let mut checked: Vec<&[&str]> = Vec::new();

        for attribute in &self.attributes {
            let group = attribute.exactly_one_of;
            if group.is_empty() || checked.contains(&group) {
                continue;
            }
            checked.push(group);

            let count = group.iter().filter(|name| is_set(config, name)).count();
            if count != 1 {
                return Err(ValidationError::ExactlyOneOf {
                    attributes: group.iter().map(|s| s.to_string()).collect(),
                });
            }
        }

        Ok(())
    }
}

fn is_set(config: &Map<String, Value>, name: &str) -> bool {
    match config.get(name) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Validate a single non-null value against its attribute definition.
pub fn validate_value(attribute: &Attribute, value: &Value) -> ValidationResult<()> {
    let type_error = || ValidationError::InvalidType {
        attribute: attribute.name.to_string(),
        expected: attribute.attr_type.describe().to_string(),
    };

    match attribute.attr_type {
        AttributeType::String => {
            let s = value.as_str().ok_or_else(type_error)?;
            apply_validator(attribute, s)
        }
        AttributeType::Bool => value.as_bool().map(|_| ()).ok_or_else(type_error),
        AttributeType::Int => value.as_i64().map(|_| ()).ok_or_else(type_error),
        AttributeType::StringList | AttributeType::StringSet => {
            let items = value.as_array().ok_or_else(type_error)?;
            for item in items {
                let s = item.as_str().ok_or_else(type_error)?;
                apply_validator(attribute, s)?;
            }
            Ok(())
        }
        AttributeType::Block => {
            let items = value.as_array().ok_or_else(type_error)?;
            if items.iter().all(Value::is_object) {
                Ok(())
            } else {
                Err(type_error())
            }
        }
    }
}

fn apply_validator(attribute: &Attribute, value: &str) -> ValidationResult<()> {
    let name = attribute.name.to_string();

    match attribute.validator {
        None => Ok(()),
        Some(Validator::Uuid) => Uuid::parse_str(value)
            .map(|_| ())
            .map_err(|_| ValidationError::InvalidUuid {
                attribute: name,
                value: value.to_string(),
            }),
        Some(Validator::NoEmptyStrings) => {
            if value.trim().is_empty() {
                Err(ValidationError::EmptyString { attribute: name })
            } else {
                Ok(())
            }
        }
        Some(Validator::OneOf(allowed)) => {
            if allowed.contains(&value) {
                Ok(())
            } else {
                Err(ValidationError::InvalidValue {
                    attribute: name,
                    value: value.to_string(),
                    allowed: allowed.iter().map(|s| s.to_string()).collect(),
                })
            }
        }
        Some(Validator::Rfc3339) => chrono::DateTime::parse_from_rfc3339(value)
            .map(|_| ())
            .map_err(|_| ValidationError::InvalidDate {
                attribute: name,
                value: value.to_string(),
            }),
        Some(Validator::Duration) => parse_duration(attribute.name, value).map(|_| ()),
    }
}
