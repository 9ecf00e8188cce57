//! Core schema type definitions.
//!
//! An [`Attribute`] carries the same characteristics a Terraform schema
//! attribute does: type, required/optional/computed, force-new, defaults,
//! conflicts and value validators.

use serde_json::Value;

/// Attribute data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    /// String value
    String,
    /// Boolean value
    Bool,
    /// Integer number
    Int,
    /// Ordered list of strings
    StringList,
    /// Unordered set of unique strings
    StringSet,
    /// List of nested objects
    Block,
}

impl AttributeType {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "number",
            Self::StringList => "list of string",
            Self::StringSet => "set of string",
            Self::Block => "list of object",
        }
    }
}

/// Value validators applied to strings (or every element of a string collection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// Must parse as a UUID
    Uuid,
    /// Must not be empty
    NoEmptyStrings,
    /// Must be one of the given values
    OneOf(&'static [&'static str]),
    /// Must be an RFC3339 timestamp
    Rfc3339,
    /// Must be a duration such as `240h` or `1h30m`
    Duration,
}

/// Definition of a single attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: &'static str,
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    pub sensitive: bool,
    pub default: Option<Value>,
    pub conflicts_with: &'static [&'static str],
    pub exactly_one_of: &'static [&'static str],
    pub validator: Option<Validator>,
}

impl Attribute {
    fn base(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            name,
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            conflicts_with: &[],
            exactly_one_of: &[],
            validator: None,
        }
    }

    pub fn required(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::base(name, attr_type)
        }
    }

    pub fn optional(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::base(name, attr_type)
        }
    }

    /// A read-only attribute populated by the provider.
    pub fn computed_only(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::base(name, attr_type)
        }
    }

    pub fn required_string(name: &'static str) -> Self {
        Self::required(name, AttributeType::String)
    }

    pub fn optional_string(name: &'static str) -> Self {
        Self::optional(name, AttributeType::String)
    }

    pub fn optional_bool(name: &'static str) -> Self {
        Self::optional(name, AttributeType::Bool)
    }

    pub fn optional_string_set(name: &'static str) -> Self {
        Self::optional(name, AttributeType::StringSet)
    }

    pub fn computed_string(name: &'static str) -> Self {
        Self::computed_only(name, AttributeType::String)
    }

    pub fn computed_block(name: &'static str) -> Self {
        Self::computed_only(name, AttributeType::Block)
    }

    /// Also populated by the provider when left unconfigured.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Changing the attribute requires replacing the resource.
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn conflicts_with(mut self, others: &'static [&'static str]) -> Self {
        self.conflicts_with = others;
        self
    }

    pub fn exactly_one_of(mut self, group: &'static [&'static str]) -> Self {
        self.exactly_one_of = group;
        self
    }

    /// Whether the attribute may appear in user configuration.
    pub fn is_configurable(&self) -> bool {
        self.required || self.optional
    }
}

/// Attribute schema of a resource or data source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Names of the attributes whose change forces replacement.
    pub fn force_new_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.force_new)
    }
}
