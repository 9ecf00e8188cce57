//! Error types for provider operations.
//!
//! Every handler returns [`ProviderResult`]. Errors fall into four families:
//! remote objects that are absent ([`ProviderError::NotFound`]), conflicts with
//! existing remote state ([`ProviderError::DuplicateName`] and
//! [`ProviderError::AlreadyExists`]), malformed input ([`ValidationError`]) and
//! API failures that are propagated unchanged ([`ProviderError::Api`]).
//!
//! Errors can be wrapped with a human readable summary and an attribute path,
//! which is how they are surfaced as [`Diagnostic`]s.
//!
//! A create that fails after the remote object came into existence returns
//! [`ProviderError::Tainted`], which carries the partial state so the object
//! stays tracked and can be destroyed.

use crate::clients::ApiError;
use crate::provider::ResourceState;

/// Main error type for provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The remote object does not exist
    #[error("{kind} with object ID {id:?} was not found")]
    NotFound { kind: String, id: String },

    /// A lookup by filter matched nothing
    #[error("No {kind} found matching filter: {filter:?}")]
    NoMatch { kind: String, filter: String },

    /// A lookup by filter that must be unique matched several objects
    #[error("Found multiple {kind} objects matching filter: {filter:?}")]
    MultipleMatches { kind: String, filter: String },

    /// A same-named object exists and the duplicate guard is enabled
    #[error(
        "existing {kind} with name {name:?} (Object ID {object_id:?}) was found and `prevent_duplicate_names` was specified"
    )]
    DuplicateName {
        kind: String,
        name: String,
        object_id: String,
    },

    /// The object to create is already present remotely and must be imported
    #[error(
        "A resource with the ID {id:?} already exists - to be managed via Terraform this resource needs to be imported into the State. Please see the resource documentation for {resource_type:?} for more information."
    )]
    AlreadyExists { resource_type: String, id: String },

    /// Malformed input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Errors returned by the directory APIs
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The API answered with data the provider cannot use
    #[error("Bad API response: {message}")]
    BadApiResponse { message: String },

    /// Provider configuration problems
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// No handler is registered for the resource or data source type
    #[error("Unsupported resource type: {0}")]
    UnsupportedResourceType(String),

    /// An error wrapped with a summary of the operation that failed
    #[error("{summary}: {source}")]
    Context {
        summary: String,
        #[source]
        source: Box<ProviderError>,
    },

    /// An error attributed to a configuration attribute
    #[error("{source}")]
    Attribute {
        attribute: String,
        #[source]
        source: Box<ProviderError>,
    },

    /// Create failed after the remote object was created
    #[error("{source}")]
    Tainted {
        state: Box<ResourceState>,
        #[source]
        source: Box<ProviderError>,
    },
}

/// Validation errors for configuration values and identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("expected {attribute:?} to be a valid UUID, got {value:?}")]
    InvalidUuid { attribute: String, value: String },

    #[error("{attribute:?} must not be empty")]
    EmptyString { attribute: String },

    #[error("the argument {attribute:?} is required, but no definition was found")]
    MissingRequired { attribute: String },

    #[error("{attribute:?}: conflicts with {other:?}")]
    Conflicting { attribute: String, other: String },

    #[error("exactly one of {attributes:?} must be specified")]
    ExactlyOneOf { attributes: Vec<String> },

    #[error("{attribute:?} has invalid type, expected {expected}")]
    InvalidType { attribute: String, expected: String },

    #[error("expected {attribute:?} to be one of {allowed:?}, got {value:?}")]
    InvalidValue {
        attribute: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("{attribute:?} is not a valid RFC3339 date: {value:?}")]
    InvalidDate { attribute: String, value: String },

    #[error("{attribute:?} is not a valid duration: {value:?}")]
    InvalidDuration { attribute: String, value: String },

    #[error("could not decode {attribute:?}: {details}")]
    InvalidEncoding { attribute: String, details: String },

    #[error("unsupported argument {attribute:?}")]
    UnknownAttribute { attribute: String },

    #[error("{attribute:?} is computed and cannot be configured")]
    ComputedAttribute { attribute: String },

    #[error("invalid ID {id:?}: {reason}")]
    InvalidId { id: String, reason: String },

    #[error("{message}")]
    Custom { attribute: String, message: String },
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// User facing rendition of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: Option<String>,
    pub attribute: Option<String>,
}

impl ProviderError {
    /// Create a not found error
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create a bad API response error
    pub fn bad_response(message: impl Into<String>) -> Self {
        Self::BadApiResponse {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap the error with a summary of the failed operation.
    pub fn context(self, summary: impl Into<String>) -> Self {
        Self::Context {
            summary: summary.into(),
            source: Box::new(self),
        }
    }

    /// Attribute the error to a configuration attribute.
    pub fn at(self, attribute: impl Into<String>) -> Self {
        Self::Attribute {
            attribute: attribute.into(),
            source: Box::new(self),
        }
    }

    /// Keep `state` alongside an error raised after the remote object was created.
    pub fn tainted(state: ResourceState, source: ProviderError) -> Self {
        Self::Tainted {
            state: Box::new(state),
            source: Box::new(source),
        }
    }

    /// The partial state of a resource whose create failed half way.
    pub fn tainted_state(&self) -> Option<&ResourceState> {
        match self {
            Self::Tainted { state, .. } => Some(&**state),
            _ => None,
        }
    }

    /// The innermost error, skipping context and attribute wrappers.
    pub fn root(&self) -> &ProviderError {
        match self {
            Self::Context { source, .. }
            | Self::Attribute { source, .. }
            | Self::Tainted { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the remote object (or a filter match) was absent.
    pub fn is_not_found(&self) -> bool {
        match self.root() {
            Self::NotFound { .. } | Self::NoMatch { .. } => true,
            Self::Api(api) => api.is_not_found(),
            _ => false,
        }
    }

    /// Whether the error reports a conflict with existing remote state.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self.root(),
            Self::DuplicateName { .. } | Self::AlreadyExists { .. }
        )
    }

    /// Whether the error reports malformed input.
    pub fn is_validation(&self) -> bool {
        matches!(self.root(), Self::Validation(_))
    }

    /// The attribute the error is attributed to, if any.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::Attribute { attribute, .. } => Some(attribute),
            Self::Context { source, .. } | Self::Tainted { source, .. } => source.attribute(),
            Self::Validation(e) => e.attribute(),
            _ => None,
        }
    }

    /// Render the error as a diagnostic.
    pub fn diagnostic(&self) -> Diagnostic {
        let (summary, detail) = match self {
            Self::Context { summary, source } => (summary.clone(), Some(source.to_string())),
            Self::Attribute { source, .. } | Self::Tainted { source, .. } => {
                let inner = source.diagnostic();
                (inner.summary, inner.detail)
            }
            other => (other.to_string(), None),
        };

        Diagnostic {
            severity: Severity::Error,
            summary,
            detail,
            attribute: self.attribute().map(str::to_string),
        }
    }
}

impl ValidationError {
    /// Create a custom validation error attributed to `attribute`
    pub fn custom(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Custom {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Create a missing required attribute error
    pub fn missing_required(attribute: impl Into<String>) -> Self {
        Self::MissingRequired {
            attribute: attribute.into(),
        }
    }

    /// The attribute the error refers to, if any.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::InvalidUuid { attribute, .. }
            | Self::EmptyString { attribute }
            | Self::MissingRequired { attribute }
            | Self::Conflicting { attribute, .. }
            | Self::InvalidType { attribute, .. }
            | Self::InvalidValue { attribute, .. }
            | Self::InvalidDate { attribute, .. }
            | Self::InvalidDuration { attribute, .. }
            | Self::InvalidEncoding { attribute, .. }
            | Self::UnknownAttribute { attribute }
            | Self::ComputedAttribute { attribute }
            | Self::Custom { attribute, .. } => Some(attribute),
            Self::ExactlyOneOf { .. } | Self::InvalidId { .. } => None,
        }
    }
}

/// Adds context to fallible operations in handler code.
pub trait ErrorContext<T> {
    /// Wrap any error with a summary.
    fn context(self, summary: impl Into<String>) -> ProviderResult<T>;

    /// Wrap any error with a lazily built summary.
    fn with_context<F, S>(self, f: F) -> ProviderResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;

    /// Attribute any error to a configuration attribute.
    fn at(self, attribute: &str) -> ProviderResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: Into<ProviderError>,
{
    fn context(self, summary: impl Into<String>) -> ProviderResult<T> {
        self.map_err(|e| e.into().context(summary))
    }

    fn with_context<F, S>(self, f: F) -> ProviderResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.into().context(f()))
    }

    fn at(self, attribute: &str) -> ProviderResult<T> {
        self.map_err(|e| e.into().at(attribute))
    }
}

// Result type aliases for convenience
pub type ProviderResult<T> = Result<T, ProviderError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
