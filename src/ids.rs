//! Identifier value objects.
//!
//! Directory objects are addressed by UUID object IDs. Credentials live inside a
//! list-valued field of their parent object and are addressed by a composite ID
//! of the form `{parentObjectId}/{credentialKind}/{keyId}`.
//!
//! ```rust
//! use azuread_provider::ids::{CredentialId, CredentialKind};
//!
//! let id: CredentialId = "00000000-0000-0000-0000-000000000001/certificate/00000000-0000-0000-0000-000000000002"
//!     .parse()
//!     .unwrap();
//! assert_eq!(id.kind, CredentialKind::Certificate);
//! assert_eq!(id.to_string().parse::<CredentialId>().unwrap(), id);
//! ```

use crate::error::{ValidationError, ValidationResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Validate that `value` is a UUID, attributing failures to `attribute`.
pub fn validate_uuid(attribute: &str, value: &str) -> ValidationResult<()> {
    Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidUuid {
            attribute: attribute.to_string(),
            value: value.to_string(),
        })
}

/// A validated directory object ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Create a new ObjectId, rejecting anything that is not a UUID.
    pub fn new(value: impl Into<String>) -> ValidationResult<Self> {
        let value = value.into();
        Uuid::parse_str(&value).map_err(|_| ValidationError::InvalidId {
            id: value.clone(),
            reason: "object ID must be a UUID".to_string(),
        })?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ObjectId {
    type Error = ValidationError;

    fn try_from(value: &str) -> ValidationResult<Self> {
        Self::new(value)
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

/// The kind of credential a composite ID refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Certificate,
    Password,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Certificate => "certificate",
            Self::Password => "password",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        match s {
            "certificate" => Ok(Self::Certificate),
            "password" => Ok(Self::Password),
            other => Err(ValidationError::InvalidId {
                id: other.to_string(),
                reason: "credential kind must be \"certificate\" or \"password\"".to_string(),
            }),
        }
    }
}

/// Composite ID of a credential held by a parent directory object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialId {
    pub object_id: String,
    pub kind: CredentialKind,
    pub key_id: String,
}

impl CredentialId {
    pub fn new(
        object_id: impl Into<String>,
        kind: CredentialKind,
        key_id: impl Into<String>,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            kind,
            key_id: key_id.into(),
        }
    }

    /// Parse a composite ID, checking that it refers to `expected` credentials.
    pub fn parse_kind(id: &str, expected: CredentialKind) -> ValidationResult<Self> {
        let parsed: Self = id.parse()?;
        if parsed.kind != expected {
            return Err(ValidationError::InvalidId {
                id: id.to_string(),
                reason: format!(
                    "wrong credential kind, expected {:?} but got {:?}",
                    expected.as_str(),
                    parsed.kind.as_str()
                ),
            });
        }
        Ok(parsed)
    }

    /// Parse the ID of a certificate credential.
    pub fn certificate_id(id: &str) -> ValidationResult<Self> {
        Self::parse_kind(id, CredentialKind::Certificate)
    }

    /// Parse the ID of a password credential.
    pub fn password_id(id: &str) -> ValidationResult<Self> {
        Self::parse_kind(id, CredentialKind::Password)
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.object_id, self.kind, self.key_id)
    }
}

impl FromStr for CredentialId {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        let invalid = |reason: &str| ValidationError::InvalidId {
            id: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 3 {
            return Err(invalid(
                "expected {objectId}/{credentialKind}/{keyId} with exactly 3 segments",
            ));
        }

        if Uuid::parse_str(parts[0]).is_err() {
            return Err(invalid("object ID segment is not a UUID"));
        }
        let kind = parts[1]
            .parse::<CredentialKind>()
            .map_err(|_| invalid("unknown credential kind segment"))?;
        if Uuid::parse_str(parts[2]).is_err() {
            return Err(invalid("key ID segment is not a UUID"));
        }

        Ok(Self::new(parts[0], kind, parts[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJECT: &str = "11111111-2222-3333-4444-555555555555";
    const KEY: &str = "66666666-7777-8888-9999-000000000000";

    #[test]
    fn test_format_and_parse() {
        let id = CredentialId::new(OBJECT, CredentialKind::Password, KEY);
        let formatted = id.to_string();
        assert_eq!(formatted, format!("{OBJECT}/password/{KEY}"));
        assert_eq!(formatted.parse::<CredentialId>().unwrap(), id);
    }

    #[test]
    fn test_rejects_wrong_segment_count() {
        assert!(format!("{OBJECT}/certificate").parse::<CredentialId>().is_err());
        assert!(
            format!("{OBJECT}/certificate/{KEY}/extra")
                .parse::<CredentialId>()
                .is_err()
        );
    }

    #[test]
    fn test_rejects_non_uuid_segments() {
        assert!(format!("nope/certificate/{KEY}").parse::<CredentialId>().is_err());
        assert!(format!("{OBJECT}/certificate/nope").parse::<CredentialId>().is_err());
        assert!(format!("{OBJECT}/secret/{KEY}").parse::<CredentialId>().is_err());
    }

    #[test]
    fn test_parse_kind_enforces_kind() {
        let id = format!("{OBJECT}/password/{KEY}");
        assert!(CredentialId::password_id(&id).is_ok());
        let err = CredentialId::certificate_id(&id).unwrap_err();
        assert!(err.to_string().contains("wrong credential kind"));
    }

    #[test]
    fn test_object_id_validation() {
        assert!(ObjectId::new(OBJECT).is_ok());
        assert!(ObjectId::new("not-a-uuid").is_err());
        assert!(validate_uuid("object_id", "").is_err());
    }
}
