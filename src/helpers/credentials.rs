//! Building credentials from resource configuration.
//!
//! Errors are [`ValidationError`]s naming the attribute at fault so that
//! diagnostics point at the right line of configuration.

use crate::error::{ValidationError, ValidationResult};
use crate::helpers::duration::parse_duration;
use crate::models::{KeyCredential, PasswordCredential};
use crate::state::ResourceData;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};

pub const CERTIFICATE_TYPES: &[&str] = &["AsymmetricX509Cert", "Symmetric"];
pub const CERTIFICATE_ENCODINGS: &[&str] = &["pem", "base64", "hex"];

/// Build a key credential from an `*_certificate` resource.
pub fn key_credential_for_resource(data: &ResourceData) -> ValidationResult<KeyCredential> {
    let key_id = key_id_for_resource(data);

    let value = data
        .get_string("value")
        .ok_or_else(|| ValidationError::missing_required("value"))?;
    let encoding = data.get_string("encoding").unwrap_or_else(|| "pem".to_string());
    let key = encode_certificate(&value, &encoding)?;

    let key_type = data
        .get_string("type")
        .unwrap_or_else(|| "AsymmetricX509Cert".to_string());

    let (start, end) = validity_window(data)?;

    Ok(KeyCredential {
        key_id: Some(key_id),
        key_type: Some(key_type),
        usage: Some("Verify".to_string()),
        key: Some(key),
        start_date_time: Some(start),
        end_date_time: Some(end),
        ..Default::default()
    })
}

/// Build a password credential from an `*_password` resource.
pub fn password_credential_for_resource(
    data: &ResourceData,
) -> ValidationResult<PasswordCredential> {
    let key_id = key_id_for_resource(data);

    let value = data
        .get_string("value")
        .ok_or_else(|| ValidationError::missing_required("value"))?;

    let (start, end) = validity_window(data)?;

    Ok(PasswordCredential {
        key_id: Some(key_id),
        display_name: data.get_string("description"),
        secret_text: Some(value),
        start_date_time: Some(start),
        end_date_time: Some(end),
        ..Default::default()
    })
}

fn key_id_for_resource(data: &ResourceData) -> String {
    data.get_string("key_id")
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn validity_window(data: &ResourceData) -> ValidationResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = match data.get_string("start_date") {
        Some(v) => parse_date("start_date", &v)?,
        None => Utc::now(),
    };

    let end = if let Some(v) = data.get_string("end_date") {
        parse_date("end_date", &v)?
    } else if let Some(v) = data.get_string("end_date_relative") {
        let duration = parse_duration("end_date_relative", &v)?;
        start
            .checked_add_signed(duration)
            .ok_or_else(|| ValidationError::InvalidDuration {
                attribute: "end_date_relative".to_string(),
                value: v.clone(),
            })?
    } else {
        return Err(ValidationError::custom(
            "end_date",
            "One of `end_date` or `end_date_relative` must be specified",
        ));
    };

    if end <= start {
        return Err(ValidationError::custom(
            "end_date",
            "`end_date` must be later than `start_date`",
        ));
    }

    Ok((start, end))
}

fn parse_date(attribute: &str, value: &str) -> ValidationResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidDate {
            attribute: attribute.to_string(),
            value: value.to_string(),
        })
}

/// Normalize certificate material to base64 according to its encoding.
pub fn encode_certificate(value: &str, encoding: &str) -> ValidationResult<String> {
    let invalid = |details: String| ValidationError::InvalidEncoding {
        attribute: "value".to_string(),
        details,
    };

    match encoding {
        "pem" => {
            let body: String = value
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with("-----"))
                .collect();
            if body.is_empty() {
                return Err(invalid("no PEM block found".to_string()));
            }
            STANDARD
                .decode(&body)
                .map_err(|e| invalid(format!("PEM body is not valid base64: {e}")))?;
            Ok(body)
        }
        "base64" => {
            let trimmed = value.trim();
            STANDARD
                .decode(trimmed)
                .map_err(|e| invalid(format!("value is not valid base64: {e}")))?;
            Ok(trimmed.to_string())
        }
        "hex" => {
            let bytes = hex::decode(value.trim())
                .map_err(|e| invalid(format!("value is not valid hex: {e}")))?;
            Ok(STANDARD.encode(bytes))
        }
        other => Err(ValidationError::InvalidValue {
            attribute: "encoding".to_string(),
            value: other.to_string(),
            allowed: CERTIFICATE_ENCODINGS.iter().map(|s| s.to_string()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    const PEM: &str = "-----BEGIN CERTIFICATE-----\nTUlJQ3Rlc3Q=\n-----END CERTIFICATE-----\n";

    fn data(value: Value) -> ResourceData {
        ResourceData::from_state(None, value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_pem_certificate_with_relative_end_date() {
        let cred = key_credential_for_resource(&data(json!({
            "value": PEM,
            "start_date": "2030-01-01T00:00:00Z",
            "end_date_relative": "240h"
        })))
        .unwrap();

        assert_eq!(cred.key.as_deref(), Some("TUlJQ3Rlc3Q="));
        assert_eq!(cred.key_type.as_deref(), Some("AsymmetricX509Cert"));
        assert_eq!(
            cred.end_date_time.unwrap().to_rfc3339(),
            "2030-01-11T00:00:00+00:00"
        );
        assert!(uuid::Uuid::parse_str(cred.key_id.as_deref().unwrap()).is_ok());
    }

    #[test]
    fn test_hex_certificate_is_base64_encoded() {
        let cred = key_credential_for_resource(&data(json!({
            "value": "68656c6c6f",
            "encoding": "hex",
            "end_date": "2099-01-01T00:00:00Z"
        })))
        .unwrap();
        assert_eq!(cred.key.as_deref(), Some("aGVsbG8="));
    }

    #[test]
    fn test_explicit_key_id_is_kept() {
        let cred = key_credential_for_resource(&data(json!({
            "value": "aGVsbG8=",
            "encoding": "base64",
            "key_id": "00000000-0000-0000-0000-0000000000aa",
            "end_date": "2099-01-01T00:00:00Z"
        })))
        .unwrap();
        assert_eq!(
            cred.key_id.as_deref(),
            Some("00000000-0000-0000-0000-0000000000aa")
        );
    }

    #[test]
    fn test_missing_end_date_is_attributed() {
        let err = key_credential_for_resource(&data(json!({"value": PEM}))).unwrap_err();
        assert_eq!(err.attribute(), Some("end_date"));
    }

    #[test]
    fn test_bad_encodings() {
        assert!(encode_certificate("zz", "hex").is_err());
        assert!(encode_certificate("not base64!", "base64").is_err());
        assert!(encode_certificate("-----BEGIN-----\n-----END-----", "pem").is_err());
        assert!(encode_certificate("abc", "der").is_err());
    }

    #[test]
    fn test_password_credential() {
        let cred = password_credential_for_resource(&data(json!({
            "value": "s3cr3t",
            "description": "ci",
            "end_date": "2099-01-01T00:00:00Z"
        })))
        .unwrap();
        assert_eq!(cred.secret_text.as_deref(), Some("s3cr3t"));
        assert_eq!(cred.display_name.as_deref(), Some("ci"));
    }
}
