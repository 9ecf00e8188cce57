use super::credentials::{self, ApplicationCredential, format_date};
use crate::clients::Client;
use crate::error::{ProviderResult, ValidationResult};
use crate::helpers::credentials::{CERTIFICATE_ENCODINGS, CERTIFICATE_TYPES};
use crate::helpers::key_credential_for_resource;
use crate::ids::{CredentialId, CredentialKind};
use crate::models::{Application, KeyCredential};
use crate::provider::ResourceHandler;
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;
use async_trait::async_trait;
use serde_json::json;

pub const APPLICATION_CERTIFICATE_RESOURCE_NAME: &str = "azuread_application_certificate";

/// Certificates attached to an application's `keyCredentials`.
pub struct ApplicationCertificateResource;

impl ApplicationCredential for ApplicationCertificateResource {
    type Credential = KeyCredential;

    const KIND: CredentialKind = CredentialKind::Certificate;
    const RESOURCE_TYPE: &'static str = APPLICATION_CERTIFICATE_RESOURCE_NAME;

    fn build(data: &ResourceData) -> ValidationResult<KeyCredential> {
        key_credential_for_resource(data)
    }

    fn key_id(credential: &KeyCredential) -> Option<&str> {
        credential.key_id.as_deref()
    }

    fn credentials(app: Application) -> Vec<KeyCredential> {
        app.key_credentials.unwrap_or_default()
    }

    fn patch(credentials: Vec<KeyCredential>) -> Application {
        Application {
            key_credentials: Some(credentials),
            ..Default::default()
        }
    }

    fn flatten(data: &mut ResourceData, credential: &KeyCredential) {
        data.set_opt("type", credential.key_type.clone());
        data.set_opt("start_date", credential.start_date_time.as_ref().map(format_date));
        data.set_opt("end_date", credential.end_date_time.as_ref().map(format_date));
    }
}

/// Schema shared by both credential resources.
pub(super) fn credential_schema() -> Schema {
    Schema::new()
        .with(
            Attribute::required_string("application_object_id")
                .force_new()
                .with_validator(Validator::Uuid),
        )
        .with(
            Attribute::optional_string("key_id")
                .computed()
                .force_new()
                .with_validator(Validator::Uuid),
        )
        .with(
            Attribute::required_string("value")
                .force_new()
                .sensitive(),
        )
        .with(
            Attribute::optional_string("start_date")
                .computed()
                .force_new()
                .with_validator(Validator::Rfc3339),
        )
        .with(
            Attribute::optional_string("end_date")
                .computed()
                .force_new()
                .with_validator(Validator::Rfc3339)
                .conflicts_with(&["end_date_relative"]),
        )
        .with(
            Attribute::optional_string("end_date_relative")
                .force_new()
                .with_validator(Validator::Duration)
                .conflicts_with(&["end_date"]),
        )
}

#[async_trait]
impl ResourceHandler for ApplicationCertificateResource {
    fn type_name(&self) -> &'static str {
        APPLICATION_CERTIFICATE_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        credential_schema()
            .with(
                Attribute::optional_string("type")
                    .computed()
                    .force_new()
                    .with_validator(Validator::OneOf(CERTIFICATE_TYPES)),
            )
            .with(
                Attribute::optional_string("encoding")
                    .force_new()
                    .with_default(json!("pem"))
                    .with_validator(Validator::OneOf(CERTIFICATE_ENCODINGS)),
            )
    }

    async fn create(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        credentials::create::<Self>(client, data).await
    }

    async fn read(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        credentials::read::<Self>(client, data).await
    }

    async fn update(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        credentials::read::<Self>(client, data).await
    }

    async fn delete(&self, client: &Client, data: &ResourceData) -> ProviderResult<()> {
        credentials::delete::<Self>(client, data).await
    }

    fn validate_import_id(&self, id: &str) -> ProviderResult<()> {
        CredentialId::certificate_id(id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_flatten_formats_dates() {
        let mut data = ResourceData::from_state(None, Default::default());
        let cred = KeyCredential {
            key_type: Some("AsymmetricX509Cert".to_string()),
            start_date_time: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };

        ApplicationCertificateResource::flatten(&mut data, &cred);
        assert_eq!(data.get_str("start_date"), Some("2030-01-01T00:00:00Z"));
        assert_eq!(data.get_str("type"), Some("AsymmetricX509Cert"));
        assert!(!data.is_set("end_date"));
    }

    #[test]
    fn test_end_dates_conflict() {
        let schema = ApplicationCertificateResource.schema();
        let config = json!({
            "application_object_id": "00000000-0000-0000-0000-000000000001",
            "value": "aGVsbG8=",
            "end_date": "2099-01-01T00:00:00Z",
            "end_date_relative": "240h"
        });
        assert!(schema.validate(config.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_import_id_must_be_a_certificate() {
        let resource = ApplicationCertificateResource;
        let object = "00000000-0000-0000-0000-000000000001";
        let key = "00000000-0000-0000-0000-000000000002";
        assert!(resource.validate_import_id(&format!("{object}/certificate/{key}")).is_ok());
        assert!(resource.validate_import_id(&format!("{object}/password/{key}")).is_err());
    }
}
