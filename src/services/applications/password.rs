use super::certificate::credential_schema;
use super::credentials::{self, ApplicationCredential, format_date};
use crate::clients::Client;
use crate::error::{ProviderResult, ValidationResult};
use crate::helpers::password_credential_for_resource;
use crate::ids::{CredentialId, CredentialKind};
use crate::models::{Application, PasswordCredential};
use crate::provider::ResourceHandler;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;
use async_trait::async_trait;

pub const APPLICATION_PASSWORD_RESOURCE_NAME: &str = "azuread_application_password";

/// Client secrets attached to an application's `passwordCredentials`.
pub struct ApplicationPasswordResource;

impl ApplicationCredential for ApplicationPasswordResource {
    type Credential = PasswordCredential;

    const KIND: CredentialKind = CredentialKind::Password;
    const RESOURCE_TYPE: &'static str = APPLICATION_PASSWORD_RESOURCE_NAME;

    fn build(data: &ResourceData) -> ValidationResult<PasswordCredential> {
        password_credential_for_resource(data)
    }

    fn key_id(credential: &PasswordCredential) -> Option<&str> {
        credential.key_id.as_deref()
    }

    fn credentials(app: Application) -> Vec<PasswordCredential> {
        app.password_credentials.unwrap_or_default()
    }

    fn patch(credentials: Vec<PasswordCredential>) -> Application {
        Application {
            password_credentials: Some(credentials),
            ..Default::default()
        }
    }

    fn flatten(data: &mut ResourceData, credential: &PasswordCredential) {
        data.set_opt("description", credential.display_name.clone());
        data.set_opt("start_date", credential.start_date_time.as_ref().map(format_date));
        data.set_opt("end_date", credential.end_date_time.as_ref().map(format_date));
    }
}

#[async_trait]
impl ResourceHandler for ApplicationPasswordResource {
    fn type_name(&self) -> &'static str {
        APPLICATION_PASSWORD_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        credential_schema().with(Attribute::optional_string("description").computed().force_new())
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
        CredentialId::password_id(id)?;
        Ok(())
    }
}
