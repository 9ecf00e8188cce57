use super::service_principal_resource::set_service_principal_attributes;
use crate::clients::Client;
use crate::error::{ErrorContext, ProviderError, ProviderResult};
use crate::helpers::odata_eq;
use crate::provider::DataSourceHandler;
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;
use async_trait::async_trait;

const LOOKUP: &[&str] = &["object_id", "display_name", "application_id"];

/// Looks up a service principal by object id, display name or application id.
pub struct ServicePrincipalDataSource;

#[async_trait]
impl DataSourceHandler for ServicePrincipalDataSource {
    fn type_name(&self) -> &'static str {
        "azuread_service_principal"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(
                Attribute::optional_string("object_id")
                    .computed()
                    .with_validator(Validator::Uuid)
                    .exactly_one_of(LOOKUP),
            )
            .with(
                Attribute::optional_string("display_name")
                    .computed()
                    .with_validator(Validator::NoEmptyStrings)
                    .exactly_one_of(LOOKUP),
            )
            .with(
                Attribute::optional_string("application_id")
                    .computed()
                    .with_validator(Validator::Uuid)
                    .exactly_one_of(LOOKUP),
            )
            .with(Attribute::computed_block("app_roles"))
            .with(Attribute::computed_block("oauth2_permissions"))
    }

    async fn read(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let sp = if let Some(object_id) = data.get_string("object_id") {
            client
                .service_principals
                .get(&object_id)
                .await
                .with_context(|| {
                    format!("Retrieving service principal with object ID {object_id:?}")
                })
                .at("object_id")?
                .ok_or_else(|| {
                    ProviderError::not_found("Service principal", &object_id)
                        .context("Service principal not found")
                        .at("object_id")
                })?
        } else {
            let (attribute, field) = if data.is_set("display_name") {
                ("display_name", "displayName")
            } else {
                ("application_id", "appId")
            };
            let value = data.get_string(attribute).unwrap_or_default();
            let filter = odata_eq(field, &value);

            let principals = client
                .service_principals
                .list(Some(&filter))
                .await
                .with_context(|| format!("Listing service principals for filter {filter:?}"))?;

            principals
                .into_iter()
                .find(|sp| {
                    let actual = match field {
                        "appId" => sp.app_id.as_deref(),
                        _ => sp.display_name.as_deref(),
                    };
                    actual == Some(value.as_str())
                })
                .ok_or_else(|| {
                    ProviderError::NoMatch {
                        kind: "service principals".to_string(),
                        filter,
                    }
                    .context("Service principal not found")
                    .at(attribute)
                })?
        };

        let id = sp.id.clone().ok_or_else(|| {
            ProviderError::bad_response("Object ID returned for service principal is nil")
        })?;

        data.set_id(id);
        set_service_principal_attributes(data, &sp);

        Ok(())
    }
}
