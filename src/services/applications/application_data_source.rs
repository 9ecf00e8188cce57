use super::application_resource::set_application_attributes;
use crate::clients::Client;
use crate::error::{ErrorContext, ProviderError, ProviderResult};
use crate::helpers::{flatten, odata_eq};
use crate::models::Application;
use crate::provider::DataSourceHandler;
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::state::ResourceData;
use async_trait::async_trait;

const LOOKUP: &[&str] = &["object_id", "application_id", "display_name", "name"];

/// Looks up an application by object id, application id or display name.
pub struct ApplicationDataSource;

fn lookup_attribute(name: &'static str, validator: Validator) -> Attribute {
    Attribute::optional_string(name)
        .computed()
        .with_validator(validator)
        .exactly_one_of(LOOKUP)
}

/// Find the single application whose `field` equals `value`.
async fn find_one(
    client: &Client,
    attribute: &str,
    field: &str,
    value: &str,
) -> ProviderResult<Application> {
    let filter = odata_eq(field, value);
    let mut apps = client
        .applications
        .list(Some(&filter))
        .await
        .with_context(|| format!("Listing applications for filter {filter:?}"))
        .at(attribute)?;

    let app = match apps.len() {
        0 => {
            return Err(ProviderError::NoMatch {
                kind: "applications".to_string(),
                filter,
            }
            .context("Application not found")
            .at(attribute));
        }
        1 => apps.remove(0),
        _ => {
            return Err(ProviderError::MultipleMatches {
                kind: "applications".to_string(),
                filter,
            }
            .context("Multiple applications found")
            .at(attribute));
        }
    };

    let actual = match field {
        "appId" => app.app_id.as_deref(),
        _ => app.display_name.as_deref(),
    };
    if actual != Some(value) {
        return Err(ProviderError::bad_response(format!(
            "Application returned with {field} {actual:?} does not match specified {attribute} {value:?}"
        ))
        .context("Bad API Response")
        .at(attribute));
    }

    Ok(app)
}

#[async_trait]
impl DataSourceHandler for ApplicationDataSource {
    fn type_name(&self) -> &'static str {
        "azuread_application"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(lookup_attribute("object_id", Validator::Uuid))
            .with(lookup_attribute("application_id", Validator::Uuid))
            .with(lookup_attribute("display_name", Validator::NoEmptyStrings))
            .with(lookup_attribute("name", Validator::NoEmptyStrings))
            .with(Attribute::computed_string("homepage"))
            .with(Attribute::computed_only("identifier_uris", AttributeType::StringList))
            .with(Attribute::computed_only("reply_urls", AttributeType::StringSet))
            .with(Attribute::computed_string("logout_url"))
            .with(Attribute::computed_only("available_to_other_tenants", AttributeType::Bool))
            .with(Attribute::computed_only("oauth2_allow_implicit_flow", AttributeType::Bool))
            .with(Attribute::computed_string("group_membership_claims"))
            .with(Attribute::computed_string("type"))
            .with(Attribute::computed_block("required_resource_access"))
            .with(Attribute::computed_block("optional_claims"))
            .with(Attribute::computed_block("app_roles"))
            .with(Attribute::computed_block("oauth2_permissions"))
            .with(Attribute::computed_only("owners", AttributeType::StringSet))
    }

    async fn read(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let app = if let Some(object_id) = data.get_string("object_id") {
            client
                .applications
                .get(&object_id)
                .await
                .with_context(|| format!("Retrieving application with object ID {object_id:?}"))
                .at("object_id")?
                .ok_or_else(|| {
                    ProviderError::not_found("Application", &object_id)
                        .context("Application not found")
                        .at("object_id")
                })?
        } else if let Some(application_id) = data.get_string("application_id") {
            find_one(client, "application_id", "appId", &application_id).await?
        } else if let Some(display_name) = data.get_string("display_name") {
            find_one(client, "display_name", "displayName", &display_name).await?
        } else {
            let name = data.get_string("name").unwrap_or_default();
            find_one(client, "name", "displayName", &name).await?
        };

        let id = app.id.clone().ok_or_else(|| {
            ProviderError::bad_response("Object ID returned for application is nil")
                .context("Bad API Response")
        })?;

        data.set_id(id.clone());
        set_application_attributes(data, &app);
        data.set_opt("name", app.display_name.clone());
        data.set("optional_claims", flatten::optional_claims(app.optional_claims.as_ref()));

        let owners = client
            .applications
            .owner_ids(&id)
            .await
            .with_context(|| format!("Retrieving owners for application with object ID {id:?}"))
            .at("owners")?;
        data.set_string_set("owners", owners);

        Ok(())
    }
}
