use crate::clients::Client;
use crate::error::{ErrorContext, ProviderError, ProviderResult, ValidationError};
use crate::helpers::{SetDiff, flatten};
use crate::ids::validate_uuid;
use crate::models::{Application, ApplicationWeb, ImplicitGrantSettings, SignInAudience};
use crate::provider::ResourceHandler;
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::state::ResourceData;
use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value, json};

pub const APPLICATION_RESOURCE_NAME: &str = "azuread_application";

const GROUP_MEMBERSHIP_CLAIMS: &[&str] =
    &["None", "SecurityGroup", "DirectoryRole", "ApplicationGroup", "All"];
const APPLICATION_TYPES: &[&str] = &["webapp/api", "native"];

/// Application registrations.
pub struct ApplicationResource;

/// Fail when an application named `name` already exists.
async fn ensure_unique_name(client: &Client, name: &str) -> ProviderResult<()> {
    let existing = client
        .applications
        .find_by_name(name)
        .await
        .with_context(|| format!("Checking for existing application with name {name:?}"))?;

    if let Some(app) = existing.into_iter().next() {
        return Err(ProviderError::DuplicateName {
            kind: "Application".to_string(),
            name: name.to_string(),
            object_id: app.id.unwrap_or_default(),
        }
        .at("display_name"));
    }
    Ok(())
}

fn sign_in_audience(data: &ResourceData) -> SignInAudience {
    if data.get_bool("available_to_other_tenants") {
        SignInAudience::AzureAdMultipleOrgs
    } else {
        SignInAudience::AzureAdMyOrg
    }
}

/// Write the attributes shared by the resource and the data source.
pub(crate) fn set_application_attributes(data: &mut ResourceData, app: &Application) {
    let web = app.web.clone().unwrap_or_default();

    data.set_opt("object_id", app.id.clone());
    data.set_opt("application_id", app.app_id.clone());
    data.set_opt("display_name", app.display_name.clone());
    data.set_opt("homepage", web.home_page_url);
    data.set_opt("logout_url", web.logout_url);
    data.set_string_set("reply_urls", web.redirect_uris.unwrap_or_default());
    data.set(
        "oauth2_allow_implicit_flow",
        web.implicit_grant_settings
            .and_then(|s| s.enable_access_token_issuance)
            .unwrap_or(false),
    );
    data.set_string_list("identifier_uris", app.identifier_uris.clone().unwrap_or_default());
    data.set(
        "available_to_other_tenants",
        app.sign_in_audience == Some(SignInAudience::AzureAdMultipleOrgs),
    );
    data.set_opt("group_membership_claims", app.group_membership_claims.clone());

    let app_type = if app.is_fallback_public_client == Some(true) {
        "native"
    } else {
        "webapp/api"
    };
    data.set("type", app_type);

    data.set(
        "required_resource_access",
        flatten::required_resource_access(app.required_resource_access.as_deref()),
    );
    data.set("app_roles", flatten::app_roles(app.app_roles.as_deref()));
    data.set(
        "oauth2_permissions",
        flatten::oauth2_permissions(
            app.api
                .as_ref()
                .and_then(|api| api.oauth2_permission_scopes.as_deref()),
        ),
    );
}

impl ApplicationResource {
    /// PATCH body holding only the changed attributes. Removed values are sent as null.
    fn patch(data: &ResourceData) -> Map<String, Value> {
        let string_or_null =
            |key: &str| data.get_string(key).map_or(Value::Null, Value::from);

        let mut patch = Map::new();
        if data.has_change("display_name") {
            patch.insert("displayName".to_string(), string_or_null("display_name"));
        }
        if data.has_change("identifier_uris") {
            patch.insert(
                "identifierUris".to_string(),
                json!(data.get_string_list("identifier_uris")),
            );
        }
        if data.has_change("group_membership_claims") {
            patch.insert(
                "groupMembershipClaims".to_string(),
                string_or_null("group_membership_claims"),
            );
        }
        if data.has_change("available_to_other_tenants") {
            patch.insert(
                "signInAudience".to_string(),
                Value::from(sign_in_audience(data).as_str()),
            );
        }
        if data.has_change("required_resource_access") {
            let access =
                flatten::expand_required_resource_access(data.get("required_resource_access"));
            patch.insert("requiredResourceAccess".to_string(), json!(access));
        }

        let mut web = Map::new();
        if data.has_change("homepage") {
            web.insert("homePageUrl".to_string(), string_or_null("homepage"));
        }
        if data.has_change("logout_url") {
            web.insert("logoutUrl".to_string(), string_or_null("logout_url"));
        }
        if data.has_change("reply_urls") {
            web.insert(
                "redirectUris".to_string(),
                json!(data.get_string_set("reply_urls")),
            );
        }
        if data.has_change("oauth2_allow_implicit_flow") {
            web.insert(
                "implicitGrantSettings".to_string(),
                json!({ "enableAccessTokenIssuance": data.get_bool("oauth2_allow_implicit_flow") }),
            );
        }
        if !web.is_empty() {
            patch.insert("web".to_string(), Value::Object(web));
        }

        patch
    }
}

#[async_trait]
impl ResourceHandler for ApplicationResource {
    fn type_name(&self) -> &'static str {
        APPLICATION_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(Attribute::required_string("display_name").with_validator(Validator::NoEmptyStrings))
            .with(Attribute::optional_string("homepage").computed())
            .with(Attribute::optional("identifier_uris", AttributeType::StringList).computed())
            .with(Attribute::optional_string_set("reply_urls").computed())
            .with(Attribute::optional_string("logout_url"))
            .with(Attribute::optional_bool("available_to_other_tenants").with_default(json!(false)))
            .with(Attribute::optional_bool("oauth2_allow_implicit_flow").with_default(json!(false)))
            .with(
                Attribute::optional_string("group_membership_claims")
                    .with_validator(Validator::OneOf(GROUP_MEMBERSHIP_CLAIMS)),
            )
            .with(
                Attribute::optional_string("type")
                    .force_new()
                    .with_default(json!("webapp/api"))
                    .with_validator(Validator::OneOf(APPLICATION_TYPES)),
            )
            .with(Attribute::optional("required_resource_access", AttributeType::Block))
            .with(
                Attribute::optional_string_set("owners")
                    .computed()
                    .with_validator(Validator::Uuid),
            )
            .with(Attribute::optional_bool("prevent_duplicate_names").with_default(json!(false)))
            .with(Attribute::computed_string("object_id"))
            .with(Attribute::computed_string("application_id"))
            .with(Attribute::computed_block("app_roles"))
            .with(Attribute::computed_block("oauth2_permissions"))
    }

    async fn create(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let name = data
            .get_string("display_name")
            .ok_or_else(|| ValidationError::missing_required("display_name"))?;

        if data.get_bool("prevent_duplicate_names") {
            ensure_unique_name(client, &name).await?;
        }

        let native = data.get_str("type") == Some("native");
        let properties = Application {
            display_name: Some(name.clone()),
            sign_in_audience: Some(sign_in_audience(data)),
            identifier_uris: Some(data.get_string_list("identifier_uris")),
            is_fallback_public_client: Some(native),
            group_membership_claims: data.get_string("group_membership_claims"),
            web: Some(ApplicationWeb {
                home_page_url: data.get_string("homepage"),
                logout_url: data.get_string("logout_url"),
                redirect_uris: Some(data.get_string_set("reply_urls").into_iter().collect()),
                implicit_grant_settings: Some(ImplicitGrantSettings {
                    enable_access_token_issuance: Some(data.get_bool("oauth2_allow_implicit_flow")),
                    ..Default::default()
                }),
            }),
            required_resource_access: Some(flatten::expand_required_resource_access(
                data.get("required_resource_access"),
            )),
            ..Default::default()
        };

        let app = client
            .applications
            .create(&properties)
            .await
            .with_context(|| format!("Creating application {name:?}"))?;
        let id = app.id.ok_or_else(|| {
            ProviderError::bad_response("Object ID returned for application is nil")
        })?;
        data.set_id(id.clone());

        let owners: Vec<String> = data.get_string_set("owners").into_iter().collect();
        if !owners.is_empty() {
            let _lock = client.locks.lock(APPLICATION_RESOURCE_NAME, &id).await;
            client
                .applications
                .add_owners(&id, &owners)
                .await
                .with_context(|| format!("Adding owners to application with object ID {id:?}"))?;
        }

        self.read(client, data).await
    }

    async fn read(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let Some(id) = data.id().map(str::to_string) else {
            return Ok(());
        };

        let Some(app) = client
            .applications
            .get(&id)
            .await
            .with_context(|| format!("Retrieving application with object ID {id:?}"))?
        else {
            debug!("Application with ID {id:?} was not found - removing from state!");
            data.clear_id();
            return Ok(());
        };

        set_application_attributes(data, &app);

        let owners = client
            .applications
            .owner_ids(&id)
            .await
            .with_context(|| format!("Retrieving owners for application with object ID {id:?}"))
            .at("owners")?;
        data.set_string_set("owners", owners);

        if !data.is_set("prevent_duplicate_names") {
            data.set("prevent_duplicate_names", false);
        }

        Ok(())
    }

    async fn update(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let id = data
            .id()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::bad_response("updating an application without an ID"))?;

        if data.has_change("display_name") && data.get_bool("prevent_duplicate_names") {
            if let Some(name) = data.get_string("display_name") {
                ensure_unique_name(client, &name).await?;
            }
        }

        let patch = Self::patch(data);
        if !patch.is_empty() {
            client
                .applications
                .update(&id, &patch)
                .await
                .with_context(|| format!("Updating application with object ID {id:?}"))?;
        }

        if data.has_change("owners") {
            let _lock = client.locks.lock(APPLICATION_RESOURCE_NAME, &id).await;
            let current = client
                .applications
                .owner_ids(&id)
                .await
                .with_context(|| format!("Retrieving owners for application with object ID {id:?}"))?;
            let diff = SetDiff::between(&current, &data.get_string_set("owners"));

            client
                .applications
                .add_owners(&id, &diff.to_add)
                .await
                .with_context(|| format!("Adding owners to application with object ID {id:?}"))?;
            client
                .applications
                .remove_owners(&id, &diff.to_remove)
                .await
                .with_context(|| format!("Removing owners from application with object ID {id:?}"))?;
        }

        self.read(client, data).await
    }

    async fn delete(&self, client: &Client, data: &ResourceData) -> ProviderResult<()> {
        let Some(id) = data.id() else {
            return Ok(());
        };

        let deleted = client
            .applications
            .delete(id)
            .await
            .with_context(|| format!("Deleting application with object ID {id:?}"))?;
        if !deleted {
            debug!("Application with ID {id:?} was already gone");
        }
        Ok(())
    }

    fn validate_import_id(&self, id: &str) -> ProviderResult<()> {
        Ok(validate_uuid("id", id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_contains_only_changes() {
        let schema = ApplicationResource.schema();
        let prior = json!({
            "display_name": "app",
            "homepage": "https://old",
            "reply_urls": ["https://a"],
            "type": "webapp/api",
            "prevent_duplicate_names": false
        });
        let config = json!({
            "display_name": "app",
            "homepage": "https://new",
            "logout_url": "https://logout"
        });

        let data = ResourceData::planned(
            &schema,
            Some("id".to_string()),
            prior.as_object().unwrap(),
            config.as_object().unwrap(),
        );
        let patch = ApplicationResource::patch(&data);

        assert_eq!(
            Value::Object(patch),
            json!({"web": {"homePageUrl": "https://new", "logoutUrl": "https://logout"}})
        );
    }

    #[test]
    fn test_unset_bools_do_not_patch() {
        let schema = ApplicationResource.schema();
        let prior = json!({"display_name": "app", "type": "webapp/api"});
        let config = json!({"display_name": "app"});

        let data = ResourceData::planned(
            &schema,
            Some("id".to_string()),
            prior.as_object().unwrap(),
            config.as_object().unwrap(),
        );
        assert!(ApplicationResource::patch(&data).is_empty());

        let config = json!({"display_name": "app", "available_to_other_tenants": true});
        let data = ResourceData::planned(
            &schema,
            Some("id".to_string()),
            prior.as_object().unwrap(),
            config.as_object().unwrap(),
        );
        let patch = ApplicationResource::patch(&data);
        assert_eq!(patch.get("signInAudience"), Some(&json!("AzureADMultipleOrgs")));
        assert!(patch.get("web").is_none());
    }

    #[test]
    fn test_removed_value_is_null() {
        let schema = ApplicationResource.schema();
        let prior = json!({"display_name": "app", "group_membership_claims": "All"});
        let config = json!({"display_name": "app"});

        let data = ResourceData::planned(
            &schema,
            Some("id".to_string()),
            prior.as_object().unwrap(),
            config.as_object().unwrap(),
        );
        let patch = ApplicationResource::patch(&data);
        assert_eq!(patch.get("groupMembershipClaims"), Some(&Value::Null));
    }
}
