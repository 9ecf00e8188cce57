use crate::clients::Client;
use crate::error::{ErrorContext, ProviderError, ProviderResult, ValidationError};
use crate::helpers::flatten;
use crate::ids::validate_uuid;
use crate::models::ServicePrincipal;
use crate::provider::ResourceHandler;
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;
use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value, json};

pub const SERVICE_PRINCIPAL_RESOURCE_NAME: &str = "azuread_service_principal";

/// Service principals instantiating an application in the tenant.
pub struct ServicePrincipalResource;

/// Write the attributes shared by the resource and the data source.
pub(crate) fn set_service_principal_attributes(data: &mut ResourceData, sp: &ServicePrincipal) {
    data.set_opt("object_id", sp.id.clone());
    data.set_opt("application_id", sp.app_id.clone());
    data.set_opt("display_name", sp.display_name.clone());
    data.set("app_roles", flatten::app_roles(sp.app_roles.as_deref()));
    data.set(
        "oauth2_permissions",
        flatten::oauth2_permissions(sp.oauth2_permission_scopes.as_deref()),
    );
}

#[async_trait]
impl ResourceHandler for ServicePrincipalResource {
    fn type_name(&self) -> &'static str {
        SERVICE_PRINCIPAL_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(
                Attribute::required_string("application_id")
                    .force_new()
                    .with_validator(Validator::Uuid),
            )
            .with(Attribute::optional_bool("app_role_assignment_required").with_default(json!(false)))
            .with(Attribute::optional_string_set("tags"))
            .with(Attribute::computed_string("object_id"))
            .with(Attribute::computed_string("display_name"))
            .with(Attribute::computed_block("app_roles"))
            .with(Attribute::computed_block("oauth2_permissions"))
    }

    async fn create(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let application_id = data
            .get_string("application_id")
            .ok_or_else(|| ValidationError::missing_required("application_id"))?;

        let properties = ServicePrincipal {
            app_id: Some(application_id.clone()),
            account_enabled: Some(true),
            app_role_assignment_required: Some(data.get_bool("app_role_assignment_required")),
            tags: Some(data.get_string_set("tags").into_iter().collect()),
            ..Default::default()
        };

        let sp = client
            .service_principals
            .create(&properties)
            .await
            .with_context(|| {
                format!("Creating service principal for application {application_id:?}")
            })?;
        let id = sp.id.ok_or_else(|| {
            ProviderError::bad_response("Object ID returned for service principal is nil")
        })?;
        data.set_id(id);

        self.read(client, data).await
    }

    async fn read(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let Some(id) = data.id().map(str::to_string) else {
            return Ok(());
        };

        let Some(sp) = client
            .service_principals
            .get(&id)
            .await
            .with_context(|| format!("Retrieving service principal with object ID {id:?}"))?
        else {
            debug!("Service principal with ID {id:?} was not found - removing from state!");
            data.clear_id();
            return Ok(());
        };

        set_service_principal_attributes(data, &sp);
        data.set(
            "app_role_assignment_required",
            sp.app_role_assignment_required.unwrap_or(false),
        );
        data.set_string_set("tags", sp.tags.unwrap_or_default());

        Ok(())
    }

    async fn update(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let id = data.id().map(str::to_string).ok_or_else(|| {
            ProviderError::bad_response("updating a service principal without an ID")
        })?;

        let mut patch = Map::new();
        if data.has_change("app_role_assignment_required") {
            patch.insert(
                "appRoleAssignmentRequired".to_string(),
                Value::from(data.get_bool("app_role_assignment_required")),
            );
        }
        if data.has_change("tags") {
            patch.insert("tags".to_string(), json!(data.get_string_set("tags")));
        }

        if !patch.is_empty() {
            client
                .service_principals
                .update(&id, &patch)
                .await
                .with_context(|| format!("Updating service principal with object ID {id:?}"))?;
        }

        self.read(client, data).await
    }

    async fn delete(&self, client: &Client, data: &ResourceData) -> ProviderResult<()> {
        let Some(id) = data.id() else {
            return Ok(());
        };

        let deleted = client
            .service_principals
            .delete(id)
            .await
            .with_context(|| format!("Deleting service principal with object ID {id:?}"))?;
        if !deleted {
            debug!("Service principal with ID {id:?} was already gone");
        }
        Ok(())
    }

    fn validate_import_id(&self, id: &str) -> ProviderResult<()> {
        Ok(validate_uuid("id", id)?)
    }
}
