//! Conversions between nested API models and attribute blocks.

use crate::models::{
    AppRole, OptionalClaim, OptionalClaims, PermissionScope, RequiredResourceAccess,
    ResourceAccess,
};
use serde_json::{Map, Value, json};

pub fn app_roles(roles: Option<&[AppRole]>) -> Value {
    let roles = roles.unwrap_or_default();
    Value::Array(
        roles
            .iter()
            .map(|role| {
                json!({
                    "id": role.id,
                    "allowed_member_types": role.allowed_member_types.clone().unwrap_or_default(),
                    "description": role.description,
                    "display_name": role.display_name,
                    "is_enabled": role.is_enabled.unwrap_or(false),
                    "value": role.value,
                })
            })
            .collect(),
    )
}

pub fn oauth2_permissions(scopes: Option<&[PermissionScope]>) -> Value {
    let scopes = scopes.unwrap_or_default();
    Value::Array(
        scopes
            .iter()
            .map(|scope| {
                json!({
                    "id": scope.id,
                    "admin_consent_description": scope.admin_consent_description,
                    "admin_consent_display_name": scope.admin_consent_display_name,
                    "is_enabled": scope.is_enabled.unwrap_or(false),
                    "type": scope.scope_type,
                    "user_consent_description": scope.user_consent_description,
                    "user_consent_display_name": scope.user_consent_display_name,
                    "value": scope.value,
                })
            })
            .collect(),
    )
}

pub fn required_resource_access(access: Option<&[RequiredResourceAccess]>) -> Value {
    let access = access.unwrap_or_default();
    Value::Array(
        access
            .iter()
            .map(|rra| {
                let resource_access: Vec<Value> = rra
                    .resource_access
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|ra| json!({ "id": ra.id, "type": ra.access_type }))
                    .collect();
                json!({
                    "resource_app_id": rra.resource_app_id,
                    "resource_access": resource_access,
                })
            })
            .collect(),
    )
}

/// Build `requiredResourceAccess` from its attribute block.
pub fn expand_required_resource_access(value: Option<&Value>) -> Vec<RequiredResourceAccess> {
    let blocks = value.and_then(Value::as_array).cloned().unwrap_or_default();

    blocks
        .iter()
        .filter_map(Value::as_object)
        .map(|block| RequiredResourceAccess {
            resource_app_id: string_field(block, "resource_app_id"),
            resource_access: Some(
                block
                    .get("resource_access")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_object)
                            .map(|ra| ResourceAccess {
                                id: string_field(ra, "id"),
                                access_type: string_field(ra, "type"),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
        })
        .collect()
}

pub fn optional_claims(claims: Option<&OptionalClaims>) -> Value {
    let Some(claims) = claims else {
        return Value::Array(Vec::new());
    };

    let flatten = |list: &Option<Vec<OptionalClaim>>| -> Vec<Value> {
        list.as_deref()
            .unwrap_or_default()
            .iter()
            .map(|claim| {
                json!({
                    "name": claim.name,
                    "source": claim.source,
                    "essential": claim.essential.unwrap_or(false),
                    "additional_properties": claim.additional_properties.clone().unwrap_or_default(),
                })
            })
            .collect()
    };

    json!([{
        "access_token": flatten(&claims.access_token),
        "id_token": flatten(&claims.id_token),
    }])
}

fn string_field(block: &Map<String, Value>, key: &str) -> Option<String> {
    block
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
