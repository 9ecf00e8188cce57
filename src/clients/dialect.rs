//! Translation between the canonical payload shape and AAD Graph 1.6.
//!
//! Models inside the crate are shaped like Microsoft Graph v1.0 payloads.
//! When the provider is configured for the legacy AAD Graph API, request
//! bodies are translated to the older field names on the way out and
//! responses are translated back on the way in. Microsoft Graph payloads pass
//! through unchanged.

use super::graph::ApiVersion;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

/// Translate a canonical payload into the wire format of `version`.
pub fn to_wire(version: ApiVersion, collection: &str, value: Value) -> Value {
    match version {
        ApiVersion::MsGraph => value,
        ApiVersion::AadGraph => map_object(value, |obj| aad_out(collection, obj)),
    }
}

/// Translate a payload received from `version` into the canonical shape.
pub fn from_wire(version: ApiVersion, collection: &str, value: Value) -> Value {
    match version {
        ApiVersion::MsGraph => value,
        ApiVersion::AadGraph => map_object(value, |obj| aad_in(collection, obj)),
    }
}

fn map_object<F>(value: Value, f: F) -> Value
where
    F: FnOnce(&mut Map<String, Value>),
{
    match value {
        Value::Object(mut obj) => {
            f(&mut obj);
            Value::Object(obj)
        }
        other => other,
    }
}

fn rename(obj: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(v) = obj.remove(from) {
        obj.insert(to.to_string(), v);
    }
}

fn for_each_item<F>(obj: &mut Map<String, Value>, field: &str, mut f: F)
where
    F: FnMut(&mut Map<String, Value>),
{
    if let Some(Value::Array(items)) = obj.get_mut(field) {
        for item in items.iter_mut() {
            if let Value::Object(item) = item {
                f(item);
            }
        }
    }
}

fn aad_out(collection: &str, obj: &mut Map<String, Value>) {
    if collection == "domains" {
        rename(obj, "id", "name");
        return;
    }

    rename(obj, "id", "objectId");
    if let Some(Value::String(odata_type)) = obj.remove("@odata.type") {
        obj.insert("objectType".to_string(), Value::from(object_type_out(&odata_type)));
    }

    for_each_item(obj, "keyCredentials", |cred| {
        rename(cred, "startDateTime", "startDate");
        rename(cred, "endDateTime", "endDate");
        rename(cred, "key", "value");
        cred.remove("displayName");
    });

    for_each_item(obj, "passwordCredentials", |cred| {
        rename(cred, "startDateTime", "startDate");
        rename(cred, "endDateTime", "endDate");
        rename(cred, "secretText", "value");
        cred.remove("hint");
        if let Some(Value::String(name)) = cred.remove("displayName") {
            cred.insert(
                "customKeyIdentifier".to_string(),
                Value::from(STANDARD.encode(name)),
            );
        }
    });

    match collection {
        "applications" => application_out(obj),
        "servicePrincipals" => rename(obj, "oauth2PermissionScopes", "oauth2Permissions"),
        _ => {}
    }
}

fn aad_in(collection: &str, obj: &mut Map<String, Value>) {
    if collection == "domains" {
        rename(obj, "name", "id");
        return;
    }

    rename(obj, "objectId", "id");
    obj.remove("odata.type");
    if let Some(Value::String(object_type)) = obj.remove("objectType") {
        obj.insert("@odata.type".to_string(), Value::from(object_type_in(&object_type)));
    }

    for_each_item(obj, "keyCredentials", |cred| {
        rename(cred, "startDate", "startDateTime");
        rename(cred, "endDate", "endDateTime");
        rename(cred, "value", "key");
    });

    for_each_item(obj, "passwordCredentials", |cred| {
        rename(cred, "startDate", "startDateTime");
        rename(cred, "endDate", "endDateTime");
        rename(cred, "value", "secretText");
        if let Some(Value::String(encoded)) = cred.remove("customKeyIdentifier") {
            if let Some(name) = STANDARD
                .decode(&encoded)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
            {
                cred.insert("displayName".to_string(), Value::from(name));
            }
        }
    });

    match collection {
        "applications" => application_in(obj),
        "servicePrincipals" => rename(obj, "oauth2Permissions", "oauth2PermissionScopes"),
        _ => {}
    }
}

fn application_out(obj: &mut Map<String, Value>) {
    if let Some(Value::Object(mut web)) = obj.remove("web") {
        rename(&mut web, "homePageUrl", "homepage");
        rename(&mut web, "redirectUris", "replyUrls");
        if let Some(Value::Object(implicit)) = web.remove("implicitGrantSettings") {
            if let Some(v) = implicit.get("enableAccessTokenIssuance") {
                web.insert("oauth2AllowImplicitFlow".to_string(), v.clone());
            }
        }
        obj.extend(web);
    }

    if let Some(Value::String(audience)) = obj.remove("signInAudience") {
        obj.insert(
            "availableToOtherTenants".to_string(),
            Value::from(audience != "AzureADMyOrg"),
        );
    }

    rename(obj, "isFallbackPublicClient", "publicClient");

    if let Some(Value::Object(mut api)) = obj.remove("api") {
        if let Some(scopes) = api.remove("oauth2PermissionScopes") {
            obj.insert("oauth2Permissions".to_string(), scopes);
        }
    }
}

fn application_in(obj: &mut Map<String, Value>) {
    let mut web = Map::new();
    if let Some(v) = obj.remove("homepage") {
        web.insert("homePageUrl".to_string(), v);
    }
    if let Some(v) = obj.remove("replyUrls") {
        web.insert("redirectUris".to_string(), v);
    }
    if let Some(v) = obj.remove("logoutUrl") {
        web.insert("logoutUrl".to_string(), v);
    }
    if let Some(v) = obj.remove("oauth2AllowImplicitFlow") {
        let mut implicit = Map::new();
        implicit.insert("enableAccessTokenIssuance".to_string(), v);
        web.insert("implicitGrantSettings".to_string(), Value::Object(implicit));
    }
    if !web.is_empty() {
        obj.insert("web".to_string(), Value::Object(web));
    }

    if let Some(Value::Bool(multi)) = obj.remove("availableToOtherTenants") {
        let audience = if multi {
            "AzureADMultipleOrgs"
        } else {
            "AzureADMyOrg"
        };
        obj.insert("signInAudience".to_string(), Value::from(audience));
    }

    rename(obj, "publicClient", "isFallbackPublicClient");

    if let Some(scopes) = obj.remove("oauth2Permissions") {
        let mut api = Map::new();
        api.insert("oauth2PermissionScopes".to_string(), scopes);
        obj.insert("api".to_string(), Value::Object(api));
    }
}

/// `#microsoft.graph.servicePrincipal` becomes `ServicePrincipal`.
fn object_type_out(odata_type: &str) -> String {
    let name = odata_type.trim_start_matches("#microsoft.graph.");
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn object_type_in(object_type: &str) -> String {
    let mut chars = object_type.chars();
    let name = match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    };
    format!("#microsoft.graph.{name}")
}
