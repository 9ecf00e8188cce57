//! Application registrations.

use super::credentials::{KeyCredential, PasswordCredential};
use serde::{Deserialize, Serialize};

/// Which accounts may sign in to an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignInAudience {
    #[serde(rename = "AzureADMyOrg")]
    AzureAdMyOrg,
    #[serde(rename = "AzureADMultipleOrgs")]
    AzureAdMultipleOrgs,
    #[serde(rename = "AzureADandPersonalMicrosoftAccount")]
    AzureAdAndPersonalMicrosoftAccount,
    #[serde(rename = "PersonalMicrosoftAccount")]
    PersonalMicrosoftAccount,
}

impl SignInAudience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AzureAdMyOrg => "AzureADMyOrg",
            Self::AzureAdMultipleOrgs => "AzureADMultipleOrgs",
            Self::AzureAdAndPersonalMicrosoftAccount => "AzureADandPersonalMicrosoftAccount",
            Self::PersonalMicrosoftAccount => "PersonalMicrosoftAccount",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_in_audience: Option<SignInAudience>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier_uris: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_fallback_public_client: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_membership_claims: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web: Option<ApplicationWeb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApplicationApi>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_roles: Option<Vec<AppRole>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional_claims: Option<OptionalClaims>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_resource_access: Option<Vec<RequiredResourceAccess>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_credentials: Option<Vec<KeyCredential>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_credentials: Option<Vec<PasswordCredential>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationWeb {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uris: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit_grant_settings: Option<ImplicitGrantSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitGrantSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_access_token_issuance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_id_token_issuance: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationApi {
    #[serde(
        rename = "oauth2PermissionScopes",
        skip_serializing_if = "Option::is_none"
    )]
    pub oauth2_permission_scopes: Option<Vec<PermissionScope>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRole {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_member_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A delegated permission exposed by an API (`oauth2Permissions` in AAD Graph).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionScope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_consent_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_consent_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    /// `Admin` or `User`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub scope_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_consent_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_consent_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionalClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<Vec<OptionalClaim>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<Vec<OptionalClaim>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionalClaim {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub essential: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredResourceAccess {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_access: Option<Vec<ResourceAccess>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAccess {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `Scope` or `Role`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub access_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_graph_payload() {
        let app: Application = serde_json::from_value(json!({
            "id": "00000000-0000-0000-0000-000000000001",
            "appId": "00000000-0000-0000-0000-000000000002",
            "displayName": "acctestApp",
            "signInAudience": "AzureADMultipleOrgs",
            "web": {
                "homePageUrl": "https://example.com",
                "redirectUris": ["https://example.com/callback"],
                "implicitGrantSettings": { "enableAccessTokenIssuance": true }
            },
            "keyCredentials": [{
                "keyId": "00000000-0000-0000-0000-000000000003",
                "type": "AsymmetricX509Cert",
                "usage": "Verify",
                "endDateTime": "2030-01-01T00:00:00Z"
            }],
            "unknownField": 1
        }))
        .unwrap();

        assert_eq!(app.sign_in_audience, Some(SignInAudience::AzureAdMultipleOrgs));
        let web = app.web.unwrap();
        assert_eq!(web.home_page_url.as_deref(), Some("https://example.com"));
        let cred = &app.key_credentials.unwrap()[0];
        assert_eq!(cred.key_type.as_deref(), Some("AsymmetricX509Cert"));
        assert!(cred.end_date_time.is_some());
    }

    #[test]
    fn test_patch_body_omits_absent_fields() {
        let patch = Application {
            display_name: Some("renamed".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"displayName": "renamed"})
        );
    }
}
