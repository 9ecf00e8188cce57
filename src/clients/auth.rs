//! Bearer tokens for the directory APIs.

use super::transport::{ApiError, ApiResult};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use log::{debug, trace};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Supplies bearer tokens for a resource endpoint such as `https://graph.microsoft.com`.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn token(&self, resource: &str) -> ApiResult<String>;
}

/// A pre-issued token used for every resource.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl Authorizer for StaticToken {
    async fn token(&self, _resource: &str) -> ApiResult<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// OAuth2 client credentials flow with a per-resource token cache.
pub struct ClientSecretCredential {
    http_client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl ClientSecretCredential {
    /// Tokens are refreshed this long before they expire.
    const EXPIRY_MARGIN_MINUTES: i64 = 5;

    /// Token requests hold the cache lock, so they must not hang.
    const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

    pub fn new(
        login_endpoint: &str,
        tenant_id: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            token_url: format!(
                "{}/{tenant_id}/oauth2/v2.0/token",
                login_endpoint.trim_end_matches('/')
            ),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    async fn request_token(&self, resource: &str) -> ApiResult<CachedToken> {
        let scope = format!("{}/.default", resource.trim_end_matches('/'));
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", scope.as_str()),
        ];

        debug!("Requesting token for {resource}");
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!(
                "token request for {resource} failed with {status}: {text}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                ApiError::Auth(format!(
                    "token for {resource} has an invalid lifetime of {} seconds",
                    token.expires_in
                ))
            })?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at,
        })
    }
}

#[async_trait]
impl Authorizer for ClientSecretCredential {
    async fn token(&self, resource: &str) -> ApiResult<String> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.get(resource) {
            if cached.expires_at - Duration::minutes(Self::EXPIRY_MARGIN_MINUTES) > Utc::now() {
                trace!("Using cached token for {resource}");
                return Ok(cached.access_token.clone());
            }
        }

        let token = self.request_token(resource).await?;
        let access_token = token.access_token.clone();
        cache.insert(resource.to_string(), token);
        Ok(access_token)
    }
}

/// Identity claims of the authenticated caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    #[serde(rename = "oid", default)]
    pub object_id: Option<String>,
    #[serde(rename = "tid", default)]
    pub tenant_id: Option<String>,
    #[serde(rename = "appid", default)]
    pub app_id: Option<String>,
}

impl Claims {
    /// Decode the claims from the payload segment of a JWT. The signature is not verified.
    pub fn from_jwt(token: &str) -> ApiResult<Self> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| ApiError::Auth("access token is not a JWT".to_string()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| ApiError::Auth(format!("could not decode token claims: {e}")))?;

        Ok(serde_json::from_slice(&bytes)?)
    }
}
