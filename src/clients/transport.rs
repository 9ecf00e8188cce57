//! Request execution against the directory APIs.
//!
//! The [`Transport`] trait is the seam between the typed clients and the
//! network. [`HttpTransport`] talks to the real services through `reqwest`;
//! [`super::InMemoryDirectory`] answers the same requests in process.

use super::auth::Authorizer;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// HTTP methods used by the directory APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to one of the directory APIs.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    /// Token audience, i.e. the endpoint the request is addressed to
    pub resource: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url, resource: impl Into<String>) -> Self {
        Self {
            method,
            url,
            resource: resource.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A successful (2xx) response. Error statuses are reported as [`ApiError::Status`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

/// Transport level errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("could not decode response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Build a status error from an error response body in either API dialect.
    pub fn from_response(status: u16, body: Option<&Value>) -> Self {
        let (code, message) = body
            .and_then(decode_odata_error)
            .unwrap_or_else(|| (String::from("Unknown"), String::from("no error details")));

        Self::Status {
            status,
            code,
            message,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Executes requests against a directory API.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse>;
}

#[derive(Debug, Deserialize)]
struct MsGraphError {
    error: MsGraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct MsGraphErrorBody {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct AadGraphError {
    #[serde(rename = "odata.error")]
    error: AadGraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct AadGraphErrorBody {
    code: String,
    message: AadGraphMessage,
}

#[derive(Debug, Deserialize)]
struct AadGraphMessage {
    value: String,
}

fn decode_odata_error(body: &Value) -> Option<(String, String)> {
    if let Ok(e) = serde_json::from_value::<MsGraphError>(body.clone()) {
        return Some((e.error.code, e.error.message));
    }
    serde_json::from_value::<AadGraphError>(body.clone())
        .ok()
        .map(|e| (e.error.code, e.error.message.value))
}

/// Transport over HTTPS with bearer tokens from an [`Authorizer`].
#[derive(Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    authorizer: Arc<dyn Authorizer>,
}

impl HttpTransport {
    pub fn new(authorizer: Arc<dyn Authorizer>, partner_id: Option<&str>) -> ApiResult<Self> {
        let user_agent = match partner_id {
            Some(id) if !id.is_empty() => {
                format!("{}/{} pid-{id}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
            }
            _ => format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        };

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            http_client,
            authorizer,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        debug!("{} {}", request.method, request.url);

        let token = self.authorizer.token(&request.resource).await?;

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .http_client
            .request(method, request.url.clone())
            .bearer_auth(token);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        let body = if bytes.is_empty() {
            None
        } else {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(v) => Some(v),
                // error pages are not always JSON
                Err(_) if !(200..300).contains(&status) => None,
                Err(e) => return Err(e.into()),
            }
        };

        if (200..300).contains(&status) {
            Ok(ApiResponse { status, body })
        } else {
            debug!("{} {} returned {status}", request.method, request.url);
            Err(ApiError::from_response(status, body.as_ref()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_ms_graph_error() {
        let body = json!({"error": {"code": "Request_ResourceNotFound", "message": "gone"}});
        let err = ApiError::from_response(404, Some(&body));
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Request_ResourceNotFound"));
    }

    #[test]
    fn test_decodes_aad_graph_error() {
        let body = json!({
            "odata.error": {
                "code": "Request_BadRequest",
                "message": {"lang": "en", "value": "One or more added object references already exist"}
            }
        });
        let err = ApiError::from_response(400, Some(&body));
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("already exist"));
    }

    #[test]
    fn test_undecodable_error_body() {
        let err = ApiError::from_response(500, None);
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
    }
}
