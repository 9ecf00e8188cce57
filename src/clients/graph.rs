//! A thin client over one generation of the directory API.
//!
//! [`GraphClient`] knows how to address collections, follow pagination links
//! and manage reference links for the configured [`ApiVersion`]. Payloads are
//! translated with [`super::dialect`] so callers always see the canonical
//! shape. A `404` on a single object is reported as absence rather than as an
//! error.

use super::dialect::{from_wire, to_wire};
use super::transport::{ApiRequest, ApiResult, Method, Transport};
use crate::models::DirectoryObject;
use log::{debug, trace};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use url::Url;

/// Which directory API a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiVersion {
    /// Legacy Azure Active Directory Graph, version 1.6
    AadGraph,
    /// Microsoft Graph v1.0
    MsGraph,
}

impl ApiVersion {
    pub const AAD_GRAPH_API_VERSION: &'static str = "1.6";

    fn next_link_field(&self) -> &'static str {
        match self {
            Self::AadGraph => "odata.nextLink",
            Self::MsGraph => "@odata.nextLink",
        }
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AadGraph => f.write_str("AAD Graph"),
            Self::MsGraph => f.write_str("Microsoft Graph"),
        }
    }
}

/// Percent-encode a query value, using `%20` for spaces.
fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[derive(Clone)]
pub struct GraphClient {
    transport: Arc<dyn Transport>,
    version: ApiVersion,
    endpoint: String,
    tenant_id: String,
}

impl GraphClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        version: ApiVersion,
        endpoint: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            version,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            tenant_id: tenant_id.into(),
        }
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    pub fn base_url(&self) -> String {
        match self.version {
            ApiVersion::AadGraph => format!("{}/{}", self.endpoint, self.tenant_id),
            ApiVersion::MsGraph => format!("{}/v1.0", self.endpoint),
        }
    }

    fn url(&self, path: &str, filter: Option<&str>) -> ApiResult<Url> {
        let mut url = Url::parse(&format!("{}/{path}", self.base_url()))?;

        let mut query = Vec::new();
        if let Some(filter) = filter {
            query.push(format!("$filter={}", encode_query_value(filter)));
        }
        if self.version == ApiVersion::AadGraph {
            query.push(format!(
                "api-version={}",
                ApiVersion::AAD_GRAPH_API_VERSION
            ));
        }
        if !query.is_empty() {
            url.set_query(Some(&query.join("&")));
        }

        Ok(url)
    }

    /// Resolve a pagination link. AAD Graph links are relative to the tenant
    /// and omit the API version.
    fn next_url(&self, link: &str) -> ApiResult<Url> {
        match self.version {
            ApiVersion::MsGraph => Ok(Url::parse(link)?),
            ApiVersion::AadGraph => {
                let mut url = if link.starts_with("http") {
                    Url::parse(link)?
                } else {
                    Url::parse(&format!("{}/{}", self.base_url(), link.trim_start_matches('/')))?
                };
                if !url.query_pairs().any(|(k, _)| k == "api-version") {
                    let query = match url.query() {
                        Some(q) if !q.is_empty() => {
                            format!("{q}&api-version={}", ApiVersion::AAD_GRAPH_API_VERSION)
                        }
                        _ => format!("api-version={}", ApiVersion::AAD_GRAPH_API_VERSION),
                    };
                    url.set_query(Some(&query));
                }
                Ok(url)
            }
        }
    }

    async fn send(&self, method: Method, url: Url, body: Option<Value>) -> ApiResult<Option<Value>> {
        let mut request = ApiRequest::new(method, url, self.endpoint.clone());
        if let Some(body) = body {
            request = request.with_body(body);
        }
        let response = self.transport.execute(request).await?;
        Ok(response.body)
    }

    fn decode<T: DeserializeOwned>(&self, collection: &str, body: Option<Value>) -> ApiResult<T> {
        let value = from_wire(self.version, collection, body.unwrap_or(Value::Null));
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch a single object, or `None` when it does not exist.
    pub async fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> ApiResult<Option<T>> {
        let url = self.url(&format!("{collection}/{id}"), None)?;
        match self.send(Method::Get, url, None).await {
            Ok(body) => self.decode(collection, body).map(Some),
            Err(e) if e.is_not_found() => {
                debug!("{collection}/{id} was not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// List a collection, following pagination links until exhausted.
    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Option<&str>,
    ) -> ApiResult<Vec<T>> {
        let url = self.url(collection, filter)?;
        self.list_pages(url, collection).await
    }

    async fn list_pages<T: DeserializeOwned>(&self, first: Url, collection: &str) -> ApiResult<Vec<T>> {
        let mut results = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            trace!("Fetching page {url}");
            let body = self.send(Method::Get, url, None).await?.unwrap_or(Value::Null);

            if let Some(Value::Array(items)) = body.get("value") {
                for item in items {
                    results.push(self.decode(collection, Some(item.clone()))?);
                }
            }

            if let Some(link) = body
                .get(self.version.next_link_field())
                .and_then(Value::as_str)
            {
                next = Some(self.next_url(link)?);
            }
        }

        Ok(results)
    }

    pub async fn create<B, T>(&self, collection: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(collection, None)?;
        let wire = to_wire(self.version, collection, serde_json::to_value(body)?);
        let response = self.send(Method::Post, url, Some(wire)).await?;
        self.decode(collection, response)
    }

    /// PATCH an object with the fields present in `body`.
    pub async fn update<B>(&self, collection: &str, id: &str, body: &B) -> ApiResult<()>
    where
        B: Serialize + Sync,
    {
        let url = self.url(&format!("{collection}/{id}"), None)?;
        let wire = to_wire(self.version, collection, serde_json::to_value(body)?);
        self.send(Method::Patch, url, Some(wire)).await?;
        Ok(())
    }

    /// Delete an object. Returns `false` when it was already gone.
    pub async fn delete(&self, collection: &str, id: &str) -> ApiResult<bool> {
        let url = self.url(&format!("{collection}/{id}"), None)?;
        match self.send(Method::Delete, url, None).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List the objects referenced by `relation` (e.g. `owners` or `members`).
    pub async fn list_refs(
        &self,
        collection: &str,
        id: &str,
        relation: &str,
    ) -> ApiResult<Vec<DirectoryObject>> {
        let url = self.url(&format!("{collection}/{id}/{relation}"), None)?;
        self.list_pages(url, "directoryObjects").await
    }

    pub async fn add_ref(
        &self,
        collection: &str,
        id: &str,
        relation: &str,
        member_id: &str,
    ) -> ApiResult<()> {
        let (path, body) = match self.version {
            ApiVersion::AadGraph => (
                format!("{collection}/{id}/$links/{relation}"),
                json!({ "url": format!("{}/directoryObjects/{member_id}", self.base_url()) }),
            ),
            ApiVersion::MsGraph => (
                format!("{collection}/{id}/{relation}/$ref"),
                json!({ "@odata.id": format!("{}/directoryObjects/{member_id}", self.base_url()) }),
            ),
        };

        let url = self.url(&path, None)?;
        self.send(Method::Post, url, Some(body)).await?;
        Ok(())
    }

    /// Remove a reference. Returns `false` when it did not exist.
    pub async fn remove_ref(
        &self,
        collection: &str,
        id: &str,
        relation: &str,
        member_id: &str,
    ) -> ApiResult<bool> {
        let path = match self.version {
            ApiVersion::AadGraph => format!("{collection}/{id}/$links/{relation}/{member_id}"),
            ApiVersion::MsGraph => format!("{collection}/{id}/{relation}/{member_id}/$ref"),
        };

        let url = self.url(&path, None)?;
        match self.send(Method::Delete, url, None).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("version", &self.version)
            .field("endpoint", &self.endpoint)
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}
