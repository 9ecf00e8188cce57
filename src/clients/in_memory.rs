//! In-process directory for tests and local development.
//!
//! [`InMemoryDirectory`] implements [`Transport`] by answering requests from a
//! nested map instead of the network. It understands both API dialects, so the
//! same handlers can be exercised against AAD Graph and Microsoft Graph style
//! requests without credentials.
//!
//! # Features
//!
//! * Objects stored per collection in canonical (Microsoft Graph) shape
//! * `$filter` equality clauses and server-driven paging with next links
//! * Owner and member reference links in either dialect
//! * A request log and one-shot failure injection for assertions
//!
//! # Example Usage
//!
//! ```rust
//! use azuread_provider::clients::{ApiVersion, GraphClient, InMemoryDirectory};
//! use azuread_provider::models::Group;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = InMemoryDirectory::new();
//! let client = GraphClient::new(
//!     Arc::new(directory.clone()),
//!     ApiVersion::MsGraph,
//!     "https://graph.microsoft.com",
//!     "00000000-0000-0000-0000-000000000001",
//! );
//!
//! let group = Group {
//!     display_name: Some("acctestGroup".to_string()),
//!     ..Default::default()
//! };
//! let created: Group = client.create("groups", &group).await?;
//! assert!(directory.object("groups", created.id.as_deref().unwrap()).await.is_some());
//! # Ok(())
//! # }
//! ```

use super::dialect::{from_wire, to_wire};
use super::graph::ApiVersion;
use super::transport::{ApiError, ApiRequest, ApiResponse, ApiResult, Method, Transport};
use crate::helpers::filter::parse_odata_eq;
use async_trait::async_trait;
use log::trace;
use serde_json::{Map, Value, json};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

const DEFAULT_PAGE_SIZE: usize = 100;

/// Collections whose objects can be owners or members.
const PRINCIPAL_COLLECTIONS: &[&str] = &["users", "groups", "servicePrincipals", "applications"];

/// A request as seen by the directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct DirectoryState {
    // Structure: collection -> object id -> canonical object
    objects: HashMap<String, HashMap<String, Value>>,
    // Structure: (object id, relation) -> referenced object ids
    links: HashMap<(String, String), BTreeSet<String>>,
    requests: Vec<RecordedRequest>,
    failures: VecDeque<u16>,
}

/// Thread-safe fake of the directory APIs.
#[derive(Clone)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
    page_size: usize,
    latency: Option<Duration>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// A routed failure, rendered in the dialect of the request.
struct Failure {
    status: u16,
    code: &'static str,
    message: String,
}

impl Failure {
    fn not_found(what: &str) -> Self {
        Self {
            status: 404,
            code: "Request_ResourceNotFound",
            message: format!("Resource '{what}' does not exist or one of its queried reference-property objects are not present."),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            code: "Request_BadRequest",
            message: message.into(),
        }
    }

    fn into_error(self, version: ApiVersion) -> ApiError {
        let body = match version {
            ApiVersion::MsGraph => json!({
                "error": { "code": self.code, "message": self.message }
            }),
            ApiVersion::AadGraph => json!({
                "odata.error": {
                    "code": self.code,
                    "message": { "lang": "en", "value": self.message }
                }
            }),
        };
        ApiError::from_response(self.status, Some(&body))
    }
}

type Routed = Result<(u16, Option<Value>), Failure>;

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState::default())),
            page_size: DEFAULT_PAGE_SIZE,
            latency: None,
        }
    }

    /// Serve lists in pages of `page_size` objects.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay every request, which widens the window for interleaving.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Store an object in canonical shape, assigning an id when absent.
    pub async fn insert(&self, collection: &str, object: Value) -> String {
        let mut state = self.state.write().await;
        state.insert(collection, object)
    }

    pub async fn seed_user(&self, display_name: &str) -> String {
        self.insert(
            "users",
            json!({ "displayName": display_name, "userPrincipalName": format!("{display_name}@example.com") }),
        )
        .await
    }

    pub async fn seed_domain(&self, name: &str, is_default: bool, is_initial: bool, is_verified: bool) {
        self.insert(
            "domains",
            json!({
                "id": name,
                "authenticationType": "Managed",
                "isAdminManaged": true,
                "isDefault": is_default,
                "isInitial": is_initial,
                "isVerified": is_verified,
            }),
        )
        .await;
    }

    /// The stored (canonical) object.
    pub async fn object(&self, collection: &str, id: &str) -> Option<Value> {
        let state = self.state.read().await;
        state.objects.get(collection).and_then(|c| c.get(id)).cloned()
    }

    pub async fn count(&self, collection: &str) -> usize {
        let state = self.state.read().await;
        state.objects.get(collection).map_or(0, HashMap::len)
    }

    /// Ids referenced by `relation` of object `id`.
    pub async fn links(&self, id: &str, relation: &str) -> BTreeSet<String> {
        let state = self.state.read().await;
        state
            .links
            .get(&(id.to_string(), relation.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.read().await.requests.clone()
    }

    pub async fn count_requests(&self, method: Method) -> usize {
        let state = self.state.read().await;
        state.requests.iter().filter(|r| r.method == method).count()
    }

    /// Fail the next request with `status`.
    pub async fn inject_failure(&self, status: u16) {
        self.state.write().await.failures.push_back(status);
    }

    fn route(&self, state: &mut DirectoryState, version: ApiVersion, request: &ApiRequest) -> Routed {
        let segments: Vec<&str> = request
            .url
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        // the first segment is the tenant (AAD Graph) or the API version
        let Some((_, path)) = segments.split_first() else {
            return Err(Failure::bad_request("missing collection"));
        };
        let body = request
            .body
            .clone()
            .map(|b| from_wire(version, path.first().copied().unwrap_or(""), b));

        match (request.method, path) {
            (Method::Get, [collection]) => {
                let filter = query_param(&request.url, "$filter");
                let skip = query_param(&request.url, "$skiptoken")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                let objects = state.list(collection, version, filter.as_deref())?;
                Ok((200, Some(self.page(version, &request.url, path, objects, skip, collection))))
            }
            (Method::Post, [collection]) => {
                let created = state.create(collection, body.unwrap_or(Value::Null))?;
                Ok((201, Some(to_wire(version, collection, created))))
            }
            (Method::Get, [collection, id]) => state
                .get(collection, id)
                .map(|o| (200, Some(to_wire(version, collection, o))))
                .ok_or_else(|| Failure::not_found(id)),
            (Method::Patch, [collection, id]) => {
                state.patch(collection, id, body.unwrap_or(Value::Null))?;
                Ok((204, None))
            }
            (Method::Delete, [collection, id]) => {
                state.delete(collection, id)?;
                Ok((204, None))
            }
            (Method::Get, [collection, id, relation]) => {
                let skip = query_param(&request.url, "$skiptoken")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                let objects = state.referenced(collection, id, relation)?;
                Ok((200, Some(self.page(version, &request.url, path, objects, skip, "directoryObjects"))))
            }
            (Method::Post, [collection, id, relation, "$ref"])
                if version == ApiVersion::MsGraph =>
            {
                let member = reference_target(request.body.as_ref(), "@odata.id")?;
                state.add_link(collection, id, relation, &member)?;
                Ok((204, None))
            }
            (Method::Post, [collection, id, "$links", relation])
                if version == ApiVersion::AadGraph =>
            {
                let member = reference_target(request.body.as_ref(), "url")?;
                state.add_link(collection, id, relation, &member)?;
                Ok((204, None))
            }
            (Method::Delete, [collection, id, relation, member, "$ref"])
                if version == ApiVersion::MsGraph =>
            {
                state.remove_link(collection, id, relation, member)?;
                Ok((204, None))
            }
            (Method::Delete, [collection, id, "$links", relation, member])
                if version == ApiVersion::AadGraph =>
            {
                state.remove_link(collection, id, relation, member)?;
                Ok((204, None))
            }
            _ => Err(Failure::bad_request(format!(
                "unsupported request {} {}",
                request.method, request.url
            ))),
        }
    }

    /// Render one page of a list response with a next link when more remain.
    fn page(
        &self,
        version: ApiVersion,
        url: &Url,
        path: &[&str],
        objects: Vec<Value>,
        skip: usize,
        dialect_collection: &str,
    ) -> Value {
        let total = objects.len();
        let items: Vec<Value> = objects
            .into_iter()
            .skip(skip)
            .take(self.page_size)
            .map(|o| to_wire(version, dialect_collection, o))
            .collect();

        let mut body = Map::new();
        body.insert("value".to_string(), Value::Array(items));

        let next = skip + self.page_size;
        if next < total {
            let mut query = Vec::new();
            if let Some(filter) = query_param(url, "$filter") {
                query.push(format!(
                    "$filter={}",
                    url::form_urlencoded::byte_serialize(filter.as_bytes())
                        .collect::<String>()
                        .replace('+', "%20")
                ));
            }
            query.push(format!("$skiptoken={next}"));

            let (field, link) = match version {
                ApiVersion::MsGraph => {
                    let mut link = url.clone();
                    link.set_query(Some(&query.join("&")));
                    ("@odata.nextLink", link.to_string())
                }
                // relative to the tenant and without the API version
                ApiVersion::AadGraph => {
                    ("odata.nextLink", format!("{}?{}", path.join("/"), query.join("&")))
                }
            };
            body.insert(field.to_string(), Value::from(link));
        }

        Value::Object(body)
    }
}

impl DirectoryState {
    fn insert(&mut self, collection: &str, object: Value) -> String {
        let mut object = match object {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let id = object
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        object.insert("id".to_string(), Value::from(id.clone()));

        if let Some(odata_type) = odata_type(collection) {
            object.insert("@odata.type".to_string(), Value::from(odata_type));
        }

        self.objects
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), Value::Object(object));
        id
    }

    fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.objects.get(collection).and_then(|c| c.get(id)).cloned()
    }

    fn find_principal(&self, id: &str) -> Option<Value> {
        PRINCIPAL_COLLECTIONS
            .iter()
            .find_map(|collection| self.get(collection, id))
    }

    fn list(&self, collection: &str, version: ApiVersion, filter: Option<&str>) -> Result<Vec<Value>, Failure> {
        let clause = match filter {
            Some(f) => Some(
                parse_odata_eq(f)
                    .ok_or_else(|| Failure::bad_request(format!("unsupported filter: {f}")))?,
            ),
            None => None,
        };

        let mut objects: Vec<Value> = self
            .objects
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default();

        if let Some((field, value)) = clause {
            let field = canonical_field(version, collection, &field);
            objects.retain(|o| o.get(field.as_str()).and_then(Value::as_str) == Some(value.as_str()));
        }

        objects.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
        Ok(objects)
    }

    fn create(&mut self, collection: &str, body: Value) -> Result<Value, Failure> {
        let Value::Object(mut object) = body else {
            return Err(Failure::bad_request("request body must be an object"));
        };
        object.remove("id");

        match collection {
            "applications" => {
                object.insert(
                    "appId".to_string(),
                    Value::from(uuid::Uuid::new_v4().to_string()),
                );
            }
            "servicePrincipals" => {
                let app_id = object
                    .get("appId")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| Failure::bad_request("appId is required"))?;

                let application = self
                    .objects
                    .get("applications")
                    .and_then(|apps| apps.values().find(|a| a["appId"].as_str() == Some(app_id.as_str())))
                    .cloned()
                    .ok_or_else(|| {
                        Failure::bad_request(format!(
                            "The appId '{app_id}' of the service principal does not reference a valid application object."
                        ))
                    })?;

                let exists = self
                    .objects
                    .get("servicePrincipals")
                    .is_some_and(|sps| sps.values().any(|sp| sp["appId"].as_str() == Some(app_id.as_str())));
                if exists {
                    return Err(Failure {
                        status: 409,
                        code: "Request_MultipleObjectsWithSameKeyValue",
                        message: "Another object with the same value for property servicePrincipalNames already exists.".to_string(),
                    });
                }

                if let Some(name) = application.get("displayName") {
                    object.insert("displayName".to_string(), name.clone());
                }
                if let Some(roles) = application.get("appRoles") {
                    object.insert("appRoles".to_string(), roles.clone());
                }
                if let Some(scopes) = application.pointer("/api/oauth2PermissionScopes") {
                    object.insert("oauth2PermissionScopes".to_string(), scopes.clone());
                }
            }
            _ => {}
        }

        let id = self.insert(collection, Value::Object(object));
        self.get(collection, &id)
            .ok_or_else(|| Failure::not_found(&id))
    }

    fn patch(&mut self, collection: &str, id: &str, body: Value) -> Result<(), Failure> {
        let object = self
            .objects
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| Failure::not_found(id))?;

        let Value::Object(mut patch) = body else {
            return Err(Failure::bad_request("request body must be an object"));
        };
        patch.remove("id");
        merge(object, Value::Object(patch));
        Ok(())
    }

    fn delete(&mut self, collection: &str, id: &str) -> Result<(), Failure> {
        self.objects
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .ok_or_else(|| Failure::not_found(id))?;

        self.links.retain(|(source, _), _| source != id);
        for members in self.links.values_mut() {
            members.remove(id);
        }
        Ok(())
    }

    fn referenced(&self, collection: &str, id: &str, relation: &str) -> Result<Vec<Value>, Failure> {
        if self.get(collection, id).is_none() {
            return Err(Failure::not_found(id));
        }

        let ids = self
            .links
            .get(&(id.to_string(), relation.to_string()))
            .cloned()
            .unwrap_or_default();

        Ok(ids.iter().filter_map(|m| self.find_principal(m)).collect())
    }

    fn add_link(&mut self, collection: &str, id: &str, relation: &str, member: &str) -> Result<(), Failure> {
        if self.get(collection, id).is_none() {
            return Err(Failure::not_found(id));
        }
        if self.find_principal(member).is_none() {
            return Err(Failure::not_found(member));
        }

        let added = self
            .links
            .entry((id.to_string(), relation.to_string()))
            .or_default()
            .insert(member.to_string());
        if !added {
            return Err(Failure::bad_request(format!(
                "One or more added object references already exist for the following modified properties: '{relation}'."
            )));
        }
        Ok(())
    }

    fn remove_link(&mut self, collection: &str, id: &str, relation: &str, member: &str) -> Result<(), Failure> {
        if self.get(collection, id).is_none() {
            return Err(Failure::not_found(id));
        }

        let removed = self
            .links
            .get_mut(&(id.to_string(), relation.to_string()))
            .is_some_and(|members| members.remove(member));
        if removed {
            Ok(())
        } else {
            Err(Failure::not_found(member))
        }
    }
}

#[async_trait]
impl Transport for InMemoryDirectory {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let version = if request.url.query_pairs().any(|(k, _)| k == "api-version") {
            ApiVersion::AadGraph
        } else {
            ApiVersion::MsGraph
        };

        let mut state = self.state.write().await;
        trace!("in-memory directory: {} {}", request.method, request.url);
        state.requests.push(RecordedRequest {
            method: request.method,
            url: request.url.to_string(),
            body: request.body.clone(),
        });

        if let Some(status) = state.failures.pop_front() {
            let failure = Failure {
                status,
                code: "Injected",
                message: format!("injected failure with status {status}"),
            };
            return Err(failure.into_error(version));
        }

        match self.route(&mut state, version, &request) {
            Ok((status, body)) => Ok(ApiResponse { status, body }),
            Err(failure) => Err(failure.into_error(version)),
        }
    }
}

fn odata_type(collection: &str) -> Option<&'static str> {
    match collection {
        "users" => Some("#microsoft.graph.user"),
        "groups" => Some("#microsoft.graph.group"),
        "servicePrincipals" => Some("#microsoft.graph.servicePrincipal"),
        "applications" => Some("#microsoft.graph.application"),
        _ => None,
    }
}

/// Map a filter field of `version` onto the canonical field name.
fn canonical_field(version: ApiVersion, collection: &str, field: &str) -> String {
    match (version, collection, field) {
        (ApiVersion::AadGraph, "domains", "name") => "id".to_string(),
        (ApiVersion::AadGraph, _, "objectId") => "id".to_string(),
        _ => field.to_string(),
    }
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// The object id at the end of a reference body URL.
fn reference_target(body: Option<&Value>, field: &str) -> Result<String, Failure> {
    body.and_then(|b| b.get(field))
        .and_then(Value::as_str)
        .and_then(|url| url.rsplit('/').next())
        .map(str::to_string)
        .ok_or_else(|| Failure::bad_request(format!("reference body requires {field:?}")))
}

/// Merge `patch` into `target`: objects merge recursively, null removes.
fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    target.remove(&key);
                } else if let Some(existing) = target.get_mut(&key) {
                    merge(existing, value);
                } else {
                    target.insert(key, value);
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::GraphClient;
    use crate::models::{Application, Group, ServicePrincipal};

    const TENANT: &str = "00000000-0000-0000-0000-00000000000a";

    fn client(directory: &InMemoryDirectory, version: ApiVersion) -> GraphClient {
        let endpoint = match version {
            ApiVersion::AadGraph => "https://graph.windows.net",
            ApiVersion::MsGraph => "https://graph.microsoft.com",
        };
        GraphClient::new(Arc::new(directory.clone()), version, endpoint, TENANT)
    }

    fn group(name: &str) -> Group {
        Group {
            display_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_pagination_in_both_dialects() {
        let directory = InMemoryDirectory::new().with_page_size(2);
        for i in 0..5 {
            directory
                .insert("groups", json!({"displayName": format!("group-{i}")}))
                .await;
        }

        for version in [ApiVersion::AadGraph, ApiVersion::MsGraph] {
            let groups: Vec<Group> = client(&directory, version).list("groups", None).await.unwrap();
            assert_eq!(groups.len(), 5, "{version}");
        }
        // three pages per dialect
        assert_eq!(directory.count_requests(Method::Get).await, 6);
    }

    #[tokio::test]
    async fn test_filter_with_paging() {
        let directory = InMemoryDirectory::new().with_page_size(1);
        for name in ["a", "b", "b"] {
            directory.insert("groups", json!({"displayName": name})).await;
        }

        let graph = client(&directory, ApiVersion::AadGraph);
        let groups: Vec<Group> = graph
            .list("groups", Some("displayName eq 'b'"))
            .await
            .unwrap();
        assert_eq!(groups.len(), 2);
    }

    #[tokio::test]
    async fn test_get_missing_is_none_and_delete_missing_is_false() {
        let directory = InMemoryDirectory::new();
        let graph = client(&directory, ApiVersion::MsGraph);

        let missing: Option<Group> = graph.get("groups", "nope").await.unwrap();
        assert!(missing.is_none());
        assert!(!graph.delete("groups", "nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_references_in_both_dialects() {
        let directory = InMemoryDirectory::new();
        let user = directory.seed_user("alice").await;

        for version in [ApiVersion::AadGraph, ApiVersion::MsGraph] {
            let graph = client(&directory, version);
            let created: Group = graph.create("groups", &group("g")).await.unwrap();
            let id = created.id.unwrap();

            graph.add_ref("groups", &id, "members", &user).await.unwrap();
            let err = graph.add_ref("groups", &id, "members", &user).await.unwrap_err();
            assert_eq!(err.status(), Some(400));

            let members = graph.list_refs("groups", &id, "members").await.unwrap();
            assert_eq!(members.len(), 1);
            assert_eq!(members[0].object_type(), Some("user"));

            assert!(graph.remove_ref("groups", &id, "members", &user).await.unwrap());
            assert!(!graph.remove_ref("groups", &id, "members", &user).await.unwrap());
            assert!(directory.links(&id, "members").await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_service_principal_requires_application() {
        let directory = InMemoryDirectory::new();
        let graph = client(&directory, ApiVersion::MsGraph);

        let orphan = ServicePrincipal {
            app_id: Some(uuid::Uuid::new_v4().to_string()),
            ..Default::default()
        };
        let err = graph
            .create::<_, ServicePrincipal>("servicePrincipals", &orphan)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));

        let app: Application = graph
            .create(
                "applications",
                &Application {
                    display_name: Some("app".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let sp: ServicePrincipal = graph
            .create(
                "servicePrincipals",
                &ServicePrincipal {
                    app_id: app.app_id.clone(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(sp.display_name.as_deref(), Some("app"));
    }

    #[tokio::test]
    async fn test_patch_merges_nested_objects() {
        let directory = InMemoryDirectory::new();
        let id = directory
            .insert(
                "applications",
                json!({"displayName": "app", "web": {"homePageUrl": "https://a", "logoutUrl": "https://l"}}),
            )
            .await;

        // AAD Graph patches the flattened fields
        let graph = client(&directory, ApiVersion::AadGraph);
        graph
            .update("applications", &id, &json!({"web": {"homePageUrl": "https://b"}}))
            .await
            .unwrap();

        let stored = directory.object("applications", &id).await.unwrap();
        assert_eq!(stored["web"]["homePageUrl"], "https://b");
        assert_eq!(stored["web"]["logoutUrl"], "https://l");
    }

    #[tokio::test]
    async fn test_injected_failure_uses_dialect() {
        let directory = InMemoryDirectory::new();
        directory.inject_failure(503).await;

        let graph = client(&directory, ApiVersion::AadGraph);
        let err = graph.list::<Group>("groups", None).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("Injected"));

        assert!(graph.list::<Group>("groups", None).await.is_ok());
    }
}
