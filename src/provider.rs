//! Resource and data source registry.
//!
//! [`Provider`] owns the configured [`Client`] and dispatches lifecycle calls
//! to the handler registered for a type name such as `azuread_group`.
//! Configuration is validated against the handler's [`Schema`] before any
//! request is made, and planned values are derived from configuration and
//! prior state with [`ResourceData::planned`].
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use azuread_provider::clients::{Client, ProviderConfig};
//! use azuread_provider::provider::Provider;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::builder(ProviderConfig::from_env()?).build().await?;
//! let provider = Provider::new(client);
//!
//! let config = json!({ "name": "acctestGroup-1", "prevent_duplicate_names": true });
//! let state = provider
//!     .create("azuread_group", config.as_object().unwrap())
//!     .await?;
//! println!("created group {}", state.id);
//! # Ok(())
//! # }
//! ```

use crate::clients::Client;
use crate::error::{ProviderError, ProviderResult};
use crate::schema::Schema;
use crate::services::{applications, domains, groups, serviceprincipals};
use crate::state::ResourceData;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Lifecycle of a managed resource type.
///
/// Handlers read and write attribute values through [`ResourceData`]. `read`
/// clears the id when the remote object no longer exists.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn create(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()>;

    async fn read(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()>;

    async fn update(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()>;

    async fn delete(&self, client: &Client, data: &ResourceData) -> ProviderResult<()>;

    /// Check the format of an id passed to `import`.
    fn validate_import_id(&self, id: &str) -> ProviderResult<()>;
}

/// A read-only lookup.
#[async_trait]
pub trait DataSourceHandler: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()>;
}

/// Recorded state of a resource or data source.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState {
    pub id: String,
    pub attributes: Map<String, Value>,
}

impl ResourceState {
    fn from_data(data: ResourceData) -> Option<Self> {
        let id = data.id()?.to_string();
        Some(Self {
            id,
            attributes: data.into_values(),
        })
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

pub struct Provider {
    client: Arc<Client>,
    resources: HashMap<&'static str, Arc<dyn ResourceHandler>>,
    data_sources: HashMap<&'static str, Arc<dyn DataSourceHandler>>,
}

impl Provider {
    /// Create a provider with every resource and data source registered.
    pub fn new(client: Client) -> Self {
        let mut provider = Self {
            client: Arc::new(client),
            resources: HashMap::new(),
            data_sources: HashMap::new(),
        };

        provider.register_resource(Arc::new(applications::ApplicationResource));
        provider.register_resource(Arc::new(applications::ApplicationCertificateResource));
        provider.register_resource(Arc::new(applications::ApplicationPasswordResource));
        provider.register_resource(Arc::new(groups::GroupResource));
        provider.register_resource(Arc::new(serviceprincipals::ServicePrincipalResource));

        provider.register_data_source(Arc::new(applications::ApplicationDataSource));
        provider.register_data_source(Arc::new(domains::DomainsDataSource));
        provider.register_data_source(Arc::new(groups::GroupDataSource));
        provider.register_data_source(Arc::new(serviceprincipals::ServicePrincipalDataSource));
        provider.register_data_source(Arc::new(serviceprincipals::ClientConfigDataSource));

        provider
    }

    pub fn register_resource(&mut self, handler: Arc<dyn ResourceHandler>) {
        self.resources.insert(handler.type_name(), handler);
    }

    pub fn register_data_source(&mut self, handler: Arc<dyn DataSourceHandler>) {
        self.data_sources.insert(handler.type_name(), handler);
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    pub fn resource_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.resources.keys().copied().collect();
        types.sort_unstable();
        types
    }

    pub fn data_source_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.data_sources.keys().copied().collect();
        types.sort_unstable();
        types
    }

    fn resource(&self, type_name: &str) -> ProviderResult<&Arc<dyn ResourceHandler>> {
        self.resources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnsupportedResourceType(type_name.to_string()))
    }

    fn data_source(&self, type_name: &str) -> ProviderResult<&Arc<dyn DataSourceHandler>> {
        self.data_sources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnsupportedResourceType(type_name.to_string()))
    }

    pub fn resource_schema(&self, type_name: &str) -> ProviderResult<Schema> {
        Ok(self.resource(type_name)?.schema())
    }

    pub fn data_source_schema(&self, type_name: &str) -> ProviderResult<Schema> {
        Ok(self.data_source(type_name)?.schema())
    }

    /// Create a resource from configuration.
    ///
    /// When the handler fails after the remote object exists, the error is
    /// [`ProviderError::Tainted`] and carries the partial state.
    pub async fn create(
        &self,
        type_name: &str,
        config: &Map<String, Value>,
    ) -> ProviderResult<ResourceState> {
        let handler = self.resource(type_name)?;
        let schema = handler.schema();
        schema.validate(config)?;

        let mut data = ResourceData::planned(&schema, None, &Map::new(), config);
        if let Err(err) = handler.create(&self.client, &mut data).await {
            // an id means the remote object exists and must stay in state
            return Err(match ResourceState::from_data(data) {
                Some(state) => {
                    warn!("Created {type_name} {} is tainted: {err}", state.id);
                    ProviderError::tainted(state, err)
                }
                None => err,
            });
        }

        let state = ResourceState::from_data(data).ok_or_else(|| {
            ProviderError::bad_response(format!("{type_name} disappeared after it was created"))
        })?;
        info!("Created {type_name} {}", state.id);
        Ok(state)
    }

    /// Refresh a resource. Returns `None` when it no longer exists remotely.
    pub async fn read(
        &self,
        type_name: &str,
        state: &ResourceState,
    ) -> ProviderResult<Option<ResourceState>> {
        let handler = self.resource(type_name)?;
        let mut data = ResourceData::from_state(Some(state.id.clone()), state.attributes.clone());
        handler.read(&self.client, &mut data).await?;
        Ok(ResourceState::from_data(data))
    }

    pub async fn update(
        &self,
        type_name: &str,
        prior: &ResourceState,
        config: &Map<String, Value>,
    ) -> ProviderResult<ResourceState> {
        let handler = self.resource(type_name)?;
        let schema = handler.schema();
        schema.validate(config)?;

        let mut data =
            ResourceData::planned(&schema, Some(prior.id.clone()), &prior.attributes, config);
        handler.update(&self.client, &mut data).await?;

        ResourceState::from_data(data).ok_or_else(|| {
            ProviderError::not_found(type_name, prior.id.clone()).context("Updating resource")
        })
    }

    pub async fn delete(&self, type_name: &str, state: &ResourceState) -> ProviderResult<()> {
        let handler = self.resource(type_name)?;
        let data = ResourceData::from_state(Some(state.id.clone()), state.attributes.clone());
        handler.delete(&self.client, &data).await?;
        info!("Deleted {type_name} {}", state.id);
        Ok(())
    }

    /// Bring an existing remote object under management.
    pub async fn import(&self, type_name: &str, id: &str) -> ProviderResult<ResourceState> {
        let handler = self.resource(type_name)?;
        handler.validate_import_id(id)?;

        let mut data = ResourceData::from_state(Some(id.to_string()), Map::new());
        handler.read(&self.client, &mut data).await?;

        ResourceState::from_data(data).ok_or_else(|| {
            ProviderError::not_found(type_name, id).context("Cannot import non-existent remote object")
        })
    }

    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: &Map<String, Value>,
    ) -> ProviderResult<ResourceState> {
        let handler = self.data_source(type_name)?;
        let schema = handler.schema();
        schema.validate(config)?;

        let mut data = ResourceData::planned(&schema, None, &Map::new(), config);
        handler.read(&self.client, &mut data).await?;

        ResourceState::from_data(data)
            .ok_or_else(|| ProviderError::bad_response(format!("{type_name} did not set an ID")))
    }

    /// Whether applying `config` over `prior` changes a force-new attribute.
    pub fn requires_replacement(
        &self,
        type_name: &str,
        prior: &ResourceState,
        config: &Map<String, Value>,
    ) -> ProviderResult<bool> {
        let schema = self.resource(type_name)?.schema();
        let planned =
            ResourceData::planned(&schema, Some(prior.id.clone()), &prior.attributes, config);

        let replace = schema.force_new_attributes().any(|attribute| {
            let changed = planned.has_change(attribute.name);
            if changed {
                debug!("{type_name} {}: {} forces replacement", prior.id, attribute.name);
            }
            changed
        });
        Ok(replace)
    }
}
