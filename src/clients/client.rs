//! The configured client shared by every handler.

use super::auth::{Authorizer, Claims, ClientSecretCredential, StaticToken};
use super::config::ProviderConfig;
use super::graph::{ApiVersion, GraphClient};
use super::transport::{HttpTransport, Transport};
use crate::error::{ProviderError, ProviderResult};
use crate::ids::validate_uuid;
use crate::locks::NamedLocks;
use crate::services::applications::ApplicationsClient;
use crate::services::domains::DomainsClient;
use crate::services::groups::GroupsClient;
use crate::services::serviceprincipals::ServicePrincipalsClient;
use log::{debug, warn};
use std::sync::Arc;

/// API clients, caller identity and the lock registry.
#[derive(Debug)]
pub struct Client {
    pub tenant_id: String,
    pub client_id: String,
    /// Identity of the authenticated caller, when it could be determined
    pub claims: Claims,
    pub applications: ApplicationsClient,
    pub groups: GroupsClient,
    pub service_principals: ServicePrincipalsClient,
    pub domains: DomainsClient,
    pub locks: Arc<NamedLocks>,
    version: ApiVersion,
}

impl Client {
    pub fn builder(config: ProviderConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    pub fn api_version(&self) -> ApiVersion {
        self.version
    }
}

/// Builder for [`Client`].
///
/// Without an explicit transport the builder talks HTTPS, authenticating with
/// the configured access token or client secret.
pub struct ClientBuilder {
    config: ProviderConfig,
    transport: Option<Arc<dyn Transport>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    claims: Option<Claims>,
}

impl ClientBuilder {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            transport: None,
            authorizer: None,
            claims: None,
        }
    }

    /// Route requests through `transport` instead of HTTPS.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Use known claims instead of decoding them from an access token.
    pub fn claims(mut self, claims: Claims) -> Self {
        self.claims = Some(claims);
        self
    }

    fn configured_authorizer(config: &ProviderConfig) -> ProviderResult<Arc<dyn Authorizer>> {
        if let Some(token) = &config.access_token {
            return Ok(Arc::new(StaticToken::new(token.clone())));
        }
        match &config.client_secret {
            Some(secret) => Ok(Arc::new(ClientSecretCredential::new(
                config.environment.login_endpoint(),
                &config.tenant_id,
                config.client_id.clone(),
                secret.clone(),
            )?)),
            None => Err(ProviderError::config(
                "one of `client_secret` or `access_token` must be configured",
            )),
        }
    }

    pub async fn build(self) -> ProviderResult<Client> {
        let config = self.config;

        let (version, endpoint) = if config.use_microsoft_graph {
            (ApiVersion::MsGraph, config.environment.ms_graph_endpoint())
        } else {
            (ApiVersion::AadGraph, config.environment.aad_graph_endpoint())
        };

        let (transport, authorizer) = match (self.transport, self.authorizer) {
            (Some(transport), authorizer) => {
                validate_uuid("tenant_id", &config.tenant_id)?;
                validate_uuid("client_id", &config.client_id)?;
                (transport, authorizer)
            }
            (None, authorizer) => {
                config.validate()?;
                let authorizer = match authorizer {
                    Some(a) => a,
                    None => Self::configured_authorizer(&config)?,
                };
                let transport = HttpTransport::new(authorizer.clone(), config.partner_id.as_deref())
                    .map_err(|e| ProviderError::from(e).context("Building HTTP client"))?;
                (Arc::new(transport) as Arc<dyn Transport>, Some(authorizer))
            }
        };

        let claims = match (self.claims, authorizer) {
            (Some(claims), _) => claims,
            (None, Some(authorizer)) => match authorizer.token(endpoint).await {
                Ok(token) => Claims::from_jwt(&token).unwrap_or_else(|e| {
                    warn!("Could not determine the authenticated principal: {e}");
                    Claims::default()
                }),
                Err(e) => return Err(ProviderError::from(e).context("Obtaining access token")),
            },
            (None, None) => Claims::default(),
        };

        debug!(
            "Configured {version} client for tenant {} (object ID {:?})",
            config.tenant_id, claims.object_id
        );

        let graph = GraphClient::new(transport, version, endpoint, config.tenant_id.clone());

        Ok(Client {
            tenant_id: config.tenant_id,
            client_id: config.client_id,
            claims,
            applications: ApplicationsClient::new(graph.clone()),
            groups: GroupsClient::new(graph.clone()),
            service_principals: ServicePrincipalsClient::new(graph.clone()),
            domains: DomainsClient::new(graph),
            locks: Arc::new(NamedLocks::new()),
            version,
        })
    }
}
