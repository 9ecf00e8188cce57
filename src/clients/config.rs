//! Provider configuration and cloud environments.

use crate::error::{ProviderError, ProviderResult};
use crate::ids::validate_uuid;
use std::str::FromStr;

/// The Azure cloud the provider talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Global,
    UsGovernment,
    China,
    Germany,
}

impl Environment {
    pub fn login_endpoint(&self) -> &'static str {
        match self {
            Self::Global => "https://login.microsoftonline.com",
            Self::UsGovernment => "https://login.microsoftonline.us",
            Self::China => "https://login.chinacloudapi.cn",
            Self::Germany => "https://login.microsoftonline.de",
        }
    }

    pub fn aad_graph_endpoint(&self) -> &'static str {
        match self {
            Self::Global | Self::UsGovernment => "https://graph.windows.net",
            Self::China => "https://graph.chinacloudapi.cn",
            Self::Germany => "https://graph.cloudapi.de",
        }
    }

    pub fn ms_graph_endpoint(&self) -> &'static str {
        match self {
            Self::Global => "https://graph.microsoft.com",
            Self::UsGovernment => "https://graph.microsoft.us",
            Self::China => "https://microsoftgraph.chinacloudapi.cn",
            Self::Germany => "https://graph.microsoft.de",
        }
    }
}

impl FromStr for Environment {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "public" | "global" => Ok(Self::Global),
            "usgovernment" | "usgovernmentl4" | "usgovernmentl5" => Ok(Self::UsGovernment),
            "china" => Ok(Self::China),
            "german" | "germany" => Ok(Self::Germany),
            other => Err(ProviderError::config(format!(
                "unknown environment {other:?}, expected one of public, usgovernment, china, german"
            ))),
        }
    }
}

/// Settings the provider is configured with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Bypasses the client credentials flow when set
    pub access_token: Option<String>,
    pub environment: Environment,
    /// Use Microsoft Graph instead of the legacy AAD Graph
    pub use_microsoft_graph: bool,
    pub partner_id: Option<String>,
}

impl ProviderConfig {
    pub fn new(tenant_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            ..Default::default()
        }
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_microsoft_graph(mut self, enabled: bool) -> Self {
        self.use_microsoft_graph = enabled;
        self
    }

    pub fn with_partner_id(mut self, partner_id: impl Into<String>) -> Self {
        self.partner_id = Some(partner_id.into());
        self
    }

    /// Read the configuration from the `ARM_*` environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> ProviderResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let config = Self {
            tenant_id: non_empty("ARM_TENANT_ID").unwrap_or_default(),
            client_id: non_empty("ARM_CLIENT_ID").unwrap_or_default(),
            client_secret: non_empty("ARM_CLIENT_SECRET"),
            access_token: non_empty("ARM_ACCESS_TOKEN"),
            environment: non_empty("ARM_ENVIRONMENT")
                .map(|e| e.parse())
                .transpose()?
                .unwrap_or_default(),
            use_microsoft_graph: non_empty("ARM_USE_MSGRAPH")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true"))
                .unwrap_or(false),
            partner_id: non_empty("ARM_PARTNER_ID"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ProviderResult<()> {
        validate_uuid("tenant_id", &self.tenant_id)?;
        validate_uuid("client_id", &self.client_id)?;

        if self.client_secret.is_none() && self.access_token.is_none() {
            return Err(ProviderError::config(
                "one of `client_secret` or `access_token` must be configured",
            ));
        }

        if let Some(partner_id) = &self.partner_id {
            validate_uuid("partner_id", partner_id)?;
        }

        Ok(())
    }
}
