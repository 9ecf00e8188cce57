use crate::clients::Client;
use crate::error::{ErrorContext, ProviderError, ProviderResult};
use crate::models::Domain;
use crate::provider::DataSourceHandler;
use crate::schema::{Attribute, AttributeType, Schema};
use crate::state::ResourceData;
use async_trait::async_trait;
use serde_json::{Value, json};

/// Lists the tenant's domains, optionally filtered.
pub struct DomainsDataSource;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DomainFilter {
    include_unverified: bool,
    only_default: bool,
    only_initial: bool,
}

impl DomainFilter {
    fn from_data(data: &ResourceData) -> Self {
        Self {
            include_unverified: data.get_bool("include_unverified"),
            only_default: data.get_bool("only_default"),
            only_initial: data.get_bool("only_initial"),
        }
    }

    fn matches(&self, domain: &Domain) -> bool {
        if !self.include_unverified && domain.is_verified != Some(true) {
            return false;
        }
        if self.only_default && domain.is_default != Some(true) {
            return false;
        }
        if self.only_initial && domain.is_initial != Some(true) {
            return false;
        }
        true
    }
}

fn flatten_domain(domain: &Domain) -> Value {
    json!({
        "domain_name": domain.id,
        "authentication_type": domain.authentication_type,
        "is_default": domain.is_default.unwrap_or(false),
        "is_initial": domain.is_initial.unwrap_or(false),
        "is_verified": domain.is_verified.unwrap_or(false),
    })
}

#[async_trait]
impl DataSourceHandler for DomainsDataSource {
    fn type_name(&self) -> &'static str {
        "azuread_domains"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(Attribute::optional_bool("include_unverified").with_default(json!(false)))
            .with(
                Attribute::optional_bool("only_default")
                    .with_default(json!(false))
                    .conflicts_with(&["only_initial"]),
            )
            .with(
                Attribute::optional_bool("only_initial")
                    .with_default(json!(false))
                    .conflicts_with(&["only_default"]),
            )
            .with(Attribute::computed_only("domains", AttributeType::Block))
    }

    async fn read(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let filter = DomainFilter::from_data(data);

        let domains: Vec<Value> = client
            .domains
            .list()
            .await
            .context("Listing domains")?
            .iter()
            .filter(|d| filter.matches(d))
            .map(flatten_domain)
            .collect();

        if domains.is_empty() {
            return Err(ProviderError::bad_response(
                "No domains were returned for the provided filters",
            )
            .context("Listing domains"));
        }

        data.set_id(format!(
            "domains-{}-{}-{}-{}",
            client.tenant_id, filter.include_unverified, filter.only_default, filter.only_initial
        ));
        data.set("domains", Value::Array(domains));

        Ok(())
    }
}
