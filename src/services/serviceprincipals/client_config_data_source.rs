use crate::clients::Client;
use crate::error::ProviderResult;
use crate::provider::DataSourceHandler;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceData;
use async_trait::async_trait;

/// Exposes the identity the provider authenticates as.
pub struct ClientConfigDataSource;

#[async_trait]
impl DataSourceHandler for ClientConfigDataSource {
    fn type_name(&self) -> &'static str {
        "azuread_client_config"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(Attribute::computed_string("tenant_id"))
            .with(Attribute::computed_string("client_id"))
            .with(Attribute::computed_string("object_id"))
    }

    async fn read(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let object_id = client.claims.object_id.clone().unwrap_or_default();

        data.set_id(format!("{}-{}-{}", client.tenant_id, client.client_id, object_id));
        data.set("tenant_id", client.tenant_id.clone());
        data.set("client_id", client.client_id.clone());
        data.set("object_id", object_id);

        Ok(())
    }
}
