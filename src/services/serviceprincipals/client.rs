use crate::clients::{ApiResult, GraphClient};
use crate::helpers::odata_eq;
use crate::models::ServicePrincipal;
use serde::Serialize;

const COLLECTION: &str = "servicePrincipals";

#[derive(Debug, Clone)]
pub struct ServicePrincipalsClient {
    graph: GraphClient,
}

impl ServicePrincipalsClient {
    pub fn new(graph: GraphClient) -> Self {
        Self { graph }
    }

    pub async fn get(&self, id: &str) -> ApiResult<Option<ServicePrincipal>> {
        self.graph.get(COLLECTION, id).await
    }

    pub async fn list(&self, filter: Option<&str>) -> ApiResult<Vec<ServicePrincipal>> {
        self.graph.list(COLLECTION, filter).await
    }

    /// The first service principal whose `appId` is exactly `application_id`.
    pub async fn find_by_app_id(&self, application_id: &str) -> ApiResult<Option<ServicePrincipal>> {
        let principals = self.list(Some(&odata_eq("appId", application_id))).await?;
        Ok(principals
            .into_iter()
            .find(|sp| sp.app_id.as_deref() == Some(application_id)))
    }

    pub async fn create(&self, principal: &ServicePrincipal) -> ApiResult<ServicePrincipal> {
        self.graph.create(COLLECTION, principal).await
    }

    pub async fn update<B: Serialize + Sync>(&self, id: &str, patch: &B) -> ApiResult<()> {
        self.graph.update(COLLECTION, id, patch).await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<bool> {
        self.graph.delete(COLLECTION, id).await
    }
}
