use crate::clients::{ApiResult, GraphClient};
use crate::models::Domain;

const COLLECTION: &str = "domains";

#[derive(Debug, Clone)]
pub struct DomainsClient {
    graph: GraphClient,
}

impl DomainsClient {
    pub fn new(graph: GraphClient) -> Self {
        Self { graph }
    }

    pub async fn list(&self) -> ApiResult<Vec<Domain>> {
        self.graph.list(COLLECTION, None).await
    }
}
