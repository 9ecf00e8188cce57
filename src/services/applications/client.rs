use crate::clients::{ApiResult, GraphClient};
use crate::helpers::odata_eq;
use crate::models::Application;
use crate::services::groups::object_ids;
use serde::Serialize;
use std::collections::BTreeSet;

const COLLECTION: &str = "applications";

/// Application registrations and their owners.
#[derive(Debug, Clone)]
pub struct ApplicationsClient {
    graph: GraphClient,
}

impl ApplicationsClient {
    pub fn new(graph: GraphClient) -> Self {
        Self { graph }
    }

    pub async fn get(&self, id: &str) -> ApiResult<Option<Application>> {
        self.graph.get(COLLECTION, id).await
    }

    pub async fn list(&self, filter: Option<&str>) -> ApiResult<Vec<Application>> {
        self.graph.list(COLLECTION, filter).await
    }

    /// Applications whose display name is exactly `name`.
    pub async fn find_by_name(&self, name: &str) -> ApiResult<Vec<Application>> {
        let apps = self.list(Some(&odata_eq("displayName", name))).await?;
        Ok(apps
            .into_iter()
            .filter(|a| a.display_name.as_deref() == Some(name))
            .collect())
    }

    pub async fn create(&self, application: &Application) -> ApiResult<Application> {
        self.graph.create(COLLECTION, application).await
    }

    pub async fn update<B: Serialize + Sync>(&self, id: &str, patch: &B) -> ApiResult<()> {
        self.graph.update(COLLECTION, id, patch).await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<bool> {
        self.graph.delete(COLLECTION, id).await
    }

    pub async fn owner_ids(&self, id: &str) -> ApiResult<BTreeSet<String>> {
        let owners = self.graph.list_refs(COLLECTION, id, "owners").await?;
        Ok(object_ids(owners))
    }

    pub async fn add_owners(&self, id: &str, owners: &[String]) -> ApiResult<()> {
        for owner in owners {
            self.graph.add_ref(COLLECTION, id, "owners", owner).await?;
        }
        Ok(())
    }

    pub async fn remove_owners(&self, id: &str, owners: &[String]) -> ApiResult<()> {
        for owner in owners {
            self.graph.remove_ref(COLLECTION, id, "owners", owner).await?;
        }
        Ok(())
    }
}
