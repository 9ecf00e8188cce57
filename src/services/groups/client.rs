use crate::clients::{ApiResult, GraphClient};
use crate::helpers::odata_eq;
use crate::models::{DirectoryObject, Group};
use serde::Serialize;
use std::collections::BTreeSet;

const COLLECTION: &str = "groups";

/// Groups, their members and their owners.
#[derive(Debug, Clone)]
pub struct GroupsClient {
    graph: GraphClient,
}

impl GroupsClient {
    pub fn new(graph: GraphClient) -> Self {
        Self { graph }
    }

    pub async fn get(&self, id: &str) -> ApiResult<Option<Group>> {
        self.graph.get(COLLECTION, id).await
    }

    pub async fn list(&self, filter: Option<&str>) -> ApiResult<Vec<Group>> {
        self.graph.list(COLLECTION, filter).await
    }

    /// Groups whose display name is exactly `name`.
    pub async fn find_by_name(&self, name: &str) -> ApiResult<Vec<Group>> {
        let groups = self.list(Some(&odata_eq("displayName", name))).await?;
        Ok(groups
            .into_iter()
            .filter(|g| g.display_name.as_deref() == Some(name))
            .collect())
    }

    pub async fn create(&self, group: &Group) -> ApiResult<Group> {
        self.graph.create(COLLECTION, group).await
    }

    pub async fn update<B: Serialize + Sync>(&self, id: &str, patch: &B) -> ApiResult<()> {
        self.graph.update(COLLECTION, id, patch).await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<bool> {
        self.graph.delete(COLLECTION, id).await
    }

    pub async fn list_members(&self, id: &str) -> ApiResult<Vec<DirectoryObject>> {
        self.graph.list_refs(COLLECTION, id, "members").await
    }

    pub async fn list_owners(&self, id: &str) -> ApiResult<Vec<DirectoryObject>> {
        self.graph.list_refs(COLLECTION, id, "owners").await
    }

    /// Object ids of the members of a group.
    pub async fn member_ids(&self, id: &str) -> ApiResult<BTreeSet<String>> {
        Ok(object_ids(self.list_members(id).await?))
    }

    pub async fn owner_ids(&self, id: &str) -> ApiResult<BTreeSet<String>> {
        Ok(object_ids(self.list_owners(id).await?))
    }

    pub async fn add_members(&self, id: &str, members: &[String]) -> ApiResult<()> {
        for member in members {
            self.graph.add_ref(COLLECTION, id, "members", member).await?;
        }
        Ok(())
    }

    pub async fn remove_members(&self, id: &str, members: &[String]) -> ApiResult<()> {
        for member in members {
            self.graph.remove_ref(COLLECTION, id, "members", member).await?;
        }
        Ok(())
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

pub(crate) fn object_ids(objects: Vec<DirectoryObject>) -> BTreeSet<String> {
    objects.into_iter().filter_map(|o| o.id).collect()
}
