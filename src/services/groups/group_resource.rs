use crate::clients::Client;
use crate::error::{ErrorContext, ProviderError, ProviderResult, ValidationError};
use crate::helpers::SetDiff;
use crate::ids::validate_uuid;
use crate::models::Group;
use crate::provider::ResourceHandler;
use crate::schema::{Attribute, Schema, Validator};
use crate::state::ResourceData;
use async_trait::async_trait;
use log::debug;
use serde_json::{Value, json};

pub const GROUP_RESOURCE_NAME: &str = "azuread_group";

/// Security groups with managed members and owners.
pub struct GroupResource;

/// Fail when a group named `name` already exists.
pub(crate) async fn ensure_unique_name(client: &Client, name: &str) -> ProviderResult<()> {
    let existing = client
        .groups
        .find_by_name(name)
        .await
        .with_context(|| format!("Checking for existing group with name {name:?}"))?;

    if let Some(group) = existing.into_iter().next() {
        return Err(ProviderError::DuplicateName {
            kind: "Group".to_string(),
            name: name.to_string(),
            object_id: group.id.unwrap_or_default(),
        }
        .at("name"));
    }
    Ok(())
}

impl GroupResource {
    async fn sync_members(client: &Client, id: &str, data: &ResourceData) -> ProviderResult<()> {
        let current = client
            .groups
            .member_ids(id)
            .await
            .with_context(|| format!("Retrieving members for group with object ID {id:?}"))?;
        let diff = SetDiff::between(&current, &data.get_string_set("members"));
        if diff.is_empty() {
            return Ok(());
        }

        debug!(
            "Group {id}: adding {} and removing {} members",
            diff.to_add.len(),
            diff.to_remove.len()
        );
        client
            .groups
            .add_members(id, &diff.to_add)
            .await
            .with_context(|| format!("Adding members to group with object ID {id:?}"))?;
        client
            .groups
            .remove_members(id, &diff.to_remove)
            .await
            .with_context(|| format!("Removing members from group with object ID {id:?}"))
    }

    async fn sync_owners(client: &Client, id: &str, data: &ResourceData) -> ProviderResult<()> {
        let current = client
            .groups
            .owner_ids(id)
            .await
            .with_context(|| format!("Retrieving owners for group with object ID {id:?}"))?;
        let diff = SetDiff::between(&current, &data.get_string_set("owners"));
        if diff.is_empty() {
            return Ok(());
        }

        client
            .groups
            .add_owners(id, &diff.to_add)
            .await
            .with_context(|| format!("Adding owners to group with object ID {id:?}"))?;
        client
            .groups
            .remove_owners(id, &diff.to_remove)
            .await
            .with_context(|| format!("Removing owners from group with object ID {id:?}"))
    }
}

#[async_trait]
impl ResourceHandler for GroupResource {
    fn type_name(&self) -> &'static str {
        GROUP_RESOURCE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(
                Attribute::required_string("name")
                    .force_new()
                    .with_validator(Validator::NoEmptyStrings),
            )
            .with(Attribute::optional_string("description"))
            .with(
                Attribute::optional_string_set("members")
                    .computed()
                    .with_validator(Validator::Uuid),
            )
            .with(
                Attribute::optional_string_set("owners")
                    .computed()
                    .with_validator(Validator::Uuid),
            )
            .with(Attribute::optional_bool("prevent_duplicate_names").with_default(json!(false)))
            .with(Attribute::computed_string("object_id"))
    }

    async fn create(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let name = data
            .get_string("name")
            .ok_or_else(|| ValidationError::missing_required("name"))?;

        if data.get_bool("prevent_duplicate_names") {
            ensure_unique_name(client, &name).await?;
        }

        let properties = Group {
            display_name: Some(name.clone()),
            description: data.get_string("description"),
            mail_enabled: Some(false),
            mail_nickname: Some(uuid::Uuid::new_v4().to_string()),
            security_enabled: Some(true),
            ..Default::default()
        };

        let group = client
            .groups
            .create(&properties)
            .await
            .with_context(|| format!("Creating group {name:?}"))?;
        let id = group
            .id
            .ok_or_else(|| ProviderError::bad_response("Object ID returned for group is nil"))?;
        data.set_id(id.clone());

        {
            let _lock = client.locks.lock(GROUP_RESOURCE_NAME, &id).await;
            // owners first so that the caller keeps control of the group
            let owners: Vec<String> = data.get_string_set("owners").into_iter().collect();
            client
                .groups
                .add_owners(&id, &owners)
                .await
                .with_context(|| format!("Adding owners to group with object ID {id:?}"))?;

            let members: Vec<String> = data.get_string_set("members").into_iter().collect();
            client
                .groups
                .add_members(&id, &members)
                .await
                .with_context(|| format!("Adding members to group with object ID {id:?}"))?;
        }

        self.read(client, data).await
    }

    async fn read(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let Some(id) = data.id().map(str::to_string) else {
            return Ok(());
        };

        let Some(group) = client
            .groups
            .get(&id)
            .await
            .with_context(|| format!("Retrieving group with object ID {id:?}"))?
        else {
            debug!("Group with ID {id:?} was not found - removing from state!");
            data.clear_id();
            return Ok(());
        };

        data.set("object_id", id.clone());
        data.set_opt("name", group.display_name);
        data.set_opt("description", group.description);

        let members = client
            .groups
            .member_ids(&id)
            .await
            .with_context(|| format!("Retrieving members for group with object ID {id:?}"))?;
        data.set_string_set("members", members);

        let owners = client
            .groups
            .owner_ids(&id)
            .await
            .with_context(|| format!("Retrieving owners for group with object ID {id:?}"))?;
        data.set_string_set("owners", owners);

        if !data.is_set("prevent_duplicate_names") {
            data.set("prevent_duplicate_names", false);
        }

        Ok(())
    }

    async fn update(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let id = data
            .id()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::bad_response("updating a group without an ID"))?;

        if data.has_change("description") {
            let description = data.get_string("description").map_or(Value::Null, Value::from);
            client
                .groups
                .update(&id, &json!({ "description": description }))
                .await
                .with_context(|| format!("Updating group with object ID {id:?}"))?;
        }

        if data.has_change("members") || data.has_change("owners") {
            let _lock = client.locks.lock(GROUP_RESOURCE_NAME, &id).await;
            if data.has_change("members") {
                Self::sync_members(client, &id, data).await?;
            }
            if data.has_change("owners") {
                Self::sync_owners(client, &id, data).await?;
            }
        }

        self.read(client, data).await
    }

    async fn delete(&self, client: &Client, data: &ResourceData) -> ProviderResult<()> {
        let Some(id) = data.id() else {
            return Ok(());
        };

        let deleted = client
            .groups
            .delete(id)
            .await
            .with_context(|| format!("Deleting group with object ID {id:?}"))?;
        if !deleted {
            debug!("Group with ID {id:?} was already gone");
        }
        Ok(())
    }

    fn validate_import_id(&self, id: &str) -> ProviderResult<()> {
        Ok(validate_uuid("id", id)?)
    }
}
