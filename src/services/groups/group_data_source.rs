use crate::clients::Client;
use crate::error::{ErrorContext, ProviderError, ProviderResult};
use crate::helpers::odata_eq;
use crate::provider::DataSourceHandler;
use crate::schema::{Attribute, AttributeType, Schema, Validator};
use crate::state::ResourceData;
use async_trait::async_trait;

const LOOKUP: &[&str] = &["object_id", "name"];

/// Looks up a group by object id or display name.
pub struct GroupDataSource;

#[async_trait]
impl DataSourceHandler for GroupDataSource {
    fn type_name(&self) -> &'static str {
        "azuread_group"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with(
                Attribute::optional_string("object_id")
                    .computed()
                    .with_validator(Validator::Uuid)
                    .exactly_one_of(LOOKUP),
            )
            .with(
                Attribute::optional_string("name")
                    .computed()
                    .with_validator(Validator::NoEmptyStrings)
                    .exactly_one_of(LOOKUP),
            )
            .with(Attribute::computed_string("description"))
            .with(Attribute::computed_only("members", AttributeType::StringSet))
            .with(Attribute::computed_only("owners", AttributeType::StringSet))
    }

    async fn read(&self, client: &Client, data: &mut ResourceData) -> ProviderResult<()> {
        let group = if let Some(object_id) = data.get_string("object_id") {
            client
                .groups
                .get(&object_id)
                .await
                .with_context(|| format!("Retrieving group with object ID {object_id:?}"))
                .at("object_id")?
                .ok_or_else(|| ProviderError::not_found("Group", &object_id).at("object_id"))?
        } else {
            let name = data.get_string("name").unwrap_or_default();
            let filter = odata_eq("displayName", &name);
            let mut groups = client
                .groups
                .find_by_name(&name)
                .await
                .with_context(|| format!("Listing groups for filter {filter:?}"))?;

            match groups.len() {
                0 => {
                    return Err(ProviderError::NoMatch {
                        kind: "groups".to_string(),
                        filter,
                    }
                    .context("Group not found"));
                }
                1 => groups.remove(0),
                _ => {
                    return Err(ProviderError::MultipleMatches {
                        kind: "groups".to_string(),
                        filter,
                    }
                    .context("Multiple groups found"));
                }
            }
        };

        let id = group
            .id
            .ok_or_else(|| ProviderError::bad_response("Object ID returned for group is nil"))?;

        data.set_id(id.clone());
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

        Ok(())
    }
}
