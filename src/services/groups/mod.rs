//! Groups: the `azuread_group` resource and data source.

mod client;
mod group_data_source;
mod group_resource;

pub use client::GroupsClient;
pub(crate) use client::object_ids;
pub use group_data_source::GroupDataSource;
pub use group_resource::{GROUP_RESOURCE_NAME, GroupResource};
