//! Service principals and the client configuration data source.

mod client;
mod client_config_data_source;
mod service_principal_data_source;
mod service_principal_resource;

pub use client::ServicePrincipalsClient;
pub use client_config_data_source::ClientConfigDataSource;
pub use service_principal_data_source::ServicePrincipalDataSource;
pub use service_principal_resource::{SERVICE_PRINCIPAL_RESOURCE_NAME, ServicePrincipalResource};
