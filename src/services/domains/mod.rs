//! Domains registered with the tenant.

mod client;
mod domains_data_source;

pub use client::DomainsClient;
pub use domains_data_source::DomainsDataSource;
