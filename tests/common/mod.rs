//! Shared test utilities for provider integration tests.
//!
//! Every test drives a [`Provider`] backed by an [`InMemoryDirectory`], so
//! handlers run end to end through the Graph client, dialect translation and
//! pagination without network access.

#![allow(dead_code)]

pub mod acceptance;

use azuread_provider::clients::{ApiVersion, Claims, Client, InMemoryDirectory, ProviderConfig};
use azuread_provider::provider::Provider;
use serde_json::{Map, Value};
use std::sync::Arc;

pub use acceptance::{ExistsInDirectory, ResourceTest, Step, TestData};

pub const TENANT_ID: &str = "00000000-0000-0000-0000-00000000000a";
pub const CLIENT_ID: &str = "00000000-0000-0000-0000-00000000000b";
pub const CALLER_OBJECT_ID: &str = "00000000-0000-0000-0000-00000000000c";

pub const BOTH_VERSIONS: [ApiVersion; 2] = [ApiVersion::AadGraph, ApiVersion::MsGraph];

/// Initialize logging once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A provider talking to a fresh in-memory directory with the given dialect.
pub async fn provider(version: ApiVersion) -> (Provider, InMemoryDirectory) {
    provider_with(InMemoryDirectory::new(), version).await
}

/// A provider talking to `directory` with the given dialect.
pub async fn provider_with(
    directory: InMemoryDirectory,
    version: ApiVersion,
) -> (Provider, InMemoryDirectory) {
    init_logging();

    let config = ProviderConfig::new(TENANT_ID, CLIENT_ID)
        .with_microsoft_graph(version == ApiVersion::MsGraph);
    let client = Client::builder(config)
        .transport(Arc::new(directory.clone()))
        .claims(Claims {
            object_id: Some(CALLER_OBJECT_ID.to_string()),
            tenant_id: Some(TENANT_ID.to_string()),
            app_id: Some(CLIENT_ID.to_string()),
        })
        .build()
        .await
        .unwrap();

    (Provider::new(client), directory)
}

/// Convert a JSON object literal into a configuration map.
pub fn config(value: Value) -> Map<String, Value> {
    value
        .as_object()
        .cloned()
        .expect("configuration must be a JSON object")
}

/// A string set attribute as a sorted vector, for order-independent comparisons.
pub fn string_set(attributes: &Map<String, Value>, key: &str) -> Vec<String> {
    let mut items: Vec<String> = attributes
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    items.sort();
    items
}

/// Sorted copy of `ids`.
pub fn sorted(ids: &[String]) -> Vec<String> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids
}
