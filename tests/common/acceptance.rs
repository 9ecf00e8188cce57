//! A small acceptance test runner.
//!
//! A [`ResourceTest`] applies a sequence of configurations to one resource
//! address, the way a plan/apply cycle would: the first step creates, later
//! steps update in place or replace when a force-new attribute changed. After
//! every successful step the state is refreshed and must not drift, and the
//! remote object must exist. Dropping out of the sequence destroys the
//! resource and checks it is gone.

use azuread_provider::ids::CredentialId;
use azuread_provider::provider::{Provider, ResourceState};
use azuread_provider::clients::InMemoryDirectory;
use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value};

/// Identifies one test resource.
#[derive(Debug, Clone)]
pub struct TestData {
    pub random_integer: u32,
    pub resource_type: &'static str,
    pub resource_label: &'static str,
}

impl TestData {
    pub fn new(resource_type: &'static str, resource_label: &'static str) -> Self {
        let bytes = uuid::Uuid::new_v4().into_bytes();
        Self {
            random_integer: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            resource_type,
            resource_label,
        }
    }

    /// `azuread_group.test`
    pub fn resource_name(&self) -> String {
        format!("{}.{}", self.resource_type, self.resource_label)
    }

    /// A display name unique to this test run, e.g. `acctestGroup-1234`.
    pub fn name(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.random_integer)
    }

    /// Render `attributes` as an HCL resource block.
    pub fn render_hcl(&self, attributes: &Map<String, Value>) -> String {
        let mut hcl = format!(
            "resource {:?} {:?} {{\n",
            self.resource_type, self.resource_label
        );
        let width = attributes.keys().map(String::len).max().unwrap_or(0);
        for (key, value) in attributes {
            hcl.push_str(&format!("  {key:width$} = {}\n", render_value(value)));
        }
        hcl.push_str("}\n");
        hcl
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{k} = {}", render_value(v)))
                .collect();
            format!("{{ {} }}", fields.join(", "))
        }
        other => other.to_string(),
    }
}

/// How to tell whether a resource's remote object exists.
#[async_trait]
pub trait ExistsInDirectory: Send + Sync {
    async fn exists(&self, directory: &InMemoryDirectory, id: &str) -> bool;
}

/// The resource id is the object id within `collection`.
pub struct DirectoryObject(pub &'static str);

#[async_trait]
impl ExistsInDirectory for DirectoryObject {
    async fn exists(&self, directory: &InMemoryDirectory, id: &str) -> bool {
        directory.object(self.0, id).await.is_some()
    }
}

/// The resource id is a credential id whose key lives in `field` of an application.
pub struct ApplicationCredential(pub &'static str);

#[async_trait]
impl ExistsInDirectory for ApplicationCredential {
    async fn exists(&self, directory: &InMemoryDirectory, id: &str) -> bool {
        let Ok(id) = id.parse::<CredentialId>() else {
            return false;
        };
        let Some(app) = directory.object("applications", &id.object_id).await else {
            return false;
        };
        app.get(self.0)
            .and_then(Value::as_array)
            .is_some_and(|creds| creds.iter().any(|c| c["keyId"] == id.key_id.as_str()))
    }
}

pub enum Step {
    /// Apply a configuration, creating, updating or replacing as needed
    Apply(Map<String, Value>),
    /// Apply a configuration and expect an error containing the given text
    ApplyExpectError(Map<String, Value>, &'static str),
    /// Import by id and compare with the current state, ignoring some attributes
    ImportVerify(&'static [&'static str]),
}

pub struct ResourceTest<'a> {
    pub provider: &'a Provider,
    pub directory: &'a InMemoryDirectory,
    pub data: TestData,
    pub check: Box<dyn ExistsInDirectory + 'a>,
    pub state: Option<ResourceState>,
}

impl<'a> ResourceTest<'a> {
    pub fn new(
        provider: &'a Provider,
        directory: &'a InMemoryDirectory,
        data: TestData,
        check: impl ExistsInDirectory + 'a,
    ) -> Self {
        Self {
            provider,
            directory,
            data,
            check: Box::new(check),
            state: None,
        }
    }

    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> &ResourceState {
        self.state.as_ref().expect("no steps applied yet")
    }

    async fn apply(&mut self, config: &Map<String, Value>) -> Result<(), String> {
        debug!("applying\n{}", self.data.render_hcl(config));
        let type_name = self.data.resource_type;

        let result = match self.state.clone() {
            None => self.provider.create(type_name, config).await,
            Some(prior) => {
                let replace = self
                    .provider
                    .requires_replacement(type_name, &prior, config)
                    .map_err(|e| e.to_string())?;
                if replace {
                    self.provider
                        .delete(type_name, &prior)
                        .await
                        .map_err(|e| e.to_string())?;
                    self.state = None;
                    self.provider.create(type_name, config).await
                } else {
                    self.provider.update(type_name, &prior, config).await
                }
            }
        };

        match result {
            Ok(state) => {
                self.state = Some(state);
                Ok(())
            }
            Err(e) => {
                // a half-created object is still ours to destroy
                if let Some(tainted) = e.tainted_state() {
                    self.state = Some(tainted.clone());
                }
                Err(e.to_string())
            }
        }
    }

    async fn assert_consistent(&self) {
        let state = self.state();
        assert!(
            self.check.exists(self.directory, &state.id).await,
            "{} {} does not exist",
            self.data.resource_name(),
            state.id
        );

        let refreshed = self
            .provider
            .read(self.data.resource_type, state)
            .await
            .unwrap()
            .expect("resource vanished on refresh");
        assert_eq!(&refreshed, state, "state drifted after refresh");
    }

    async fn import_verify(&self, ignore: &[&str]) {
        let state = self.state();
        let imported = self
            .provider
            .import(self.data.resource_type, &state.id)
            .await
            .unwrap();
        assert_eq!(imported.id, state.id);

        for (key, value) in &state.attributes {
            if ignore.contains(&key.as_str()) || value.is_null() {
                continue;
            }
            assert_eq!(
                imported.attributes.get(key),
                Some(value),
                "imported {key:?} differs"
            );
        }
    }

    /// Run every step, then destroy the resource.
    pub async fn run(mut self, steps: Vec<Step>) {
        self.run_steps(steps).await;
        self.destroy().await;
    }

    /// Run every step, keeping the resource for further checks.
    pub async fn run_steps(&mut self, steps: Vec<Step>) {
        for step in steps {
            match step {
                Step::Apply(config) => {
                    if let Err(e) = self.apply(&config).await {
                        panic!("applying {}: {e}", self.data.resource_name());
                    }
                    self.assert_consistent().await;
                }
                Step::ApplyExpectError(config, expected) => match self.apply(&config).await {
                    Ok(()) => panic!("expected an error containing {expected:?}"),
                    Err(e) => assert!(e.contains(expected), "unexpected error: {e}"),
                },
                Step::ImportVerify(ignore) => self.import_verify(ignore).await,
            }
        }
    }

    pub async fn destroy(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        self.provider
            .delete(self.data.resource_type, &state)
            .await
            .unwrap();
        assert!(
            !self.check.exists(self.directory, &state.id).await,
            "{} {} still exists after destroy",
            self.data.resource_name(),
            state.id
        );
    }
}
