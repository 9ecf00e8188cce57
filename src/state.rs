//! Resource data passed to and mutated by handlers.
//!
//! [`ResourceData`] holds the planned attribute values of a resource together
//! with the prior state, so handlers can ask whether an attribute changed and
//! compute minimal updates. Handlers write remote values back with the `set`
//! family of methods; the resulting map becomes the new state.

use crate::schema::{AttributeType, Schema};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: Option<String>,
    values: Map<String, Value>,
    prior: Map<String, Value>,
}

impl ResourceData {
    /// Resource data whose values and prior state are both `state`.
    pub fn from_state(id: Option<String>, state: Map<String, Value>) -> Self {
        Self {
            id,
            prior: state.clone(),
            values: state,
        }
    }

    /// Plan new values from user configuration and the prior state.
    ///
    /// Configured values win. Unconfigured computed attributes keep their prior
    /// value, and everything else falls back to the attribute default.
    pub fn planned(
        schema: &Schema,
        id: Option<String>,
        prior: &Map<String, Value>,
        config: &Map<String, Value>,
    ) -> Self {
        let mut values = Map::new();
        let mut prior = prior.clone();

        for attribute in &schema.attributes {
            if attribute.attr_type == AttributeType::StringSet {
                if let Some(old) = prior.get_mut(attribute.name) {
                    *old = normalize_set(old.take());
                }
            }

            let configured = config.get(attribute.name).filter(|v| !v.is_null());

            let value = match configured {
                Some(v) => Some(v.clone()),
                None if attribute.computed => prior.get(attribute.name).cloned(),
                None => attribute.default.clone(),
            };

            if let Some(mut value) = value {
                if attribute.attr_type == AttributeType::StringSet {
                    value = normalize_set(value);
                }
                values.insert(attribute.name.to_string(), value);
            }
        }

        Self { id, values, prior }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Mark the resource as gone so it is removed from state.
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    /// The non-null value of an attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// Whether the attribute holds a non-null value.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// A string attribute, treating the empty string as unset.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get_str(key)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        string_items(self.get(key))
    }

    pub fn get_string_set(&self, key: &str) -> BTreeSet<String> {
        string_items(self.get(key)).into_iter().collect()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Set an optional value, storing null when absent.
    pub fn set_opt<T: Into<Value>>(&mut self, key: &str, value: Option<T>) {
        let value = value.map(Into::into).unwrap_or(Value::Null);
        self.values.insert(key.to_string(), value);
    }

    /// Store a set of strings in canonical (sorted, deduplicated) order.
    pub fn set_string_set<I, S>(&mut self, key: &str, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = items.into_iter().map(Into::into).collect();
        self.set(key, Value::from(set.into_iter().collect::<Vec<_>>()));
    }

    pub fn set_string_list<I, S>(&mut self, key: &str, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<String> = items.into_iter().map(Into::into).collect();
        self.set(key, Value::from(list));
    }

    /// Whether the planned value of `key` differs from the prior state.
    ///
    /// Null, `false`, empty strings and empty lists are all treated as unset.
    pub fn has_change(&self, key: &str) -> bool {
        let old = self.prior.get(key).filter(|v| !is_zero(v));
        let new = self.values.get(key).filter(|v| !is_zero(v));
        old != new
    }

    /// Prior and planned values of a string set attribute.
    pub fn string_set_change(&self, key: &str) -> (BTreeSet<String>, BTreeSet<String>) {
        let old = string_items(self.prior.get(key)).into_iter().collect();
        (old, self.get_string_set(key))
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn string_items(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn normalize_set(value: Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut strings: Vec<Value> = items;
            strings.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
            strings.dedup();
            Value::Array(strings)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .with(Attribute::required_string("name"))
            .with(Attribute::optional_string("description"))
            .with(Attribute::optional_string_set("members").computed())
            .with(Attribute::optional_bool("prevent_duplicate_names").with_default(json!(false)))
            .with(Attribute::computed_string("object_id"))
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_planned_keeps_computed_and_applies_defaults() {
        let prior = map(json!({
            "name": "group",
            "description": "old",
            "members": ["b", "a"],
            "object_id": "123"
        }));
        let config = map(json!({"name": "group"}));

        let data = ResourceData::planned(&schema(), Some("123".to_string()), &prior, &config);

        assert_eq!(data.get_str("object_id"), Some("123"));
        assert_eq!(data.get_string_set("members").len(), 2);
        assert_eq!(data.get("prevent_duplicate_names"), Some(&json!(false)));
        // optional, not computed: dropping it from config removes it
        assert!(data.get("description").is_none());
        assert!(data.has_change("description"));
        assert!(!data.has_change("members"));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let prior = map(json!({"name": "g", "description": "", "owners": []}));
        let config = map(json!({"name": "g"}));

        let data = ResourceData::planned(&schema(), None, &prior, &config);
        assert!(!data.has_change("description"));
    }

    #[test]
    fn test_unordered_prior_set_is_not_a_change() {
        let prior = map(json!({"name": "g", "members": ["c", "a", "b", "a"]}));
        let config = map(json!({"name": "g", "members": ["a", "b", "c"]}));

        let data = ResourceData::planned(&schema(), None, &prior, &config);
        assert!(!data.has_change("members"));
    }

    #[test]
    fn test_false_matches_missing_bool() {
        let prior = map(json!({"name": "g"}));
        let config = map(json!({"name": "g"}));

        let data = ResourceData::planned(&schema(), None, &prior, &config);
        assert_eq!(data.get("prevent_duplicate_names"), Some(&json!(false)));
        assert!(!data.has_change("prevent_duplicate_names"));

        let config = map(json!({"name": "g", "prevent_duplicate_names": true}));
        let data = ResourceData::planned(&schema(), None, &prior, &config);
        assert!(data.has_change("prevent_duplicate_names"));
    }

    #[test]
    fn test_set_change_is_order_independent() {
        let prior = map(json!({"name": "g", "members": ["a", "b"]}));
        let config = map(json!({"name": "g", "members": ["b", "a", "a"]}));

        let data = ResourceData::planned(&schema(), None, &prior, &config);
        assert!(!data.has_change("members"));

        let (old, new) = data.string_set_change("members");
        assert_eq!(old, new);
    }

    #[test]
    fn test_explicit_empty_set_is_a_change() {
        let prior = map(json!({"name": "g", "members": ["a"]}));
        let config = map(json!({"name": "g", "members": []}));

        let data = ResourceData::planned(&schema(), None, &prior, &config);
        assert!(data.has_change("members"));
        assert!(data.get_string_set("members").is_empty());
    }

    #[test]
    fn test_setters() {
        let mut data = ResourceData::default();
        data.set_string_set("owners", ["z", "a", "z"]);
        data.set_opt::<String>("description", None);
        data.set_id("abc");

        assert_eq!(data.get("owners"), Some(&json!(["a", "z"])));
        assert!(!data.is_set("description"));
        assert_eq!(data.id(), Some("abc"));
        data.clear_id();
        assert_eq!(data.id(), None);
    }
}
