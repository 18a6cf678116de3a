//! Attribute access for a single resource or data source instance.

use crate::error::{ProviderError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const ID_ATTRIBUTE: &str = "id";

/// The attributes of one resource instance, plus its prior state during an
/// update.
///
/// Unset attributes read as the zero value of their accessor (`""`, `0`,
/// `false`, empty collections), mirroring how Terraform treats them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    values: Map<String, Value>,
    prior: Option<Map<String, Value>>,
}

/// Whether `value` is the zero value of its type.
#[must_use]
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

impl ResourceData {
    /// Wrap an attribute map.
    #[must_use]
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values,
            prior: None,
        }
    }

    /// Wrap planned attributes together with the prior state.
    #[must_use]
    pub fn with_prior(values: Map<String, Value>, prior: Map<String, Value>) -> Self {
        Self {
            values,
            prior: Some(prior),
        }
    }

    /// Build from a JSON value, which must be an object (or null for empty).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Decode`] for any other JSON shape.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self::new(values)),
            Value::Null => Ok(Self::default()),
            other => Err(ProviderError::decode(
                "state",
                format!("expected an object, got {other}"),
            )),
        }
    }

    /// Resource ID, empty when the resource does not exist.
    #[must_use]
    pub fn id(&self) -> &str {
        self.get_str(ID_ATTRIBUTE)
    }

    /// Set the resource ID. An empty ID marks the resource as gone.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.set(ID_ATTRIBUTE, id.into());
    }

    /// Raw attribute value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// Attribute value if it is set to something other than its zero value.
    #[must_use]
    pub fn get_ok(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !is_zero(v))
    }

    /// Non-empty string attribute.
    #[must_use]
    pub fn get_ok_str(&self, key: &str) -> Option<&str> {
        self.get_ok(key).and_then(Value::as_str)
    }

    /// String attribute, `""` when unset.
    #[must_use]
    pub fn get_str(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// Integer attribute, `0` when unset.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> i64 {
        self.get(key).and_then(Value::as_i64).unwrap_or_default()
    }

    /// Boolean attribute, `false` when unset.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or_default()
    }

    /// List or set attribute, empty when unset.
    #[must_use]
    pub fn get_list(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Set attribute with duplicate elements removed, in first-seen order.
    #[must_use]
    pub fn get_set(&self, key: &str) -> Vec<Value> {
        dedup(self.get_list(key))
    }

    /// Set of strings, sorted.
    #[must_use]
    pub fn get_string_set(&self, key: &str) -> Vec<String> {
        string_set(self.get_list(key))
    }

    /// Map attribute with values rendered as strings.
    #[must_use]
    pub fn get_map(&self, key: &str) -> BTreeMap<String, String> {
        string_map(self.get(key))
    }

    /// The single block of a `max_items(1)` list, if present.
    #[must_use]
    pub fn get_block(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get_list(key).first().and_then(Value::as_object)
    }

    /// Value of `key` in the prior state.
    #[must_use]
    pub fn get_prior(&self, key: &str) -> Option<&Value> {
        self.prior
            .as_ref()
            .and_then(|prior| prior.get(key))
            .filter(|v| !v.is_null())
    }

    /// Whether `key` differs from the prior state. Without prior state every
    /// set attribute counts as changed.
    #[must_use]
    pub fn has_change(&self, key: &str) -> bool {
        match &self.prior {
            Some(_) => self.get(key) != self.get_prior(key),
            None => self.get(key).is_some(),
        }
    }

    /// Set an attribute.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Attribute map as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Consume into the attribute map.
    #[must_use]
    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }
}

/// Remove duplicates, keeping first occurrences.
#[must_use]
pub fn dedup(items: &[Value]) -> Vec<Value> {
    let mut seen: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !seen.contains(item) {
            seen.push(item.clone());
        }
    }
    seen
}

/// String elements of `items`, sorted and deduplicated.
#[must_use]
pub fn string_set(items: &[Value]) -> Vec<String> {
    let mut strings: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    strings.sort();
    strings.dedup();
    strings
}

/// Render a JSON object as a string map; non-string scalars are stringified
/// and nulls dropped.
#[must_use]
pub fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(k, v)| match v {
            Value::Null => None,
            Value::String(s) => Some((k.clone(), s.clone())),
            other => Some((k.clone(), other.to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> ResourceData {
        ResourceData::from_value(value).unwrap()
    }

    #[test]
    fn unset_attributes_read_as_zero_values() {
        let d = data(json!({}));
        assert_eq!(d.id(), "");
        assert_eq!(d.get_str("name"), "");
        assert_eq!(d.get_i64("port"), 0);
        assert!(!d.get_bool("only_passing"));
        assert!(d.get_list("tags").is_empty());
        assert!(d.get_map("meta").is_empty());
    }

    #[test]
    fn get_ok_skips_zero_values() {
        let d = data(json!({"datacenter": "", "port": 0, "name": "web", "tags": []}));
        assert!(d.get_ok("datacenter").is_none());
        assert!(d.get_ok("port").is_none());
        assert!(d.get_ok("tags").is_none());
        assert_eq!(d.get_ok_str("name"), Some("web"));
    }

    #[test]
    fn string_set_sorts_and_dedups() {
        let d = data(json!({"tags": ["b", "a", "b"]}));
        assert_eq!(d.get_string_set("tags"), vec!["a", "b"]);
    }

    #[test]
    fn map_values_are_stringified() {
        let d = data(json!({"meta": {"a": "x", "b": 2, "c": null}}));
        let map = d.get_map("meta");
        assert_eq!(map.get("a").map(String::as_str), Some("x"));
        assert_eq!(map.get("b").map(String::as_str), Some("2"));
        assert!(!map.contains_key("c"));
    }

    #[test]
    fn has_change_compares_with_prior() {
        let values = json!({"subkeys": {"a": "1"}, "path_prefix": "app/"});
        let prior = json!({"subkeys": {"a": "0"}, "path_prefix": "app/"});
        let (Value::Object(values), Value::Object(prior)) = (values, prior) else {
            unreachable!()
        };
        let d = ResourceData::with_prior(values, prior);
        assert!(d.has_change("subkeys"));
        assert!(!d.has_change("path_prefix"));
    }

    #[test]
    fn non_object_state_is_rejected() {
        assert!(ResourceData::from_value(json!([1, 2])).is_err());
        assert_eq!(ResourceData::from_value(Value::Null).unwrap(), ResourceData::default());
    }

    #[test]
    fn clearing_the_id() {
        let mut d = data(json!({"id": "abc"}));
        d.set_id("");
        assert_eq!(d.id(), "");
        assert_eq!(d.to_value()["id"], json!(""));
    }
}
