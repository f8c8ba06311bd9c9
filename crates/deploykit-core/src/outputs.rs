//! Provisioner output values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Output key -> JSON value, as produced by `terraform output -json`.
///
/// Lookups never fail: a missing key yields `None` or the caller's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvisionOutputs(BTreeMap<String, Value>);

impl ProvisionOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the `value` field of every entry in a `terraform output -json`
    /// document. Entries without `value` are skipped; a non-object document
    /// yields an empty mapping.
    pub fn from_terraform_json(document: &Value) -> Self {
        let Some(entries) = document.as_object() else {
            return Self::default();
        };
        entries
            .iter()
            .filter_map(|(key, entry)| entry.get("value").map(|v| (key.clone(), v.clone())))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`. Numbers and booleans are stringified; empty
    /// strings, nulls and structured values count as absent.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.get_str(key).unwrap_or_else(|| default.to_string())
    }

    /// Truthiness of a flag output: JSON `true` or the string `"true"`.
    pub fn flag(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ProvisionOutputs {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        ProvisionOutputs(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
