//! Tagged values for Terraform variables and Helm overrides.
//!
//! Both tools take loosely typed `key=value` assignments on the command line.
//! [`DeploymentValue`] keeps the type until the moment of rendering so the
//! serialization rules stay in one place:
//!
//! - booleans render as lowercase `true` / `false`
//! - lists and mappings render as compact JSON text
//! - `Null` is never rendered; callers skip the assignment entirely

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeploymentValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<DeploymentValue>),
    Map(BTreeMap<String, DeploymentValue>),
}

impl DeploymentValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DeploymentValue::Null)
    }

    /// True for lists and mappings.
    pub fn is_structured(&self) -> bool {
        matches!(self, DeploymentValue::List(_) | DeploymentValue::Map(_))
    }

    /// Render the right-hand side of a `key=value` assignment.
    ///
    /// Returns `None` for `Null`.
    pub fn render(&self) -> Option<String> {
        match self {
            DeploymentValue::Null => None,
            DeploymentValue::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
            DeploymentValue::Int(i) => Some(i.to_string()),
            DeploymentValue::Text(s) => Some(s.clone()),
            DeploymentValue::Float(_) | DeploymentValue::List(_) | DeploymentValue::Map(_) => {
                Some(self.to_json().to_string())
            }
        }
    }

    /// Convert into a `serde_json::Value`. Non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            DeploymentValue::Null => Value::Null,
            DeploymentValue::Bool(b) => Value::Bool(*b),
            DeploymentValue::Int(i) => Value::from(*i),
            DeploymentValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            DeploymentValue::Text(s) => Value::String(s.clone()),
            DeploymentValue::List(items) => {
                Value::Array(items.iter().map(DeploymentValue::to_json).collect())
            }
            DeploymentValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for DeploymentValue {
    fn from(value: bool) -> Self {
        DeploymentValue::Bool(value)
    }
}

impl From<i64> for DeploymentValue {
    fn from(value: i64) -> Self {
        DeploymentValue::Int(value)
    }
}

impl From<i32> for DeploymentValue {
    fn from(value: i32) -> Self {
        DeploymentValue::Int(i64::from(value))
    }
}

impl From<u32> for DeploymentValue {
    fn from(value: u32) -> Self {
        DeploymentValue::Int(i64::from(value))
    }
}

impl From<f64> for DeploymentValue {
    fn from(value: f64) -> Self {
        DeploymentValue::Float(value)
    }
}

impl From<&str> for DeploymentValue {
    fn from(value: &str) -> Self {
        DeploymentValue::Text(value.to_string())
    }
}

impl From<String> for DeploymentValue {
    fn from(value: String) -> Self {
        DeploymentValue::Text(value)
    }
}

impl<T: Into<DeploymentValue>> From<Vec<T>> for DeploymentValue {
    fn from(values: Vec<T>) -> Self {
        DeploymentValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<DeploymentValue>> From<BTreeMap<String, T>> for DeploymentValue {
    fn from(entries: BTreeMap<String, T>) -> Self {
        DeploymentValue::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<DeploymentValue>> From<Option<T>> for DeploymentValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DeploymentValue::Null)
    }
}

/// Input variables for the infrastructure provisioner, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DeploymentVariables(BTreeMap<String, DeploymentValue>);

impl DeploymentVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<DeploymentValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<DeploymentValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&DeploymentValue> {
        self.0.get(name)
    }

    /// Text value of a variable, if it is a non-empty string.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(DeploymentValue::Text(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DeploymentValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<DeploymentValue>> FromIterator<(K, V)> for DeploymentVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        DeploymentVariables(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_renders_lowercase() {
        assert_eq!(DeploymentValue::from(true).render().as_deref(), Some("true"));
        assert_eq!(DeploymentValue::from(false).render().as_deref(), Some("false"));
    }

    #[test]
    fn test_float_renders_like_list_element() {
        let whole = DeploymentValue::from(1.0);
        assert_eq!(whole.render().as_deref(), Some("1.0"));
        assert_eq!(DeploymentValue::from(0.25).render().as_deref(), Some("0.25"));
        assert_eq!(
            DeploymentValue::List(vec![whole]).render().as_deref(),
            Some("[1.0]")
        );
    }

    #[test]
    fn test_null_does_not_render() {
        assert_eq!(DeploymentValue::Null.render(), None);
        assert!(DeploymentValue::from(None::<String>).is_null());
    }

    #[test]
    fn test_list_renders_as_json() {
        let value = DeploymentValue::from(vec!["t3.large", "t3.xlarge"]);
        assert!(value.is_structured());
        assert_eq!(value.render().unwrap(), r#"["t3.large","t3.xlarge"]"#);
    }

    #[test]
    fn test_map_renders_as_json() {
        let mut tags = BTreeMap::new();
        tags.insert("Validator".to_string(), "validator-01");
        assert_eq!(
            DeploymentValue::from(tags).render().unwrap(),
            r#"{"Validator":"validator-01"}"#
        );
    }

    #[test]
    fn test_nested_bool_inside_list_stays_json_bool() {
        let value = DeploymentValue::List(vec![true.into(), 3.into()]);
        assert_eq!(value.render().unwrap(), "[true,3]");
    }

    #[test]
    fn test_variables_keep_name_order() {
        let vars = DeploymentVariables::new()
            .with("region", "us-east-1")
            .with("enable_dns", false)
            .with("node_min_size", 2);
        let names: Vec<_> = vars.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["enable_dns", "node_min_size", "region"]);
        assert_eq!(vars.get_text("region"), Some("us-east-1"));
        assert_eq!(vars.get_text("enable_dns"), None);
    }

    #[test]
    fn test_variables_serialize_nulls_as_json_null() {
        let vars = DeploymentVariables::new().with("dns_zone_name", DeploymentValue::Null);
        assert_eq!(
            serde_json::to_string(&vars).unwrap(),
            r#"{"dns_zone_name":null}"#
        );
    }
}
