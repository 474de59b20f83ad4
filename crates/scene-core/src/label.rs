//! Dynamically typed label values.
//!
//! A label value arrives either as a list of strings, a list of arbitrary
//! JSON elements, or a single JSON scalar/object. The variants are kept
//! explicit so that conversion into a [`ScenarioSet`](crate::ScenarioSet)
//! happens in exactly one place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Label map of a single object, keyed by label key.
pub type Labels = BTreeMap<String, LabelValue>;

/// Value stored under a label key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    StringList(Vec<String>),
    DynamicList(Vec<Value>),
    Scalar(Value),
}

impl LabelValue {
    /// Plain string value.
    pub fn text(value: impl Into<String>) -> Self {
        LabelValue::Scalar(Value::String(value.into()))
    }

    /// The string inside a scalar string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LabelValue::Scalar(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Short name of the value's runtime type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            LabelValue::StringList(_) | LabelValue::DynamicList(_) => "list",
            LabelValue::Scalar(Value::Null) => "null",
            LabelValue::Scalar(Value::Bool(_)) => "bool",
            LabelValue::Scalar(Value::Number(_)) => "number",
            LabelValue::Scalar(Value::String(_)) => "string",
            LabelValue::Scalar(Value::Array(_)) => "list",
            LabelValue::Scalar(Value::Object(_)) => "object",
        }
    }

    /// Render as a plain JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            LabelValue::StringList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            LabelValue::DynamicList(items) => Value::Array(items.clone()),
            LabelValue::Scalar(v) => v.clone(),
        }
    }

    /// Filter match: equal values, or `needle` contained in a list value.
    pub fn matches(&self, needle: &LabelValue) -> bool {
        let haystack = self.to_json();
        let needle = needle.to_json();
        if haystack == needle {
            return true;
        }
        match haystack {
            Value::Array(items) => items.contains(&needle),
            _ => false,
        }
    }
}

impl From<Value> for LabelValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => {
                if items.iter().all(Value::is_string) {
                    LabelValue::StringList(
                        items
                            .into_iter()
                            .filter_map(|v| match v {
                                Value::String(s) => Some(s),
                                _ => None,
                            })
                            .collect(),
                    )
                } else {
                    LabelValue::DynamicList(items)
                }
            }
            other => LabelValue::Scalar(other),
        }
    }
}

impl From<Vec<String>> for LabelValue {
    fn from(items: Vec<String>) -> Self {
        LabelValue::StringList(items)
    }
}

impl From<&str> for LabelValue {
    fn from(value: &str) -> Self {
        LabelValue::text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_into_the_narrowest_variant() {
        let strings: LabelValue = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(strings, LabelValue::StringList(vec!["a".into(), "b".into()]));

        let mixed: LabelValue = serde_json::from_value(json!(["a", 1])).unwrap();
        assert!(matches!(mixed, LabelValue::DynamicList(_)));

        let scalar: LabelValue = serde_json::from_value(json!("eu-1")).unwrap();
        assert_eq!(scalar.as_str(), Some("eu-1"));
    }

    #[test]
    fn from_json_normalizes_string_arrays() {
        assert_eq!(
            LabelValue::from(json!(["x"])),
            LabelValue::StringList(vec!["x".into()])
        );
        assert_eq!(LabelValue::from(json!(3)).type_name(), "number");
    }

    #[test]
    fn matches_equal_values_and_list_members() {
        let list = LabelValue::StringList(vec!["a".into(), "b".into()]);
        assert!(list.matches(&LabelValue::text("b")));
        assert!(!list.matches(&LabelValue::text("c")));
        assert!(LabelValue::text("eu").matches(&LabelValue::text("eu")));
        assert!(!LabelValue::text("eu").matches(&LabelValue::text("us")));
    }
}
