//! Typed formation schema.
//!
//! Each tenant owns one label definition for the `scenarios` key. Its
//! schema is a JSON-schema-shaped document whose `items.enum` enumerates
//! the formations that currently exist in the tenant:
//!
//! ```json
//! {"type": "array", "minItems": 1, "uniqueItems": true,
//!  "items": {"type": "string", "pattern": "...", "enum": ["DEFAULT"], "maxLength": 128}}
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LabelValueError, SchemaError};
use crate::label::LabelValue;
use crate::scenario::ScenarioSet;

/// Allowed shape of a formation name.
pub const SCENARIO_NAME_PATTERN: &str = r"^[A-Za-z0-9]([-_A-Za-z0-9\s]*[A-Za-z0-9])?$";

/// Longest accepted formation name.
pub const SCENARIO_NAME_MAX_LENGTH: usize = 128;

/// Schema of the `scenarios` label of one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenariosSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub min_items: usize,
    pub unique_items: bool,
    pub items: ScenarioItemsSchema,
}

/// Constraints on a single formation name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioItemsSchema {
    #[serde(rename = "type")]
    pub item_type: String,
    pub pattern: String,
    #[serde(rename = "enum")]
    pub allowed: Vec<String>,
    pub max_length: usize,
}

impl ScenariosSchema {
    /// Schema enumerating exactly the given formations (deduplicated).
    pub fn for_formations<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: ScenarioSet = names.into_iter().map(|n| -> String { n.into() }).collect();
        Self {
            schema_type: "array".to_string(),
            min_items: 1,
            unique_items: true,
            items: ScenarioItemsSchema {
                item_type: "string".to_string(),
                pattern: SCENARIO_NAME_PATTERN.to_string(),
                allowed: allowed.into_vec(),
                max_length: SCENARIO_NAME_MAX_LENGTH,
            },
        }
    }

    /// Parse the stored JSON document.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        serde_json::from_value(value.clone()).map_err(|e| SchemaError::Malformed(e.to_string()))
    }

    /// Render as the stored JSON document.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Formations currently enumerated.
    pub fn formations(&self) -> &[String] {
        &self.items.allowed
    }

    pub fn allows(&self, name: &str) -> bool {
        self.items.allowed.iter().any(|n| n == name)
    }

    /// Copy with `name` added to the enumeration, if absent.
    pub fn with_formation(&self, name: &str) -> Self {
        let mut next = self.clone();
        if !next.allows(name) {
            next.items.allowed.push(name.to_string());
        }
        next
    }

    /// Copy with `name` removed from the enumeration.
    pub fn without_formation(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.items.allowed.retain(|n| n != name);
        next
    }

    /// Check a formation name against the pattern and length limit.
    pub fn validate_name(&self, name: &str) -> Result<(), SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidName {
            name: name.to_string(),
            reason,
        };
        if name.chars().count() > self.items.max_length {
            return Err(invalid(format!(
                "longer than {} characters",
                self.items.max_length
            )));
        }
        let pattern =
            Regex::new(&self.items.pattern).map_err(|e| SchemaError::Malformed(e.to_string()))?;
        if !pattern.is_match(name) {
            return Err(invalid(format!("does not match {}", self.items.pattern)));
        }
        Ok(())
    }

    /// Validate a `scenarios` label value against this schema.
    pub fn validate(&self, value: &LabelValue) -> Result<(), SchemaError> {
        let names = list_items(value)?;
        if names.len() < self.min_items {
            return Err(SchemaError::TooFewItems {
                min: self.min_items,
                got: names.len(),
            });
        }
        let mut seen = ScenarioSet::new();
        for name in &names {
            if self.unique_items && !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateItem(name.clone()));
            }
            self.validate_name(name)?;
            if !self.allows(name) {
                return Err(SchemaError::NotAllowed(name.clone()));
            }
        }
        Ok(())
    }
}

/// List elements in stored order, duplicates kept.
fn list_items(value: &LabelValue) -> Result<Vec<String>, SchemaError> {
    let raw = match value.to_json() {
        Value::Array(items) => items,
        _ => {
            return Err(LabelValueError::NotAList(value.type_name().to_string()).into());
        }
    };
    raw.into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(LabelValueError::NonStringElement(other.to_string()).into()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_json_schema_shape() {
        let schema = ScenariosSchema::for_formations(["DEFAULT"]);
        let value = schema.to_value();
        assert_eq!(value["type"], "array");
        assert_eq!(value["minItems"], 1);
        assert_eq!(value["items"]["enum"], json!(["DEFAULT"]));
        assert_eq!(ScenariosSchema::from_value(&value).unwrap(), schema);
    }

    #[test]
    fn with_formation_is_idempotent() {
        let schema = ScenariosSchema::for_formations(["a"]);
        let once = schema.with_formation("b");
        let twice = once.with_formation("b");
        assert_eq!(once, twice);
        assert_eq!(twice.formations(), &["a".to_string(), "b".to_string()]);
        assert!(!twice.without_formation("a").allows("a"));
    }

    #[test]
    fn validate_name_enforces_pattern_and_length() {
        let schema = ScenariosSchema::for_formations(Vec::<String>::new());
        assert!(schema.validate_name("a").is_ok());
        assert!(schema.validate_name("my formation-1").is_ok());
        assert!(schema.validate_name("-bad").is_err());
        assert!(schema.validate_name("bad/").is_err());
        assert!(schema.validate_name(&"x".repeat(129)).is_err());
    }

    #[test]
    fn validate_checks_enum_membership() {
        let schema = ScenariosSchema::for_formations(["a", "b"]);
        assert!(schema.validate(&LabelValue::from(json!(["a", "b"]))).is_ok());
        assert_eq!(
            schema.validate(&LabelValue::from(json!(["a", "c"]))),
            Err(SchemaError::NotAllowed("c".into()))
        );
        assert!(matches!(
            schema.validate(&LabelValue::from(json!([]))),
            Err(SchemaError::TooFewItems { min: 1, got: 0 })
        ));
        assert!(matches!(
            schema.validate(&LabelValue::from(json!(["a", "a"]))),
            Err(SchemaError::DuplicateItem(_))
        ));
        assert!(schema.validate(&LabelValue::text("a")).is_err());
    }

    #[test]
    fn malformed_document_is_rejected() {
        assert!(matches!(
            ScenariosSchema::from_value(&json!({"type": "array"})),
            Err(SchemaError::Malformed(_))
        ));
    }
}
