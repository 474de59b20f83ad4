//! Scenario (formation) name sets.
//!
//! Every scenario computation goes through [`ScenarioSet`]. It keeps
//! insertion order internally so output is stable within one call, but
//! equality is set equality and no caller may rely on element order.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LabelValueError;
use crate::label::LabelValue;

/// Deduplicated, unordered set of formation names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioSet(IndexSet<String>);

impl ScenarioSet {
    pub fn new() -> Self {
        Self(IndexSet::new())
    }

    /// Add a name. Returns `true` if it was not present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    /// Remove a name. Returns `true` if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.0.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Union of both sets.
    pub fn union(&self, other: &ScenarioSet) -> ScenarioSet {
        let mut out = self.clone();
        out.extend(other.iter().map(str::to_string));
        out
    }

    /// `true` if every name in `self` is in `other`.
    pub fn is_subset(&self, other: &ScenarioSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

impl Extend<String> for ScenarioSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromIterator<String> for ScenarioSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for ScenarioSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

impl IntoIterator for ScenarioSet {
    type Item = String;
    type IntoIter = indexmap::set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<ScenarioSet> for LabelValue {
    fn from(set: ScenarioSet) -> Self {
        LabelValue::StringList(set.into_vec())
    }
}

impl TryFrom<&LabelValue> for ScenarioSet {
    type Error = LabelValueError;

    /// The single normalization point from any label value shape into a
    /// set of names. Non-list values and non-string elements are rejected.
    fn try_from(value: &LabelValue) -> Result<Self, Self::Error> {
        match value {
            LabelValue::StringList(items) => Ok(items.iter().map(String::as_str).collect()),
            LabelValue::DynamicList(items) | LabelValue::Scalar(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(LabelValueError::NonStringElement(other.to_string())),
                })
                .collect(),
            other => Err(LabelValueError::NotAList(other.type_name().to_string())),
        }
    }
}
