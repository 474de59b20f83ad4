//! scene.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use anyhow::Context;
use regex::Regex;

use crate::types::DEFAULT_SELECTOR_KEY;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub store: StoreConfig,
    pub labels: LabelsConfig,
    pub scenarios: ScenariosConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    /// Keys matching this pattern are system-managed.
    pub protected_pattern: String,
    /// Keys matching this pattern can be set once.
    pub immutable_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenariosConfig {
    /// Put new runtimes into `DEFAULT` when no scenarios are given.
    pub default_scenario_enabled: bool,
    /// Selector key written into automatic assignments.
    pub selector_key: String,
    /// Runtime label naming the subaccount a runtime registers into.
    pub subaccount_label_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("scenegrid.redb"),
        }
    }
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            protected_pattern: "^consumer_subaccount_ids$|_defaultEventing$".to_string(),
            immutable_pattern: "^xsappname$".to_string(),
        }
    }
}

impl Default for ScenariosConfig {
    fn default() -> Self {
        Self {
            default_scenario_enabled: true,
            selector_key: DEFAULT_SELECTOR_KEY.to_string(),
            subaccount_label_key: DEFAULT_SELECTOR_KEY.to_string(),
        }
    }
}

impl SceneConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: SceneConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Compile the label key patterns.
    pub fn label_policy(&self) -> Result<LabelPolicy, regex::Error> {
        LabelPolicy::new(&self.labels.protected_pattern, &self.labels.immutable_pattern)
    }
}

/// Compiled protected/immutable label key patterns.
#[derive(Debug, Clone)]
pub struct LabelPolicy {
    protected: Regex,
    immutable: Regex,
}

impl LabelPolicy {
    pub fn new(protected: &str, immutable: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            protected: Regex::new(protected)?,
            immutable: Regex::new(immutable)?,
        })
    }

    pub fn is_protected(&self, key: &str) -> bool {
        self.protected.is_match(key)
    }

    pub fn is_immutable(&self, key: &str) -> bool {
        self.immutable.is_match(key)
    }

    /// Keys callers may never write through resource input maps.
    pub fn is_restricted(&self, key: &str) -> bool {
        self.is_protected(key) || self.is_immutable(key)
    }
}
