//! Shared constants and object kinds used across scenegrid crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label key holding the formations a resource belongs to.
pub const SCENARIOS_KEY: &str = "scenarios";

/// Formation applied to new runtimes when none is requested.
pub const DEFAULT_SCENARIO: &str = "DEFAULT";

/// Selector key used by automatic scenario assignments.
pub const DEFAULT_SELECTOR_KEY: &str = "global_subaccount_id";

/// Kind of object a label is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Runtime,
    Application,
    Tenant,
}

impl ObjectType {
    /// Stable name used in table keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Runtime => "runtime",
            ObjectType::Application => "application",
            ObjectType::Tenant => "tenant",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
