//! Inputs and outputs of the formation services.

use std::fmt;
use std::str::FromStr;

use scene_core::Labels;
use scenegrid_state::TenantType;
use serde::{Deserialize, Serialize};

use crate::error::FormationError;

/// A formation is identified by its name within a tenant's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    pub name: String,
}

impl Formation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Kind of object a formation is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormationObjectType {
    Application,
    Runtime,
    Tenant,
}

impl FormationObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormationObjectType::Application => "APPLICATION",
            FormationObjectType::Runtime => "RUNTIME",
            FormationObjectType::Tenant => "TENANT",
        }
    }
}

impl fmt::Display for FormationObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormationObjectType {
    type Err = FormationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "APPLICATION" => Ok(FormationObjectType::Application),
            "RUNTIME" => Ok(FormationObjectType::Runtime),
            "TENANT" => Ok(FormationObjectType::Tenant),
            _ => Err(FormationError::InvalidData(format!(
                "unknown formation object type {s}"
            ))),
        }
    }
}

/// Caller-supplied runtime fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub labels: Labels,
}

impl RuntimeInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Tenant to register if its external id is not known yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantInput {
    pub external_id: String,
    pub name: String,
    /// Internal or external id of the parent tenant.
    pub parent: Option<String>,
    pub tenant_type: TenantType,
}
