//! Domain types for the scenegrid state store.
//!
//! These types represent the persisted rows: labels, label definitions,
//! automatic scenario assignments, runtimes, applications, and tenants.
//! All types are serializable to/from JSON for storage in redb tables.

use scene_core::{LabelValue, ObjectType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Internal tenant identifier.
pub type TenantId = String;

// ── Labels ────────────────────────────────────────────────────────

/// A key/value label attached to an object in one tenant's label space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Label {
    pub id: String,
    pub tenant: TenantId,
    pub key: String,
    pub value: LabelValue,
    pub object_type: ObjectType,
    pub object_id: String,
}

/// Per-tenant definition of a label key. For the `scenarios` key the
/// schema is the formation schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelDefinition {
    pub id: String,
    pub tenant: TenantId,
    pub key: String,
    pub schema: Option<Value>,
    /// Bumped on every successful versioned update.
    pub version: u64,
}

/// Label query used when listing resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelFilter {
    pub key: String,
    /// When absent, only the presence of `key` is required.
    pub value: Option<LabelValue>,
}

impl LabelFilter {
    pub fn exists(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    pub fn equals(key: impl Into<String>, value: impl Into<LabelValue>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

// ── Assignments ───────────────────────────────────────────────────

/// Single key/value selector naming a target tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelSelector {
    pub key: String,
    pub value: String,
}

/// Automatic scenario assignment: every runtime in `target_tenant_id`
/// belongs to `scenario_name` within `tenant`'s label space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub scenario_name: String,
    pub tenant: TenantId,
    pub selector: LabelSelector,
    pub target_tenant_id: TenantId,
}

// ── Resources ─────────────────────────────────────────────────────

/// A registered runtime, owned by exactly one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Runtime {
    pub id: String,
    pub tenant: TenantId,
    pub name: String,
    pub description: Option<String>,
    /// Unix timestamp (seconds) when this runtime was registered.
    pub created_at: u64,
    /// Unix timestamp (seconds) of the last update.
    pub updated_at: u64,
}

/// A registered application, owned by exactly one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    pub id: String,
    pub tenant: TenantId,
    pub name: String,
    pub created_at: u64,
}

// ── Tenants ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantType {
    Account,
    Subaccount,
    Customer,
}

/// Node of the tenant hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tenant {
    pub id: TenantId,
    pub external_id: String,
    pub name: String,
    pub parent: Option<TenantId>,
    pub tenant_type: TenantType,
}

// ── Paging ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageInfo {
    pub start_cursor: String,
    pub end_cursor: String,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page_info: PageInfo,
    pub total_count: usize,
}

// ── Table keys ────────────────────────────────────────────────────

impl Label {
    /// Build the composite key for the labels table.
    pub fn table_key(&self) -> String {
        label_key(&self.tenant, self.object_type, &self.object_id, &self.key)
    }
}

impl LabelDefinition {
    /// Build the composite key for the label definitions table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.tenant, self.key)
    }
}

impl Assignment {
    /// Build the composite key for the assignments table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.tenant, self.scenario_name)
    }
}

pub fn label_key(tenant: &str, object_type: ObjectType, object_id: &str, key: &str) -> String {
    format!("{tenant}/{}/{object_id}/{key}", object_type.as_str())
}

pub(crate) fn object_prefix(tenant: &str, object_type: ObjectType, object_id: &str) -> String {
    format!("{tenant}/{}/{object_id}/", object_type.as_str())
}
