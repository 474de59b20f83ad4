//! redb table definitions for the scenegrid state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).
//! Composite keys are `/`-separated, most significant component first.

use redb::TableDefinition;

/// Shape shared by every table.
pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Labels keyed by `{tenant}/{object_type}/{object_id}/{key}`.
pub const LABELS: JsonTable = TableDefinition::new("labels");

/// Label definitions (formation schemas) keyed by `{tenant}/{key}`.
pub const LABEL_DEFINITIONS: JsonTable = TableDefinition::new("label_definitions");

/// Automatic scenario assignments keyed by `{tenant}/{scenario_name}`.
pub const ASSIGNMENTS: JsonTable = TableDefinition::new("assignments");

/// Runtimes keyed by `{runtime_id}`.
pub const RUNTIMES: JsonTable = TableDefinition::new("runtimes");

/// Applications keyed by `{application_id}`.
pub const APPLICATIONS: JsonTable = TableDefinition::new("applications");

/// Tenants keyed by `{tenant_id}`.
pub const TENANTS: JsonTable = TableDefinition::new("tenants");

/// External tenant id → internal tenant id (JSON string).
pub const TENANT_EXTERNAL_IDS: JsonTable = TableDefinition::new("tenant_external_ids");

pub const ALL_TABLES: [JsonTable; 7] = [
    LABELS,
    LABEL_DEFINITIONS,
    ASSIGNMENTS,
    RUNTIMES,
    APPLICATIONS,
    TENANTS,
    TENANT_EXTERNAL_IDS,
];
