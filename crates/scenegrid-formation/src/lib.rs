//! scenegrid-formation — formations and automatic scenario assignments.
//!
//! Groups runtimes and applications into named formations (scenarios)
//! per tenant, and keeps every runtime's `scenarios` label equal to the
//! union of what was set on it explicitly and what the matching automatic
//! assignments contribute:
//!
//! - Formation names live in the tenant's formation schema; removing one
//!   is refused while a label or assignment still uses it
//! - Assignments label every runtime of their target tenant on creation
//!   and unlabel them on deletion, in the same transaction
//! - Runtime creation and label writes re-derive `scenarios`, filter
//!   protected and immutable keys, and propagate to the parent tenant
//!
//! # Architecture
//!
//! ```text
//! ControlPlane (one redb transaction per call)
//!   ├── FormationService ── create/delete formation, assign/unassign
//!   │     ├── SchemaService (validated, versioned schema updates)
//!   │     ├── LabelService (schema-checked label writes)
//!   │     └── AssignmentService
//!   │           └── AssignmentEngine (reconciles runtime labels)
//!   ├── RuntimeService ── runtime lifecycle and labels
//!   │     └── TenantService (lazy subaccounts)
//!   └── ApplicationService
//! ```

pub mod application;
pub mod assignment;
pub mod context;
pub mod control_plane;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod formation;
pub mod ids;
pub mod labels;
pub mod model;
pub mod runtime;
pub mod tenant;

#[cfg(test)]
pub(crate) mod testing;

pub use context::RequestContext;
pub use control_plane::ControlPlane;
pub use engine::AssignmentEngine;
pub use error::{ErrorKind, FormationError, FormationResult, Resource};
pub use ids::{IdGenerator, UuidGenerator};
pub use model::{Formation, FormationObjectType, RuntimeInput, TenantInput};
