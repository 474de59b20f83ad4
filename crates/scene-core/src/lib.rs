//! scene-core — shared vocabulary for scenegrid crates.
//!
//! Holds the pieces every layer agrees on: the `scene.toml` configuration,
//! dynamically typed label values, the scenario set used for all
//! formation arithmetic, and the typed formation schema stored per tenant.

pub mod config;
pub mod error;
pub mod label;
pub mod scenario;
pub mod schema;
pub mod types;

pub use config::{LabelPolicy, SceneConfig};
pub use error::{LabelValueError, SchemaError};
pub use label::{LabelValue, Labels};
pub use scenario::ScenarioSet;
pub use schema::ScenariosSchema;
pub use types::*;
