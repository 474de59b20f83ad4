//! scenegrid-state — embedded state store for scenegrid.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for labels, formation schemas (label definitions), automatic
//! scenario assignments, runtimes, applications, and tenants.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Composite keys (`{tenant}/{object_type}/{object_id}/{key}`,
//! `{tenant}/{scenario}`) enable prefix scans for related records.
//!
//! Every operation is a method on [`Tx`], a single write transaction
//! obtained from [`StateStore::begin`]. Nothing is visible to other
//! transactions until [`Tx::commit`]; a dropped `Tx` is rolled back.

pub mod assignments;
pub mod definitions;
pub mod error;
pub mod labels;
pub mod resources;
pub mod store;
pub mod tables;
pub mod tenants;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{StateStore, Tx};
pub use types::*;
