//! Backend adapters and the contracts they implement.
//!
//! A backend contributes one [`PluginBuilder`] per operation it supports.
//! Builders are looked up in a [`BuilderRegistry`] by operation and library
//! identifier, and produce ready-to-run [`Plugin`]s.
//!
//! Two backends ship with the crate:
//!
//! - [`dummy`]: placeholder results, used when an operation has no backend
//!   configured
//! - [`datafusion`]: schema inference, SQL checks and column profiling over
//!   local CSV, Parquet and JSON files

pub mod builder;
pub mod datafusion;
pub mod dummy;
pub mod plugin;
pub mod registry;

pub use builder::{constraint_pairs, constraints_for, BuildRequest, BuilderContext, PluginBuilder};
pub use plugin::{
    artifact_filename, artifact_prefix, new_plugin_id, render_raw_artifact, Plugin, PluginId,
};
pub use registry::{BuilderFactory, BuilderRegistry};
