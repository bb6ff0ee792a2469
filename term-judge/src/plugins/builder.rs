//! The factory contract that turns resources and constraints into plugins.

use super::plugin::Plugin;
use crate::core::{
    Constraint, DataResource, ErrorReport, ExecArgs, Operation, StoreConfig,
};
use crate::error::{JudgeError, Result};
use crate::runner::PluginTask;
use std::fmt;

/// Inputs of one [`PluginBuilder::build`] call.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub resources: &'a [DataResource],
    /// Present for validation only
    pub constraints: Option<&'a [Constraint]>,
    /// Present for validation only
    pub error_report: Option<ErrorReport>,
}

impl<'a> BuildRequest<'a> {
    pub fn new(resources: &'a [DataResource]) -> Self {
        Self {
            resources,
            constraints: None,
            error_report: None,
        }
    }

    pub fn with_constraints(mut self, constraints: &'a [Constraint]) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn with_error_report(mut self, error_report: ErrorReport) -> Self {
        self.error_report = Some(error_report);
        self
    }

    pub fn constraints(&self) -> &'a [Constraint] {
        self.constraints.unwrap_or(&[])
    }
}

/// Constructs ready-to-run plugins for one operation and one backend.
///
/// A builder instance lives for exactly one build/execute cycle. The
/// scheduler calls [`destroy`](PluginBuilder::destroy) exactly once, after
/// every plugin the builder produced has executed.
pub trait PluginBuilder: Send + fmt::Debug {
    fn operation(&self) -> Operation;

    /// Backend library identifier this builder was registered under.
    fn library(&self) -> &str;

    /// Builds one plugin per eligible resource, or per eligible
    /// (resource, constraint) pair.
    ///
    /// Fails with [`JudgeError::StoreNotFound`] when a resource names a store
    /// the builder was not given.
    fn build(&mut self, request: &BuildRequest<'_>) -> Result<Vec<Box<dyn Plugin>>>;

    /// Releases builder-scoped resources.
    fn destroy(&mut self) -> Result<()> {
        Ok(())
    }
}

/// State every builder is constructed with: the run's stores and the
/// backend arguments of its `ExecConfig`.
#[derive(Debug, Clone, Default)]
pub struct BuilderContext {
    pub stores: Vec<StoreConfig>,
    pub exec_args: ExecArgs,
}

impl BuilderContext {
    pub fn new(stores: Vec<StoreConfig>, exec_args: ExecArgs) -> Self {
        Self { stores, exec_args }
    }

    /// Finds the store `resource` lives in.
    pub fn resource_store(&self, resource: &DataResource) -> Result<&StoreConfig> {
        self.stores
            .iter()
            .find(|store| store.name == resource.store)
            .ok_or_else(|| JudgeError::store_not_found(&resource.store, &resource.name))
    }

    /// Resolves the store of every resource, failing on the first unknown one.
    pub fn resolve_stores<'a>(
        &'a self,
        resources: &'a [DataResource],
    ) -> Result<Vec<(&'a DataResource, &'a StoreConfig)>> {
        resources
            .iter()
            .map(|resource| Ok((resource, self.resource_store(resource)?)))
            .collect()
    }

    /// Serializable task rebuilding a single plugin of this builder.
    pub fn task(
        &self,
        operation: Operation,
        library: &str,
        resources: Vec<DataResource>,
        constraint: Option<Constraint>,
        error_report: Option<ErrorReport>,
    ) -> PluginTask {
        let stores = self
            .stores
            .iter()
            .filter(|store| resources.iter().any(|res| res.store == store.name))
            .cloned()
            .collect();

        PluginTask {
            operation,
            library: library.to_string(),
            exec_args: self.exec_args.clone(),
            stores,
            resources,
            constraints: constraint.map(|constraint| vec![constraint]),
            error_report,
        }
    }
}

/// Every (resource, constraint) pair where the constraint names the resource.
///
/// Resources are the outer loop, so plugins come out grouped by resource.
pub fn constraint_pairs<'a>(
    resources: &'a [DataResource],
    constraints: &'a [Constraint],
) -> Vec<(&'a DataResource, &'a Constraint)> {
    resources
        .iter()
        .flat_map(|resource| {
            constraints
                .iter()
                .filter(move |constraint| constraint.targets(&resource.name))
                .map(move |constraint| (resource, constraint))
        })
        .collect()
}

/// Constraints written for `library`.
pub fn constraints_for<'a>(constraints: &'a [Constraint], library: &str) -> Vec<&'a Constraint> {
    constraints
        .iter()
        .filter(|constraint| constraint.library == library)
        .collect()
}
