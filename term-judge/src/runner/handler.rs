//! The scheduler: builds plugins for one operation, runs them with the
//! requested strategy and collects their bundles.
//!
//! # Example
//!
//! ```rust,no_run
//! use term_judge::prelude::*;
//!
//! # fn example() -> term_judge::error::Result<()> {
//! let config = RunConfig::default().with_inference(ExecConfig::new("datafusion"));
//! let stores = vec![StoreConfig::local("local", "/data")];
//! let resources = vec![DataResource::new("orders", "orders.csv", "local")];
//!
//! let mut handler = RunHandler::new(config, stores);
//! handler.infer(&resources, true, 4)?;
//!
//! for schema in handler.judge_schemas().into_iter().flatten() {
//!     println!("{}", serde_json::to_string_pretty(schema)?);
//! }
//! # Ok(())
//! # }
//! ```

use super::pool::{
    locate_worker, run_sequential, run_threaded, Buckets, DistributedExecutor, ProcessPool,
};
use super::registry::ResultsRegistry;
use crate::core::{
    Bundle, Constraint, DataResource, ErrorReport, ExecResult, JudgeReport, LibraryInfo,
    Operation, RenderTuple, RunConfig, StoreConfig,
};
use crate::error::{JudgeError, Result};
use crate::logging::{truncate_field, LogConfig};
use crate::plugins::registry::destroy_all;
use crate::plugins::{BuildRequest, BuilderRegistry, PluginBuilder};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Execution knobs that are not part of the run configuration.
#[derive(Debug, Clone, Default)]
pub struct SchedulerOptions {
    /// Worker executable for the process bucket. Located automatically
    /// when unset, see [`locate_worker`].
    pub worker_program: Option<PathBuf>,
    /// Strategy for the distributed bucket.
    pub distributed: Option<Arc<dyn DistributedExecutor>>,
    pub log: LogConfig,
}

impl SchedulerOptions {
    pub fn with_worker_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.worker_program = Some(program.into());
        self
    }

    pub fn with_distributed(mut self, executor: Arc<dyn DistributedExecutor>) -> Self {
        self.distributed = Some(executor);
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

/// Runs inference, validation and profiling for one set of stores.
///
/// Results of every operation accumulate in an owned [`ResultsRegistry`].
/// An operation that fails to build registers nothing; other operations'
/// results are never touched.
#[derive(Debug)]
pub struct RunHandler {
    config: RunConfig,
    stores: Vec<StoreConfig>,
    builders: BuilderRegistry,
    options: SchedulerOptions,
    registry: ResultsRegistry,
}

impl RunHandler {
    pub fn new(config: RunConfig, stores: Vec<StoreConfig>) -> Self {
        Self {
            config,
            stores,
            builders: BuilderRegistry::with_defaults(),
            options: SchedulerOptions::default(),
            registry: ResultsRegistry::new(),
        }
    }

    /// Replaces the builder registry, e.g. to add custom backends.
    pub fn with_registry(mut self, builders: BuilderRegistry) -> Self {
        self.builders = builders;
        self
    }

    pub fn with_options(mut self, options: SchedulerOptions) -> Self {
        self.options = options;
        self
    }

    /// Infers the schema of every resource.
    #[instrument(skip(self, resources), fields(resources = resources.len()))]
    pub fn infer(
        &mut self,
        resources: &[DataResource],
        parallel: bool,
        num_worker: usize,
    ) -> Result<()> {
        let request = BuildRequest::new(resources);
        self.run_operation(Operation::Inference, &request, parallel, num_worker)
    }

    /// Evaluates `constraints` against the resources they name.
    ///
    /// `error_report` is one of `count`, `partial` or `full`; anything else
    /// is rejected before a builder is created.
    #[instrument(skip(self, resources, constraints), fields(resources = resources.len(), constraints = constraints.len()))]
    pub fn validate(
        &mut self,
        resources: &[DataResource],
        constraints: &[Constraint],
        error_report: &str,
        parallel: bool,
        num_worker: usize,
    ) -> Result<()> {
        let error_report: ErrorReport = error_report.parse()?;
        let request = BuildRequest::new(resources)
            .with_constraints(constraints)
            .with_error_report(error_report);
        self.run_operation(Operation::Validation, &request, parallel, num_worker)
    }

    /// Profiles every resource.
    #[instrument(skip(self, resources), fields(resources = resources.len()))]
    pub fn profile(
        &mut self,
        resources: &[DataResource],
        parallel: bool,
        num_worker: usize,
    ) -> Result<()> {
        let request = BuildRequest::new(resources);
        self.run_operation(Operation::Profiling, &request, parallel, num_worker)
    }

    fn run_operation(
        &mut self,
        operation: Operation,
        request: &BuildRequest<'_>,
        parallel: bool,
        num_worker: usize,
    ) -> Result<()> {
        let configs = self.config.exec_configs(operation);
        let mut builders = self
            .builders
            .create_builders(operation, &configs, &self.stores)?;

        let outcome = self.build_and_execute(operation, &mut builders, request, parallel, num_worker);

        destroy_all(operation, &mut builders);

        if let Err(e) = &outcome {
            warn!(operation = %operation, error = %e, "Operation failed");
        }
        outcome
    }

    fn build_and_execute(
        &mut self,
        operation: Operation,
        builders: &mut [Box<dyn PluginBuilder>],
        request: &BuildRequest<'_>,
        parallel: bool,
        num_worker: usize,
    ) -> Result<()> {
        let mut plugins = Vec::new();
        for builder in builders.iter_mut() {
            let built = builder.build(request)?;
            debug!(
                operation = %operation,
                library = builder.library(),
                plugins = built.len(),
                "Built plugins"
            );
            plugins.extend(built);
        }

        let buckets = Buckets::partition(plugins, parallel);
        let tasks = buckets.process_tasks()?;
        let num_workers = num_worker.max(1);

        if self.options.log.log_scheduling {
            info!(
                operation = %operation,
                sequential = buckets.sequential.len(),
                thread = buckets.thread.len(),
                process = buckets.process.len(),
                distributed = buckets.distributed.len(),
                workers = num_workers,
                "Scheduling plugins"
            );
        }

        let bundles = run_sequential(&buckets.sequential);
        self.register(operation, bundles);

        let bundles = run_threaded(&buckets.thread, num_workers)?;
        self.register(operation, bundles);

        if !tasks.is_empty() {
            let program = match &self.options.worker_program {
                Some(program) => program.clone(),
                None => locate_worker()?,
            };
            let bundles = ProcessPool::new(program, num_workers).run(&tasks)?;
            self.register(operation, bundles);
        }

        if !buckets.distributed.is_empty() {
            let bundles = match &self.options.distributed {
                Some(executor) => {
                    let bundles = executor.execute(&buckets.distributed)?;
                    if bundles.len() != buckets.distributed.len() {
                        return Err(JudgeError::Pool(format!(
                            "Distributed executor returned {} bundles for {} plugins",
                            bundles.len(),
                            buckets.distributed.len()
                        )));
                    }
                    bundles
                }
                None => {
                    warn!(
                        operation = %operation,
                        plugins = buckets.distributed.len(),
                        "No distributed executor installed, running on the thread pool"
                    );
                    run_threaded(&buckets.distributed, num_workers)?
                }
            };
            self.register(operation, bundles);
        }

        Ok(())
    }

    fn register(&mut self, operation: Operation, bundles: Vec<Bundle>) {
        for bundle in bundles {
            if self.options.log.log_plugin_phases {
                let errors = bundle.wrapped.error_message().unwrap_or_default();
                debug!(
                    operation = %operation,
                    library = %bundle.library.library_name,
                    status = ?bundle.wrapped.status,
                    duration = bundle.wrapped.duration,
                    errors = %truncate_field(&errors, self.options.log.max_field_length),
                    "Registering bundle"
                );
            }
            self.registry.register_bundle(operation, bundle);
        }
    }

    pub fn results(&self) -> &ResultsRegistry {
        &self.registry
    }

    fn artifacts(&self, operation: Operation) -> Vec<Option<&Value>> {
        self.registry
            .wrapped(operation)
            .into_iter()
            .map(ExecResult::artifact)
            .collect()
    }

    fn judge_reports_of(&self, operation: Operation) -> Vec<Option<&JudgeReport>> {
        self.registry
            .reports(operation)
            .into_iter()
            .map(ExecResult::artifact)
            .collect()
    }

    fn rendered_of(&self, operation: Operation) -> Vec<&RenderTuple> {
        self.registry
            .rendered(operation)
            .into_iter()
            .filter_map(ExecResult::artifact)
            .flatten()
            .collect()
    }

    /// Raw inference artifacts, `None` where the backend failed.
    pub fn artifact_schemas(&self) -> Vec<Option<&Value>> {
        self.artifacts(Operation::Inference)
    }

    pub fn artifact_reports(&self) -> Vec<Option<&Value>> {
        self.artifacts(Operation::Validation)
    }

    pub fn artifact_profiles(&self) -> Vec<Option<&Value>> {
        self.artifacts(Operation::Profiling)
    }

    pub fn judge_schemas(&self) -> Vec<Option<&JudgeReport>> {
        self.judge_reports_of(Operation::Inference)
    }

    pub fn judge_reports(&self) -> Vec<Option<&JudgeReport>> {
        self.judge_reports_of(Operation::Validation)
    }

    pub fn judge_profiles(&self) -> Vec<Option<&JudgeReport>> {
        self.judge_reports_of(Operation::Profiling)
    }

    pub fn rendered_schemas(&self) -> Vec<&RenderTuple> {
        self.rendered_of(Operation::Inference)
    }

    pub fn rendered_reports(&self) -> Vec<&RenderTuple> {
        self.rendered_of(Operation::Validation)
    }

    pub fn rendered_profiles(&self) -> Vec<&RenderTuple> {
        self.rendered_of(Operation::Profiling)
    }

    /// Backends that ran, per operation, without duplicates.
    pub fn libraries(&self) -> BTreeMap<Operation, Vec<LibraryInfo>> {
        Operation::ALL
            .into_iter()
            .map(|operation| {
                let mut seen: Vec<LibraryInfo> = Vec::new();
                for info in self.registry.libraries(operation) {
                    if !seen.contains(info) {
                        seen.push(info.clone());
                    }
                }
                (operation, seen)
            })
            .collect()
    }
}
