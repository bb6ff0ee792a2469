//! Serializable plugin descriptors and the worker side of the process pool.
//!
//! A worker receives one JSON [`PluginTask`] on stdin, rebuilds the plugin
//! from a [`BuilderRegistry`], executes it and writes one JSON [`Bundle`] on
//! stdout. No live plugin state crosses the process boundary.

use crate::core::{
    Bundle, Constraint, DataResource, ErrorReport, ExecArgs, ExecConfig, Operation, StoreConfig,
};
use crate::error::{JudgeError, Result};
use crate::plugins::{BuildRequest, BuilderRegistry};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::{info, instrument, warn};

/// Everything a worker needs to rebuild exactly one plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginTask {
    pub operation: Operation,
    pub library: String,
    #[serde(default)]
    pub exec_args: ExecArgs,
    #[serde(default)]
    pub stores: Vec<StoreConfig>,
    pub resources: Vec<DataResource>,
    #[serde(default)]
    pub constraints: Option<Vec<Constraint>>,
    #[serde(default)]
    pub error_report: Option<ErrorReport>,
}

impl PluginTask {
    /// Rebuilds the described plugin and executes it.
    ///
    /// The builder is destroyed before returning, whatever the outcome.
    #[instrument(skip(self, registry), fields(operation = %self.operation, library = %self.library))]
    pub fn run(&self, registry: &BuilderRegistry) -> Result<Bundle> {
        let config = ExecConfig {
            library: self.library.clone(),
            exec_args: self.exec_args.clone(),
            enabled: true,
        };
        let mut builder = registry.create_builder(self.operation, &config, &self.stores)?;

        let mut request = BuildRequest::new(&self.resources);
        request.constraints = self.constraints.as_deref();
        request.error_report = self.error_report;

        let outcome = builder.build(&request).and_then(|plugins| match plugins.as_slice() {
            [plugin] => Ok(plugin.execute()),
            other => Err(JudgeError::Pool(format!(
                "Task must rebuild exactly one plugin, got {}",
                other.len()
            ))),
        });

        if let Err(e) = builder.destroy() {
            warn!(error = %e, "Failed to destroy worker builder");
        }
        outcome
    }
}

/// Worker loop body: reads one task from `input`, writes its bundle to
/// `output`.
pub fn run_worker<R: Read, W: Write>(
    registry: &BuilderRegistry,
    input: R,
    mut output: W,
) -> Result<()> {
    let task: PluginTask = serde_json::from_reader(input)?;
    info!(
        operation = %task.operation,
        library = %task.library,
        resources = task.resources.len(),
        "Worker received task"
    );

    let bundle = task.run(registry)?;
    serde_json::to_writer(&mut output, &bundle)?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecStatus, DUMMY_LIBRARY};

    fn dummy_task() -> PluginTask {
        PluginTask {
            operation: Operation::Validation,
            library: DUMMY_LIBRARY.to_string(),
            exec_args: ExecArgs::new(),
            stores: vec![StoreConfig::local("local", "/data")],
            resources: vec![DataResource::new("orders", "orders.csv", "local")],
            constraints: Some(vec![Constraint::new("c1", DUMMY_LIBRARY, ["orders"])]),
            error_report: Some(ErrorReport::Full),
        }
    }

    #[test]
    fn test_task_runs_through_registry() {
        let bundle = dummy_task().run(&BuilderRegistry::with_defaults()).unwrap();
        assert_eq!(bundle.wrapped.status, ExecStatus::Finished);
        assert_eq!(bundle.library.library_name, DUMMY_LIBRARY);
    }

    #[test]
    fn test_task_must_describe_one_plugin() {
        let mut task = dummy_task();
        task.resources.push(DataResource::new("orders", "orders-2.csv", "local"));
        let err = task.run(&BuilderRegistry::with_defaults()).unwrap_err();
        assert!(matches!(err, JudgeError::Pool(_)));
    }

    #[test]
    fn test_worker_protocol_in_memory() {
        let input = serde_json::to_vec(&dummy_task()).unwrap();
        let mut output = Vec::new();
        run_worker(&BuilderRegistry::with_defaults(), input.as_slice(), &mut output).unwrap();

        let bundle: Bundle = serde_json::from_slice(&output).unwrap();
        let report = bundle.report.artifact.unwrap();
        assert_eq!(report.as_validation().unwrap().valid, None);
    }

    #[test]
    fn test_worker_rejects_garbage() {
        let mut output = Vec::new();
        let err = run_worker(&BuilderRegistry::with_defaults(), &b"not a task"[..], &mut output)
            .unwrap_err();
        assert!(matches!(err, JudgeError::Serialization(_)));
        assert!(output.is_empty());
    }
}
