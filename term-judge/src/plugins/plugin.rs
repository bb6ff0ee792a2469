//! The contract every backend adapter implements.

use crate::core::{
    exec_wrapped, Bundle, ExecAffinity, ExecResult, JudgeReport, LibraryInfo, Operation,
    RenderTuple,
};
use crate::error::Result;
use crate::runner::PluginTask;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identity token of a plugin instance.
pub type PluginId = Uuid;

/// Creates a fresh plugin identity.
pub fn new_plugin_id() -> PluginId {
    Uuid::new_v4()
}

/// One backend's execution of one operation over one resource, or one
/// (resource, constraint) pair for validation.
///
/// Plugins are created and set up by their [`PluginBuilder`]: a constructed
/// plugin is ready to run. Implementors provide the backend call and the two
/// render phases; [`Plugin::execute`] drives them and never fails.
///
/// [`PluginBuilder`]: crate::plugins::PluginBuilder
pub trait Plugin: Send + Sync + fmt::Debug {
    fn id(&self) -> PluginId;

    fn operation(&self) -> Operation;

    fn lib_name(&self) -> &str;

    fn lib_version(&self) -> &str;

    /// Execution strategy this plugin prefers when the caller runs in parallel.
    fn affinity(&self) -> ExecAffinity {
        ExecAffinity::Sequential
    }

    /// The backend call: infer, validate or profile.
    fn run_backend(&self) -> Result<Value>;

    /// Builds the standardized report from the backend result.
    ///
    /// Must accept an errored `result`.
    fn render_report(&self, result: &ExecResult<Value>) -> Result<JudgeReport>;

    /// Builds the artifacts to persist from the backend result.
    ///
    /// Must accept an errored `result`; see [`render_raw_artifact`].
    fn render_artifact(&self, result: &ExecResult<Value>) -> Result<Vec<RenderTuple>>;

    /// Serializable description a worker process can rebuild this plugin from.
    ///
    /// Required for plugins declaring [`ExecAffinity::Process`].
    fn task(&self) -> Option<PluginTask> {
        None
    }

    fn library(&self) -> LibraryInfo {
        LibraryInfo::new(self.lib_name(), self.lib_version())
    }

    /// Runs the backend call, then both render phases, each through the
    /// execution wrapper.
    fn execute(&self) -> Bundle {
        let id = self.id();
        info!(
            operation = %self.operation(),
            library = self.lib_name(),
            plugin.id = %id,
            "Executing plugin"
        );

        let wrapped = exec_wrapped(|| self.run_backend());
        if let Some(message) = wrapped.error_message() {
            warn!(
                operation = %self.operation(),
                library = self.lib_name(),
                plugin.id = %id,
                error = %message,
                "Backend execution failed"
            );
        }

        debug!(plugin.id = %id, "Rendering report");
        let report = exec_wrapped(|| self.render_report(&wrapped));

        debug!(plugin.id = %id, "Rendering artifact");
        let rendered = exec_wrapped(|| self.render_artifact(&wrapped));

        Bundle {
            wrapped,
            report,
            rendered,
            library: self.library(),
        }
    }
}

/// File name prefix of persisted artifacts for `operation`.
pub fn artifact_prefix(operation: Operation) -> &'static str {
    match operation {
        Operation::Inference => "schema",
        Operation::Validation => "report",
        Operation::Profiling => "profile",
    }
}

/// File name of the persisted artifact, e.g. `schema_datafusion.json`.
pub fn artifact_filename(operation: Operation, library: &str) -> String {
    format!("{}_{library}.json", artifact_prefix(operation))
}

/// Persists the raw backend artifact as-is, or an `{"errors": ...}`
/// placeholder when the backend call failed.
pub fn render_raw_artifact(
    operation: Operation,
    library: &str,
    result: &ExecResult<Value>,
) -> Vec<RenderTuple> {
    let object = match result.artifact() {
        Some(artifact) => artifact.clone(),
        None => json!({ "errors": result.errors }),
    };
    vec![RenderTuple::new(object, artifact_filename(operation, library))]
}
