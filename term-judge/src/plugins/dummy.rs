//! No-op backends for every operation.
//!
//! Selected when an operation has no enabled configuration, so that reports
//! keep the same shape whether or not a real backend ran.

use super::builder::{constraint_pairs, BuildRequest, BuilderContext, PluginBuilder};
use super::plugin::{new_plugin_id, render_raw_artifact, Plugin, PluginId};
use crate::core::{
    Constraint, DataResource, ErrorReport, ExecResult, JudgeProfile, JudgeReport, JudgeSchema,
    JudgeValidation, Operation, RenderTuple, DUMMY_LIBRARY,
};
use crate::error::Result;
use crate::runner::PluginTask;
use serde_json::{json, Value};

#[derive(Debug)]
pub struct DummyPlugin {
    id: PluginId,
    operation: Operation,
    task: PluginTask,
}

impl Plugin for DummyPlugin {
    fn id(&self) -> PluginId {
        self.id
    }

    fn operation(&self) -> Operation {
        self.operation
    }

    fn lib_name(&self) -> &str {
        DUMMY_LIBRARY
    }

    fn lib_version(&self) -> &str {
        DUMMY_LIBRARY
    }

    fn run_backend(&self) -> Result<Value> {
        Ok(json!({}))
    }

    fn render_report(&self, _result: &ExecResult<Value>) -> Result<JudgeReport> {
        let lib_name = self.lib_name().to_string();
        let lib_version = self.lib_version().to_string();
        Ok(match self.operation {
            Operation::Inference => JudgeReport::Schema(JudgeSchema {
                lib_name,
                lib_version,
                duration: None,
                fields: vec![],
            }),
            Operation::Validation => JudgeReport::Validation(JudgeValidation {
                lib_name,
                lib_version,
                duration: None,
                constraint: None,
                valid: None,
                errors: None,
            }),
            Operation::Profiling => JudgeReport::Profile(JudgeProfile {
                lib_name,
                lib_version,
                duration: None,
                stats: Value::Null,
                fields: Value::Null,
            }),
        })
    }

    fn render_artifact(&self, result: &ExecResult<Value>) -> Result<Vec<RenderTuple>> {
        Ok(render_raw_artifact(self.operation, DUMMY_LIBRARY, result))
    }

    fn task(&self) -> Option<PluginTask> {
        Some(self.task.clone())
    }
}

/// Builds one dummy plugin per resource, or per matching
/// (resource, constraint) pair for validation.
#[derive(Debug)]
pub struct DummyBuilder {
    operation: Operation,
    context: BuilderContext,
}

impl DummyBuilder {
    pub fn new(operation: Operation, context: BuilderContext) -> Self {
        Self { operation, context }
    }

    fn plugin(
        &self,
        resource: &DataResource,
        constraint: Option<&Constraint>,
        error_report: Option<ErrorReport>,
    ) -> Box<dyn Plugin> {
        Box::new(DummyPlugin {
            id: new_plugin_id(),
            operation: self.operation,
            task: self.context.task(
                self.operation,
                DUMMY_LIBRARY,
                vec![resource.clone()],
                constraint.cloned(),
                error_report,
            ),
        })
    }
}

impl PluginBuilder for DummyBuilder {
    fn operation(&self) -> Operation {
        self.operation
    }

    fn library(&self) -> &str {
        DUMMY_LIBRARY
    }

    fn build(&mut self, request: &BuildRequest<'_>) -> Result<Vec<Box<dyn Plugin>>> {
        self.context.resolve_stores(request.resources)?;

        let plugins = match self.operation {
            Operation::Validation => constraint_pairs(request.resources, request.constraints())
                .into_iter()
                .map(|(resource, constraint)| {
                    self.plugin(resource, Some(constraint), request.error_report)
                })
                .collect(),
            Operation::Inference | Operation::Profiling => request
                .resources
                .iter()
                .map(|resource| self.plugin(resource, None, None))
                .collect(),
        };
        Ok(plugins)
    }
}
