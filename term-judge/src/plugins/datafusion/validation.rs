//! SQL constraint validation over a builder-scoped `SessionContext`.

use super::checks::{evaluate_validity, QueryOutcome};
use super::source::{register_resource, resolve_paths, usize_arg, ReadOptions};
use super::{block_on, lib_version, LIBRARY};
use crate::core::{
    Constraint, DataResource, ErrorReport, ErrorSummary, ExecAffinity, ExecResult, JudgeReport,
    JudgeValidation, Operation, RenderTuple,
};
use crate::error::{JudgeError, Result};
use crate::plugins::builder::{constraints_for, BuildRequest, BuilderContext, PluginBuilder};
use crate::plugins::plugin::{new_plugin_id, render_raw_artifact, Plugin, PluginId};
use crate::runner::PluginTask;
use crate::security::SqlSecurity;
use arrow::record_batch::RecordBatch;
use datafusion::execution::context::SQLOptions;
use datafusion::prelude::SessionContext;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

const DEFAULT_MAX_RESULT_ROWS: usize = 1000;

fn read_only() -> SQLOptions {
    SQLOptions::new()
        .with_allow_ddl(false)
        .with_allow_dml(false)
        .with_allow_statements(false)
}

/// Serializes query results as a list of JSON rows.
fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Map<String, Value>>> {
    let mut writer = arrow::json::ArrayWriter::new(Vec::new());
    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer.write_batches(&refs)?;
    writer.finish()?;
    let buffer = writer.into_inner();

    if buffer.is_empty() {
        return Ok(vec![]);
    }
    Ok(serde_json::from_slice(&buffer)?)
}

/// Evaluates one constraint's query against the shared context.
pub struct ValidationPlugin {
    id: PluginId,
    constraint: Constraint,
    error_report: ErrorReport,
    max_result_rows: usize,
    session: Arc<SessionContext>,
    task: PluginTask,
}

impl fmt::Debug for ValidationPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationPlugin")
            .field("id", &self.id)
            .field("constraint", &self.constraint.name)
            .field("error_report", &self.error_report)
            .field("max_result_rows", &self.max_result_rows)
            .finish_non_exhaustive()
    }
}

impl ValidationPlugin {
    fn required_field(&self, key: &str) -> Result<&str> {
        self.constraint.field_str(key).ok_or_else(|| {
            JudgeError::Configuration(format!(
                "Constraint '{}' is missing the '{key}' field",
                self.constraint.name
            ))
        })
    }
}

impl Plugin for ValidationPlugin {
    fn id(&self) -> PluginId {
        self.id
    }

    fn operation(&self) -> Operation {
        Operation::Validation
    }

    fn lib_name(&self) -> &str {
        LIBRARY
    }

    fn lib_version(&self) -> &str {
        lib_version()
    }

    fn affinity(&self) -> ExecAffinity {
        ExecAffinity::Thread
    }

    #[instrument(skip(self), fields(constraint = %self.constraint.name))]
    fn run_backend(&self) -> Result<Value> {
        let query = self.required_field("query")?;
        let check = self.required_field("check")?;
        let expect = self.required_field("expect")?;
        SqlSecurity::validate_query(query)?;

        let session = Arc::clone(&self.session);
        let (columns, batches) = block_on(async move {
            let df = session.sql_with_options(query, read_only()).await?;
            let columns: Vec<String> = df
                .schema()
                .fields()
                .iter()
                .map(|field| field.name().clone())
                .collect();
            let batches = df.collect().await?;
            Ok::<_, JudgeError>((columns, batches))
        })??;

        let mut rows = batches_to_rows(&batches)?;
        let row_count = rows.len();
        // Null cells are omitted by the JSON writer.
        let first_value = rows.first().map(|row| {
            columns
                .first()
                .and_then(|column| row.get(column))
                .cloned()
                .unwrap_or(Value::Null)
        });

        let outcome = QueryOutcome {
            row_count,
            first_value,
        };
        let (valid, error) = evaluate_validity(&outcome, check, expect, self.constraint.field("value"));
        debug!(valid, rows = row_count, "Constraint evaluated");

        rows.truncate(self.max_result_rows);
        Ok(json!({
            "result": rows,
            "rowCount": row_count,
            "valid": valid,
            "error": error,
        }))
    }

    fn render_report(&self, result: &ExecResult<Value>) -> Result<JudgeReport> {
        let mut errors = ErrorSummary::default();

        let valid = match result.artifact() {
            Some(artifact) => {
                let valid = artifact.get("valid").and_then(Value::as_bool).unwrap_or(false);
                if !valid {
                    let record = json!({
                        "type": "sql-check-error",
                        "message": artifact.get("error").cloned().unwrap_or(Value::Null),
                    });
                    errors = self.error_report.summarize(1, vec![record]);
                }
                valid
            }
            None => {
                error!(
                    plugin.id = %self.id,
                    errors = ?result.errors,
                    "Execution error, constraint reported invalid"
                );
                let record = json!({
                    "type": "execution-error",
                    "message": result.error_message(),
                });
                errors = self.error_report.summarize(1, vec![record]);
                false
            }
        };

        Ok(JudgeReport::Validation(JudgeValidation {
            lib_name: self.lib_name().to_string(),
            lib_version: self.lib_version().to_string(),
            duration: Some(result.duration),
            constraint: Some(serde_json::to_value(&self.constraint)?),
            valid: Some(valid),
            errors: Some(errors),
        }))
    }

    fn render_artifact(&self, result: &ExecResult<Value>) -> Result<Vec<RenderTuple>> {
        Ok(render_raw_artifact(Operation::Validation, LIBRARY, result))
    }

    fn task(&self) -> Option<PluginTask> {
        Some(self.task.clone())
    }
}

/// Registers every resource named by a `datafusion` constraint in one
/// shared context, then builds one [`ValidationPlugin`] per constraint.
pub struct ValidationBuilder {
    context: BuilderContext,
    options: ReadOptions,
    max_result_rows: usize,
    session: Option<Arc<SessionContext>>,
    registered: Vec<String>,
}

impl fmt::Debug for ValidationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationBuilder")
            .field("context", &self.context)
            .field("options", &self.options)
            .field("max_result_rows", &self.max_result_rows)
            .field("registered", &self.registered)
            .finish_non_exhaustive()
    }
}

impl ValidationBuilder {
    pub fn new(context: BuilderContext) -> Result<Self> {
        let options = ReadOptions::from_exec_args(&context.exec_args)?;
        let max_result_rows =
            usize_arg(&context.exec_args, "max_result_rows", DEFAULT_MAX_RESULT_ROWS)?;
        Ok(Self {
            context,
            options,
            max_result_rows,
            session: None,
            registered: Vec::new(),
        })
    }

    fn register(&mut self, session: &SessionContext, resource: &DataResource) -> Result<()> {
        let store = self.context.resource_store(resource)?;
        let construction = |e: JudgeError| {
            JudgeError::Construction(format!("Cannot register resource '{}': {e}", resource.name))
        };

        SqlSecurity::validate_identifier(&resource.name).map_err(construction)?;
        let paths = resolve_paths(store, resource).map_err(construction)?;
        block_on(register_resource(session, &resource.name, &paths, &self.options))
            .and_then(|registered| registered)
            .map_err(construction)?;

        self.registered.push(resource.name.clone());
        Ok(())
    }
}

impl PluginBuilder for ValidationBuilder {
    fn operation(&self) -> Operation {
        Operation::Validation
    }

    fn library(&self) -> &str {
        LIBRARY
    }

    fn build(&mut self, request: &BuildRequest<'_>) -> Result<Vec<Box<dyn Plugin>>> {
        let constraints = constraints_for(request.constraints(), LIBRARY);
        let targeted: HashSet<&str> = constraints
            .iter()
            .flat_map(|constraint| constraint.resources.iter().map(String::as_str))
            .collect();
        let resources: Vec<&DataResource> = request
            .resources
            .iter()
            .filter(|resource| targeted.contains(resource.name.as_str()))
            .collect();

        let session = Arc::new(SessionContext::new());
        for resource in &resources {
            self.register(&session, resource)?;
        }
        self.session = Some(Arc::clone(&session));
        info!(
            resources = resources.len(),
            constraints = constraints.len(),
            "Registered validation resources"
        );

        let error_report = request.error_report.unwrap_or_default();
        let plugins = constraints
            .into_iter()
            .filter_map(|constraint| {
                let present: Vec<DataResource> = resources
                    .iter()
                    .filter(|resource| constraint.targets(&resource.name))
                    .map(|resource| (*resource).clone())
                    .collect();
                if present.is_empty() {
                    return None;
                }

                let task = self.context.task(
                    Operation::Validation,
                    LIBRARY,
                    present,
                    Some(constraint.clone()),
                    Some(error_report),
                );
                Some(Box::new(ValidationPlugin {
                    id: new_plugin_id(),
                    constraint: constraint.clone(),
                    error_report,
                    max_result_rows: self.max_result_rows,
                    session: Arc::clone(&session),
                    task,
                }) as Box<dyn Plugin>)
            })
            .collect();

        Ok(plugins)
    }

    fn destroy(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            for name in self.registered.drain(..) {
                session.deregister_table(name.as_str())?;
            }
            debug!("Released validation session");
        }
        Ok(())
    }
}
