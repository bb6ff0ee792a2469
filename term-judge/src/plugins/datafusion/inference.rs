//! Schema inference over a single resource.

use super::source::{portable_type, read_resource, resolve_paths, ReadOptions};
use super::{block_on, lib_version, LIBRARY};
use crate::core::{
    DataResource, ExecAffinity, ExecResult, JudgeReport, JudgeSchema, Operation, RenderTuple,
    SchemaField, StoreConfig,
};
use crate::error::{JudgeError, Result};
use crate::plugins::builder::{BuildRequest, BuilderContext, PluginBuilder};
use crate::plugins::plugin::{new_plugin_id, render_raw_artifact, Plugin, PluginId};
use crate::runner::PluginTask;
use datafusion::prelude::SessionContext;
use serde_json::{json, Value};
use tracing::instrument;

/// Infers the schema of one resource. Runs in a worker process when the
/// caller asks for parallel execution.
#[derive(Debug)]
pub struct InferencePlugin {
    id: PluginId,
    resource: DataResource,
    store: StoreConfig,
    options: ReadOptions,
    task: PluginTask,
}

impl Plugin for InferencePlugin {
    fn id(&self) -> PluginId {
        self.id
    }

    fn operation(&self) -> Operation {
        Operation::Inference
    }

    fn lib_name(&self) -> &str {
        LIBRARY
    }

    fn lib_version(&self) -> &str {
        lib_version()
    }

    fn affinity(&self) -> ExecAffinity {
        ExecAffinity::Process
    }

    #[instrument(skip(self), fields(resource = %self.resource.name))]
    fn run_backend(&self) -> Result<Value> {
        let paths = resolve_paths(&self.store, &self.resource)?;
        let ctx = SessionContext::new();

        let (format, schema) = block_on(async {
            let (format, df) = read_resource(&ctx, &paths, &self.options).await?;
            Ok::<_, JudgeError>((format, df.schema().inner().clone()))
        })??;

        let fields: Vec<Value> = schema
            .fields()
            .iter()
            .map(|field| {
                json!({
                    "name": field.name(),
                    "type": portable_type(field.data_type()),
                    "arrowType": field.data_type().to_string(),
                    "nullable": field.is_nullable(),
                })
            })
            .collect();

        Ok(json!({
            "resource": self.resource.name,
            "format": format.as_str(),
            "paths": paths,
            "fields": fields,
        }))
    }

    fn render_report(&self, result: &ExecResult<Value>) -> Result<JudgeReport> {
        let fields = match result.artifact() {
            Some(artifact) => artifact
                .get("fields")
                .and_then(Value::as_array)
                .map(|fields| {
                    fields
                        .iter()
                        .map(|field| SchemaField {
                            name: field["name"].as_str().unwrap_or_default().to_string(),
                            field_type: field["type"].as_str().unwrap_or("any").to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            None => vec![],
        };

        Ok(JudgeReport::Schema(JudgeSchema {
            lib_name: self.lib_name().to_string(),
            lib_version: self.lib_version().to_string(),
            duration: Some(result.duration),
            fields,
        }))
    }

    fn render_artifact(&self, result: &ExecResult<Value>) -> Result<Vec<RenderTuple>> {
        Ok(render_raw_artifact(Operation::Inference, LIBRARY, result))
    }

    fn task(&self) -> Option<PluginTask> {
        Some(self.task.clone())
    }
}

/// Builds one [`InferencePlugin`] per resource.
#[derive(Debug)]
pub struct InferenceBuilder {
    context: BuilderContext,
    options: ReadOptions,
}

impl InferenceBuilder {
    pub fn new(context: BuilderContext) -> Result<Self> {
        let options = ReadOptions::from_exec_args(&context.exec_args)?;
        Ok(Self { context, options })
    }
}

impl PluginBuilder for InferenceBuilder {
    fn operation(&self) -> Operation {
        Operation::Inference
    }

    fn library(&self) -> &str {
        LIBRARY
    }

    fn build(&mut self, request: &BuildRequest<'_>) -> Result<Vec<Box<dyn Plugin>>> {
        self.context
            .resolve_stores(request.resources)?
            .into_iter()
            .map(|(resource, store)| {
                Ok(Box::new(InferencePlugin {
                    id: new_plugin_id(),
                    resource: resource.clone(),
                    store: store.clone(),
                    options: self.options.clone(),
                    task: self.context.task(
                        Operation::Inference,
                        LIBRARY,
                        vec![resource.clone()],
                        None,
                        None,
                    ),
                }) as Box<dyn Plugin>)
            })
            .collect()
    }
}
