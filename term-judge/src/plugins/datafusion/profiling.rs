//! Column-level profiling of a single resource.

use super::source::{read_resource, resolve_paths, ReadOptions};
use super::{block_on, lib_version, LIBRARY};
use crate::core::{
    DataResource, ExecAffinity, ExecResult, JudgeProfile, JudgeReport, Operation, RenderTuple,
    StoreConfig,
};
use crate::error::{JudgeError, Result};
use crate::plugins::builder::{BuildRequest, BuilderContext, PluginBuilder};
use crate::plugins::plugin::{new_plugin_id, render_raw_artifact, Plugin, PluginId};
use crate::runner::PluginTask;
use crate::security::SqlSecurity;
use arrow::array::{Array, Float64Array, Int64Array};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use serde_json::{json, Map, Value};
use tracing::instrument;

const PROFILE_TABLE: &str = "profiled_resource";

fn int_column(batch: &RecordBatch, name: &str) -> Result<i64> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_any().downcast_ref::<Int64Array>())
        .filter(|array| !array.is_empty())
        .map(|array| array.value(0))
        .ok_or_else(|| JudgeError::Internal(format!("Profile column '{name}' is not an integer")))
}

fn float_column(batch: &RecordBatch, name: &str) -> Option<f64> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_any().downcast_ref::<Float64Array>())
        .filter(|array| !array.is_empty() && array.is_valid(0))
        .map(|array| array.value(0))
}

/// Profiles one resource: row count, missing cells, and per-column counts,
/// distinct values and numeric ranges.
#[derive(Debug)]
pub struct ProfilingPlugin {
    id: PluginId,
    resource: DataResource,
    store: StoreConfig,
    options: ReadOptions,
    task: PluginTask,
}

impl Plugin for ProfilingPlugin {
    fn id(&self) -> PluginId {
        self.id
    }

    fn operation(&self) -> Operation {
        Operation::Profiling
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

    #[instrument(skip(self), fields(resource = %self.resource.name))]
    fn run_backend(&self) -> Result<Value> {
        let paths = resolve_paths(&self.store, &self.resource)?;
        let ctx = SessionContext::new();

        let (format, schema, batches) = block_on(async {
            let (format, df) = read_resource(&ctx, &paths, &self.options).await?;
            let schema = df.schema().inner().clone();
            ctx.register_table(PROFILE_TABLE, df.into_view())?;

            let mut select = vec!["COUNT(*) AS row_count".to_string()];
            for (i, field) in schema.fields().iter().enumerate() {
                let column = SqlSecurity::quote_identifier(field.name());
                select.push(format!("COUNT({column}) AS c{i}_count"));
                select.push(format!("COUNT(DISTINCT {column}) AS c{i}_distinct"));
                if field.data_type().is_numeric() {
                    select.push(format!("CAST(MIN({column}) AS DOUBLE) AS c{i}_min"));
                    select.push(format!("CAST(MAX({column}) AS DOUBLE) AS c{i}_max"));
                    select.push(format!("CAST(AVG({column}) AS DOUBLE) AS c{i}_mean"));
                }
            }

            let sql = format!("SELECT {} FROM {PROFILE_TABLE}", select.join(", "));
            let batches = ctx.sql(&sql).await?.collect().await?;
            Ok::<_, JudgeError>((format, schema, batches))
        })??;

        let batch = batches
            .iter()
            .find(|batch| batch.num_rows() > 0)
            .ok_or_else(|| JudgeError::Internal("Profile query returned no rows".to_string()))?;

        let rows = int_column(batch, "row_count")?;
        let mut fields = Map::new();
        let mut missing_cells = 0;
        for (i, field) in schema.fields().iter().enumerate() {
            let count = int_column(batch, &format!("c{i}_count"))?;
            let missing = rows - count;
            missing_cells += missing;

            let mut stats = json!({
                "type": field.data_type().to_string(),
                "count": count,
                "missing": missing,
                "distinct": int_column(batch, &format!("c{i}_distinct"))?,
            });
            if field.data_type().is_numeric() {
                stats["min"] = json!(float_column(batch, &format!("c{i}_min")));
                stats["max"] = json!(float_column(batch, &format!("c{i}_max")));
                stats["mean"] = json!(float_column(batch, &format!("c{i}_mean")));
            }
            fields.insert(field.name().clone(), stats);
        }

        let cells = rows * schema.fields().len() as i64;
        let missing_ratio = if cells > 0 {
            missing_cells as f64 / cells as f64
        } else {
            0.0
        };

        Ok(json!({
            "resource": self.resource.name,
            "format": format.as_str(),
            "stats": {
                "rows": rows,
                "columns": schema.fields().len(),
                "missingCells": missing_cells,
                "missingCellsRatio": missing_ratio,
            },
            "fields": fields,
        }))
    }

    fn render_report(&self, result: &ExecResult<Value>) -> Result<JudgeReport> {
        let section = |key: &str| {
            result
                .artifact()
                .and_then(|artifact| artifact.get(key))
                .cloned()
                .unwrap_or_else(|| json!({}))
        };

        Ok(JudgeReport::Profile(JudgeProfile {
            lib_name: self.lib_name().to_string(),
            lib_version: self.lib_version().to_string(),
            duration: Some(result.duration),
            stats: section("stats"),
            fields: section("fields"),
        }))
    }

    fn render_artifact(&self, result: &ExecResult<Value>) -> Result<Vec<RenderTuple>> {
        Ok(render_raw_artifact(Operation::Profiling, LIBRARY, result))
    }

    fn task(&self) -> Option<PluginTask> {
        Some(self.task.clone())
    }
}

/// Builds one [`ProfilingPlugin`] per resource.
#[derive(Debug)]
pub struct ProfilingBuilder {
    context: BuilderContext,
    options: ReadOptions,
}

impl ProfilingBuilder {
    pub fn new(context: BuilderContext) -> Result<Self> {
        let options = ReadOptions::from_exec_args(&context.exec_args)?;
        Ok(Self { context, options })
    }
}

impl PluginBuilder for ProfilingBuilder {
    fn operation(&self) -> Operation {
        Operation::Profiling
    }

    fn library(&self) -> &str {
        LIBRARY
    }

    fn build(&mut self, request: &BuildRequest<'_>) -> Result<Vec<Box<dyn Plugin>>> {
        self.context
            .resolve_stores(request.resources)?
            .into_iter()
            .map(|(resource, store)| {
                Ok(Box::new(ProfilingPlugin {
                    id: new_plugin_id(),
                    resource: resource.clone(),
                    store: store.clone(),
                    options: self.options.clone(),
                    task: self.context.task(
                        Operation::Profiling,
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
