//! Reading resources from local stores into DataFusion.

use crate::core::{DataResource, ExecArgs, StoreConfig};
use crate::error::{JudgeError, Result};
use arrow::datatypes::DataType;
use datafusion::prelude::*;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, instrument};

/// File formats the DataFusion backends can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Parquet,
    Json,
}

impl FileFormat {
    /// Parses a format name or file extension.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Ok(FileFormat::Csv),
            "parquet" | "pq" => Ok(FileFormat::Parquet),
            "json" | "ndjson" | "jsonl" => Ok(FileFormat::Json),
            other => Err(JudgeError::NotSupported(format!(
                "file format '{other}'"
            ))),
        }
    }

    /// Guesses the format from the file extension.
    pub fn from_path(path: &str) -> Result<Self> {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                JudgeError::NotSupported(format!(
                    "cannot guess file format of '{path}', set the 'file_format' argument"
                ))
            })?;
        Self::parse(extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Parquet => "parquet",
            FileFormat::Json => "json",
        }
    }
}

/// Reader settings taken from an `ExecConfig` argument bag.
///
/// Recognized keys: `file_format`, `has_header`, `delimiter`,
/// `schema_infer_max_records`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    /// Forced format name; guessed from the extension when unset
    pub file_format: Option<String>,
    pub has_header: bool,
    pub delimiter: u8,
    pub schema_infer_max_records: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            file_format: None,
            has_header: true,
            delimiter: b',',
            schema_infer_max_records: 1000,
        }
    }
}

fn invalid_arg(key: &str, expected: &str) -> JudgeError {
    JudgeError::Configuration(format!("Argument '{key}' must be {expected}"))
}

impl ReadOptions {
    /// Parses reader settings, rejecting malformed values.
    ///
    /// The format name itself is checked when a resource is read, so that an
    /// unsupported format fails that resource only.
    pub fn from_exec_args(args: &ExecArgs) -> Result<Self> {
        let mut options = Self::default();

        if let Some(value) = args.get("file_format") {
            let format = value
                .as_str()
                .ok_or_else(|| invalid_arg("file_format", "a string"))?;
            options.file_format = Some(format.to_string());
        }

        if let Some(value) = args.get("has_header") {
            options.has_header = value
                .as_bool()
                .ok_or_else(|| invalid_arg("has_header", "a boolean"))?;
        }

        if let Some(value) = args.get("delimiter") {
            options.delimiter = match value.as_str().map(str::as_bytes) {
                Some([byte]) if byte.is_ascii() => *byte,
                _ => return Err(invalid_arg("delimiter", "a single ASCII character")),
            };
        }

        if let Some(value) = args.get("schema_infer_max_records") {
            options.schema_infer_max_records = value
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| invalid_arg("schema_infer_max_records", "a positive integer"))?;
        }

        Ok(options)
    }

    pub fn format_for(&self, path: &str) -> Result<FileFormat> {
        match &self.file_format {
            Some(name) => FileFormat::parse(name),
            None => FileFormat::from_path(path),
        }
    }
}

/// Reads an optional positive integer argument.
pub fn usize_arg(args: &ExecArgs, key: &str, default: usize) -> Result<usize> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| invalid_arg(key, "a positive integer")),
    }
}

/// Resolves the files of `resource` inside `store`, expanding glob patterns.
pub fn resolve_paths(store: &StoreConfig, resource: &DataResource) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for path in resource.path.paths() {
        let resolved = store.resolve_path(path)?;
        let resolved = resolved
            .to_str()
            .ok_or_else(|| JudgeError::data_source("file", "Path contains invalid UTF-8"))?
            .to_string();

        if resolved.contains(['*', '?', '[']) {
            paths.extend(expand_glob(&resolved)?);
        } else {
            paths.push(resolved);
        }
    }

    if paths.is_empty() {
        return Err(JudgeError::data_source(
            "file",
            format!("Resource '{}' has no files", resource.name),
        ));
    }
    Ok(paths)
}

fn expand_glob(pattern: &str) -> Result<Vec<String>> {
    let matches = glob::glob(pattern).map_err(|e| {
        JudgeError::Configuration(format!("Invalid glob pattern '{pattern}': {e}"))
    })?;

    let mut paths = Vec::new();
    for entry in matches {
        let path = entry.map_err(|e| JudgeError::Io(std::io::Error::other(e)))?;
        if path.is_file() {
            if let Some(path_str) = path.to_str() {
                paths.push(path_str.to_string());
            }
        }
    }

    if paths.is_empty() {
        return Err(JudgeError::data_source(
            "file",
            format!("No files found matching glob pattern '{pattern}'"),
        ));
    }
    paths.sort();
    Ok(paths)
}

fn file_extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Reads `paths` as one DataFrame.
#[instrument(skip(ctx, options), fields(files = paths.len()))]
pub async fn read_resource(
    ctx: &SessionContext,
    paths: &[String],
    options: &ReadOptions,
) -> Result<(FileFormat, DataFrame)> {
    let first = paths
        .first()
        .ok_or_else(|| JudgeError::data_source("file", "No files to read"))?;
    let format = options.format_for(first)?;
    let extension = file_extension(first);
    debug!(format = format.as_str(), extension = %extension, "Reading resource files");

    let df = match format {
        FileFormat::Csv => {
            let csv_options = CsvReadOptions::new()
                .has_header(options.has_header)
                .delimiter(options.delimiter)
                .schema_infer_max_records(options.schema_infer_max_records)
                .file_extension(&extension);
            ctx.read_csv(paths.to_vec(), csv_options).await?
        }
        FileFormat::Parquet => {
            let parquet_options = ParquetReadOptions {
                file_extension: &extension,
                ..Default::default()
            };
            ctx.read_parquet(paths.to_vec(), parquet_options).await?
        }
        FileFormat::Json => {
            let json_options = NdJsonReadOptions {
                file_extension: &extension,
                schema_infer_max_records: options.schema_infer_max_records,
                ..Default::default()
            };
            ctx.read_json(paths.to_vec(), json_options).await?
        }
    };

    Ok((format, df))
}

/// Reads `paths` and registers them as table `name`.
pub async fn register_resource(
    ctx: &SessionContext,
    name: &str,
    paths: &[String],
    options: &ReadOptions,
) -> Result<FileFormat> {
    let (format, df) = read_resource(ctx, paths, options).await?;
    ctx.register_table(name, df.into_view())?;
    Ok(format)
}

/// Maps an Arrow type onto the portable type names used in schema reports.
pub fn portable_type(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => "integer",
        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(..)
        | DataType::Decimal256(..) => "number",
        DataType::Boolean => "boolean",
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "string",
        DataType::Date32 | DataType::Date64 => "date",
        DataType::Timestamp(..) => "datetime",
        DataType::Time32(_) | DataType::Time64(_) => "time",
        DataType::Duration(_) | DataType::Interval(_) => "duration",
        DataType::List(_) | DataType::LargeList(_) | DataType::FixedSizeList(..) => "array",
        DataType::Struct(_) | DataType::Map(..) => "object",
        _ => "any",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::datafusion::block_on;
    use serde_json::json;

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_path("a/b.CSV").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_path("b.parquet").unwrap(), FileFormat::Parquet);
        assert_eq!(FileFormat::from_path("b.jsonl").unwrap(), FileFormat::Json);
        assert!(matches!(
            FileFormat::from_path("b.xlsx"),
            Err(JudgeError::NotSupported(_))
        ));
        assert!(FileFormat::from_path("no_extension").is_err());
    }

    #[test]
    fn test_read_options_from_args() {
        let mut args = ExecArgs::new();
        args.insert("delimiter".to_string(), json!(";"));
        args.insert("has_header".to_string(), json!(false));
        args.insert("file_format".to_string(), json!("csv"));

        let options = ReadOptions::from_exec_args(&args).unwrap();
        assert_eq!(options.delimiter, b';');
        assert!(!options.has_header);
        assert_eq!(options.format_for("data.txt").unwrap(), FileFormat::Csv);
    }

    #[test]
    fn test_read_options_reject_bad_delimiter() {
        let mut args = ExecArgs::new();
        args.insert("delimiter".to_string(), json!(";;"));
        assert!(ReadOptions::from_exec_args(&args).unwrap_err().is_configuration());
    }

    #[test]
    fn test_unknown_format_parses_lazily() {
        let mut args = ExecArgs::new();
        args.insert("file_format".to_string(), json!("xlsx"));
        let options = ReadOptions::from_exec_args(&args).unwrap();
        assert!(options.format_for("data.csv").is_err());
    }

    #[test]
    fn test_resolve_paths_expands_globs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("part-1.csv"), "a\n1\n").unwrap();
        std::fs::write(dir.path().join("part-2.csv"), "a\n2\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "skip").unwrap();

        let store = StoreConfig::local("local", dir.path());
        let resource = DataResource::new("parts", "part-*.csv", "local");
        let paths = resolve_paths(&store, &resource).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("part-1.csv"));

        let missing = DataResource::new("none", "missing-*.csv", "local");
        assert!(resolve_paths(&store, &missing).is_err());
    }

    #[test]
    fn test_register_csv_resource() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.tsv");
        std::fs::write(&path, "id\tamount\n1\t9.5\n2\t3.0\n").unwrap();

        let ctx = SessionContext::new();
        let options = ReadOptions {
            delimiter: b'\t',
            ..Default::default()
        };
        let paths = vec![path.to_string_lossy().into_owned()];

        let count = block_on(async {
            register_resource(&ctx, "orders", &paths, &options).await?;
            let batches = ctx.sql("SELECT COUNT(*) FROM orders").await?.collect().await?;
            Ok::<_, JudgeError>(batches[0].num_rows())
        })
        .unwrap()
        .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_portable_types() {
        assert_eq!(portable_type(&DataType::Int64), "integer");
        assert_eq!(portable_type(&DataType::Float64), "number");
        assert_eq!(portable_type(&DataType::Utf8), "string");
        assert_eq!(portable_type(&DataType::Boolean), "boolean");
        assert_eq!(portable_type(&DataType::Null), "any");
    }
}
