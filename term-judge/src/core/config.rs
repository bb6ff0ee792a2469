//! Run configuration: which backends run for each operation.

use super::report::ErrorSummary;
use super::types::Operation;
use crate::error::{JudgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Library identifier of the no-op backends.
pub const DUMMY_LIBRARY: &str = "_dummy";

/// Backend-specific argument bag.
pub type ExecArgs = Map<String, Value>;

fn default_enabled() -> bool {
    true
}

/// Selects one backend library for an operation.
///
/// # Examples
///
/// ```rust
/// use term_judge::core::ExecConfig;
///
/// let config = ExecConfig::new("datafusion").with_arg("delimiter", ";");
/// assert!(config.enabled);
/// assert_eq!(config.exec_args["delimiter"], ";");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecConfig {
    /// Backend library identifier
    pub library: String,
    /// Arguments forwarded to the backend
    #[serde(default, alias = "exec_args")]
    pub exec_args: ExecArgs,
    /// Disabled entries are skipped
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ExecConfig {
    pub fn new(library: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            exec_args: ExecArgs::new(),
            enabled: true,
        }
    }

    /// The no-op configuration used when an operation has nothing enabled.
    pub fn dummy() -> Self {
        Self::new(DUMMY_LIBRARY)
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.exec_args.insert(key.into(), value.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Per-operation backend selection for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub inference: Vec<ExecConfig>,
    #[serde(default)]
    pub validation: Vec<ExecConfig>,
    #[serde(default)]
    pub profiling: Vec<ExecConfig>,
}

impl RunConfig {
    /// Parses a run configuration from a JSON document.
    ///
    /// Malformed input is a [`JudgeError::Configuration`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| JudgeError::Configuration(format!("Invalid run configuration: {e}")))
    }

    /// Reads and parses a run configuration file.
    ///
    /// An unreadable file is a [`JudgeError::Configuration`], like a malformed one.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            JudgeError::Configuration(format!(
                "Failed to read run configuration {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&content)
    }

    pub fn with_inference(mut self, config: ExecConfig) -> Self {
        self.inference.push(config);
        self
    }

    pub fn with_validation(mut self, config: ExecConfig) -> Self {
        self.validation.push(config);
        self
    }

    pub fn with_profiling(mut self, config: ExecConfig) -> Self {
        self.profiling.push(config);
        self
    }

    /// All configured entries for `operation`, enabled or not.
    pub fn configs(&self, operation: Operation) -> &[ExecConfig] {
        match operation {
            Operation::Inference => &self.inference,
            Operation::Validation => &self.validation,
            Operation::Profiling => &self.profiling,
        }
    }

    /// Enabled entries for `operation`.
    ///
    /// An empty or fully disabled list yields a single dummy entry so that
    /// every operation produces uniformly shaped results.
    pub fn exec_configs(&self, operation: Operation) -> Vec<ExecConfig> {
        let enabled: Vec<ExecConfig> = self
            .configs(operation)
            .iter()
            .filter(|config| config.enabled)
            .cloned()
            .collect();

        if enabled.is_empty() {
            vec![ExecConfig::dummy()]
        } else {
            enabled
        }
    }
}

/// How many failing records a validation report carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorReport {
    /// Only the number of errors.
    Count,
    /// At most [`ErrorReport::PARTIAL_LIMIT`] records.
    #[default]
    Partial,
    /// Every record.
    Full,
}

impl ErrorReport {
    pub const PARTIAL_LIMIT: usize = 100;

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorReport::Count => "count",
            ErrorReport::Partial => "partial",
            ErrorReport::Full => "full",
        }
    }

    /// Shapes `records` according to the report mode.
    pub fn summarize(&self, count: usize, mut records: Vec<Value>) -> ErrorSummary {
        match self {
            ErrorReport::Count => records.clear(),
            ErrorReport::Partial => records.truncate(Self::PARTIAL_LIMIT),
            ErrorReport::Full => {}
        }
        ErrorSummary { count, records }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorReport {
    type Err = JudgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "count" => Ok(ErrorReport::Count),
            "partial" => Ok(ErrorReport::Partial),
            "full" => Ok(ErrorReport::Full),
            other => Err(JudgeError::Configuration(format!(
                "Invalid error report mode '{other}', expected one of count, partial, full"
            ))),
        }
    }
}
