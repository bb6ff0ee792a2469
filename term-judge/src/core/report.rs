//! Standardized reports and the four-part result bundle.

use super::result::ExecResult;
use super::types::ResultCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend provenance attached to every bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryInfo {
    pub library_name: String,
    pub library_version: String,
}

impl LibraryInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            library_name: name.into(),
            library_version: version.into(),
        }
    }
}

/// One inferred column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

/// Error count plus the records kept by the error report mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub count: usize,
    pub records: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeSchema {
    pub lib_name: String,
    pub lib_version: String,
    pub duration: Option<f64>,
    pub fields: Vec<SchemaField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeValidation {
    pub lib_name: String,
    pub lib_version: String,
    pub duration: Option<f64>,
    /// The evaluated constraint, serialized
    pub constraint: Option<Value>,
    /// `None` when the backend did not decide
    pub valid: Option<bool>,
    pub errors: Option<ErrorSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeProfile {
    pub lib_name: String,
    pub lib_version: String,
    pub duration: Option<f64>,
    /// Dataset-level statistics
    pub stats: Value,
    /// Column-level statistics
    pub fields: Value,
}

/// Backend-independent report produced by a plugin's render phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JudgeReport {
    Schema(JudgeSchema),
    Validation(JudgeValidation),
    Profile(JudgeProfile),
}

impl JudgeReport {
    pub fn lib_name(&self) -> &str {
        match self {
            JudgeReport::Schema(report) => &report.lib_name,
            JudgeReport::Validation(report) => &report.lib_name,
            JudgeReport::Profile(report) => &report.lib_name,
        }
    }

    pub fn as_schema(&self) -> Option<&JudgeSchema> {
        match self {
            JudgeReport::Schema(report) => Some(report),
            _ => None,
        }
    }

    pub fn as_validation(&self) -> Option<&JudgeValidation> {
        match self {
            JudgeReport::Validation(report) => Some(report),
            _ => None,
        }
    }

    pub fn as_profile(&self) -> Option<&JudgeProfile> {
        match self {
            JudgeReport::Profile(report) => Some(report),
            _ => None,
        }
    }
}

/// An object ready to be persisted under `filename`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderTuple {
    pub object: Value,
    pub filename: String,
}

impl RenderTuple {
    pub fn new(object: Value, filename: impl Into<String>) -> Self {
        Self {
            object,
            filename: filename.into(),
        }
    }
}

/// The four-part output of one plugin execution.
///
/// Every field is always present; failures live inside the [`ExecResult`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub wrapped: ExecResult<Value>,
    pub report: ExecResult<JudgeReport>,
    pub rendered: ExecResult<Vec<RenderTuple>>,
    pub library: LibraryInfo,
}

impl Bundle {
    /// Splits the bundle into one registry entry per category.
    pub fn into_entries(self) -> [ResultEntry; 4] {
        [
            ResultEntry::Wrapped(self.wrapped),
            ResultEntry::Report(self.report),
            ResultEntry::Rendered(self.rendered),
            ResultEntry::Library(self.library),
        ]
    }
}

/// One value stored in the results registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "value", rename_all = "lowercase")]
pub enum ResultEntry {
    Wrapped(ExecResult<Value>),
    Report(ExecResult<JudgeReport>),
    Rendered(ExecResult<Vec<RenderTuple>>),
    Library(LibraryInfo),
}

impl ResultEntry {
    pub fn category(&self) -> ResultCategory {
        match self {
            ResultEntry::Wrapped(_) => ResultCategory::Wrapped,
            ResultEntry::Report(_) => ResultCategory::Report,
            ResultEntry::Rendered(_) => ResultCategory::Rendered,
            ResultEntry::Library(_) => ResultCategory::Library,
        }
    }
}
