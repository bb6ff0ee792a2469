//! Enumerations shared by plugins, builders and the scheduler.

use crate::error::{JudgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three data-quality operations a run can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Schema discovery.
    Inference,
    /// Constraint checking.
    Validation,
    /// Statistical summarization.
    Profiling,
}

impl Operation {
    /// All operations, in the order a full run executes them.
    pub const ALL: [Operation; 3] = [
        Operation::Inference,
        Operation::Validation,
        Operation::Profiling,
    ];

    /// Returns the lowercase name used in configuration files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Inference => "inference",
            Operation::Validation => "validation",
            Operation::Profiling => "profiling",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = JudgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "inference" => Ok(Operation::Inference),
            "validation" => Ok(Operation::Validation),
            "profiling" => Ok(Operation::Profiling),
            other => Err(JudgeError::Configuration(format!(
                "Unknown operation '{other}', expected one of inference, validation, profiling"
            ))),
        }
    }
}

/// The four categories every plugin bundle is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultCategory {
    /// Raw backend artifact.
    Wrapped,
    /// Standardized report.
    Report,
    /// Artifacts ready for persistence.
    Rendered,
    /// Backend library identification.
    Library,
}

impl ResultCategory {
    pub const ALL: [ResultCategory; 4] = [
        ResultCategory::Wrapped,
        ResultCategory::Report,
        ResultCategory::Rendered,
        ResultCategory::Library,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCategory::Wrapped => "wrapped",
            ResultCategory::Report => "report",
            ResultCategory::Rendered => "rendered",
            ResultCategory::Library => "library",
        }
    }
}

impl fmt::Display for ResultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution strategy a plugin asks for.
///
/// The scheduler honors the affinity only when the caller requests parallel
/// execution; otherwise every plugin runs in the sequential bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecAffinity {
    #[default]
    Sequential,
    Thread,
    Process,
    Distributed,
}

impl ExecAffinity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecAffinity::Sequential => "sequential",
            ExecAffinity::Thread => "thread",
            ExecAffinity::Process => "process",
            ExecAffinity::Distributed => "distributed",
        }
    }
}

impl fmt::Display for ExecAffinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_parse() {
        assert_eq!("inference".parse::<Operation>().unwrap(), Operation::Inference);
        assert_eq!("profiling".parse::<Operation>().unwrap(), Operation::Profiling);
        let err = "transform".parse::<Operation>().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_operation_serde_names() {
        let json = serde_json::to_string(&Operation::Validation).unwrap();
        assert_eq!(json, "\"validation\"");
        let affinity: ExecAffinity = serde_json::from_str("\"process\"").unwrap();
        assert_eq!(affinity, ExecAffinity::Process);
    }

    #[test]
    fn test_default_affinity_is_sequential() {
        assert_eq!(ExecAffinity::default(), ExecAffinity::Sequential);
    }
}
