//! Prelude for commonly used types and traits in term-judge.

pub use crate::core::{
    Bundle, Constraint, DataResource, ErrorReport, ExecConfig, ExecResult, ExecStatus,
    JudgeReport, Operation, RunConfig, StoreConfig,
};
pub use crate::error::{ErrorContext, JudgeError, Result};
pub use crate::logging::LogConfig;
pub use crate::plugins::{BuilderRegistry, Plugin, PluginBuilder};
pub use crate::runner::{RunHandler, SchedulerOptions};
