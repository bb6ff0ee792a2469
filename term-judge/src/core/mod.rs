//! Core data model: operations, configuration, resources, results and reports.

pub mod config;
pub mod report;
pub mod resource;
pub mod result;
pub mod types;

pub use config::{ErrorReport, ExecArgs, ExecConfig, RunConfig, DUMMY_LIBRARY};
pub use report::{
    Bundle, ErrorSummary, JudgeProfile, JudgeReport, JudgeSchema, JudgeValidation, LibraryInfo,
    RenderTuple, ResultEntry, SchemaField,
};
pub use resource::{Constraint, DataResource, ResourcePath, StoreConfig};
pub use result::{exec_wrapped, ExecResult, ExecStatus};
pub use types::{ExecAffinity, Operation, ResultCategory};
