//! Error types for the term-judge orchestration engine.
//!
//! All fallible operations return [`JudgeError`]. The variants fall into four
//! groups that the scheduler treats differently:
//!
//! - configuration errors (`Configuration`, `UnknownBackend`) are raised before
//!   any plugin is built,
//! - construction errors (`StoreNotFound`, `Construction`) abort one operation,
//! - execution errors only ever travel inside an
//!   [`ExecResult`](crate::core::ExecResult),
//! - pool errors (`Pool`) escape the execution wrapper and are fatal.

use crate::core::Operation;
use thiserror::Error;

/// The main error type for term-judge.
#[derive(Error, Debug)]
pub enum JudgeError {
    /// Error related to run configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No builder is registered for the requested operation/library pair.
    #[error("No {operation} backend registered for library '{library}'")]
    UnknownBackend {
        /// Operation the backend was requested for
        operation: Operation,
        /// Library identifier from the run configuration
        library: String,
    },

    /// A resource names a store the builder was not given.
    #[error("No store registered with name '{store}'. Impossible to fetch resource '{resource}'")]
    StoreNotFound {
        /// Store name declared by the resource
        store: String,
        /// Name of the resource being resolved
        resource: String,
    },

    /// Plugin construction failed inside a builder.
    #[error("Construction error: {0}")]
    Construction(String),

    /// Failure raised by a backend computation.
    #[error("Backend error in '{library}': {message}")]
    Backend {
        /// Library that failed
        library: String,
        /// Detailed error message
        message: String,
    },

    /// Error from data source operations.
    #[error("Data source error: {message}")]
    DataSource {
        /// Type of data source (e.g., "csv", "parquet")
        source_type: String,
        /// Detailed error message
        message: String,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error when an operation is not supported.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Error raised by a worker pool outside the execution wrapper.
    #[error("Worker pool error: {0}")]
    Pool(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    SecurityError(String),
}

/// A type alias for `Result<T, JudgeError>`.
///
/// # Examples
///
/// ```rust
/// use term_judge::error::Result;
///
/// fn build_plugins() -> Result<()> {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, JudgeError>;

impl From<serde_json::Error> for JudgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl JudgeError {
    /// Creates a new backend error.
    pub fn backend(library: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            library: library.into(),
            message: message.into(),
        }
    }

    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
        }
    }

    /// Creates a store resolution error.
    pub fn store_not_found(store: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::StoreNotFound {
            store: store.into(),
            resource: resource.into(),
        }
    }

    /// Returns true for errors raised before any plugin is built.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::UnknownBackend { .. })
    }

    /// Returns true for errors raised while a builder constructs plugins.
    pub fn is_construction(&self) -> bool {
        matches!(self, Self::StoreNotFound { .. } | Self::Construction(_))
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<JudgeError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            JudgeError::Internal(inner) => JudgeError::Internal(format!("{msg}: {inner}")),
            other => JudgeError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                JudgeError::Internal(inner) => JudgeError::Internal(format!("{msg}: {inner}")),
                other => JudgeError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
