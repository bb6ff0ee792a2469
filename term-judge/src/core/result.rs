//! Execution wrapper for backend calls.
//!
//! Every phase of a plugin (backend call, report rendering, artifact
//! rendering) goes through [`exec_wrapped`], which turns both `Err` returns
//! and panics into an [`ExecResult`] with `status = error`. Nothing a backend
//! does can unwind into the scheduler.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Lifecycle status of one wrapped call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecStatus {
    #[default]
    Created,
    Finished,
    Error,
}

/// Outcome of one wrapped backend call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecResult<T> {
    /// Final status of the call
    pub status: ExecStatus,
    /// Elapsed wall time in seconds, rounded to two decimals
    pub duration: f64,
    /// Error details when the call failed
    pub errors: Option<Vec<String>>,
    /// Value returned by the call when it finished
    pub artifact: Option<T>,
}

impl<T> Default for ExecResult<T> {
    fn default() -> Self {
        Self {
            status: ExecStatus::Created,
            duration: 0.0,
            errors: None,
            artifact: None,
        }
    }
}

impl<T> ExecResult<T> {
    /// Creates a finished result carrying `artifact`.
    pub fn finished(artifact: T, duration: f64) -> Self {
        Self {
            status: ExecStatus::Finished,
            duration,
            errors: None,
            artifact: Some(artifact),
        }
    }

    /// Creates an errored result carrying `errors`.
    pub fn failed(errors: Vec<String>, duration: f64) -> Self {
        Self {
            status: ExecStatus::Error,
            duration,
            errors: Some(errors),
            artifact: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == ExecStatus::Finished
    }

    pub fn is_error(&self) -> bool {
        self.status == ExecStatus::Error
    }

    pub fn artifact(&self) -> Option<&T> {
        self.artifact.as_ref()
    }

    /// Joins the captured error details into one message.
    pub fn error_message(&self) -> Option<String> {
        self.errors.as_ref().map(|errors| errors.join("; "))
    }
}

/// Runs `f`, timing it and capturing its outcome.
///
/// Returns `finished` with the artifact on `Ok`, and `error` with the error
/// message on `Err` or on panic. Never panics and never returns an error.
///
/// # Examples
///
/// ```rust
/// use term_judge::core::{exec_wrapped, ExecStatus};
/// use term_judge::error::JudgeError;
///
/// let ok = exec_wrapped(|| Ok(21 * 2));
/// assert_eq!(ok.status, ExecStatus::Finished);
/// assert_eq!(ok.artifact, Some(42));
///
/// let failed = exec_wrapped::<i32, _>(|| Err(JudgeError::backend("demo", "boom")));
/// assert_eq!(failed.status, ExecStatus::Error);
/// assert!(failed.artifact.is_none());
/// ```
pub fn exec_wrapped<T, F>(f: F) -> ExecResult<T>
where
    F: FnOnce() -> Result<T>,
{
    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    let duration = round_duration(start.elapsed());

    match outcome {
        Ok(Ok(artifact)) => ExecResult::finished(artifact, duration),
        Ok(Err(err)) => ExecResult::failed(vec![err.to_string()], duration),
        Err(payload) => ExecResult::failed(vec![panic_message(payload.as_ref())], duration),
    }
}

fn round_duration(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("backend panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("backend panicked: {msg}")
    } else {
        "backend panicked".to_string()
    }
}
