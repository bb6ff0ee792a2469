//! Backends computing inference, validation and profiling with DataFusion.
//!
//! Resources are read from local stores (CSV, Parquet or newline-delimited
//! JSON). Each plugin drives its own single-threaded Tokio runtime, so the
//! plugins stay synchronous and can run on any scheduler bucket.

pub mod checks;
mod inference;
mod profiling;
pub mod source;
mod validation;

pub use inference::{InferenceBuilder, InferencePlugin};
pub use profiling::{ProfilingBuilder, ProfilingPlugin};
pub use validation::{ValidationBuilder, ValidationPlugin};

use crate::error::Result;
use std::future::Future;

/// Library identifier of the DataFusion backends.
pub const LIBRARY: &str = "datafusion";

/// Version of the linked DataFusion crate.
pub fn lib_version() -> &'static str {
    datafusion::DATAFUSION_VERSION
}

/// Runs `future` to completion on a fresh current-thread runtime.
///
/// When called from inside a Tokio runtime the future is driven on a scoped
/// helper thread, since runtimes cannot be nested.
pub(crate) fn block_on<F>(future: F) -> Result<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    let run = move || -> Result<F::Output> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(future))
    };

    if tokio::runtime::Handle::try_current().is_ok() {
        std::thread::scope(|scope| {
            scope
                .spawn(run)
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
        })
    } else {
        run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on_outside_runtime() {
        assert_eq!(block_on(async { 40 + 2 }).unwrap(), 42);
    }

    #[tokio::test]
    async fn test_block_on_inside_runtime() {
        assert_eq!(block_on(async { "nested" }).unwrap(), "nested");
    }

    #[test]
    fn test_version_is_reported() {
        assert!(!lib_version().is_empty());
    }
}
