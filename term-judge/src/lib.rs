//! # Term Judge - Data-Quality Plugin Orchestration
//!
//! Term Judge runs data-quality operations (schema inference, constraint
//! validation and statistical profiling) against named data resources. The
//! computation itself is delegated to interchangeable backend libraries;
//! Term Judge guarantees a uniform lifecycle, failure isolation and result
//! aggregation whichever backend ran.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use term_judge::prelude::*;
//!
//! # fn example() -> term_judge::error::Result<()> {
//! let config = RunConfig::default()
//!     .with_inference(ExecConfig::new("datafusion"))
//!     .with_validation(ExecConfig::new("datafusion"));
//! let stores = vec![StoreConfig::local("local", "/data").with_default(true)];
//! let resources = vec![DataResource::new("orders", "orders.csv", "local")];
//! let constraints = vec![Constraint::new("no_negative", "datafusion", ["orders"])
//!     .with_field("query", "SELECT COUNT(*) FROM orders WHERE amount < 0")
//!     .with_field("check", "value")
//!     .with_field("expect", "exact")
//!     .with_field("value", 0)];
//!
//! let mut handler = RunHandler::new(config, stores);
//! handler.infer(&resources, true, 4)?;
//! handler.validate(&resources, &constraints, "partial", true, 4)?;
//!
//! for report in handler.judge_reports().into_iter().flatten() {
//!     println!("{}", serde_json::to_string(report)?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`core`**: run configuration, resources and stores, the execution
//!   wrapper ([`core::exec_wrapped`]) and the four-part result bundle
//! - **`plugins`**: the `Plugin` / `PluginBuilder` contracts, the builder
//!   registry, and the `_dummy` and `datafusion` backends
//! - **`runner`**: the `RunHandler` scheduler, the thread and process pools
//!   and the per-run results registry
//! - **`logging`**: log presets and subscriber setup
//! - **`security`**: identifier and query checks for SQL backends
//!
//! ## Execution strategies
//!
//! Each plugin declares an [`core::ExecAffinity`]. When an operation runs
//! with `parallel = true`, plugins are grouped by affinity and the groups
//! run one after the other: sequential, thread pool, process pool, then
//! distributed. Each group keeps its plugins' submission order.
//!
//! Process-pool plugins are rebuilt inside a `term-judge-worker` child
//! process from a serializable [`runner::PluginTask`].

pub mod core;
pub mod error;
pub mod logging;
pub mod plugins;
pub mod prelude;
pub mod runner;
pub mod security;
