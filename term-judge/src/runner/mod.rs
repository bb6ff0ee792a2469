//! Scheduling, execution pools and result aggregation.

pub mod handler;
pub mod pool;
pub mod registry;
pub mod task;

pub use handler::{RunHandler, SchedulerOptions};
pub use pool::{default_num_workers, Buckets, DistributedExecutor, ProcessPool};
pub use registry::ResultsRegistry;
pub use task::{run_worker, PluginTask};
