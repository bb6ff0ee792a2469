//! Partitioning and execution strategies for built plugins.
//!
//! Every strategy returns bundles in the order of its input, whatever order
//! the plugins complete in.

use super::task::PluginTask;
use crate::core::{Bundle, ExecAffinity};
use crate::error::{JudgeError, Result};
use crate::plugins::Plugin;
use rayon::prelude::*;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, instrument};

/// Environment variable overriding the worker executable.
pub const WORKER_ENV: &str = "TERM_JUDGE_WORKER";

/// File name of the worker executable, without platform suffix.
pub const WORKER_BIN: &str = "term-judge-worker";

/// Worker count used when the caller has no preference.
pub fn default_num_workers() -> usize {
    num_cpus::get().max(1)
}

/// Plugins grouped by the strategy that will run them.
#[derive(Debug, Default)]
pub struct Buckets {
    pub sequential: Vec<Box<dyn Plugin>>,
    pub thread: Vec<Box<dyn Plugin>>,
    pub process: Vec<Box<dyn Plugin>>,
    pub distributed: Vec<Box<dyn Plugin>>,
}

impl Buckets {
    /// Splits `plugins` by declared affinity.
    ///
    /// Without `parallel`, every plugin goes to the sequential bucket.
    pub fn partition(plugins: Vec<Box<dyn Plugin>>, parallel: bool) -> Self {
        let mut buckets = Self::default();
        for plugin in plugins {
            let affinity = if parallel {
                plugin.affinity()
            } else {
                ExecAffinity::Sequential
            };
            match affinity {
                ExecAffinity::Sequential => buckets.sequential.push(plugin),
                ExecAffinity::Thread => buckets.thread.push(plugin),
                ExecAffinity::Process => buckets.process.push(plugin),
                ExecAffinity::Distributed => buckets.distributed.push(plugin),
            }
        }
        buckets
    }

    pub fn len(&self) -> usize {
        self.sequential.len() + self.thread.len() + self.process.len() + self.distributed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Task descriptors of the process bucket.
    ///
    /// A process-bound plugin without a descriptor breaks the plugin
    /// contract and is reported as a construction error.
    pub fn process_tasks(&self) -> Result<Vec<PluginTask>> {
        self.process
            .iter()
            .map(|plugin| {
                plugin.task().ok_or_else(|| {
                    JudgeError::Construction(format!(
                        "Plugin {} of library '{}' requests process execution but cannot be described as a task",
                        plugin.id(),
                        plugin.lib_name()
                    ))
                })
            })
            .collect()
    }
}

/// Strategy for the distributed bucket.
///
/// Implementations must return one bundle per plugin, in input order.
pub trait DistributedExecutor: Send + Sync + fmt::Debug {
    fn execute(&self, plugins: &[Box<dyn Plugin>]) -> Result<Vec<Bundle>>;
}

fn thread_pool(num_workers: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers.max(1))
        .thread_name(|i| format!("term-judge-{i}"))
        .build()
        .map_err(|e| JudgeError::Pool(format!("Failed to start worker pool: {e}")))
}

pub fn run_sequential(plugins: &[Box<dyn Plugin>]) -> Vec<Bundle> {
    plugins.iter().map(|plugin| plugin.execute()).collect()
}

/// Executes `plugins` on a bounded thread pool.
#[instrument(skip(plugins), fields(plugins = plugins.len()))]
pub fn run_threaded(plugins: &[Box<dyn Plugin>], num_workers: usize) -> Result<Vec<Bundle>> {
    if plugins.is_empty() {
        return Ok(vec![]);
    }
    let pool = thread_pool(num_workers)?;
    Ok(pool.install(|| plugins.par_iter().map(|plugin| plugin.execute()).collect()))
}

/// Runs plugin tasks in worker processes, at most `num_workers` at a time.
#[derive(Debug, Clone)]
pub struct ProcessPool {
    program: PathBuf,
    num_workers: usize,
}

impl ProcessPool {
    pub fn new(program: impl Into<PathBuf>, num_workers: usize) -> Self {
        Self {
            program: program.into(),
            num_workers: num_workers.max(1),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    #[instrument(skip(self, tasks), fields(tasks = tasks.len(), workers = self.num_workers))]
    pub fn run(&self, tasks: &[PluginTask]) -> Result<Vec<Bundle>> {
        if tasks.is_empty() {
            return Ok(vec![]);
        }
        let pool = thread_pool(self.num_workers)?;
        pool.install(|| tasks.par_iter().map(|task| self.run_task(task)).collect())
    }

    fn run_task(&self, task: &PluginTask) -> Result<Bundle> {
        let pool_err = |what: &str, e: &dyn fmt::Display| {
            JudgeError::Pool(format!("{what} ({}): {e}", self.program.display()))
        };

        let payload = serde_json::to_vec(task)?;
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| pool_err("Failed to spawn worker", &e))?;

        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&payload),
            None => return Err(JudgeError::Pool("Worker stdin is not captured".to_string())),
        };

        if let Err(e) = sent {
            // The worker may have exited before reading its task. Reap it and
            // surface whatever it reported.
            let _ = child.kill();
            let output = child
                .wait_with_output()
                .map_err(|e| pool_err("Failed to wait for worker", &e))?;
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(JudgeError::Pool(format!(
                "Failed to send task to worker ({}): {e}; worker exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let output = child
            .wait_with_output()
            .map_err(|e| pool_err("Failed to wait for worker", &e))?;
        debug!(status = %output.status, bytes = output.stdout.len(), "Worker finished");

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(JudgeError::Pool(format!(
                "Worker exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| pool_err("Worker returned an invalid bundle", &e))
    }
}

/// Finds the worker executable.
///
/// Looks at [`WORKER_ENV`] first, then next to the current executable and
/// one directory up (test binaries live in `target/<profile>/deps`).
pub fn locate_worker() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(WORKER_ENV) {
        return Ok(PathBuf::from(path));
    }

    let file_name = format!("{WORKER_BIN}{}", std::env::consts::EXE_SUFFIX);
    let exe = std::env::current_exe()?;
    exe.ancestors()
        .skip(1)
        .take(2)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            JudgeError::Pool(format!(
                "Cannot locate the {WORKER_BIN} executable, set {WORKER_ENV}"
            ))
        })
}
