//! Detached-pipeline registry and opportunistic reaper
//!
//! Backgrounded stages are registered here instead of being awaited. The
//! `reap_finished` sweep is an explicit addition over the classic
//! fire-and-forget behavior: hosts call it between pipelines to collect
//! statuses of jobs that have since exited, keeping the registry bounded.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::task::JoinHandle;
use tracing::debug;

/// One detached pipeline stage.
#[derive(Debug)]
struct BackgroundJob {
    /// OS pid, when the stage actually spawned
    pid: Option<u32>,
    /// Handle on the task waiting for the child
    handle: JoinHandle<i32>,
}

/// A reaped job's identity and exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReapedJob {
    pub pid: Option<u32>,
    pub exit_code: i32,
}

/// Registry of detached pipeline stages.
///
/// Cloning shares the registry (`Rc`), so every clone of the shell state
/// sees the same jobs.
#[derive(Debug, Clone, Default)]
pub struct BackgroundJobs {
    inner: Rc<RefCell<Vec<BackgroundJob>>>,
}

impl BackgroundJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a detached stage.
    pub fn register(&self, pid: Option<u32>, handle: JoinHandle<i32>) {
        debug!(?pid, "registered background job");
        self.inner.borrow_mut().push(BackgroundJob { pid, handle });
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Pids of still-registered jobs.
    pub fn pids(&self) -> Vec<u32> {
        self.inner.borrow().iter().filter_map(|j| j.pid).collect()
    }

    /// Collect statuses of jobs whose wait has completed; running jobs stay
    /// registered. Never blocks on a still-running child.
    pub async fn reap_finished(&self) -> Vec<ReapedJob> {
        let finished: Vec<BackgroundJob> = {
            let mut jobs = self.inner.borrow_mut();
            let mut finished = Vec::new();
            let mut index = 0;
            while index < jobs.len() {
                if jobs[index].handle.is_finished() {
                    finished.push(jobs.swap_remove(index));
                } else {
                    index += 1;
                }
            }
            finished
        };

        let mut reaped = Vec::new();
        for job in finished {
            let exit_code = job.handle.await.unwrap_or(1);
            debug!(pid = ?job.pid, exit_code, "reaped background job");
            reaped.push(ReapedJob {
                pid: job.pid,
                exit_code,
            });
        }
        reaped
    }

    /// Wait for every registered job to finish and collect all statuses.
    pub async fn wait_all(&self) -> Vec<ReapedJob> {
        let jobs: Vec<BackgroundJob> = self.inner.borrow_mut().drain(..).collect();
        let mut reaped = Vec::new();
        for job in jobs {
            let exit_code = job.handle.await.unwrap_or(1);
            reaped.push(ReapedJob {
                pid: job.pid,
                exit_code,
            });
        }
        reaped
    }
}
