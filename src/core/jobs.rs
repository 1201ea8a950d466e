// src/core/jobs.rs

//! Bookkeeping for background jobs.

use crate::models::{ExitStatus, ProcessHandle, ProcessKind};
use nix::errno::Errno;
use nix::unistd::Pid;
use thiserror::Error;

/// Registry failures. Reported, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// No room for another background job.
    #[error("The job registry is full ({limit} background jobs).")]
    RegistryFull {
        /// The configured capacity.
        limit: usize,
    },
}

/// A wait on a known child failed. The process table can no longer be
/// trusted, so callers treat this as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Waiting on process {pid} failed: {source}")]
pub struct WaitError {
    /// The child being waited on.
    pub pid: Pid,
    /// What `waitpid` returned.
    #[source]
    pub source: Errno,
}

/// The operations the registry needs from the operating system.
/// The real implementation lives in `system::supervisor`; tests supply their own.
pub trait ProcessControl {
    /// Checks without blocking whether `pid` has terminated.
    fn poll(&mut self, pid: Pid) -> Result<Option<ExitStatus>, WaitError>;

    /// Asks `pid` to terminate and blocks until it has.
    fn terminate(&mut self, pid: Pid) -> Result<ExitStatus, WaitError>;
}

/// A background job whose termination has been collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReapedJob {
    /// The job's process id.
    pub pid: Pid,
    /// How it terminated.
    pub status: ExitStatus,
}

/// Outstanding background processes in spawn order.
///
/// Never holds a PID that has already been reaped; removals keep the
/// relative order of the survivors.
#[derive(Debug, Clone)]
pub struct JobRegistry {
    jobs: Vec<ProcessHandle>,
    capacity: usize,
}

impl JobRegistry {
    /// An empty registry holding at most `capacity` jobs. Storage grows with
    /// the jobs actually started.
    pub fn new(capacity: usize) -> Self {
        Self {
            jobs: Vec::new(),
            capacity,
        }
    }

    /// Number of outstanding jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// `true` when no job is outstanding.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// `true` when another job would exceed the capacity.
    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.capacity
    }

    /// The most jobs this registry accepts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// PIDs in spawn order.
    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.jobs.iter().map(|job| job.pid)
    }

    /// Appends a freshly spawned background process.
    pub fn insert(&mut self, pid: Pid) -> Result<(), JobError> {
        if self.is_full() {
            return Err(JobError::RegistryFull {
                limit: self.capacity,
            });
        }
        self.jobs.push(ProcessHandle {
            pid,
            kind: ProcessKind::Background,
        });
        Ok(())
    }

    /// Polls every job once, in registry order, and removes the ones that
    /// have terminated. Returns them in the order they were found.
    pub fn reap_finished(
        &mut self,
        control: &mut impl ProcessControl,
    ) -> Result<Vec<ReapedJob>, WaitError> {
        let mut reaped: Vec<ReapedJob> = Vec::new();
        let mut idx = 0;
        while let Some(job) = self.jobs.get(idx) {
            let pid = job.pid;
            let polled = match control.poll(pid) {
                Ok(polled) => polled,
                Err(e) => {
                    // Already waited on, and the sweep is abandoned.
                    for job in &reaped {
                        log::warn!("Reaped {} ({}) before a failed wait", job.pid, job.status);
                    }
                    return Err(e);
                }
            };
            match polled {
                Some(status) => {
                    self.jobs.remove(idx);
                    log::debug!("Reaped background job {} ({:?})", pid, status);
                    reaped.push(ReapedJob { pid, status });
                }
                None => idx += 1,
            }
        }
        Ok(reaped)
    }

    /// Terminates and waits on every job in registry order, leaving the
    /// registry empty. A failed wait is logged and the sweep continues, so one
    /// bad entry cannot leave the others running.
    pub fn terminate_all(&mut self, control: &mut impl ProcessControl) -> Vec<ReapedJob> {
        let mut reaped = Vec::with_capacity(self.jobs.len());
        for job in self.jobs.drain(..) {
            match control.terminate(job.pid) {
                Ok(status) => reaped.push(ReapedJob {
                    pid: job.pid,
                    status,
                }),
                Err(e) => log::warn!("{}", e),
            }
        }
        reaped
    }
}

// MARK: --- UNIT TESTS ---
