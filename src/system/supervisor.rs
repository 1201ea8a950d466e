// src/system/supervisor.rs

//! Waiting on children.

use crate::{
    core::jobs::{ProcessControl, WaitError},
    models::ExitStatus,
    state,
};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

/// Blocks until the foreground child `pid` terminates.
///
/// While waiting, `pid` is published in `state` so a mode toggle arriving
/// meanwhile defers its notice instead of writing over the child's output.
pub fn wait_foreground(pid: Pid) -> Result<ExitStatus, WaitError> {
    state::set_foreground_pid(pid);
    let _slot = scopeguard::guard((), |_| state::clear_foreground_pid());
    wait_blocking(pid)
}

/// The mode notice deferred while a foreground child ran, if any.
/// Announces the mode in effect now, so back-to-back toggles collapse into
/// one accurate line.
pub fn take_mode_notice() -> Option<&'static str> {
    state::take_pending_notice().then(|| state::current_mode().notice())
}

/// Waits on `pid` until it terminates, retrying on `EINTR`.
fn wait_blocking(pid: Pid) -> Result<ExitStatus, WaitError> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(exit) = ExitStatus::from_wait_status(status) {
                    return Ok(exit);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(source) => return Err(WaitError { pid, source }),
        }
    }
}

/// `ProcessControl` backed by `waitpid(2)` and `kill(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcesses;

impl ProcessControl for SystemProcesses {
    fn poll(&mut self, pid: Pid) -> Result<Option<ExitStatus>, WaitError> {
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(Errno::EINTR) => Ok(None),
            Ok(status) => Ok(ExitStatus::from_wait_status(status)),
            Err(source) => Err(WaitError { pid, source }),
        }
    }

    fn terminate(&mut self, pid: Pid) -> Result<ExitStatus, WaitError> {
        // Best effort: the process may already be gone and waiting to be reaped.
        if let Err(e) = kill(pid, Signal::SIGTERM) {
            log::debug!("Could not send SIGTERM to {}: {}", pid, e);
        }
        wait_blocking(pid)
    }
}

// MARK: --- UNIT TESTS ---
