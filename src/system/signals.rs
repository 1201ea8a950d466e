// src/system/signals.rs

//! Signal dispositions for the shell and its children.
//!
//! The shell ignores `SIGINT` and handles `SIGTSTP` by flipping the
//! foreground-only mode. Children get `SIGINT` back only when they run in the
//! foreground, and always ignore `SIGTSTP`.

#![allow(unsafe_code)]

use crate::state;
use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::unistd;
use std::os::fd::BorrowedFd;
use thiserror::Error;

/// Interactive interrupt: ignored by the shell, default in foreground children.
pub const INTERRUPT_SIGNAL: Signal = Signal::SIGINT;

/// Toggles foreground-only mode in the shell; ignored by every child.
pub const MODE_TOGGLE_SIGNAL: Signal = Signal::SIGTSTP;

/// `sigaction` refused a disposition.
#[derive(Error, Debug)]
#[error("Could not set the disposition of {signal}: {source}")]
pub struct SignalError {
    /// The signal being configured.
    pub signal: Signal,
    /// Why `sigaction` failed.
    #[source]
    pub source: Errno,
}

/// Installs the shell process's own dispositions. Call once, after the
/// prompt has been recorded in `state`.
pub fn install_shell_handlers() -> Result<(), SignalError> {
    set_disposition(INTERRUPT_SIGNAL, SigHandler::SigIgn, SaFlags::empty())?;
    // SA_RESTART keeps the blocking line read and foreground wait going; the
    // full mask keeps a second delivery from nesting inside the first.
    set_disposition(
        MODE_TOGGLE_SIGNAL,
        SigHandler::Handler(handle_mode_toggle),
        SaFlags::SA_RESTART,
    )?;
    log::debug!(
        "Installed handlers: {} ignored, {} toggles foreground-only mode",
        INTERRUPT_SIGNAL,
        MODE_TOGGLE_SIGNAL
    );
    Ok(())
}

/// Runs in a freshly forked child, before exec.
pub fn configure_child(foreground: bool) -> Result<(), SignalError> {
    let interrupt = if foreground {
        SigHandler::SigDfl
    } else {
        SigHandler::SigIgn
    };
    set_disposition(INTERRUPT_SIGNAL, interrupt, SaFlags::empty())?;
    set_disposition(MODE_TOGGLE_SIGNAL, SigHandler::SigIgn, SaFlags::empty())
}

fn set_disposition(signal: Signal, handler: SigHandler, flags: SaFlags) -> Result<(), SignalError> {
    let action = SigAction::new(handler, flags, SigSet::all());
    // SAFETY: the only handler ever installed is `handle_mode_toggle`, which
    // restricts itself to atomics and write(2).
    unsafe { sigaction(signal, &action) }
        .map(drop)
        .map_err(|source| SignalError { signal, source })
}

/// `SIGTSTP` handler. Touches only atomic state and writes with write(2);
/// it never waits and never allocates.
extern "C" fn handle_mode_toggle(_signal: libc::c_int) {
    let mode = state::toggle_mode();
    if state::foreground_pid().is_some() {
        // The supervisor announces the change once the foreground child is done.
        state::defer_notice();
        return;
    }
    write_stdout(b"\n");
    write_stdout(mode.notice().as_bytes());
    write_stdout(b"\n");
    write_stdout(state::prompt().as_bytes());
}

fn write_stdout(bytes: &[u8]) {
    // SAFETY: descriptor 1 is open for the whole life of the shell; the
    // control loop only ever dup2()s over it, never closes it.
    let stdout = unsafe { BorrowedFd::borrow_raw(libc::STDOUT_FILENO) };
    // Nothing useful can be done about a failed write from inside a handler.
    let _ = unistd::write(stdout, bytes);
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShellMode;
    use crate::system::supervisor;
    use nix::sys::signal::raise;
    use nix::unistd::Pid;

    #[test]
    fn test_two_deliveries_restore_the_original_mode() {
        let _state = state::lock_for_test();
        install_shell_handlers().unwrap();
        let original = state::current_mode();

        raise(MODE_TOGGLE_SIGNAL).unwrap();
        assert_eq!(state::current_mode(), original.toggled());

        raise(MODE_TOGGLE_SIGNAL).unwrap();
        assert_eq!(state::current_mode(), original);
    }

    #[test]
    fn test_toggle_during_foreground_wait_defers_the_notice() {
        let _state = state::lock_for_test();
        install_shell_handlers().unwrap();
        let original = state::current_mode();

        state::set_foreground_pid(Pid::this());
        raise(MODE_TOGGLE_SIGNAL).unwrap();
        state::clear_foreground_pid();

        assert_eq!(state::current_mode(), original.toggled());
        assert_eq!(
            supervisor::take_mode_notice(),
            Some(original.toggled().notice())
        );
        assert_eq!(supervisor::take_mode_notice(), None);

        raise(MODE_TOGGLE_SIGNAL).unwrap();
        assert_eq!(state::current_mode(), original);
        assert_eq!(supervisor::take_mode_notice(), None);
    }

    #[test]
    fn test_mode_notices_are_distinct() {
        assert_eq!(ShellMode::ForegroundOnly.notice(), t!("mode.enter"));
        assert_eq!(ShellMode::Normal.notice(), t!("mode.exit"));
    }
}
