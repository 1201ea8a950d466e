// src/state.rs

//! Process-wide state shared between the control loop and the `SIGTSTP`
//! handler.
//!
//! The handler may run between any two instructions of the main loop, so
//! every value here is a single atomic word (or a `OnceLock` that is written
//! once before handlers are installed). Nothing in this module allocates or
//! blocks after initialisation.

use crate::{constants::DEFAULT_PROMPT, models::ShellMode};
use nix::unistd::Pid;
use std::sync::OnceLock;
#[cfg(test)]
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// `true` while the shell is in foreground-only mode.
static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

/// PID of the child under foreground supervision, or 0 when there is none.
static FOREGROUND_PID: AtomicI32 = AtomicI32::new(0);

/// Set by the handler when a mode change happened while a foreground child
/// was running; the supervisor prints the notice once the wait completes.
static PENDING_NOTICE: AtomicBool = AtomicBool::new(false);

static PROMPT: OnceLock<Box<str>> = OnceLock::new();

#[cfg(test)]
static TEST_LOCK: Mutex<()> = Mutex::new(());

/// The mode currently in effect.
pub fn current_mode() -> ShellMode {
    if FOREGROUND_ONLY.load(Ordering::SeqCst) {
        ShellMode::ForegroundOnly
    } else {
        ShellMode::Normal
    }
}

/// Flips the mode in one atomic step and returns the new mode.
pub fn toggle_mode() -> ShellMode {
    let was_foreground_only = FOREGROUND_ONLY.fetch_xor(true, Ordering::SeqCst);
    if was_foreground_only {
        ShellMode::Normal
    } else {
        ShellMode::ForegroundOnly
    }
}

/// Marks `pid` as the child under foreground supervision.
pub fn set_foreground_pid(pid: Pid) {
    FOREGROUND_PID.store(pid.as_raw(), Ordering::SeqCst);
}

/// Empties the foreground slot.
pub fn clear_foreground_pid() {
    FOREGROUND_PID.store(0, Ordering::SeqCst);
}

/// The supervised foreground child, if any.
pub fn foreground_pid() -> Option<Pid> {
    match FOREGROUND_PID.load(Ordering::SeqCst) {
        0 => None,
        raw => Some(Pid::from_raw(raw)),
    }
}

/// Asks the supervisor to announce the mode after its wait.
pub fn defer_notice() {
    PENDING_NOTICE.store(true, Ordering::SeqCst);
}

/// Returns `true` exactly once per deferred notice.
pub fn take_pending_notice() -> bool {
    PENDING_NOTICE.swap(false, Ordering::SeqCst)
}

/// Records the prompt text. Only the first call has an effect, so the value
/// is fixed before the signal handler can read it.
pub fn set_prompt(prompt: &str) {
    if PROMPT.set(prompt.into()).is_err() {
        log::debug!("Prompt already set; ignoring '{}'", prompt);
    }
}

/// The recorded prompt, or the default before one is set.
pub fn prompt() -> &'static str {
    PROMPT.get().map_or(DEFAULT_PROMPT, |p| &**p)
}

/// Serializes tests that toggle the mode or occupy the foreground slot.
#[cfg(test)]
pub(crate) fn lock_for_test() -> MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}
