// src/system/stdio.rs

//! The shell's own standard descriptors, kept across dispatches.

use nix::errno::Errno;
use nix::libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::unistd::dup2;
use scopeguard::ScopeGuard;
use std::io;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};

/// Copies of the shell's original standard input and output.
///
/// The copies are close-on-exec, so children never inherit them.
#[derive(Debug)]
pub struct SavedStdio {
    stdin: OwnedFd,
    stdout: OwnedFd,
}

impl SavedStdio {
    /// Duplicates descriptors 0 and 1.
    pub fn save() -> io::Result<Self> {
        Ok(Self {
            stdin: io::stdin().as_fd().try_clone_to_owned()?,
            stdout: io::stdout().as_fd().try_clone_to_owned()?,
        })
    }

    /// Points descriptors 0 and 1 back at the saved originals.
    pub fn restore(&self) -> Result<(), Errno> {
        dup2(self.stdin.as_raw_fd(), STDIN_FILENO)?;
        dup2(self.stdout.as_raw_fd(), STDOUT_FILENO)?;
        Ok(())
    }

    /// Returns a guard that restores both descriptors when dropped, on every
    /// exit path of the dispatch that holds it.
    pub fn restore_on_drop<'a>(&'a self) -> ScopeGuard<&'a Self, impl FnOnce(&'a Self)> {
        scopeguard::guard(self, |saved: &'a Self| {
            if let Err(e) = saved.restore() {
                log::warn!("Could not restore standard input/output: {}", e);
            }
        })
    }
}
