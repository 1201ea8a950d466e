// src/system/launcher.rs

//! Creates one child process per dispatched command.
//!
//! Everything the child needs (C strings for argv and redirect paths) is
//! prepared before `fork`, so the child only makes system calls between
//! `fork` and `exec`.

#![allow(unsafe_code)]

use crate::{
    constants::{CHILD_FAILURE_STATUS, SHELL_NAME},
    models::{Command, ProcessHandle, ProcessKind, ShellMode},
    system::signals,
};
use nix::errno::Errno;
use nix::fcntl::{OFlag, open};
use nix::libc::{self, STDIN_FILENO, STDOUT_FILENO};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, close, dup2, execvp, fork};
use std::ffi::{CStr, CString, NulError};
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use thiserror::Error;

const NULL_DEVICE: &CStr = c"/dev/null";

/// Failures on the parent side of a launch.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The command can't be represented as C strings. Not fatal.
    #[error("Argument or path contains a NUL byte: {0}")]
    InvalidArgument(#[from] NulError),
    /// `fork` itself failed. The shell cannot continue safely.
    #[error("Could not create a child process: {0}")]
    Fork(#[source] Errno),
}

/// A command converted into exactly what `execvp` and `open` consume.
#[derive(Debug, Clone)]
pub struct PreparedCommand {
    program: CString,
    argv: Vec<CString>,
    input: Option<CString>,
    output: Option<CString>,
    kind: ProcessKind,
}

impl PreparedCommand {
    /// Resolves the effective kind (foreground-only mode wins over `&`) and
    /// converts every string up front.
    pub fn new(command: &Command, mode: ShellMode) -> Result<Self, LaunchError> {
        let kind = if command.runs_in_background(mode) {
            ProcessKind::Background
        } else {
            ProcessKind::Foreground
        };
        Ok(Self {
            program: CString::new(command.program.as_str())?,
            argv: command
                .argv()
                .map(CString::new)
                .collect::<Result<Vec<_>, _>>()?,
            input: command.input.as_deref().map(path_to_cstring).transpose()?,
            output: command.output.as_deref().map(path_to_cstring).transpose()?,
            kind,
        })
    }

    /// Foreground or background, after the mode has been applied.
    pub fn kind(&self) -> ProcessKind {
        self.kind
    }

    fn is_background(&self) -> bool {
        self.kind == ProcessKind::Background
    }

    /// Where the child's stdin comes from: the named file, `/dev/null` for
    /// background jobs, or the inherited terminal.
    fn stdin_source(&self) -> Option<&CStr> {
        match &self.input {
            Some(path) => Some(path.as_c_str()),
            None if self.is_background() => Some(NULL_DEVICE),
            None => None,
        }
    }

    fn stdout_target(&self) -> Option<&CStr> {
        match &self.output {
            Some(path) => Some(path.as_c_str()),
            None if self.is_background() => Some(NULL_DEVICE),
            None => None,
        }
    }
}

fn path_to_cstring(path: &Path) -> Result<CString, NulError> {
    CString::new(path.as_os_str().as_bytes())
}

/// Forks and execs `prepared`. Returns the child's handle in the parent; the
/// child never returns from this function.
pub fn launch(prepared: &PreparedCommand) -> Result<ProcessHandle, LaunchError> {
    // SAFETY: between fork and exec the child only calls open, dup2, close,
    // sigaction, execvp, write and _exit on data prepared before the fork.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            log::debug!(
                "Spawned {:?} as {} ({:?}, stdin: {:?}, stdout: {:?})",
                prepared.program,
                child,
                prepared.kind,
                prepared.input,
                prepared.output
            );
            Ok(ProcessHandle {
                pid: child,
                kind: prepared.kind,
            })
        }
        Ok(ForkResult::Child) => run_child(prepared),
        Err(e) => Err(LaunchError::Fork(e)),
    }
}

// --- Child side ---

/// Why a child gave up before or at exec.
struct ChildFailure<'a> {
    subject: &'a CStr,
    context: &'static str,
    errno: Errno,
}

impl ChildFailure<'_> {
    /// Writes `jobsh: <subject>: <context>: <reason>` to stderr piecewise,
    /// without formatting or allocation.
    fn report(&self) {
        let pieces: [&[u8]; 8] = [
            SHELL_NAME.as_bytes(),
            b": ",
            self.subject.to_bytes(),
            b": ",
            self.context.as_bytes(),
            b": ",
            self.errno.desc().as_bytes(),
            b"\n",
        ];
        for piece in pieces {
            let _ = unistd::write(std::io::stderr(), piece);
        }
    }
}

fn run_child(prepared: &PreparedCommand) -> ! {
    if let Err(failure) = configure_child(prepared) {
        failure.report();
        child_exit();
    }

    let errno = match execvp(&prepared.program, &prepared.argv) {
        Err(errno) => errno,
        Ok(never) => match never {},
    };
    ChildFailure {
        subject: &prepared.program,
        context: t!("child.exec_failed"),
        errno,
    }
    .report();
    child_exit()
}

fn configure_child(prepared: &PreparedCommand) -> Result<(), ChildFailure<'_>> {
    // Dispositions first: the inherited SIGTSTP handler must not run once
    // stdout points at a redirect target.
    signals::configure_child(!prepared.is_background()).map_err(|e| ChildFailure {
        subject: &prepared.program,
        context: t!("child.signal_failed"),
        errno: e.source,
    })?;
    if let Some(path) = prepared.stdin_source() {
        redirect(path, OFlag::O_RDONLY, STDIN_FILENO, t!("child.input_failed"))?;
    }
    if let Some(path) = prepared.stdout_target() {
        redirect(
            path,
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            STDOUT_FILENO,
            t!("child.output_failed"),
        )?;
    }
    Ok(())
}

/// Opens `path` and moves it onto `target`.
fn redirect<'a>(
    path: &'a CStr,
    flags: OFlag,
    target: RawFd,
    context: &'static str,
) -> Result<(), ChildFailure<'a>> {
    let failure = |errno| ChildFailure {
        subject: path,
        context,
        errno,
    };
    // rw-r--r-- before the umask; only used when O_CREAT is set.
    let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
    let fd = open(path, flags, mode).map_err(failure)?;
    if fd != target {
        dup2(fd, target).map_err(|errno| ChildFailure {
            subject: path,
            context: t!("child.redirect_failed"),
            errno,
        })?;
        close(fd).map_err(failure)?;
    }
    Ok(())
}

fn child_exit() -> ! {
    // SAFETY: _exit skips atexit handlers and stdio flushing, which belong to
    // the parent's copy of the process image.
    unsafe { libc::_exit(CHILD_FAILURE_STATUS) }
}

// MARK: --- UNIT TESTS ---
