// src/models.rs

//! Data passed between the parser, the launcher and the control loop.

use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use std::fmt;
use std::path::PathBuf;

// --- PARSED INPUT ---

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A blank line or a comment. Nothing is dispatched.
    Noop,
    /// Something to run.
    Command(Command),
}

/// A structured command, built fresh for every input line.
///
/// The program name is stored apart from its arguments, so a `Command`
/// always has at least one argument word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The first word, looked up through `PATH`.
    pub program: String,
    /// The words after the program, `$$` already expanded.
    pub args: Vec<String>,
    /// File named after `<`.
    pub input: Option<PathBuf>,
    /// File named after `>`.
    pub output: Option<PathBuf>,
    /// Set by a trailing `&`.
    pub background: bool,
}

impl Command {
    /// Creates a foreground command with no redirections.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            input: None,
            output: None,
            background: false,
        }
    }

    /// The full argument vector, program name first, as handed to `execvp`.
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }

    /// Whether this command actually runs in the background under `mode`.
    /// Foreground-only mode overrides the `&` flag.
    pub fn runs_in_background(&self, mode: ShellMode) -> bool {
        self.background && mode.allows_background()
    }
}

// --- PROCESSES ---

/// Whether the shell waits for a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    /// Waited on before the next prompt.
    Foreground,
    /// Registered as a job and reaped later.
    Background,
}

/// A spawned child and how the shell treats it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    /// The child's process id.
    pub pid: Pid,
    /// How the shell treats it.
    pub kind: ProcessKind,
}

/// How a child process terminated.
///
/// This is also the shell's `LastExitStatus`; it starts as a clean exit so
/// `status` has something sensible to report before any foreground command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Normal exit with this code.
    Exited(i32),
    /// Killed by this signal number.
    Signaled(i32),
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self::Exited(0)
    }
}

impl ExitStatus {
    /// Converts a `waitpid` result into a termination status.
    /// Returns `None` for anything that is not a termination (still running,
    /// stopped, continued).
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Self::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Self::Signaled(signal as i32)),
            _ => None,
        }
    }

    /// `true` when a signal ended the process.
    pub fn is_signaled(&self) -> bool {
        matches!(self, Self::Signaled(_))
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, t!("status.exited"), code = code),
            Self::Signaled(signal) => write!(f, t!("status.signaled"), signal = signal),
        }
    }
}

// --- SHELL MODE ---

/// Whether `&` is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellMode {
    /// `&` runs commands in the background.
    #[default]
    Normal,
    /// `&` is ignored.
    ForegroundOnly,
}

impl ShellMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            Self::Normal => Self::ForegroundOnly,
            Self::ForegroundOnly => Self::Normal,
        }
    }

    /// Whether `&` is honoured in this mode.
    pub fn allows_background(self) -> bool {
        self == Self::Normal
    }

    /// The fixed notice announcing that the shell has just entered this mode.
    /// It is a `'static` literal so the signal handler can write it as is.
    pub fn notice(self) -> &'static str {
        match self {
            Self::Normal => t!("mode.exit"),
            Self::ForegroundOnly => t!("mode.enter"),
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;

    #[test]
    fn test_argv_starts_with_program() {
        let mut cmd = Command::new("ls");
        cmd.args = vec!["-l".to_string(), "/tmp".to_string()];
        assert_eq!(cmd.argv().collect::<Vec<_>>(), vec!["ls", "-l", "/tmp"]);
    }

    #[test]
    fn test_foreground_only_overrides_background_flag() {
        let mut cmd = Command::new("sleep");
        cmd.background = true;
        assert!(cmd.runs_in_background(ShellMode::Normal));
        assert!(!cmd.runs_in_background(ShellMode::ForegroundOnly));

        cmd.background = false;
        assert!(!cmd.runs_in_background(ShellMode::Normal));
    }

    #[test]
    fn test_exit_status_from_wait_status() {
        let pid = Pid::from_raw(42);
        assert_eq!(
            ExitStatus::from_wait_status(WaitStatus::Exited(pid, 3)),
            Some(ExitStatus::Exited(3))
        );
        assert_eq!(
            ExitStatus::from_wait_status(WaitStatus::Signaled(pid, Signal::SIGTERM, false)),
            Some(ExitStatus::Signaled(15))
        );
        assert_eq!(ExitStatus::from_wait_status(WaitStatus::StillAlive), None);
    }

    #[test]
    fn test_exit_status_display() {
        assert_eq!(ExitStatus::default().to_string(), "Exit Status: 0");
        assert_eq!(ExitStatus::Exited(1).to_string(), "Exit Status: 1");
        assert_eq!(ExitStatus::Signaled(2).to_string(), "Terminating Signal: 2");
    }

    #[test]
    fn test_mode_toggle_round_trip() {
        let mode = ShellMode::default();
        assert_eq!(mode, ShellMode::Normal);
        assert_eq!(mode.toggled(), ShellMode::ForegroundOnly);
        assert_eq!(mode.toggled().toggled(), mode);
        assert_ne!(ShellMode::Normal.notice(), ShellMode::ForegroundOnly.notice());
    }
}
