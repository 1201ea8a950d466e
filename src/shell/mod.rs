// src/shell/mod.rs

//! The control loop: reap finished background jobs, prompt, read one line,
//! parse it, then hand it to a built-in or to the launcher.

pub mod builtins;

use crate::{
    config::ShellConfig,
    constants::SHELL_NAME,
    core::{
        jobs::{JobRegistry, WaitError},
        parser::LineParser,
    },
    models::{Command, ExitStatus, ParsedLine, ProcessKind, ShellMode},
    state,
    system::{
        launcher::{self, LaunchError, PreparedCommand},
        stdio::SavedStdio,
        supervisor::{self, SystemProcesses},
    },
};
use colored::Colorize;
use nix::unistd::getpid;
use std::fmt::Display;
use std::io::{self, BufRead, ErrorKind, Write};
use thiserror::Error;

/// Failures that end the shell. Everything else is reported and the prompt
/// comes back.
#[derive(Error, Debug)]
pub enum ShellError {
    /// Descriptors 0 and 1 could not be duplicated at startup.
    #[error("Could not save the original standard input/output: {0}")]
    Stdio(#[source] io::Error),
    /// Reading a line or writing a message failed.
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    /// `fork` failed.
    #[error(transparent)]
    Spawn(LaunchError),
    /// A wait on a known child failed.
    #[error(transparent)]
    Wait(#[from] WaitError),
}

/// What the loop does after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Prompt again.
    Continue,
    /// Clean up and return from `run`.
    Exit,
}

/// The shell's bookkeeping for one session.
#[derive(Debug)]
pub struct Shell {
    config: ShellConfig,
    parser: LineParser,
    jobs: JobRegistry,
    processes: SystemProcesses,
    last_status: ExitStatus,
    saved_stdio: SavedStdio,
}

impl Shell {
    /// A shell for this process, saving the current standard descriptors.
    pub fn new(config: ShellConfig) -> Result<Self, ShellError> {
        let shell_pid = getpid().as_raw();
        log::debug!("Starting shell {} with {:?}", shell_pid, config);
        Ok(Self {
            parser: LineParser::from_config(shell_pid, &config),
            jobs: JobRegistry::new(config.max_background_jobs),
            processes: SystemProcesses,
            last_status: ExitStatus::default(),
            saved_stdio: SavedStdio::save().map_err(ShellError::Stdio)?,
            config,
        })
    }

    /// Status of the last foreground command.
    pub fn last_status(&self) -> ExitStatus {
        self.last_status
    }

    /// Outstanding background jobs.
    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    /// Runs until `exit` or end of input, then terminates leftover jobs.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, out: &mut W) -> Result<(), ShellError> {
        let mut line = String::new();
        loop {
            self.reap_background(out)?;

            write!(out, "{}", self.config.prompt)?;
            out.flush()?;

            line.clear();
            match input.read_line(&mut line) {
                Ok(0) => {
                    log::debug!("End of input");
                    writeln!(out)?;
                    break;
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    report_diagnostic(e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            if self.execute_line(&line, out)? == Flow::Exit {
                break;
            }
        }
        self.shutdown();
        Ok(())
    }

    /// Handles one input line. Parse errors and per-command problems are
    /// reported here; only fatal errors are returned.
    pub fn execute_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow, ShellError> {
        let command = match self.parser.parse(line) {
            Ok(ParsedLine::Noop) => return Ok(Flow::Continue),
            Ok(ParsedLine::Command(command)) => command,
            Err(e) => {
                report_diagnostic(e);
                return Ok(Flow::Continue);
            }
        };

        if let Some(builtin) = builtins::find_builtin(&command.program) {
            log::debug!("Running built-in '{}'", builtin.name);
            return (builtin.handler)(self, &command, out);
        }

        self.dispatch(&command, state::current_mode(), out)?;
        Ok(Flow::Continue)
    }

    /// Launches `command` and either supervises it or registers it as a job.
    pub fn dispatch<W: Write>(
        &mut self,
        command: &Command,
        mode: ShellMode,
        out: &mut W,
    ) -> Result<(), ShellError> {
        let prepared = match PreparedCommand::new(command, mode) {
            Ok(prepared) => prepared,
            Err(e) => {
                report_diagnostic(e);
                return Ok(());
            }
        };

        if prepared.kind() == ProcessKind::Background && self.jobs.is_full() {
            report_diagnostic(format!(
                t!("job.registry_full"),
                program = command.program,
                limit = self.jobs.capacity()
            ));
            return Ok(());
        }

        let _restore = self.saved_stdio.restore_on_drop();
        let handle = launcher::launch(&prepared).map_err(ShellError::Spawn)?;

        match handle.kind {
            ProcessKind::Background => {
                if let Err(e) = self.jobs.insert(handle.pid) {
                    log::warn!("{}", e);
                }
                writeln!(out, t!("job.started"), pid = handle.pid)?;
            }
            ProcessKind::Foreground => {
                let status = supervisor::wait_foreground(handle.pid)?;
                log::debug!("Foreground process {} finished: {:?}", handle.pid, status);
                self.last_status = status;
                if status.is_signaled() {
                    writeln!(out, "{}", status)?;
                }
                if let Some(notice) = supervisor::take_mode_notice() {
                    log::info!("Mode changed during the wait: {:?}", state::current_mode());
                    writeln!(out, "{}", notice)?;
                }
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Collects every background job that has finished and reports it.
    pub fn reap_background<W: Write>(&mut self, out: &mut W) -> Result<(), ShellError> {
        let reaped = self.jobs.reap_finished(&mut self.processes)?;
        for job in &reaped {
            writeln!(out, t!("job.reaped"), pid = job.pid)?;
            writeln!(out, "{}", job.status)?;
        }
        if !reaped.is_empty() {
            out.flush()?;
        }
        Ok(())
    }

    /// Sends `SIGTERM` to every remaining job and waits for each, in spawn order.
    pub fn shutdown(&mut self) {
        if self.jobs.is_empty() {
            return;
        }
        log::info!("Terminating {} background job(s)", self.jobs.len());
        for job in self.jobs.terminate_all(&mut self.processes) {
            log::debug!("Job {} ended: {:?}", job.pid, job.status);
        }
    }
}

/// Writes a non-fatal diagnostic to stderr.
pub fn report_diagnostic(message: impl Display) {
    eprintln!(
        "{}: {}: {}",
        SHELL_NAME,
        t!("shell.diagnostic").red().bold(),
        message
    );
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::jobs::ProcessControl;
    use std::fs;
    use std::io::Cursor;
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn shell() -> Shell {
        Shell::new(ShellConfig::default()).unwrap()
    }

    fn parse(shell: &Shell, line: &str) -> Command {
        match shell.parser.parse(line).unwrap() {
            ParsedLine::Command(command) => command,
            ParsedLine::Noop => panic!("expected a command for {:?}", line),
        }
    }

    fn text(out: &[u8]) -> String {
        String::from_utf8_lossy(out).into_owned()
    }

    fn reap_until_empty(shell: &mut Shell, out: &mut Vec<u8>) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !shell.jobs().is_empty() {
            shell.reap_background(out).unwrap();
            assert!(Instant::now() < deadline, "background jobs never finished");
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_noop_lines_change_nothing() {
        let mut shell = shell();
        let mut out = Vec::new();
        for line in ["", "   \n", "# just a comment", "#echo hi &"] {
            assert_eq!(shell.execute_line(line, &mut out).unwrap(), Flow::Continue);
        }
        assert!(out.is_empty());
        assert!(shell.jobs().is_empty());
        assert_eq!(shell.last_status(), ExitStatus::default());
    }

    #[test]
    fn test_parse_error_is_not_dispatched() {
        let mut shell = shell();
        let mut out = Vec::new();
        assert_eq!(shell.execute_line("cat <", &mut out).unwrap(), Flow::Continue);
        assert!(out.is_empty());
        assert_eq!(shell.last_status(), ExitStatus::default());
    }

    #[test]
    fn test_foreground_status_is_recorded() {
        let _state = state::lock_for_test();
        let mut shell = shell();
        let mut out = Vec::new();
        shell.execute_line("false", &mut out).unwrap();
        assert_eq!(shell.last_status(), ExitStatus::Exited(1));
        shell.execute_line("true", &mut out).unwrap();
        assert_eq!(shell.last_status(), ExitStatus::Exited(0));
    }

    #[test]
    fn test_unknown_program_sets_non_zero_status() {
        let _state = state::lock_for_test();
        let mut shell = shell();
        let mut out = Vec::new();
        let flow = shell.execute_line("jobsh-test-badprog", &mut out).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert!(matches!(shell.last_status(), ExitStatus::Exited(code) if code != 0));
    }

    #[test]
    fn test_signaled_foreground_child_is_announced_immediately() {
        let _state = state::lock_for_test();
        let mut shell = shell();
        let mut out = Vec::new();
        // Quotes are not special to the parser, so build the command by hand.
        let mut command = Command::new("sh");
        command.args = vec!["-c".to_string(), "kill -KILL $$".to_string()];
        shell.dispatch(&command, ShellMode::Normal, &mut out).unwrap();
        assert_eq!(shell.last_status(), ExitStatus::Signaled(9));
        assert!(text(&out).contains("Terminating Signal: 9"));
    }

    #[test]
    fn test_background_dispatch_registers_without_blocking() {
        let mut shell = shell();
        let mut out = Vec::new();
        let command = parse(&shell, "sleep 30 &");

        let started = Instant::now();
        shell.dispatch(&command, ShellMode::Normal, &mut out).unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        assert_eq!(shell.jobs().len(), 1);
        let pid = shell.jobs().pids().next().unwrap();
        assert_eq!(
            text(&out),
            format!("PID of new background process: {}\n", pid)
        );
        assert_eq!(shell.last_status(), ExitStatus::default());

        shell.shutdown();
        assert!(shell.jobs().is_empty());
        // Already reaped by the shutdown sweep.
        assert!(SystemProcesses.poll(pid).is_err());
    }

    #[test]
    fn test_foreground_only_mode_waits_despite_ampersand() {
        let _state = state::lock_for_test();
        let mut shell = shell();
        let mut out = Vec::new();
        let mut command = Command::new("sh");
        command.args = vec!["-c".to_string(), "sleep 0.2; exit 4".to_string()];
        command.background = true;

        let started = Instant::now();
        shell
            .dispatch(&command, ShellMode::ForegroundOnly, &mut out)
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(shell.jobs().is_empty());
        assert_eq!(shell.last_status(), ExitStatus::Exited(4));
    }

    #[test]
    fn test_echo_pid_into_file_in_background() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let mut shell = shell();
        let mut out = Vec::new();

        let command = parse(&shell, &format!("echo $$ > {} &", target.display()));
        let shell_pid = std::process::id().to_string();
        assert_eq!(command.argv().collect::<Vec<_>>(), vec!["echo", shell_pid.as_str()]);
        assert!(command.background);

        shell.dispatch(&command, ShellMode::Normal, &mut out).unwrap();
        let pid = shell.jobs().pids().next().unwrap();
        reap_until_empty(&mut shell, &mut out);

        assert_eq!(fs::read_to_string(&target).unwrap(), format!("{}\n", shell_pid));
        let report = text(&out);
        assert!(report.contains(&format!("PID of new background process: {}\n", pid)));
        assert!(report.contains(&format!("{} has been reaped.\nExit Status: 0\n", pid)));
    }

    #[test]
    fn test_jobs_are_reaped_in_spawn_order() {
        let mut shell = shell();
        let mut out = Vec::new();
        let mut pids = Vec::new();
        for _ in 0..3 {
            shell
                .dispatch(&parse(&shell, "true &"), ShellMode::Normal, &mut out)
                .unwrap();
            pids.push(shell.jobs().pids().last().unwrap());
        }
        // Give every child time to finish so one sweep collects them all.
        thread::sleep(Duration::from_millis(500));
        out.clear();
        reap_until_empty(&mut shell, &mut out);

        let report = text(&out);
        let positions: Vec<usize> = pids
            .iter()
            .map(|pid| report.find(&format!("{} has been reaped.", pid)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_full_registry_refuses_new_jobs() {
        let config = ShellConfig {
            max_background_jobs: 1,
            ..ShellConfig::default()
        };
        let mut shell = Shell::new(config).unwrap();
        let mut out = Vec::new();
        let command = parse(&shell, "sleep 30 &");

        shell.dispatch(&command, ShellMode::Normal, &mut out).unwrap();
        shell.dispatch(&command, ShellMode::Normal, &mut out).unwrap();
        assert_eq!(shell.jobs().len(), 1);
        shell.shutdown();
    }

    #[test]
    fn test_run_loop_with_status_and_exit() {
        let _state = state::lock_for_test();
        let mut shell = shell();
        let mut out = Vec::new();
        let input = Cursor::new("true\nstatus\n\n# note\nfalse\nstatus\nexit\necho unreachable\n");

        shell.run(input, &mut out).unwrap();
        let report = text(&out);
        assert_eq!(report, "::Exit Status: 0\n::::Exit Status: 1\n:");
    }

    #[test]
    fn test_huge_job_limit_does_not_preallocate() {
        let config = ShellConfig {
            max_background_jobs: usize::MAX,
            ..ShellConfig::default()
        };
        let shell = Shell::new(config).unwrap();
        assert_eq!(shell.jobs().capacity(), usize::MAX);
        assert!(!shell.jobs().is_full());
    }

    #[test]
    fn test_run_loop_ends_on_eof_and_terminates_jobs() {
        let mut shell = shell();
        let mut out = Vec::new();
        // `&` honours the global mode, which starts out normal.
        shell
            .dispatch(&parse(&shell, "sleep 30 &"), ShellMode::Normal, &mut out)
            .unwrap();
        shell.run(Cursor::new(""), &mut out).unwrap();
        assert!(shell.jobs().is_empty());
    }
}
