// src/shell/builtins.rs

//! Commands the shell runs itself, without forking.
//!
//! Built-ins ignore `&` and redirections, and never touch the last
//! foreground status.

use super::{Flow, Shell, ShellError, report_diagnostic};
use crate::models::Command;
use std::env;
use std::io::Write;
use std::path::PathBuf;

/// A built-in command and the function that runs it.
pub struct BuiltinDefinition {
    /// The word that invokes it.
    pub name: &'static str,
    /// Runs it against the shell.
    pub handler: fn(&mut Shell, &Command, &mut dyn Write) -> Result<Flow, ShellError>,
}

static BUILTIN_REGISTRY: &[BuiltinDefinition] = &[
    BuiltinDefinition {
        name: "cd",
        handler: change_directory,
    },
    BuiltinDefinition {
        name: "exit",
        handler: exit,
    },
    BuiltinDefinition {
        name: "status",
        handler: status,
    },
];

/// Looks up a built-in by its exact name.
pub fn find_builtin(name: &str) -> Option<&'static BuiltinDefinition> {
    BUILTIN_REGISTRY.iter().find(|builtin| builtin.name == name)
}

/// `cd [dir]`: with no argument, goes to the home directory.
fn change_directory(
    _shell: &mut Shell,
    command: &Command,
    _out: &mut dyn Write,
) -> Result<Flow, ShellError> {
    let target = match command.args.first() {
        Some(dir) => PathBuf::from(dir),
        None => match dirs::home_dir() {
            Some(home) => home,
            None => {
                report_diagnostic(t!("builtin.cd_no_home"));
                return Ok(Flow::Continue);
            }
        },
    };

    match env::set_current_dir(&target) {
        Ok(()) => log::debug!("Working directory is now {}", target.display()),
        Err(e) => report_diagnostic(format!(
            t!("builtin.cd_failed"),
            path = target.display(),
            reason = e
        )),
    }
    Ok(Flow::Continue)
}

fn status(shell: &mut Shell, _command: &Command, out: &mut dyn Write) -> Result<Flow, ShellError> {
    writeln!(out, "{}", shell.last_status())?;
    out.flush()?;
    Ok(Flow::Continue)
}

fn exit(_shell: &mut Shell, _command: &Command, _out: &mut dyn Write) -> Result<Flow, ShellError> {
    Ok(Flow::Exit)
}
