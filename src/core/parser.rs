// src/core/parser.rs

//! Turns one input line into a [`ParsedLine`].

use crate::{
    config::ShellConfig,
    constants::{BACKGROUND_MARKER, COMMENT_MARKER, INPUT_REDIRECT, OUTPUT_REDIRECT, PID_TOKEN},
    models::{Command, ParsedLine},
};
use std::path::PathBuf;
use thiserror::Error;

/// A line that cannot be dispatched. Reported, then the prompt returns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// `<` or `>` with no file name after it.
    #[error("'{operator}' must be followed by a file name.")]
    MissingRedirectTarget {
        /// The operator missing its target.
        operator: &'static str,
    },
    /// The line exceeds `max_line_length`.
    #[error("Line is {length} bytes long; the limit is {limit}.")]
    LineTooLong {
        /// Length of the line, in bytes.
        length: usize,
        /// The configured limit.
        limit: usize,
    },
    /// The command exceeds `max_arguments`.
    #[error("Command has {count} arguments; the limit is {limit}.")]
    TooManyArguments {
        /// Argument words, program name included.
        count: usize,
        /// The configured limit.
        limit: usize,
    },
}

/// Turns raw input lines into [`Command`]s.
///
/// The shell PID is rendered once, since `$$` expands to the same value for
/// the whole run.
#[derive(Debug, Clone)]
pub struct LineParser {
    shell_pid: String,
    max_line_length: usize,
    max_arguments: usize,
}

impl LineParser {
    /// A parser expanding `$$` to `shell_pid` and enforcing both limits.
    pub fn new(shell_pid: i32, max_line_length: usize, max_arguments: usize) -> Self {
        Self {
            shell_pid: shell_pid.to_string(),
            max_line_length,
            max_arguments,
        }
    }

    /// Takes the limits from `config`.
    pub fn from_config(shell_pid: i32, config: &ShellConfig) -> Self {
        Self::new(shell_pid, config.max_line_length, config.max_arguments)
    }

    /// Parses one line (a trailing newline is ignored).
    ///
    /// # Logic:
    /// - Words are separated by runs of whitespace; the first word is the
    ///   program, taken verbatim.
    /// - A first word starting with `#` makes the whole line a comment.
    /// - `<` and `>` consume the next word as the input/output file.
    /// - `&` as the last word requests background execution; anywhere else it
    ///   is an ordinary argument.
    /// - Every other word is an argument, with each `$$` replaced by the shell PID.
    pub fn parse(&self, line: &str) -> Result<ParsedLine, ParseError> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.len() > self.max_line_length {
            return Err(ParseError::LineTooLong {
                length: line.len(),
                limit: self.max_line_length,
            });
        }

        let mut words = line.split_whitespace().peekable();
        let Some(first) = words.next() else {
            return Ok(ParsedLine::Noop);
        };
        if first.starts_with(COMMENT_MARKER) {
            return Ok(ParsedLine::Noop);
        }

        let mut command = Command::new(first);
        while let Some(word) = words.next() {
            match word {
                INPUT_REDIRECT => {
                    command.input = Some(redirect_target(INPUT_REDIRECT, words.next())?);
                }
                OUTPUT_REDIRECT => {
                    command.output = Some(redirect_target(OUTPUT_REDIRECT, words.next())?);
                }
                BACKGROUND_MARKER if words.peek().is_none() => command.background = true,
                _ => command.args.push(self.expand(word)),
            }
        }

        let count = command.args.len() + 1;
        if count > self.max_arguments {
            return Err(ParseError::TooManyArguments {
                count,
                limit: self.max_arguments,
            });
        }

        Ok(ParsedLine::Command(command))
    }

    fn expand(&self, word: &str) -> String {
        expand_pid(word, &self.shell_pid)
    }
}

/// Replaces every `$$` in `word` with `pid`. Scanning is left to right and
/// non-overlapping, so `$$$` becomes `<pid>$`.
pub fn expand_pid(word: &str, pid: &str) -> String {
    word.replace(PID_TOKEN, pid)
}

fn redirect_target(operator: &'static str, next: Option<&str>) -> Result<PathBuf, ParseError> {
    match next {
        Some(target) if target != INPUT_REDIRECT && target != OUTPUT_REDIRECT => {
            Ok(PathBuf::from(target))
        }
        _ => Err(ParseError::MissingRedirectTarget { operator }),
    }
}

// MARK: --- UNIT TESTS ---
