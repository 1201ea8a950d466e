// src/constants.rs

//! Defaults and fixed tokens.

/// Name used as the prefix of shell diagnostics and for the config directory.
pub const SHELL_NAME: &str = "jobsh";

/// The name of the configuration file inside the config directory.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Prompt written before every read unless configured otherwise.
pub const DEFAULT_PROMPT: &str = ":";

/// Longest accepted input line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 2048;

/// Most argument words (program name included) accepted on one line.
pub const DEFAULT_MAX_ARGUMENTS: usize = 512;

/// Most background jobs tracked at once.
pub const DEFAULT_MAX_BACKGROUND_JOBS: usize = 100;

/// Token replaced by the shell's own PID inside arguments.
pub const PID_TOKEN: &str = "$$";

/// A line whose first word starts with this is ignored.
pub const COMMENT_MARKER: char = '#';

/// Redirects standard input from the following word.
pub const INPUT_REDIRECT: &str = "<";
/// Redirects standard output to the following word.
pub const OUTPUT_REDIRECT: &str = ">";
/// As the last word, runs the command in the background.
pub const BACKGROUND_MARKER: &str = "&";

/// Exit status of a child whose redirection or exec failed.
pub const CHILD_FAILURE_STATUS: i32 = 1;
