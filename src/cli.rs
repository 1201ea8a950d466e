// src/cli.rs

//! Command-line flags.

use clap::Parser;
use std::path::PathBuf;

/// jobsh: a small interactive shell with background jobs.
///
/// Reads one command per line from standard input. `cd`, `status` and `exit`
/// are built in; everything else is run as a child process. End a command
/// with `&` to run it in the background, and press Ctrl+Z to toggle
/// foreground-only mode.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read settings from this TOML file instead of the per-user config.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Prompt text, overriding the config file.
    #[arg(long)]
    pub prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_optional() {
        let cli = Cli::try_parse_from(["jobsh"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.prompt.is_none());

        let cli = Cli::try_parse_from(["jobsh", "-c", "/tmp/j.toml", "--prompt", "$ "]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/j.toml")));
        assert_eq!(cli.prompt.as_deref(), Some("$ "));
    }

    #[test]
    fn test_positional_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["jobsh", "script.sh"]).is_err());
    }
}
