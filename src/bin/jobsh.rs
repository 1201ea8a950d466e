// src/bin/jobsh.rs

//! The `jobsh` executable.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use jobsh::{cli::Cli, config, shell::Shell, state, system::signals};
use std::io;

fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Loads the config, installs the signal handlers and runs the control loop
/// on the terminal until `exit` or end of input.
fn run(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let mut config =
        config::load_config(cli.config.as_deref()).context("Could not load the configuration")?;
    if let Some(prompt) = cli.prompt {
        config.prompt = prompt;
    }

    // The handler reads the prompt, so it must be fixed before installation.
    state::set_prompt(&config.prompt);
    signals::install_shell_handlers()?;

    let mut shell = Shell::new(config)?;
    shell.run(io::stdin().lock(), &mut io::stdout())?;
    Ok(())
}
