//! # jobsh
//!
//! The process-lifecycle core of a small interactive shell: a line parser with
//! `$$` expansion and `<`/`>`/`&` handling, a fork/exec launcher, foreground
//! supervision, a background job registry with per-iteration reaping, and a
//! `SIGTSTP`-driven foreground-only mode.

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod models;
pub mod shell;
pub mod state;
pub mod system;
