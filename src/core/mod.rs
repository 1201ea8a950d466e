// src/core/mod.rs

//! Process-independent shell logic: turning lines into commands and keeping
//! the background job bookkeeping. Nothing here forks or installs handlers.

pub mod jobs;
pub mod parser;
