//! Timesheet CLI library.
//!
//! This crate provides the `ts` command-line interface on top of `ts-core`
//! and the `SQLite` store in `ts-db`.

mod cli;
pub mod commands;
mod config;
mod prompt;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use prompt::TerminalPrompt;
