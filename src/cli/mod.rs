//! CLI module for aeroforge - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
