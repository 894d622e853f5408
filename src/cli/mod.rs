//! CLI module for segfuse - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
