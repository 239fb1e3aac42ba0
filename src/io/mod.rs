//! Input/Output handling for the CLI.
//!
//! Exit codes shared by every command.

pub mod exit_code;

pub use exit_code::ExitCode;
