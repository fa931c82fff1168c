/// Launching decoded folders with external tools
///
/// This module handles:
/// - Running resolved open commands through the user's shell (runner.rs)

pub mod runner;

pub use runner::{run_async, CommandRunner, EXTRA_SEARCH_PATHS};
