//! CLI argument parsing and command dispatch.

pub mod args;
pub mod check;
pub mod run;
pub mod scan;

pub use args::{Cli, Commands, ScanArgs};
