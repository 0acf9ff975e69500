//! Command-line interface module.

mod args;
pub mod agent;
pub mod build;
pub mod serve;

pub use args::{Cli, Commands};
