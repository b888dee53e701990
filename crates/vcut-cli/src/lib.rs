//! Command-line front end for the vcut silence remover.

pub mod app;
pub mod cli;
pub mod config;
pub mod output;

pub use app::{run, RunReport};
pub use cli::Args;
pub use config::{ConfigOverrides, RunConfig};
