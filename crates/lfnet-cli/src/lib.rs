pub mod cli;
pub mod config;

pub use cli::{Cli, Commands, ConfigCommands, GraphCommands};
pub use config::CliConfig;
