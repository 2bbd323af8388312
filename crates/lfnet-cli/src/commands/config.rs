use anyhow::Result;
use lfnet_cli::{CliConfig, ConfigCommands};

pub fn handle(command: &ConfigCommands, config: &CliConfig) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
