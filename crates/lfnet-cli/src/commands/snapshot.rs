use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use lfnet_cli::CliConfig;
use lfnet_core::NetworkSnapshot;

use crate::commands::util::load_network;

pub fn handle(case: &Path, out: Option<&PathBuf>, config: &CliConfig) -> Result<()> {
    let network = load_network(case, config)?;
    let payload = NetworkSnapshot::capture(&network).to_json_pretty()?;
    if let Some(path) = out {
        fs::write(path, &payload)?;
        println!("Snapshot written to {}", path.display());
    } else {
        println!("{payload}");
    }
    Ok(())
}
