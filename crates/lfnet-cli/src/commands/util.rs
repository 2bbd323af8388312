use std::path::Path;

use anyhow::{Context, Result};
use lfnet_core::{CaseData, LfNetwork};
use lfnet_cli::CliConfig;
use rayon::ThreadPoolBuilder;

pub fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
}

/// Read a JSON case and build its network with the configured slack selection.
pub fn load_network(case: &Path, config: &CliConfig) -> Result<LfNetwork> {
    let data = CaseData::load(case).with_context(|| format!("reading case {}", case.display()))?;
    let selector = config.topology.slack_bus_selection.selector();
    let network = data
        .into_network(config.topology.clone(), selector.as_ref())
        .with_context(|| format!("building network from {}", case.display()))?;
    tracing::debug!(
        case = %case.display(),
        buses = network.buses().len(),
        branches = network.branches().len(),
        "case loaded"
    );
    Ok(network)
}
