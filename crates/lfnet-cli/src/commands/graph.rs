use std::fs;

use anyhow::Result;
use lfnet_cli::{CliConfig, GraphCommands};
use lfnet_core::graph_utils;

use crate::commands::util::load_network;

pub fn handle(command: &GraphCommands, config: &CliConfig) -> Result<()> {
    match command {
        GraphCommands::Stats { case } => {
            let network = load_network(case, config)?;
            let stats = graph_utils::graph_stats(&network)?;
            println!("Graph statistics for {}:", case.display());
            println!("  Nodes         : {}", stats.node_count);
            println!("  Edges         : {}", stats.edge_count);
            println!(
                "  Disabled      : {} bus(es), {} branch(es)",
                stats.disabled_buses, stats.disabled_branches
            );
            println!("  Components    : {}", stats.connected_components);
            println!(
                "  Degree [min/avg/max]: {}/{:.2}/{}",
                stats.min_degree, stats.avg_degree, stats.max_degree
            );
            println!("  Density       : {:.4}", stats.density);
            println!(
                "  Zero-impedance networks [ac/dc]: {}/{}",
                stats.zero_impedance_networks_ac, stats.zero_impedance_networks_dc
            );
            Ok(())
        }
        GraphCommands::Islands { case, emit } => {
            let network = load_network(case, config)?;
            let analysis = graph_utils::find_islands(&network)?;
            for summary in &analysis.islands {
                let slack = if summary.has_slack { " (slack)" } else { "" };
                println!("Island {}: {} node(s){slack}", summary.island_id, summary.node_count);
            }
            if *emit {
                println!("\nNode -> Island assignments:");
                for assignment in &analysis.assignments {
                    println!(
                        "  idx {:>3}: {:<20} -> island {}",
                        assignment.bus.value(),
                        assignment.label,
                        assignment.island_id
                    );
                }
            }
            Ok(())
        }
        GraphCommands::Export { case, format, out } => {
            let network = load_network(case, config)?;
            let dot = graph_utils::export_graph(&network, format)?;
            if let Some(path) = out {
                fs::write(path, &dot)?;
                println!("Graph exported to {}", path.display());
            } else {
                println!("{dot}");
            }
            Ok(())
        }
    }
}
