use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lfnet", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// TOML file with [topology] and [security] sections
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Graph utilities over the energized topology
    Graph {
        #[command(subcommand)]
        command: GraphCommands,
    },
    /// Screen contingencies and operator strategies
    Screen {
        /// Case files (JSON); each is screened as an independent network
        #[arg(required = true)]
        cases: Vec<PathBuf>,
        /// Contingencies and strategies (JSON)
        #[arg(long, conflicts_with_all = ["n1", "n2"])]
        contingencies: Option<PathBuf>,
        /// Generate one contingency per energized branch
        #[arg(long, conflicts_with = "n2")]
        n1: bool,
        /// Generate every pair of energized branches
        #[arg(long)]
        n2: bool,
        /// Write results as JSON
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Worker threads ("auto" or a number)
        #[arg(long, default_value = "auto")]
        threads: String,
        /// Log every network notification at debug level
        #[arg(long)]
        trace_events: bool,
    },
    /// Dump the bus and branch state of a case as JSON
    Snapshot {
        case: PathBuf,
        /// Optional output file path
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum GraphCommands {
    /// Graph stats summary
    Stats {
        /// Path to the case file (JSON)
        case: PathBuf,
    },
    /// Find islands in the energized topology
    Islands {
        /// Path to the case file (JSON)
        case: PathBuf,
        /// Emit the island of every bus
        #[arg(long)]
        emit: bool,
    },
    /// Export graph to various formats
    Export {
        /// Path to the case file (JSON)
        case: PathBuf,
        /// Output format (e.g., graphviz)
        #[arg(long, default_value = "graphviz")]
        format: String,
        /// Optional output file path
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}
