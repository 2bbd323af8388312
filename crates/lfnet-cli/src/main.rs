use std::process::ExitCode;

use clap::Parser;
use lfnet_cli::{Cli, CliConfig, Commands};
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::commands::screen::ScreenArgs;

mod commands;

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    match &cli.command {
        Commands::Graph { command } => commands::graph::handle(command, &config),
        Commands::Screen {
            cases,
            contingencies,
            n1,
            n2,
            out,
            threads,
            trace_events,
        } => commands::screen::handle(
            ScreenArgs {
                cases,
                contingencies: contingencies.as_deref(),
                n1: *n1,
                n2: *n2,
                out: out.as_deref(),
                threads,
                trace_events: *trace_events,
            },
            &config,
        ),
        Commands::Snapshot { case, out } => commands::snapshot::handle(case, out.as_ref(), &config),
        Commands::Config { command } => commands::config::handle(command, &config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG overrides --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str().to_ascii_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {err}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
