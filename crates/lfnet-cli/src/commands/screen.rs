use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use lfnet_algo::{generate_n1, generate_n2, ScreeningInput, SecurityAnalysis, SecurityAnalysisResults};
use lfnet_cli::CliConfig;
use lfnet_core::{LfNetwork, TracingListener};
use serde::Serialize;
use tabwriter::TabWriter;
use tracing::info;

use crate::commands::util::{configure_threads, load_network};

pub struct ScreenArgs<'a> {
    pub cases: &'a [PathBuf],
    pub contingencies: Option<&'a Path>,
    pub n1: bool,
    pub n2: bool,
    pub out: Option<&'a Path>,
    pub threads: &'a str,
    pub trace_events: bool,
}

#[derive(Serialize)]
struct CaseResults<'a> {
    case: String,
    #[serde(flatten)]
    results: &'a SecurityAnalysisResults,
}

fn screening_input(network: &LfNetwork, args: &ScreenArgs<'_>) -> Result<ScreeningInput> {
    if let Some(path) = args.contingencies {
        return ScreeningInput::load(path).with_context(|| format!("reading contingencies {}", path.display()));
    }
    let contingencies = if args.n2 {
        generate_n2(network)
    } else if args.n1 {
        generate_n1(network)
    } else {
        anyhow::bail!("no contingencies: pass --contingencies, --n1 or --n2");
    };
    Ok(ScreeningInput {
        contingencies,
        strategies: Vec::new(),
    })
}

fn print_results(case: &Path, results: &SecurityAnalysisResults) -> Result<()> {
    println!("{}: {}", case.display(), results.summary());
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "CONTINGENCY\tSTRATEGY\tDISABLED BUSES\tDISABLED BRANCHES\tENABLED BUSES")?;
    for report in &results.reports {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            report.contingency_id,
            report.strategy_id.as_deref().unwrap_or("-"),
            report.disabled_buses.join(","),
            report.disabled_branches.join(","),
            report.enabled_buses.join(","),
        )?;
    }
    writer.flush()?;
    if results.diagnostics.has_issues() {
        print!("{}", results.diagnostics);
    }
    Ok(())
}

pub fn handle(args: ScreenArgs<'_>, config: &CliConfig) -> Result<()> {
    let start = Instant::now();
    configure_threads(args.threads);

    let mut jobs = Vec::with_capacity(args.cases.len());
    for case in args.cases {
        let mut network = load_network(case, config)?;
        if args.trace_events {
            network.add_listener(Box::new(TracingListener));
        }
        let input = screening_input(&network, &args)?;
        jobs.push((network, input));
    }

    let analysis = SecurityAnalysis::new(config.security.clone());
    let all = analysis.run_batch(jobs)?;

    for (case, results) in args.cases.iter().zip(&all) {
        print_results(case, results)?;
    }
    info!(
        cases = all.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "screening finished"
    );

    if let Some(path) = args.out {
        let payload: Vec<CaseResults<'_>> = args
            .cases
            .iter()
            .zip(&all)
            .map(|(case, results)| CaseResults {
                case: case.display().to_string(),
                results,
            })
            .collect();
        fs::write(path, serde_json::to_string_pretty(&payload)?)?;
        println!("Results written to {}", path.display());
    }
    Ok(())
}
