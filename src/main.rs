use std::fs::File;
use std::io::{BufReader, IsTerminal};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use carbon_savings::{read_batch, summarize, EmissionFactors, SavingsReport, SavingsResult};

#[derive(Parser, Debug)]
#[command(
    name = "carbon-savings",
    version,
    about = "Estimate CO2 saved by cutting spam and deleting cloud storage"
)]
struct Cli {
    #[arg(
        long,
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "Spam emails per day"
    )]
    daily_spam: f64,
    #[arg(
        long = "deleted-gb",
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "Cloud storage deleted, in GB"
    )]
    deleted_gb: f64,
    #[arg(long, help = "TOML file overriding the emission factors")]
    factors: Option<PathBuf>,
    #[arg(long, help = "CSV of label,daily_spam_count,deleted_gigabytes rows")]
    batch: Option<PathBuf>,
    #[arg(long, help = "Reject negative or non-finite inputs")]
    strict: bool,
    #[arg(long, help = "Output machine-readable JSON")]
    json: bool,
}

#[derive(Serialize)]
struct JsonOut<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchOut {
    reports: Vec<SavingsReport>,
    total: SavingsResult,
    tree_equivalent: f64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let factors = match &cli.factors {
        Some(path) => EmissionFactors::load(path)?,
        None => EmissionFactors::default(),
    };

    let compute = |label: Option<String>, d: f64, g: f64| -> Result<SavingsReport> {
        if cli.strict {
            Ok(factors.try_report(label, d, g)?)
        } else {
            Ok(factors.report(label, d, g))
        }
    };

    match &cli.batch {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open batch file {}", path.display()))?;
            let rows = read_batch(BufReader::new(file))?;
            info!(rows = rows.len(), path = %path.display(), "read batch");

            let reports = rows
                .into_iter()
                .map(|r| {
                    let context = format!("row {} (line {})", r.label, r.line);
                    compute(Some(r.label), r.daily_spam_count, r.deleted_gigabytes)
                        .context(context)
                })
                .collect::<Result<Vec<_>>>()?;
            let total = summarize(&reports);
            let trees = factors.tree_equivalent(total.total_saving_kg);

            if cli.json {
                let out = BatchOut {
                    reports,
                    total,
                    tree_equivalent: trees,
                };
                println!(
                    "{}",
                    serde_json::to_string_pretty(&JsonOut { ok: true, data: out })?
                );
            } else {
                for r in &reports {
                    print_line(r.label.as_deref().unwrap_or("-"), &r.savings, r.tree_equivalent);
                }
                print_line("TOTAL", &total, trees);
            }
        }
        None => {
            let report = compute(None, cli.daily_spam, cli.deleted_gb)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&JsonOut {
                        ok: true,
                        data: report
                    })?
                );
            } else {
                print_line("-", &report.savings, report.tree_equivalent);
            }
        }
    }
    Ok(())
}

// label,spam_kg,cloud_kg,total_kg,trees
fn print_line(label: &str, s: &SavingsResult, trees: f64) {
    println!(
        "{},{:.3},{:.3},{:.3},{:.2}",
        label, s.spam_saving_kg, s.cloud_saving_kg, s.total_saving_kg, trees
    );
}
