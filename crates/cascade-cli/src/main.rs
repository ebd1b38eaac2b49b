//! `cascade`: run early-exit cascade scenarios against the simulated engine

use anyhow::{Context as _, Result};
use cascade_cli::{run, Scenario};
use cascade_sim::TracingSink;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(
    name = "cascade",
    version,
    about = "Early-exit inference cascade simulator",
    after_help = "EXAMPLES:\n  \
                  cascade check testing/fixtures/cascade.yaml\n  \
                  cascade run testing/fixtures/cascade.yaml --cycles 100\n  \
                  RUST_LOG=cascade_controller=debug cascade run scenario.yaml --reports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print exit statistics as JSON
    Run {
        scenario: PathBuf,

        /// Override the scenario's cycle count
        #[arg(short, long)]
        cycles: Option<u64>,

        /// Include every cycle report in the output
        #[arg(long)]
        reports: bool,
    },

    /// Validate a scenario without running it
    Check { scenario: PathBuf },
}

fn init_tracing(verbose: bool) -> Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(false)
            .finish();
        return tracing::subscriber::set_global_default(subscriber)
            .context("Failed to set tracing subscriber");
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Run {
            scenario,
            cycles,
            reports,
        } => {
            let scenario = Scenario::load(&scenario)?;
            let outcome = run(&scenario, cycles, reports, &mut TracingSink)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Check { scenario } => {
            let scenario = Scenario::load(&scenario)?;
            let issues = scenario.check()?;
            for issue in &issues {
                println!("{}", issue);
            }
            if !issues.is_empty() {
                anyhow::bail!("{} stage chain issue(s)", issues.len());
            }
            println!("ok: {} stages", scenario.stages.len());
        }
    }
    Ok(())
}
