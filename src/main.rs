mod cli;
mod telemetry;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinSet;
use tracing::info;

use cli::{Cli, Command};
use renewal_flow::state_machine::{RunSummary, Stage};
use renewal_flow::{RandomPolicy, RenewalConfig, RenewalEngine};
use ui::{FlowProgress, Tally};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.verbose, cli.log_json)?;

    let mut config = RenewalConfig::load().context("failed to load renewal.toml")?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    match cli.command {
        Command::Run => run_one(&config).await,
        Command::Simulate { runs } => simulate(&config, runs).await,
        Command::Stages => {
            for stage in Stage::ALL {
                println!("{}  {:<16} {}", stage.rank(), stage.to_string(), stage.label());
            }
            Ok(())
        }
    }
}

/// Run a single flow, rendering every snapshot. Ctrl-C resets the engine.
async fn run_one(config: &RenewalConfig) -> Result<()> {
    let engine = RenewalEngine::from_config(config)?;
    let mut snapshots = engine.subscribe();
    let mut progress = FlowProgress::start();

    engine.start()?;
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                changed.context("engine dropped its state channel")?;
                let state = snapshots.borrow_and_update().clone();
                progress.render(&state);
                if !state.running {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                engine.reset();
                break;
            }
        }
    }

    let state = engine.state();
    progress.complete(state.outcome);
    if let Some(summary) = RunSummary::from_state(&state) {
        progress.print_summary(&summary);
    }
    Ok(())
}

/// Run `runs` independent engines concurrently and tally their outcomes.
async fn simulate(config: &RenewalConfig, runs: usize) -> Result<()> {
    let mut tasks = JoinSet::new();
    for i in 0..runs {
        // Each instance gets its own generator; a base seed keeps the batch reproducible.
        let seed = config.seed.map(|s| s.wrapping_add(i as u64));
        let policy = RandomPolicy::new(config.success_probability, seed)?;
        let engine = RenewalEngine::new(config.engine_config(), policy);
        tasks.spawn(async move {
            engine.start()?;
            let state = engine.wait_until_settled().await;
            anyhow::Ok(RunSummary::from_state(&state))
        });
    }

    let mut tally = Tally::default();
    while let Some(joined) = tasks.join_next().await {
        if let Some(summary) = joined.context("simulation task panicked")?? {
            tally.record(&summary);
        }
    }

    info!(runs = tally.total(), failed = tally.failed, "simulation finished");
    tally.print();
    Ok(())
}
