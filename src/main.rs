//! grid-dac-sim entry point: CLI wiring, logging, and report printing.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use grid_dac_sim::cli::{Cli, Command, PresetsArgs, RunArgs, SweepArgs};
use grid_dac_sim::config::ScenarioConfig;
use grid_dac_sim::error::Result;
use grid_dac_sim::io::export;
use grid_dac_sim::sim::engine;
use grid_dac_sim::sim::kpi::SummaryMetrics;
use grid_dac_sim::sweep::{self, SweepControl, SweepInputs, SweepOptions, SweepOutcome};

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let result = match cli.command {
        Command::Run(args) => run(&args),
        Command::Sweep(args) => run_sweep(&args),
        Command::Presets(args) => presets(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            for field in e.config_errors() {
                error!("{field}");
            }
            if e.config_errors().is_empty() {
                error!("{e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &RunArgs) -> Result<()> {
    let scenario = args.scenario.load_scenario()?;
    let assets = scenario.to_asset_config()?;
    let demand = args.scenario.load_demand(&scenario)?;
    let supply = args.load_supply(&scenario)?;
    let imports = args.scenario.load_imports()?;

    let result = engine::run_with_imports(
        &demand,
        &supply,
        imports.as_ref(),
        &assets,
        assets.initial_state(),
    )?;
    let metrics = SummaryMetrics::from_result(&result);

    if let Some(path) = &args.flows_out {
        export::export_csv(&result, path)?;
        info!(path = %path.display(), rows = result.len(), "flow table written");
    }
    if let Some(path) = &args.summary_out {
        export::export_summary_json(&metrics, path)?;
        info!(path = %path.display(), "summary written");
    }

    println!("{metrics}");
    Ok(())
}

fn run_sweep(args: &SweepArgs) -> Result<()> {
    let scenario = args.scenario.load_scenario()?;
    let assets = scenario.to_asset_config()?;
    let demand = args.scenario.load_demand(&scenario)?;
    let factors = args.scenario.load_capacity_factors(&scenario)?;
    let imports = args.scenario.load_imports()?;
    let capacities = sweep::capacity_range(args.from, args.to, args.step)?;

    let control = SweepControl::new();
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, control.flag())?;
    }

    let inputs = SweepInputs {
        demand: &demand,
        factors: &factors,
        supply: scenario.supply_model()?,
        config: &assets,
        initial_state: assets.initial_state(),
        imports: imports.as_ref(),
    };
    let options = SweepOptions {
        stop_when_reliable: args.stop_when_reliable,
    };
    info!(points = capacities.len(), "starting sweep");
    let runs = sweep::run_sweep(&capacities, &inputs, options, &control);

    if let Some(path) = &args.out {
        export::export_sweep_csv(&runs, path)?;
        info!(path = %path.display(), "sweep table written");
    }

    println!("--- Sweep ---");
    println!(
        "{:>10}  {:>9}  {:>14}  {:>12}  {:>14}",
        "RC (GW)", "status", "DAC (GWh/yr)", "DAC CF (%)", "unmet (GWh/yr)"
    );
    for run in &runs {
        match &run.outcome {
            SweepOutcome::Completed(m) => println!(
                "{:>10.1}  {:>9}  {:>14.1}  {:>12.1}  {:>14.1}",
                run.renewable_capacity_gw,
                run.outcome.status(),
                m.annual_dac_energy_gwh,
                100.0 * m.dac_capacity_factor,
                m.annual_unmet_gwh
            ),
            SweepOutcome::Failed(e) => {
                println!("{:>10.1}  {:>9}  {e}", run.renewable_capacity_gw, run.outcome.status());
            }
            SweepOutcome::Cancelled => {
                println!("{:>10.1}  {:>9}", run.renewable_capacity_gw, run.outcome.status());
            }
        }
    }
    match sweep::first_reliable(&runs) {
        Some(c) => println!("First reliable capacity: {c:.1} GW"),
        None => println!("First reliable capacity: none"),
    }

    if control.is_cancelled() {
        warn!("sweep interrupted; remaining points were not run");
    }
    Ok(())
}

fn presets(args: &PresetsArgs) -> Result<()> {
    match &args.show {
        Some(name) => {
            let scenario = ScenarioConfig::from_preset(name)?;
            print!("{}", scenario.to_toml_string()?);
        }
        None => {
            for name in ScenarioConfig::PRESETS {
                let scenario = ScenarioConfig::from_preset(name)?;
                println!(
                    "{name:<16} {} storage assets, {} renewables, {} DAC",
                    scenario.storage.len(),
                    scenario.supply.renewable_capacity,
                    scenario.dac.max_power
                );
            }
        }
    }
    Ok(())
}
