//! Command-line arguments and scenario/input resolution for the binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{Level, info};

use crate::config::ScenarioConfig;
use crate::error::{Result, SimError};
use crate::io::input;
use crate::series::TimeSeries;
use crate::supply::CapacityFactors;

/// Energy-balance simulator for renewable grids with storage, hydrogen, and DAC.
#[derive(Parser, Debug)]
#[command(name = "grid-dac-sim", version, about, long_about = None)]
pub struct Cli {
    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log per-run detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Maximum log level selected by `--quiet` / `--verbose`.
    pub fn log_level(&self) -> Level {
        if self.quiet {
            Level::WARN
        } else if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate one scenario and print its summary
    Run(RunArgs),
    /// Simulate a range of renewable capacities in parallel
    Sweep(SweepArgs),
    /// List the built-in presets
    Presets(PresetsArgs),
}

/// Where the scenario and its input series come from.
#[derive(Args, Debug, Clone, Default)]
pub struct ScenarioArgs {
    /// Scenario TOML file
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Built-in preset (default: baseline)
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Demand CSV (`timestamp,demand [GW]`); synthetic when omitted
    #[arg(long, value_name = "CSV")]
    pub demand: Option<PathBuf>,

    /// Capacity factor CSV (`timestamp,solar,offshore,onshore`); synthetic when omitted
    #[arg(long, value_name = "CSV")]
    pub capacity_factors: Option<PathBuf>,

    /// Import availability CSV (`timestamp,imports [GW]`) limiting the interconnector per step
    #[arg(long, value_name = "CSV")]
    pub imports: Option<PathBuf>,

    /// Override the simulated period in days
    #[arg(long)]
    pub days: Option<usize>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,

    /// Supply CSV (`timestamp,supply [GW]`), used instead of capacity factors
    #[arg(long, value_name = "CSV", conflicts_with = "capacity_factors")]
    pub supply: Option<PathBuf>,

    /// Write the per-step flow table as CSV
    #[arg(long, value_name = "PATH")]
    pub flows_out: Option<PathBuf>,

    /// Write the summary metrics as JSON
    #[arg(long, value_name = "PATH")]
    pub summary_out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,

    /// First renewable capacity (GW)
    #[arg(long, default_value_t = 100.0)]
    pub from: f64,

    /// Upper bound, exclusive (GW)
    #[arg(long, default_value_t = 500.0)]
    pub to: f64,

    /// Capacity increment (GW)
    #[arg(long, default_value_t = 10.0)]
    pub step: f64,

    /// Stop at the first capacity with no unmet demand
    #[arg(long)]
    pub stop_when_reliable: bool,

    /// Write one row per capacity as CSV
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PresetsArgs {
    /// Print the named preset as TOML
    #[arg(long, value_name = "NAME")]
    pub show: Option<String>,
}

impl ScenarioArgs {
    /// Loads the scenario, applies overrides, and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] listing every invalid field.
    pub fn load_scenario(&self) -> Result<ScenarioConfig> {
        let mut scenario = match (&self.scenario, &self.preset) {
            (Some(path), _) => ScenarioConfig::from_toml_file(path)?,
            (None, Some(name)) => ScenarioConfig::from_preset(name)?,
            (None, None) => ScenarioConfig::baseline(),
        };
        if let Some(days) = self.days {
            scenario.simulation.days = days;
        }
        if let Some(seed) = self.seed {
            scenario.simulation.seed = seed;
        }
        let errors = scenario.validate();
        if !errors.is_empty() {
            return Err(SimError::Configuration(errors));
        }
        Ok(scenario)
    }

    /// Demand from `--demand`, or synthetic demand from the scenario.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_demand(&self, scenario: &ScenarioConfig) -> Result<TimeSeries> {
        match &self.demand {
            Some(path) => {
                info!(path = %path.display(), "reading demand");
                input::read_series(path)
            }
            None => scenario.synthetic_demand(),
        }
    }

    /// Capacity factors from `--capacity-factors`, or synthetic ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_capacity_factors(&self, scenario: &ScenarioConfig) -> Result<CapacityFactors> {
        match &self.capacity_factors {
            Some(path) => {
                info!(path = %path.display(), "reading capacity factors");
                input::read_capacity_factors(path)
            }
            None => scenario.synthetic_capacity_factors(),
        }
    }

    /// Import availability from `--imports`, if given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_imports(&self) -> Result<Option<TimeSeries>> {
        self.imports
            .as_ref()
            .map(|path| {
                info!(path = %path.display(), "reading import availability");
                input::read_series(path)
            })
            .transpose()
    }
}

impl RunArgs {
    /// Supply from `--supply`, or the scenario fleet over the capacity factors.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or the fleet is invalid.
    pub fn load_supply(&self, scenario: &ScenarioConfig) -> Result<TimeSeries> {
        match &self.supply {
            Some(path) => {
                info!(path = %path.display(), "reading supply");
                input::read_series(path)
            }
            None => {
                let factors = self.scenario.load_capacity_factors(scenario)?;
                scenario.supply_model()?.supply(&factors)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from([
            "grid-dac-sim",
            "run",
            "--preset",
            "storage_stress",
            "--days",
            "10",
            "--seed",
            "3",
            "--imports",
            "imports.csv",
            "--flows-out",
            "flows.csv",
            "-q",
        ]);
        assert_eq!(cli.log_level(), Level::WARN);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.scenario.preset.as_deref(), Some("storage_stress"));
        assert_eq!(args.scenario.days, Some(10));
        assert_eq!(args.scenario.imports, Some(PathBuf::from("imports.csv")));
        assert_eq!(args.flows_out, Some(PathBuf::from("flows.csv")));
    }

    #[test]
    fn scenario_and_preset_conflict() {
        let result = Cli::try_parse_from([
            "grid-dac-sim",
            "run",
            "--scenario",
            "a.toml",
            "--preset",
            "baseline",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn supply_and_capacity_factors_conflict() {
        let result = Cli::try_parse_from([
            "grid-dac-sim",
            "run",
            "--supply",
            "s.csv",
            "--capacity-factors",
            "cf.csv",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn sweep_defaults_match_standard_range() {
        let cli = Cli::parse_from(["grid-dac-sim", "sweep"]);
        let Command::Sweep(args) = cli.command else {
            panic!("expected sweep");
        };
        assert_eq!((args.from, args.to, args.step), (100.0, 500.0, 10.0));
        assert!(!args.stop_when_reliable);
        assert_eq!(args.scenario.imports, None);
    }

    #[test]
    fn overrides_apply_before_validation() {
        let args = ScenarioArgs {
            preset: Some("baseline".to_string()),
            days: Some(0),
            ..ScenarioArgs::default()
        };
        let err = args.load_scenario().unwrap_err();
        assert_eq!(err.config_errors()[0].field, "simulation.days");

        let args = ScenarioArgs {
            days: Some(30),
            seed: Some(9),
            ..ScenarioArgs::default()
        };
        let scenario = args.load_scenario().unwrap();
        assert_eq!(scenario.simulation.days, 30);
        assert_eq!(scenario.simulation.seed, 9);
    }
}
