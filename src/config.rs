//! TOML-based scenario configuration and preset definitions.
//!
//! Physical parameters are written as quantities with units (`"12 GW"`,
//! `"60 TWh"`, `"74%"`, `"101 kJ/mol"`); bare numbers are fractions. Units are
//! checked and converted once, when the scenario is turned into an
//! [`AssetConfig`] and a [`SupplyModel`].

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result, SimError};
use crate::series::TimeSeries;
use crate::sim::assets::{
    AssetConfig, Backup, BackupMode, Dac, DacMode, DeficitSource, DispatchOrder, Electrolyser,
    HydrogenStore, Interconnector, StorageAsset, SurplusSink,
};
use crate::supply::synthetic::DemandProfile;
use crate::supply::{CapacityFactors, RenewableMix, SupplyModel};
use crate::units::{Dimension, Quantity, Unit};

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or start from a preset with
/// [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Period, resolution, and seed.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Network losses and initial reservoir levels.
    #[serde(default)]
    pub grid: GridConfig,
    /// Short-term storage assets, charged and discharged in listed order.
    #[serde(default)]
    pub storage: Vec<StorageConfig>,
    #[serde(default)]
    pub electrolyser: ElectrolyserConfig,
    #[serde(default)]
    pub hydrogen: HydrogenConfig,
    #[serde(default)]
    pub dac: DacConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub interconnector: InterconnectorConfig,
    /// Priority order of sinks and sources.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Generation fleet.
    #[serde(default)]
    pub supply: SupplyConfig,
    /// Synthetic demand and weather used when no input files are given.
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

/// Simulation period and global parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// First simulated day.
    pub start: NaiveDate,
    /// Number of days to simulate (must be > 0).
    pub days: usize,
    /// Step length, e.g. `"24 h"` or `"1 h"`.
    pub step: Quantity,
    /// Master random seed.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2050, 1, 1).unwrap_or_default(),
            days: 3652,
            step: Quantity::hours(24.0),
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Share of delivered energy lost in transmission and distribution.
    pub transmission_loss_fraction: Quantity,
    /// Initial level of every storage asset as a share of its capacity.
    pub initial_storage_fraction: Quantity,
    /// Initial hydrogen level as a share of its capacity.
    pub initial_hydrogen_fraction: Quantity,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            transmission_loss_fraction: Quantity::fraction(0.0),
            initial_storage_fraction: Quantity::fraction(0.5),
            initial_hydrogen_fraction: Quantity::fraction(1.0),
        }
    }
}

/// One `[[storage]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub name: String,
    pub capacity: Quantity,
    pub round_trip_efficiency: Quantity,
    /// Shared charge and discharge limit; overridden by the specific limits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_power: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_charge_power: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discharge_power: Option<Quantity>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            name: "storage".to_string(),
            capacity: Quantity::gigawatt_hours(0.0),
            round_trip_efficiency: Quantity::fraction(0.8),
            max_power: None,
            max_charge_power: None,
            max_discharge_power: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElectrolyserConfig {
    pub max_power: Quantity,
    pub efficiency: Quantity,
}

impl Default for ElectrolyserConfig {
    fn default() -> Self {
        Self {
            max_power: Quantity::gigawatts(0.0),
            efficiency: Quantity::fraction(0.74),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HydrogenConfig {
    pub storage_capacity: Quantity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_burn_power: Option<Quantity>,
}

impl Default for HydrogenConfig {
    fn default() -> Self {
        Self {
            storage_capacity: Quantity::gigawatt_hours(0.0),
            max_burn_power: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DacConfig {
    pub max_power: Quantity,
    /// Energy per unit CO2 captured (`"101 kJ/mol"`, `"1.5 MWh/t"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_energy: Option<Quantity>,
    /// `"surplus_only"` or `"base_load"`.
    pub mode: DacMode,
    /// Keep the DAC idle until hydrogen storage is full.
    pub only_when_hydrogen_full: bool,
}

impl Default for DacConfig {
    fn default() -> Self {
        Self {
            max_power: Quantity::gigawatts(0.0),
            specific_energy: None,
            mode: DacMode::SurplusOnly,
            only_when_hydrogen_full: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackupConfig {
    pub max_power: Quantity,
    /// `"surplus_only"` or `"base_load"`.
    pub mode: BackupMode,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            max_power: Quantity::gigawatts(0.0),
            mode: BackupMode::SurplusOnly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterconnectorConfig {
    pub capacity: Quantity,
    pub loss_factor: Quantity,
}

impl Default for InterconnectorConfig {
    fn default() -> Self {
        Self {
            capacity: Quantity::gigawatts(0.0),
            loss_factor: Quantity::fraction(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// All four sinks, first served first.
    pub surplus: Vec<SurplusSink>,
    /// All four sources, first drawn first.
    pub deficit: Vec<DeficitSource>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let order = DispatchOrder::default();
        Self {
            surplus: order.surplus.to_vec(),
            deficit: order.deficit.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupplyConfig {
    /// Installed renewable capacity, split by the shares below.
    pub renewable_capacity: Quantity,
    pub solar_share: Quantity,
    pub offshore_share: Quantity,
    pub onshore_share: Quantity,
    /// Firm (nuclear) capacity.
    pub firm_capacity: Quantity,
    pub firm_capacity_factor: Quantity,
}

impl Default for SupplyConfig {
    fn default() -> Self {
        let model = SupplyModel::default();
        Self {
            renewable_capacity: Quantity::gigawatts(model.renewable_capacity_gw),
            solar_share: Quantity::fraction(model.mix.solar),
            offshore_share: Quantity::fraction(model.mix.offshore),
            onshore_share: Quantity::fraction(model.mix.onshore),
            firm_capacity: Quantity::gigawatts(model.firm_capacity_gw),
            firm_capacity_factor: Quantity::fraction(model.firm_capacity_factor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticConfig {
    pub demand_mean: Quantity,
    pub demand_seasonal_amplitude: Quantity,
    pub demand_daily_amplitude: Quantity,
    pub demand_noise: Quantity,
    /// AR(1) persistence of the weather anomaly per step (0.0-1.0).
    pub weather_persistence: f64,
    /// Standard deviation of the weather innovation, relative to the mean.
    pub weather_noise: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            demand_mean: Quantity::gigawatts(78.0),
            demand_seasonal_amplitude: Quantity::gigawatts(15.0),
            demand_daily_amplitude: Quantity::gigawatts(8.0),
            demand_noise: Quantity::gigawatts(4.0),
            weather_persistence: 0.7,
            weather_noise: 0.35,
        }
    }
}

/// Pushes a [`ConfigError`] unless `q` measures `dimension`.
fn check_dimension(errors: &mut Vec<ConfigError>, field: &str, q: &Quantity, dimension: Dimension) {
    if q.dimension() != dimension {
        errors.push(ConfigError::new(
            field,
            format!("expected {dimension}, got \"{q}\""),
        ));
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a 2050 grid with ten years of daily steps.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            grid: GridConfig {
                transmission_loss_fraction: Quantity::fraction(0.05),
                ..GridConfig::default()
            },
            storage: vec![
                StorageConfig {
                    name: "battery".to_string(),
                    capacity: Quantity::gigawatt_hours(150.0),
                    round_trip_efficiency: Quantity::fraction(0.9),
                    max_power: Some(Quantity::gigawatts(30.0)),
                    ..StorageConfig::default()
                },
                StorageConfig {
                    name: "pumped_hydro".to_string(),
                    capacity: Quantity::gigawatt_hours(30.0),
                    round_trip_efficiency: Quantity::fraction(0.75),
                    max_power: Some(Quantity::gigawatts(5.0)),
                    ..StorageConfig::default()
                },
            ],
            electrolyser: ElectrolyserConfig {
                max_power: Quantity::gigawatts(30.0),
                ..ElectrolyserConfig::default()
            },
            hydrogen: HydrogenConfig {
                storage_capacity: Quantity::new(60.0, Unit::TerawattHour),
                max_burn_power: Some(Quantity::gigawatts(60.0)),
            },
            dac: DacConfig {
                max_power: Quantity::gigawatts(10.0),
                specific_energy: Some(Quantity::new(101.0, Unit::KilojoulePerMole)),
                ..DacConfig::default()
            },
            backup: BackupConfig {
                max_power: Quantity::gigawatts(20.0),
                ..BackupConfig::default()
            },
            interconnector: InterconnectorConfig {
                capacity: Quantity::gigawatts(10.0),
                loss_factor: Quantity::fraction(0.03),
            },
            dispatch: DispatchConfig::default(),
            supply: SupplyConfig::default(),
            synthetic: SyntheticConfig::default(),
        }
    }

    /// Returns the high-renewables preset: large renewable build-out feeding a
    /// large DAC fleet that waits for full hydrogen storage.
    pub fn high_renewables() -> Self {
        let base = Self::baseline();
        Self {
            electrolyser: ElectrolyserConfig {
                max_power: Quantity::gigawatts(60.0),
                ..base.electrolyser.clone()
            },
            dac: DacConfig {
                max_power: Quantity::gigawatts(25.0),
                only_when_hydrogen_full: true,
                ..base.dac.clone()
            },
            supply: SupplyConfig {
                renewable_capacity: Quantity::gigawatts(450.0),
                ..SupplyConfig::default()
            },
            ..base
        }
    }

    /// Returns the storage-stress preset: hourly steps over one winter quarter
    /// with a thin fleet and small reservoirs.
    pub fn storage_stress() -> Self {
        let base = Self::baseline();
        Self {
            simulation: SimulationConfig {
                days: 90,
                step: Quantity::hours(1.0),
                ..SimulationConfig::default()
            },
            grid: GridConfig {
                initial_hydrogen_fraction: Quantity::fraction(0.25),
                ..base.grid.clone()
            },
            storage: vec![StorageConfig {
                name: "battery".to_string(),
                capacity: Quantity::gigawatt_hours(50.0),
                round_trip_efficiency: Quantity::fraction(0.85),
                max_power: Some(Quantity::gigawatts(10.0)),
                ..StorageConfig::default()
            }],
            hydrogen: HydrogenConfig {
                storage_capacity: Quantity::new(5.0, Unit::TerawattHour),
                max_burn_power: Some(Quantity::gigawatts(20.0)),
            },
            backup: BackupConfig {
                max_power: Quantity::gigawatts(5.0),
                ..BackupConfig::default()
            },
            interconnector: InterconnectorConfig::default(),
            supply: SupplyConfig {
                renewable_capacity: Quantity::gigawatts(200.0),
                ..SupplyConfig::default()
            },
            ..base
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "high_renewables", "storage_stress"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "high_renewables" => Ok(Self::high_renewables()),
            "storage_stress" => Ok(Self::storage_stress()),
            _ => Err(SimError::config(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SimError::config("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| SimError::config("toml", e.to_string()))
    }

    /// Renders the scenario as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] if serialisation fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| SimError::config("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.days == 0 {
            errors.push(ConfigError::new("simulation.days", "must be > 0"));
        } else if let Err(e) = self.period() {
            errors.extend(e.config_errors().iter().cloned());
        }
        check_dimension(&mut errors, "simulation.step", &s.step, Dimension::Duration);
        if let Ok(hours) = s.step.canonical(Dimension::Duration, "simulation.step") {
            if !(hours > 0.0 && hours <= 24.0) {
                errors.push(ConfigError::new(
                    "simulation.step",
                    format!("must be within (0, 24] h, got {}", s.step),
                ));
            }
        }

        let mut dims: Vec<(String, &Quantity, Dimension)> = vec![
            (
                "grid.transmission_loss_fraction".into(),
                &self.grid.transmission_loss_fraction,
                Dimension::Ratio,
            ),
            (
                "grid.initial_storage_fraction".into(),
                &self.grid.initial_storage_fraction,
                Dimension::Ratio,
            ),
            (
                "grid.initial_hydrogen_fraction".into(),
                &self.grid.initial_hydrogen_fraction,
                Dimension::Ratio,
            ),
            ("electrolyser.max_power".into(), &self.electrolyser.max_power, Dimension::Power),
            ("electrolyser.efficiency".into(), &self.electrolyser.efficiency, Dimension::Ratio),
            (
                "hydrogen.storage_capacity".into(),
                &self.hydrogen.storage_capacity,
                Dimension::Energy,
            ),
            ("dac.max_power".into(), &self.dac.max_power, Dimension::Power),
            ("backup.max_power".into(), &self.backup.max_power, Dimension::Power),
            ("interconnector.capacity".into(), &self.interconnector.capacity, Dimension::Power),
            (
                "interconnector.loss_factor".into(),
                &self.interconnector.loss_factor,
                Dimension::Ratio,
            ),
            ("supply.renewable_capacity".into(), &self.supply.renewable_capacity, Dimension::Power),
            ("supply.solar_share".into(), &self.supply.solar_share, Dimension::Ratio),
            ("supply.offshore_share".into(), &self.supply.offshore_share, Dimension::Ratio),
            ("supply.onshore_share".into(), &self.supply.onshore_share, Dimension::Ratio),
            ("supply.firm_capacity".into(), &self.supply.firm_capacity, Dimension::Power),
            (
                "supply.firm_capacity_factor".into(),
                &self.supply.firm_capacity_factor,
                Dimension::Ratio,
            ),
            ("synthetic.demand_mean".into(), &self.synthetic.demand_mean, Dimension::Power),
            (
                "synthetic.demand_seasonal_amplitude".into(),
                &self.synthetic.demand_seasonal_amplitude,
                Dimension::Power,
            ),
            (
                "synthetic.demand_daily_amplitude".into(),
                &self.synthetic.demand_daily_amplitude,
                Dimension::Power,
            ),
            ("synthetic.demand_noise".into(), &self.synthetic.demand_noise, Dimension::Power),
        ];
        if let Some(q) = &self.hydrogen.max_burn_power {
            dims.push(("hydrogen.max_burn_power".into(), q, Dimension::Power));
        }
        if let Some(q) = &self.dac.specific_energy {
            dims.push(("dac.specific_energy".into(), q, Dimension::SpecificEnergy));
        }
        for (i, st) in self.storage.iter().enumerate() {
            dims.push((format!("storage[{i}].capacity"), &st.capacity, Dimension::Energy));
            dims.push((
                format!("storage[{i}].round_trip_efficiency"),
                &st.round_trip_efficiency,
                Dimension::Ratio,
            ));
            for (key, q) in [
                ("max_power", &st.max_power),
                ("max_charge_power", &st.max_charge_power),
                ("max_discharge_power", &st.max_discharge_power),
            ] {
                if let Some(q) = q {
                    dims.push((format!("storage[{i}].{key}"), q, Dimension::Power));
                }
            }
        }
        for (field, q, dimension) in &dims {
            check_dimension(&mut errors, field, q, *dimension);
        }

        if self.dispatch.surplus.len() != 4 {
            errors.push(ConfigError::new(
                "dispatch.surplus",
                format!("must list all four sinks, got {}", self.dispatch.surplus.len()),
            ));
        }
        if self.dispatch.deficit.len() != 4 {
            errors.push(ConfigError::new(
                "dispatch.deficit",
                format!("must list all four sources, got {}", self.dispatch.deficit.len()),
            ));
        }
        if !(0.0..=1.0).contains(&self.synthetic.weather_persistence) {
            errors.push(ConfigError::new(
                "synthetic.weather_persistence",
                format!("must be in [0.0, 1.0], got {}", self.synthetic.weather_persistence),
            ));
        }
        if self.synthetic.weather_noise < 0.0 {
            errors.push(ConfigError::new("synthetic.weather_noise", "must be >= 0"));
        }

        // Ranges are only meaningful once every unit checks out.
        if errors.is_empty() {
            if let Err(e) = self.to_asset_config() {
                errors.extend(e.config_errors().iter().cloned());
            }
            if let Err(e) = self.supply_model().and_then(|m| m.validate()) {
                errors.extend(e.config_errors().iter().cloned());
            }
        }

        errors
    }

    /// Resolves quantities into canonical units and builds the asset parameters.
    ///
    /// # Errors
    ///
    /// * [`SimError::UnitMismatch`] if a quantity has the wrong dimension
    /// * [`SimError::Configuration`] if a value is out of range
    pub fn to_asset_config(&self) -> Result<AssetConfig> {
        let power = |q: &Quantity, field: &str| q.canonical(Dimension::Power, field);
        let energy = |q: &Quantity, field: &str| q.canonical(Dimension::Energy, field);
        let ratio = |q: &Quantity, field: &str| q.canonical(Dimension::Ratio, field);
        let optional_power =
            |q: &Option<Quantity>, field: &str| q.as_ref().map(|q| power(q, field)).transpose();

        let mut storage = Vec::with_capacity(self.storage.len());
        for (i, st) in self.storage.iter().enumerate() {
            let shared = optional_power(&st.max_power, &format!("storage[{i}].max_power"))?;
            let charge =
                optional_power(&st.max_charge_power, &format!("storage[{i}].max_charge_power"))?;
            let discharge = optional_power(
                &st.max_discharge_power,
                &format!("storage[{i}].max_discharge_power"),
            )?;
            storage.push(StorageAsset {
                name: st.name.clone(),
                capacity_gwh: energy(&st.capacity, &format!("storage[{i}].capacity"))?,
                round_trip_efficiency: ratio(
                    &st.round_trip_efficiency,
                    &format!("storage[{i}].round_trip_efficiency"),
                )?,
                max_charge_gw: charge.or(shared),
                max_discharge_gw: discharge.or(shared),
            });
        }

        let surplus: [SurplusSink; 4] =
            self.dispatch.surplus.clone().try_into().map_err(|v: Vec<_>| {
                SimError::config(
                    "dispatch.surplus",
                    format!("must list all four sinks, got {}", v.len()),
                )
            })?;
        let deficit: [DeficitSource; 4] =
            self.dispatch.deficit.clone().try_into().map_err(|v: Vec<_>| {
                SimError::config(
                    "dispatch.deficit",
                    format!("must list all four sources, got {}", v.len()),
                )
            })?;

        let config = AssetConfig {
            storage,
            electrolyser: Electrolyser {
                max_power_gw: power(&self.electrolyser.max_power, "electrolyser.max_power")?,
                efficiency: ratio(&self.electrolyser.efficiency, "electrolyser.efficiency")?,
            },
            hydrogen: HydrogenStore {
                capacity_gwh: energy(&self.hydrogen.storage_capacity, "hydrogen.storage_capacity")?,
                max_burn_gw: optional_power(
                    &self.hydrogen.max_burn_power,
                    "hydrogen.max_burn_power",
                )?,
            },
            dac: Dac {
                max_power_gw: power(&self.dac.max_power, "dac.max_power")?,
                specific_energy_mwh_per_t: self
                    .dac
                    .specific_energy
                    .as_ref()
                    .map(|q| q.canonical(Dimension::SpecificEnergy, "dac.specific_energy"))
                    .transpose()?,
                mode: self.dac.mode,
                requires_full_hydrogen: self.dac.only_when_hydrogen_full,
            },
            backup: Backup {
                max_power_gw: power(&self.backup.max_power, "backup.max_power")?,
                mode: self.backup.mode,
            },
            interconnector: Interconnector {
                capacity_gw: power(&self.interconnector.capacity, "interconnector.capacity")?,
                loss_factor: ratio(&self.interconnector.loss_factor, "interconnector.loss_factor")?,
            },
            transmission_loss_fraction: ratio(
                &self.grid.transmission_loss_fraction,
                "grid.transmission_loss_fraction",
            )?,
            initial_storage_fraction: ratio(
                &self.grid.initial_storage_fraction,
                "grid.initial_storage_fraction",
            )?,
            initial_hydrogen_fraction: ratio(
                &self.grid.initial_hydrogen_fraction,
                "grid.initial_hydrogen_fraction",
            )?,
            dispatch_order: DispatchOrder { surplus, deficit },
        };
        config.validate()?;
        Ok(config)
    }

    /// Builds the generation fleet in canonical units.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnitMismatch`] if a quantity has the wrong dimension.
    pub fn supply_model(&self) -> Result<SupplyModel> {
        let s = &self.supply;
        Ok(SupplyModel {
            renewable_capacity_gw: s
                .renewable_capacity
                .canonical(Dimension::Power, "supply.renewable_capacity")?,
            mix: RenewableMix {
                solar: s.solar_share.canonical(Dimension::Ratio, "supply.solar_share")?,
                offshore: s.offshore_share.canonical(Dimension::Ratio, "supply.offshore_share")?,
                onshore: s.onshore_share.canonical(Dimension::Ratio, "supply.onshore_share")?,
            },
            firm_capacity_gw: s.firm_capacity.canonical(Dimension::Power, "supply.firm_capacity")?,
            firm_capacity_factor: s
                .firm_capacity_factor
                .canonical(Dimension::Ratio, "supply.firm_capacity_factor")?,
        })
    }

    /// Step length as a time delta, rounded to whole seconds.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnitMismatch`] unless the step is a duration, and
    /// [`SimError::Configuration`] unless it is positive.
    pub fn step(&self) -> Result<TimeDelta> {
        let hours = self.simulation.step.canonical(Dimension::Duration, "simulation.step")?;
        let seconds = (hours * 3600.0).round();
        if !(seconds >= 1.0 && seconds.is_finite()) {
            return Err(SimError::config(
                "simulation.step",
                format!("must be positive, got {}", self.simulation.step),
            ));
        }
        Ok(TimeDelta::seconds(seconds as i64))
    }

    /// Midnight of the first simulated day.
    pub fn start_time(&self) -> NaiveDateTime {
        self.simulation.start.and_time(NaiveTime::MIN)
    }

    /// The configured period as a time delta.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] if `simulation.days` does not fit in
    /// a [`TimeDelta`].
    pub fn period(&self) -> Result<TimeDelta> {
        let days = self.simulation.days;
        i64::try_from(days)
            .ok()
            .and_then(TimeDelta::try_days)
            .ok_or_else(|| SimError::config("simulation.days", format!("{days} days is too long")))
    }

    /// Number of whole steps that fit in the configured period.
    ///
    /// # Errors
    ///
    /// Same as [`ScenarioConfig::step`] and [`ScenarioConfig::period`].
    pub fn steps(&self) -> Result<usize> {
        let step = self.step()?.num_seconds();
        let period = self.period()?.num_seconds();
        usize::try_from(period / step)
            .map_err(|_| SimError::config("simulation.days", "must be > 0"))
    }

    /// Seeded demand profile from the `[synthetic]` section.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnitMismatch`] if a demand parameter is not a power.
    pub fn demand_profile(&self) -> Result<DemandProfile> {
        let s = &self.synthetic;
        Ok(DemandProfile::new(
            s.demand_mean.canonical(Dimension::Power, "synthetic.demand_mean")?,
            s.demand_seasonal_amplitude
                .canonical(Dimension::Power, "synthetic.demand_seasonal_amplitude")?,
            s.demand_daily_amplitude
                .canonical(Dimension::Power, "synthetic.demand_daily_amplitude")?,
            s.demand_noise.canonical(Dimension::Power, "synthetic.demand_noise")?,
            self.simulation.seed,
        ))
    }

    /// Synthetic demand over the configured period.
    ///
    /// # Errors
    ///
    /// Returns an error for a bad step, period, or demand parameter.
    pub fn synthetic_demand(&self) -> Result<TimeSeries> {
        let step = self.step()?;
        self.demand_profile()?.series(self.start_time(), step, self.steps()?)
    }

    /// Synthetic capacity factors over the configured period.
    ///
    /// # Errors
    ///
    /// Returns an error for a bad step or period.
    pub fn synthetic_capacity_factors(&self) -> Result<CapacityFactors> {
        CapacityFactors::synthetic(
            self.start_time(),
            self.step()?,
            self.steps()?,
            self.synthetic.weather_persistence,
            self.synthetic.weather_noise,
            self.simulation.seed,
        )
    }
}
