//! Immutable asset parameters in canonical units (GW, GWh, fractions).

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result, SimError};

use super::types::ReservoirState;

/// Maximum number of short-term storage assets per scenario.
pub const MAX_STORAGE_ASSETS: usize = 4;

/// Availability policy for dispatchable backup generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupMode {
    /// Runs only to cover a deficit, never while there is surplus.
    #[default]
    SurplusOnly,
    /// Runs at full power every step regardless of the balance.
    BaseLoad,
}

/// Operating policy for the DAC load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DacMode {
    /// Draws only from surplus.
    #[default]
    SurplusOnly,
    /// Draws full power every step.
    BaseLoad,
}

/// Sinks that absorb a surplus, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurplusSink {
    Storage,
    Electrolyser,
    Dac,
    Export,
}

/// Sources that cover a deficit, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeficitSource {
    Storage,
    Hydrogen,
    Backup,
    Import,
}

/// Priority order used by the dispatch step. Each array is a permutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOrder {
    pub surplus: [SurplusSink; 4],
    pub deficit: [DeficitSource; 4],
}

impl Default for DispatchOrder {
    fn default() -> Self {
        Self {
            surplus: [
                SurplusSink::Storage,
                SurplusSink::Electrolyser,
                SurplusSink::Dac,
                SurplusSink::Export,
            ],
            deficit: [
                DeficitSource::Storage,
                DeficitSource::Hydrogen,
                DeficitSource::Backup,
                DeficitSource::Import,
            ],
        }
    }
}

/// A short-term storage asset (battery, pumped hydro).
#[derive(Debug, Clone, PartialEq)]
pub struct StorageAsset {
    pub name: String,
    pub capacity_gwh: f64,
    /// Applied on the charge leg; stored energy is post-loss.
    pub round_trip_efficiency: f64,
    /// Grid-side charge limit. `None` is unconstrained.
    pub max_charge_gw: Option<f64>,
    /// Delivered discharge limit. `None` is unconstrained.
    pub max_discharge_gw: Option<f64>,
}

impl StorageAsset {
    /// Creates an asset with unconstrained charge and discharge power.
    pub fn new(name: impl Into<String>, capacity_gwh: f64, round_trip_efficiency: f64) -> Self {
        Self {
            name: name.into(),
            capacity_gwh,
            round_trip_efficiency,
            max_charge_gw: None,
            max_discharge_gw: None,
        }
    }

    /// Sets the same charge and discharge limit.
    pub fn with_max_power(mut self, max_power_gw: f64) -> Self {
        self.max_charge_gw = Some(max_power_gw);
        self.max_discharge_gw = Some(max_power_gw);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Electrolyser {
    pub max_power_gw: f64,
    /// Electrical to hydrogen-equivalent energy.
    pub efficiency: f64,
}

impl Default for Electrolyser {
    fn default() -> Self {
        Self {
            max_power_gw: 0.0,
            efficiency: 1.0,
        }
    }
}

/// Medium-term hydrogen store, charged by the electrolyser.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HydrogenStore {
    pub capacity_gwh: f64,
    /// Delivered power limit per step. `None` is unconstrained.
    pub max_burn_gw: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dac {
    pub max_power_gw: f64,
    /// Energy per tonne of CO2 captured, in MWh/t.
    pub specific_energy_mwh_per_t: Option<f64>,
    pub mode: DacMode,
    /// Holds the DAC back until hydrogen storage is full.
    pub requires_full_hydrogen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Backup {
    pub max_power_gw: f64,
    pub mode: BackupMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Interconnector {
    /// Sending-end capacity in both directions.
    pub capacity_gw: f64,
    pub loss_factor: f64,
}

/// Every parameter the dispatch step reads. Built once per scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetConfig {
    pub storage: Vec<StorageAsset>,
    pub electrolyser: Electrolyser,
    pub hydrogen: HydrogenStore,
    pub dac: Dac,
    pub backup: Backup,
    pub interconnector: Interconnector,
    /// Fraction of delivered energy lost in transmission and distribution.
    pub transmission_loss_fraction: f64,
    pub initial_storage_fraction: f64,
    pub initial_hydrogen_fraction: f64,
    pub dispatch_order: DispatchOrder,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            storage: Vec::new(),
            electrolyser: Electrolyser::default(),
            hydrogen: HydrogenStore::default(),
            dac: Dac::default(),
            backup: Backup::default(),
            interconnector: Interconnector::default(),
            transmission_loss_fraction: 0.0,
            initial_storage_fraction: 0.5,
            initial_hydrogen_fraction: 1.0,
            dispatch_order: DispatchOrder::default(),
        }
    }
}

impl AssetConfig {
    /// Checks every range constraint.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] listing every offending field.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.storage.len() > MAX_STORAGE_ASSETS {
            errors.push(ConfigError::new(
                "storage",
                format!(
                    "at most {MAX_STORAGE_ASSETS} storage assets are supported, got {}",
                    self.storage.len()
                ),
            ));
        }
        for (i, asset) in self.storage.iter().enumerate() {
            let prefix = format!("storage[{i}]");
            non_negative(&mut errors, &format!("{prefix}.capacity"), asset.capacity_gwh);
            efficiency(
                &mut errors,
                &format!("{prefix}.round_trip_efficiency"),
                asset.round_trip_efficiency,
            );
            if let Some(p) = asset.max_charge_gw {
                non_negative(&mut errors, &format!("{prefix}.max_charge_power"), p);
            }
            if let Some(p) = asset.max_discharge_gw {
                non_negative(&mut errors, &format!("{prefix}.max_discharge_power"), p);
            }
        }

        non_negative(&mut errors, "electrolyser.max_power", self.electrolyser.max_power_gw);
        efficiency(&mut errors, "electrolyser.efficiency", self.electrolyser.efficiency);
        non_negative(&mut errors, "hydrogen.storage_capacity", self.hydrogen.capacity_gwh);
        if let Some(p) = self.hydrogen.max_burn_gw {
            non_negative(&mut errors, "hydrogen.max_burn_power", p);
        }
        non_negative(&mut errors, "dac.max_power", self.dac.max_power_gw);
        if let Some(e) = self.dac.specific_energy_mwh_per_t {
            if !(e.is_finite() && e > 0.0) {
                errors.push(ConfigError::new("dac.specific_energy", "must be > 0"));
            }
        }
        non_negative(&mut errors, "backup.max_power", self.backup.max_power_gw);
        non_negative(&mut errors, "interconnector.capacity", self.interconnector.capacity_gw);
        loss_fraction(&mut errors, "interconnector.loss_factor", self.interconnector.loss_factor);
        loss_fraction(
            &mut errors,
            "grid.transmission_loss_fraction",
            self.transmission_loss_fraction,
        );
        unit_interval(
            &mut errors,
            "grid.initial_storage_fraction",
            self.initial_storage_fraction,
        );
        unit_interval(
            &mut errors,
            "grid.initial_hydrogen_fraction",
            self.initial_hydrogen_fraction,
        );

        let order = &self.dispatch_order;
        if !is_permutation(&order.surplus) {
            errors.push(ConfigError::new(
                "dispatch.surplus",
                "must list storage, electrolyser, dac and export exactly once",
            ));
        }
        if !is_permutation(&order.deficit) {
            errors.push(ConfigError::new(
                "dispatch.deficit",
                "must list storage, hydrogen, backup and import exactly once",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SimError::Configuration(errors))
        }
    }

    /// Reservoir levels at the configured initial fractions.
    pub fn initial_state(&self) -> ReservoirState {
        let mut state = ReservoirState::default();
        for (level, asset) in state.storage_gwh.iter_mut().zip(&self.storage) {
            *level = asset.capacity_gwh * self.initial_storage_fraction;
        }
        state.hydrogen_gwh = self.hydrogen.capacity_gwh * self.initial_hydrogen_fraction;
        state
    }

    /// Checks that `state` fits inside the configured capacities.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] for levels outside `[0, capacity]`.
    pub fn validate_state(&self, state: &ReservoirState) -> Result<()> {
        let mut errors = Vec::new();
        for (i, level) in state.storage_gwh.iter().enumerate() {
            let capacity = self.storage.get(i).map_or(0.0, |a| a.capacity_gwh);
            if !(level.is_finite() && (0.0..=capacity).contains(level)) {
                errors.push(ConfigError::new(
                    format!("initial_state.storage[{i}]"),
                    format!("{level} GWh is outside [0, {capacity}] GWh"),
                ));
            }
        }
        let h2 = state.hydrogen_gwh;
        if !(h2.is_finite() && (0.0..=self.hydrogen.capacity_gwh).contains(&h2)) {
            errors.push(ConfigError::new(
                "initial_state.hydrogen",
                format!(
                    "{h2} GWh is outside [0, {}] GWh",
                    self.hydrogen.capacity_gwh
                ),
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SimError::Configuration(errors))
        }
    }
}

fn non_negative(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(value.is_finite() && value >= 0.0) {
        errors.push(ConfigError::new(field, format!("must be finite and >= 0, got {value}")));
    }
}

fn efficiency(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(value > 0.0 && value <= 1.0) {
        errors.push(ConfigError::new(field, format!("must be in (0, 1], got {value}")));
    }
}

fn loss_fraction(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(0.0..1.0).contains(&value) {
        errors.push(ConfigError::new(field, format!("must be in [0, 1), got {value}")));
    }
}

fn unit_interval(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::new(field, format!("must be in [0, 1], got {value}")));
    }
}

fn is_permutation<T: PartialEq>(items: &[T; 4]) -> bool {
    (0..items.len()).all(|i| !items[i + 1..].contains(&items[i]))
}
