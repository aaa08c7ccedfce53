//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use grid_dac_sim::config::ScenarioConfig;
use grid_dac_sim::series::TimeSeries;
use grid_dac_sim::sim::assets::{AssetConfig, StorageAsset};
use grid_dac_sim::units::Unit;

/// Midnight on 1 January 2050.
pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2050, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid start date")
}

/// Daily power series in GW starting at [`start`] plus `offset_days`.
pub fn daily_gw(name: &str, offset_days: i64, values: Vec<f64>) -> TimeSeries {
    TimeSeries::from_start(
        name,
        start() + TimeDelta::days(offset_days),
        TimeDelta::days(1),
        values,
        Unit::Gigawatt,
    )
    .expect("valid daily series")
}

/// Constant daily power series in GW.
pub fn constant_daily(name: &str, gw: f64, days: usize) -> TimeSeries {
    daily_gw(name, 0, vec![gw; days])
}

/// A single short-term storage asset and nothing else.
pub fn storage_only(capacity_gwh: f64, efficiency: f64, initial_fraction: f64) -> AssetConfig {
    AssetConfig {
        storage: vec![StorageAsset::new("battery", capacity_gwh, efficiency)],
        initial_storage_fraction: initial_fraction,
        ..AssetConfig::default()
    }
}

/// Synthetic demand, supply, and assets from a preset over `days`.
pub fn synthetic_run_inputs(
    preset: &str,
    days: usize,
    seed: u64,
) -> (TimeSeries, TimeSeries, AssetConfig) {
    let mut scenario = ScenarioConfig::from_preset(preset).expect("known preset");
    scenario.simulation.days = days;
    scenario.simulation.seed = seed;
    let demand = scenario.synthetic_demand().expect("synthetic demand");
    let factors = scenario
        .synthetic_capacity_factors()
        .expect("synthetic capacity factors");
    let supply = scenario
        .supply_model()
        .and_then(|m| m.supply(&factors))
        .expect("supply series");
    let assets = scenario.to_asset_config().expect("valid preset");
    (demand, supply, assets)
}
