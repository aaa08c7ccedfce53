//! Worked daily-step scenarios (1 GW over a day = 24 GWh).

mod common;

use approx::{assert_abs_diff_eq, assert_relative_eq};

use grid_dac_sim::error::SimError;
use grid_dac_sim::sim::assets::{AssetConfig, Dac, DacMode, StorageAsset};
use grid_dac_sim::sim::engine;
use grid_dac_sim::sim::kpi::SummaryMetrics;
use grid_dac_sim::sim::types::ReservoirState;
use grid_dac_sim::units::Unit;

#[test]
fn balanced_grid_without_storage_moves_nothing() {
    let demand = common::daily_gw("demand", 0, vec![40.0, 55.0, 61.5, 38.0, 40.0]);
    let supply = common::daily_gw("supply", 0, vec![40.0, 55.0, 61.5, 38.0, 40.0]);
    let config = common::storage_only(0.0, 0.9, 0.0);

    let result = engine::run(&demand, &supply, &config, config.initial_state()).unwrap();
    assert_eq!(result.len(), 5);
    assert!(result.warnings.is_empty());
    for flow in &result.flows {
        assert_eq!(flow.curtailment, 0.0);
        assert_eq!(flow.unmet, 0.0);
        assert_eq!(flow.total_storage_charge(), 0.0);
        assert_eq!(flow.total_storage_discharge(), 0.0);
    }

    let metrics = SummaryMetrics::from_result(&result);
    assert_eq!(metrics.total_curtailed_gwh, 0.0);
    assert_eq!(metrics.total_unmet_gwh, 0.0);
    assert!(metrics.is_reliable());
}

#[test]
fn constant_surplus_fills_storage_then_curtails() {
    // 10 GW surplus is 240 GWh/day, stored at 80%: 192 GWh/day fills 1920 GWh in 10 days.
    let days = 15;
    let demand = common::constant_daily("demand", 30.0, days);
    let supply = common::constant_daily("supply", 40.0, days);
    let config = common::storage_only(1920.0, 0.8, 0.0);

    let result = engine::run(&demand, &supply, &config, config.initial_state()).unwrap();

    for day in 0..10 {
        let flow = &result.flows[day];
        assert_relative_eq!(flow.storage_charge[0], 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(flow.curtailment, 0.0, epsilon = 1e-9);
        assert_relative_eq!(
            result.levels[day].storage_gwh[0],
            192.0 * (day + 1) as f64,
            epsilon = 1e-9
        );
    }
    assert_eq!(result.levels[9].storage_gwh[0], 1920.0);

    for day in 10..days {
        let flow = &result.flows[day];
        assert_eq!(flow.storage_charge[0], 0.0);
        assert_relative_eq!(flow.curtailment, 10.0, epsilon = 1e-9);
        assert_eq!(result.levels[day].storage_gwh[0], 1920.0);
    }

    let metrics = SummaryMetrics::from_result(&result);
    assert_relative_eq!(metrics.total_curtailed_gwh, 5.0 * 240.0, epsilon = 1e-6);
    assert_eq!(metrics.storage[0].terminal_level_gwh, 1920.0);
}

#[test]
fn saturated_storage_leaves_room_for_dac_before_curtailment() {
    let demand = common::constant_daily("demand", 30.0, 12);
    let supply = common::constant_daily("supply", 40.0, 12);
    let config = AssetConfig {
        dac: Dac {
            max_power_gw: 4.0,
            ..Dac::default()
        },
        ..common::storage_only(1920.0, 0.8, 0.0)
    };

    let result = engine::run(&demand, &supply, &config, config.initial_state()).unwrap();
    // Storage absorbs everything while filling, so the DAC only runs afterwards.
    assert_eq!(result.flows[0].dac, 0.0);
    let last = result.flows.last().unwrap();
    assert_eq!(last.dac, 4.0);
    assert_relative_eq!(last.curtailment, 6.0, epsilon = 1e-9);
}

#[test]
fn constant_deficit_with_empty_storage_is_unmet() {
    let demand = common::constant_daily("demand", 45.0, 7);
    let supply = common::constant_daily("supply", 40.0, 7);
    let config = common::storage_only(500.0, 0.9, 0.0);

    let result = engine::run(&demand, &supply, &config, config.initial_state()).unwrap();
    for (flow, level) in result.flows.iter().zip(&result.levels) {
        assert_eq!(flow.unmet, 5.0);
        assert_eq!(flow.total_storage_discharge(), 0.0);
        assert_eq!(level.storage_gwh[0], 0.0);
    }

    let metrics = SummaryMetrics::from_result(&result);
    assert_eq!(metrics.unmet_steps, 7);
    assert_relative_eq!(metrics.total_unmet_gwh, 7.0 * 120.0);
    assert!(!metrics.is_reliable());
}

#[test]
fn deep_deficit_drains_storage_and_reports_remainder_unmet() {
    // 300 GWh short over one day from 100 GWh stored leaves 200 GWh unmet.
    let demand = common::constant_daily("demand", 52.5, 1);
    let supply = common::constant_daily("supply", 40.0, 1);
    let config = common::storage_only(200.0, 0.9, 0.5);

    let result = engine::run(&demand, &supply, &config, config.initial_state()).unwrap();
    let flow = &result.flows[0];
    assert_eq!(result.levels[0].storage_gwh[0], 0.0);
    assert_relative_eq!(flow.storage_discharge[0] * 24.0, 100.0, epsilon = 1e-9);
    assert_relative_eq!(flow.unmet * 24.0, 200.0, epsilon = 1e-9);

    let metrics = SummaryMetrics::from_result(&result);
    assert_relative_eq!(metrics.total_unmet_gwh, 200.0, epsilon = 1e-9);
    assert_eq!(metrics.storage[0].min_level_gwh, 0.0);
}

#[test]
fn surplus_only_dac_takes_up_to_its_rating() {
    let demand = common::daily_gw("demand", 0, vec![30.0, 30.0]);
    let supply = common::daily_gw("supply", 0, vec![32.0, 35.0]);
    let config = AssetConfig {
        dac: Dac {
            max_power_gw: 2.0,
            mode: DacMode::SurplusOnly,
            ..Dac::default()
        },
        ..common::storage_only(100.0, 0.9, 1.0)
    };

    let result = engine::run(&demand, &supply, &config, config.initial_state()).unwrap();
    assert_eq!(result.flows[0].dac, 2.0);
    assert_eq!(result.flows[0].curtailment, 0.0);
    assert_eq!(result.flows[1].dac, 2.0);
    assert_eq!(result.flows[1].curtailment, 3.0);

    let metrics = SummaryMetrics::from_result(&result);
    assert_relative_eq!(metrics.total_dac_energy_gwh, 96.0);
    assert_relative_eq!(metrics.dac_capacity_factor, 1.0);
}

#[test]
fn power_capped_asset_hands_the_rest_to_the_next_one() {
    // Three days of 6 GW surplus, then three days of 5 GW deficit.
    let demand = common::constant_daily("demand", 30.0, 6);
    let supply = common::daily_gw("supply", 0, vec![36.0, 36.0, 36.0, 25.0, 25.0, 25.0]);
    let config = AssetConfig {
        storage: vec![
            StorageAsset::new("battery", 500.0, 1.0).with_max_power(2.0),
            StorageAsset::new("pumped_hydro", 2000.0, 1.0),
        ],
        initial_storage_fraction: 0.0,
        ..AssetConfig::default()
    };

    let result = engine::run(&demand, &supply, &config, config.initial_state()).unwrap();
    for flow in &result.flows[..3] {
        assert_eq!(flow.storage_charge[0], 2.0);
        assert_relative_eq!(flow.storage_charge[1], 4.0, epsilon = 1e-9);
        assert_eq!(flow.curtailment, 0.0);
    }
    assert_relative_eq!(result.levels[2].storage_gwh[0], 3.0 * 48.0, epsilon = 1e-9);
    assert_relative_eq!(result.levels[2].storage_gwh[1], 3.0 * 96.0, epsilon = 1e-9);

    for flow in &result.flows[3..] {
        assert_eq!(flow.storage_discharge[0], 2.0);
        assert_relative_eq!(flow.storage_discharge[1], 3.0, epsilon = 1e-9);
        assert_eq!(flow.unmet, 0.0);
    }
    assert_relative_eq!(result.levels[5].storage_gwh[0], 0.0, epsilon = 1e-9);
    assert_relative_eq!(result.levels[5].storage_gwh[1], 3.0 * 96.0 - 3.0 * 72.0, epsilon = 1e-9);
}

#[test]
fn partial_overlap_warns_and_simulates_the_intersection() {
    let demand = common::daily_gw("demand", 0, vec![30.0; 10]);
    let supply = common::daily_gw("supply", 2, vec![30.0; 10]);
    let config = common::storage_only(0.0, 0.9, 0.0);

    let result = engine::run(&demand, &supply, &config, config.initial_state()).unwrap();
    assert_eq!(result.len(), 8);
    assert_eq!(result.timestamps[0], common::start() + chrono::TimeDelta::days(2));
    let warning = &result.warnings[0];
    assert_eq!(warning.dropped_steps, 2);
    assert_eq!(warning.total_steps, 10);
}

#[test]
fn disjoint_series_are_rejected() {
    let demand = common::daily_gw("demand", 0, vec![30.0; 5]);
    let supply = common::daily_gw("supply", 10, vec![30.0; 5]);
    let config = common::storage_only(0.0, 0.9, 0.0);

    let err = engine::run(&demand, &supply, &config, config.initial_state()).unwrap_err();
    assert!(matches!(err, SimError::InvalidInput(_)));
}

#[test]
fn energy_series_as_demand_is_a_unit_mismatch() {
    let demand = common::constant_daily("demand", 30.0, 3)
        .map("demand", Unit::GigawattHour, |v| v * 24.0);
    let supply = common::constant_daily("supply", 30.0, 3);
    let config = common::storage_only(0.0, 0.9, 0.0);

    let err = engine::run(&demand, &supply, &config, config.initial_state()).unwrap_err();
    assert!(matches!(err, SimError::UnitMismatch { .. }), "{err}");
}

#[test]
fn supply_in_megawatts_is_converted() {
    let demand = common::constant_daily("demand", 30.0, 3);
    let supply =
        common::constant_daily("supply", 32_000.0, 3).map("supply", Unit::Megawatt, |v| v);
    let config = common::storage_only(0.0, 0.9, 0.0);

    let result = engine::run(&demand, &supply, &config, config.initial_state()).unwrap();
    assert_relative_eq!(result.flows[0].curtailment, 2.0, epsilon = 1e-9);
}

#[test]
fn invalid_configuration_fails_before_any_step() {
    let demand = common::constant_daily("demand", 30.0, 3);
    let supply = common::constant_daily("supply", 30.0, 3);
    let config = common::storage_only(100.0, 1.5, 0.0);

    let err = engine::run(&demand, &supply, &config, config.initial_state()).unwrap_err();
    assert_eq!(err.config_errors()[0].field, "storage[0].round_trip_efficiency");
}

#[test]
fn initial_state_above_capacity_is_rejected() {
    let demand = common::constant_daily("demand", 30.0, 3);
    let supply = common::constant_daily("supply", 30.0, 3);
    let config = common::storage_only(100.0, 0.9, 0.0);
    let mut state = ReservoirState::default();
    state.storage_gwh[0] = 150.0;

    let err = engine::run(&demand, &supply, &config, state).unwrap_err();
    assert_eq!(err.config_errors()[0].field, "initial_state.storage[0]");
}

#[test]
fn nan_demand_reports_the_step() {
    let demand = common::daily_gw("demand", 0, vec![30.0, f64::NAN, 30.0]);
    let supply = common::constant_daily("supply", 30.0, 3);
    let config = common::storage_only(0.0, 0.9, 0.0);

    let err = engine::run(&demand, &supply, &config, config.initial_state()).unwrap_err();
    assert_eq!(err.config_errors()[0].field, "step[1].demand");
}
