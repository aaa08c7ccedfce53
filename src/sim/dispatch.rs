//! Priority-ordered dispatch for a single time step.
//!
//! [`step`] is a pure function of the step input, the current reservoir state
//! and the asset configuration. It works on plain `f64` in GW/GWh, never
//! allocates, and never logs, so the simulation loop can call it millions of
//! times per sweep.
//!
//! Per step:
//!
//! 1. Gross up demand for transmission losses: `required = demand / (1 - loss)`.
//! 2. Add base-load backup and subtract base-load DAC from `supply - required`.
//! 3. Walk the surplus sinks or the deficit sources in configured order.
//!    Each takes what its power limit and reservoir bounds allow; the rest
//!    cascades. Leftover surplus is curtailed, leftover deficit is unmet.
//!
//! Conversion losses (storage round trip, electrolysis) are charged on the way
//! in, so stored energy is already post-loss and discharges are lossless.

use crate::error::{Result, SimError};

use super::assets::{
    AssetConfig, BackupMode, DacMode, DeficitSource, MAX_STORAGE_ASSETS, SurplusSink,
};
use super::types::{FlowRecord, ReservoirState, StepInput};

/// Headroom below which a reservoir counts as full (GWh).
const FULL_TOLERANCE_GWH: f64 = 1e-9;

/// Advances `state` by one step and itemises where every GW went.
///
/// # Arguments
///
/// * `input` - Demand, supply, and step length
/// * `state` - Reservoir levels at the start of the step
/// * `config` - Validated asset configuration
///
/// # Returns
///
/// The reservoir state at the end of the step and its flow record.
///
/// # Errors
///
/// Returns [`SimError::Configuration`] for
///
/// * a non-positive step length
/// * a demand, supply, or import limit that is negative or not finite
/// * more storage assets than a [`ReservoirState`] has slots for
pub fn step(
    input: StepInput,
    state: &ReservoirState,
    config: &AssetConfig,
) -> Result<(ReservoirState, FlowRecord)> {
    let StepInput {
        demand_gw,
        supply_gw,
        step_hours: dt,
        import_limit_gw,
    } = input;

    if config.storage.len() > MAX_STORAGE_ASSETS {
        return Err(SimError::config(
            "storage",
            format!(
                "at most {MAX_STORAGE_ASSETS} assets are supported, got {}",
                config.storage.len()
            ),
        ));
    }

    if !(dt.is_finite() && dt > 0.0) {
        return Err(SimError::config("step_hours", format!("must be > 0, got {dt}")));
    }
    if !(demand_gw.is_finite() && demand_gw >= 0.0) {
        return Err(SimError::config(
            "demand",
            format!("must be finite and >= 0, got {demand_gw}"),
        ));
    }
    if !(supply_gw.is_finite() && supply_gw >= 0.0) {
        return Err(SimError::config(
            "supply",
            format!("must be finite and >= 0, got {supply_gw}"),
        ));
    }
    if let Some(limit) = import_limit_gw.filter(|l| !(l.is_finite() && *l >= 0.0)) {
        return Err(SimError::config(
            "import_availability",
            format!("must be finite and >= 0, got {limit}"),
        ));
    }

    let mut next = *state;
    let required = demand_gw / (1.0 - config.transmission_loss_fraction);
    let mut flow = FlowRecord {
        demand: demand_gw,
        supply: supply_gw,
        transmission_loss: required - demand_gw,
        net_before_dispatch: supply_gw - required,
        ..FlowRecord::default()
    };

    let mut net = flow.net_before_dispatch;
    if config.backup.mode == BackupMode::BaseLoad {
        flow.backup = config.backup.max_power_gw;
        net += flow.backup;
    }
    if config.dac.mode == DacMode::BaseLoad {
        flow.dac = config.dac.max_power_gw;
        net -= flow.dac;
    }

    if net >= 0.0 {
        flow.curtailment = absorb_surplus(net, dt, config, &mut next, &mut flow);
    } else {
        flow.unmet = cover_deficit(-net, dt, import_limit_gw, config, &mut next, &mut flow);
    }

    clamp_levels(&mut next, config);
    Ok((next, flow))
}

/// Routes `surplus` GW through the surplus sinks; returns the curtailed remainder.
fn absorb_surplus(
    surplus: f64,
    dt: f64,
    config: &AssetConfig,
    state: &mut ReservoirState,
    flow: &mut FlowRecord,
) -> f64 {
    let mut remaining = surplus;
    for sink in config.dispatch_order.surplus {
        if remaining <= 0.0 {
            break;
        }
        match sink {
            SurplusSink::Storage => {
                let slots = state.storage_gwh.iter_mut().zip(flow.storage_charge.iter_mut());
                for (asset, (level, charged)) in config.storage.iter().zip(slots) {
                    if remaining <= 0.0 {
                        break;
                    }
                    let p = charge(
                        level,
                        asset.capacity_gwh,
                        asset.round_trip_efficiency,
                        remaining.min(asset.max_charge_gw.unwrap_or(f64::INFINITY)),
                        dt,
                    );
                    *charged = p;
                    remaining -= p;
                }
            }
            SurplusSink::Electrolyser => {
                let p = charge(
                    &mut state.hydrogen_gwh,
                    config.hydrogen.capacity_gwh,
                    config.electrolyser.efficiency,
                    remaining.min(config.electrolyser.max_power_gw),
                    dt,
                );
                flow.electrolyser = p;
                remaining -= p;
            }
            SurplusSink::Dac => {
                let held_back = config.dac.requires_full_hydrogen
                    && config.hydrogen.capacity_gwh - state.hydrogen_gwh > FULL_TOLERANCE_GWH;
                if config.dac.mode == DacMode::SurplusOnly && !held_back {
                    let p = remaining.min(config.dac.max_power_gw);
                    flow.dac += p;
                    remaining -= p;
                }
            }
            SurplusSink::Export => {
                let p = remaining.min(config.interconnector.capacity_gw);
                flow.export = p;
                flow.interconnector_loss += p * config.interconnector.loss_factor;
                remaining -= p;
            }
        }
    }
    remaining.max(0.0)
}

/// Covers `deficit` GW from the deficit sources; returns the unmet remainder.
///
/// `import_limit` caps the sending end of the interconnector for this step.
fn cover_deficit(
    deficit: f64,
    dt: f64,
    import_limit: Option<f64>,
    config: &AssetConfig,
    state: &mut ReservoirState,
    flow: &mut FlowRecord,
) -> f64 {
    let mut remaining = deficit;
    for source in config.dispatch_order.deficit {
        if remaining <= 0.0 {
            break;
        }
        match source {
            DeficitSource::Storage => {
                let slots = state.storage_gwh.iter_mut().zip(flow.storage_discharge.iter_mut());
                for (asset, (level, discharged)) in config.storage.iter().zip(slots) {
                    if remaining <= 0.0 {
                        break;
                    }
                    let p = discharge(
                        level,
                        remaining.min(asset.max_discharge_gw.unwrap_or(f64::INFINITY)),
                        dt,
                    );
                    *discharged = p;
                    remaining -= p;
                }
            }
            DeficitSource::Hydrogen => {
                let p = discharge(
                    &mut state.hydrogen_gwh,
                    remaining.min(config.hydrogen.max_burn_gw.unwrap_or(f64::INFINITY)),
                    dt,
                );
                flow.hydrogen_discharge = p;
                remaining -= p;
            }
            // Base-load backup already runs at full power.
            DeficitSource::Backup => {
                if config.backup.mode == BackupMode::SurplusOnly {
                    let p = remaining.min(config.backup.max_power_gw);
                    flow.backup += p;
                    remaining -= p;
                }
            }
            DeficitSource::Import => {
                let keep = 1.0 - config.interconnector.loss_factor;
                let rating = config.interconnector.capacity_gw;
                let sending = import_limit.map_or(rating, |limit| limit.min(rating));
                let p = remaining.min(sending * keep);
                flow.import = p;
                flow.interconnector_loss += p * config.interconnector.loss_factor / keep;
                remaining -= p;
            }
        }
    }
    remaining.max(0.0)
}

/// Charges a reservoir with up to `offered` GW (grid side) at efficiency `eta`.
///
/// Returns the accepted grid-side power. When headroom binds, the level is set
/// to `capacity` exactly.
fn charge(level: &mut f64, capacity: f64, eta: f64, offered: f64, dt: f64) -> f64 {
    let acceptable = (capacity - *level).max(0.0) / (eta * dt);
    if offered >= acceptable {
        *level = capacity;
        acceptable
    } else {
        *level += offered * dt * eta;
        offered
    }
}

/// Draws up to `wanted` GW from a reservoir. Empties it exactly when energy binds.
fn discharge(level: &mut f64, wanted: f64, dt: f64) -> f64 {
    let available = level.max(0.0) / dt;
    if wanted >= available {
        *level = 0.0;
        available
    } else {
        *level -= wanted * dt;
        wanted
    }
}

/// Rounding guard: pins every level into `[0, capacity]`.
fn clamp_levels(state: &mut ReservoirState, config: &AssetConfig) {
    for (i, level) in state.storage_gwh.iter_mut().enumerate() {
        let capacity = config.storage.get(i).map_or(0.0, |a| a.capacity_gwh);
        *level = level.clamp(0.0, capacity);
    }
    state.hydrogen_gwh = state.hydrogen_gwh.clamp(0.0, config.hydrogen.capacity_gwh);
}
