//! Core simulation types: step input, reservoir state, flow records, and run results.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::AlignmentWarning;

use super::assets::MAX_STORAGE_ASSETS;

/// Scalar inputs for one dispatch step, already unit-checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInput {
    /// Delivered demand (GW, mean over the step).
    pub demand_gw: f64,
    /// Available generation (GW, mean over the step).
    pub supply_gw: f64,
    /// Step length in hours.
    pub step_hours: f64,
    /// Power the neighbours can send this step (GW). `None` leaves the
    /// interconnector rating as the only import limit.
    pub import_limit_gw: Option<f64>,
}

/// Stored energy of every reservoir, advanced once per step.
///
/// Slots beyond the configured storage assets stay at zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ReservoirState {
    pub storage_gwh: [f64; MAX_STORAGE_ASSETS],
    pub hydrogen_gwh: f64,
}

impl ReservoirState {
    /// Sum over all short-term storage assets (GWh).
    pub fn total_storage_gwh(&self) -> f64 {
        self.storage_gwh.iter().sum()
    }
}

/// Itemised allocation of one step.
///
/// Every channel is a non-negative mean power over the step in GW. Charges,
/// electrolysis, and exports are measured on the grid side; discharges and
/// imports as delivered. The balance identity is
///
/// ```text
/// supply + backup + Σ storage_discharge + hydrogen_discharge + import + unmet
///   = demand + transmission_loss + Σ storage_charge + electrolyser + dac + export + curtailment
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FlowRecord {
    pub demand: f64,
    pub supply: f64,
    /// Extra generation needed to deliver `demand` through the network.
    pub transmission_loss: f64,
    /// `supply - (demand + transmission_loss)`, before any dispatch. Signed.
    pub net_before_dispatch: f64,
    pub storage_charge: [f64; MAX_STORAGE_ASSETS],
    pub storage_discharge: [f64; MAX_STORAGE_ASSETS],
    pub electrolyser: f64,
    pub hydrogen_discharge: f64,
    pub dac: f64,
    pub backup: f64,
    pub export: f64,
    pub import: f64,
    /// Lost on the interconnector; not part of the balance.
    pub interconnector_loss: f64,
    pub curtailment: f64,
    pub unmet: f64,
}

impl FlowRecord {
    pub fn total_storage_charge(&self) -> f64 {
        self.storage_charge.iter().sum()
    }

    pub fn total_storage_discharge(&self) -> f64 {
        self.storage_discharge.iter().sum()
    }

    /// Left-hand side of the balance identity.
    pub fn sources(&self) -> f64 {
        self.supply
            + self.backup
            + self.total_storage_discharge()
            + self.hydrogen_discharge
            + self.import
            + self.unmet
    }

    /// Right-hand side of the balance identity.
    pub fn sinks(&self) -> f64 {
        self.demand
            + self.transmission_loss
            + self.total_storage_charge()
            + self.electrolyser
            + self.dac
            + self.export
            + self.curtailment
    }

    /// `sources - sinks`; zero up to rounding for a correct step.
    pub fn balance_residual(&self) -> f64 {
        self.sources() - self.sinks()
    }
}

impl fmt::Display for FlowRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "demand={:>8.2}  supply={:>8.2}  net={:>+8.2} | stor(+{:.2}/-{:.2})  \
             h2(+{:.2}/-{:.2})  dac={:.2}  backup={:.2}  exp={:.2}  imp={:.2} | \
             curt={:.2}  unmet={:.2} GW",
            self.demand,
            self.supply,
            self.net_before_dispatch,
            self.total_storage_charge(),
            self.total_storage_discharge(),
            self.electrolyser,
            self.hydrogen_discharge,
            self.dac,
            self.backup,
            self.export,
            self.import,
            self.curtailment,
            self.unmet,
        )
    }
}

/// Capacity figures the analyzer needs, captured from the asset configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResultCapacities {
    pub storage_names: Vec<String>,
    pub storage_gwh: Vec<f64>,
    pub hydrogen_gwh: f64,
    pub dac_max_power_gw: f64,
    pub dac_specific_energy_mwh_per_t: Option<f64>,
    pub backup_max_power_gw: f64,
}

/// Complete output of one simulation run, owned by the caller.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub timestamps: Vec<NaiveDateTime>,
    pub step_hours: f64,
    pub flows: Vec<FlowRecord>,
    /// Reservoir levels after each step.
    pub levels: Vec<ReservoirState>,
    pub initial_state: ReservoirState,
    pub capacities: ResultCapacities,
    pub warnings: Vec<AlignmentWarning>,
}

impl SimulationResult {
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Simulated period in hours.
    pub fn total_hours(&self) -> f64 {
        self.flows.len() as f64 * self.step_hours
    }

    /// Levels after the last step, or the initial state for an empty run.
    pub fn terminal_state(&self) -> ReservoirState {
        self.levels.last().copied().unwrap_or(self.initial_state)
    }

    pub fn storage_count(&self) -> usize {
        self.capacities.storage_gwh.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_residual_of_consistent_record_is_zero() {
        let mut flow = FlowRecord {
            demand: 10.0,
            supply: 14.0,
            transmission_loss: 0.5,
            electrolyser: 1.0,
            dac: 1.5,
            curtailment: 0.5,
            ..FlowRecord::default()
        };
        flow.storage_charge[0] = 0.5;
        assert_eq!(flow.sources(), 14.0);
        assert_eq!(flow.sinks(), 14.0);
        assert_eq!(flow.balance_residual(), 0.0);
    }

    #[test]
    fn totals_sum_all_assets() {
        let mut flow = FlowRecord::default();
        flow.storage_discharge = [1.0, 2.0, 0.0, 0.5];
        assert_eq!(flow.total_storage_discharge(), 3.5);
        let state = ReservoirState {
            storage_gwh: [1.0, 2.0, 3.0, 0.0],
            hydrogen_gwh: 9.0,
        };
        assert_eq!(state.total_storage_gwh(), 6.0);
    }

    #[test]
    fn display_is_single_line() {
        let flow = FlowRecord {
            demand: 40.0,
            supply: 42.0,
            net_before_dispatch: 2.0,
            dac: 2.0,
            ..FlowRecord::default()
        };
        let text = flow.to_string();
        assert!(!text.contains('\n'));
        assert!(text.contains("dac=2.00"));
    }
}
