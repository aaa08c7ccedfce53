//! Post-hoc summary metrics computed from a completed simulation run.

use std::fmt;

use serde::Serialize;

use crate::units::HOURS_PER_YEAR;

use super::types::{ReservoirState, SimulationResult};

/// Minimum and terminal level of one reservoir.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservoirSummary {
    pub name: String,
    pub capacity_gwh: f64,
    pub min_level_gwh: f64,
    pub terminal_level_gwh: f64,
}

/// Aggregate metrics derived from a complete simulation run.
///
/// Energies are `power × step_hours` summed over the run; annual figures
/// divide by the simulated period in 365.25-day years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub steps: usize,
    pub step_hours: f64,
    /// Simulated period in years.
    pub years: f64,
    pub storage: Vec<ReservoirSummary>,
    pub hydrogen: ReservoirSummary,
    pub total_dac_energy_gwh: f64,
    pub annual_dac_energy_gwh: f64,
    /// DAC energy over the energy at full power for the whole period.
    pub dac_capacity_factor: f64,
    /// Fraction of steps in which the DAC drew any power.
    pub dac_operating_fraction: f64,
    /// Mt CO2 per year; present when the DAC specific energy is configured.
    pub annual_co2_removal_mt: Option<f64>,
    pub total_curtailed_gwh: f64,
    pub annual_curtailed_gwh: f64,
    pub total_unmet_gwh: f64,
    pub annual_unmet_gwh: f64,
    pub unmet_steps: usize,
    pub total_backup_gwh: f64,
    pub backup_utilisation: f64,
    pub total_electrolyser_gwh: f64,
    pub total_export_gwh: f64,
    pub total_import_gwh: f64,
    /// Fraction of steps where supply fell short of loss-adjusted demand.
    pub deficit_step_fraction: f64,
}

impl SummaryMetrics {
    /// Reduces a finished run into summary metrics. Pure; calling it twice on
    /// the same result yields identical metrics.
    ///
    /// # Arguments
    ///
    /// * `result` - Completed simulation result
    ///
    /// # Returns
    ///
    /// A `SummaryMetrics` with all fields populated. An empty run reports
    /// zero energies and the initial reservoir levels.
    pub fn from_result(result: &SimulationResult) -> Self {
        let dt = result.step_hours;
        let steps = result.len();
        let total_hours = result.total_hours();
        let years = total_hours / HOURS_PER_YEAR;
        let caps = &result.capacities;

        let mut dac = 0.0;
        let mut dac_steps = 0_usize;
        let mut curtailed = 0.0;
        let mut unmet = 0.0;
        let mut unmet_steps = 0_usize;
        let mut backup = 0.0;
        let mut electrolyser = 0.0;
        let mut export = 0.0;
        let mut import = 0.0;
        let mut deficit_steps = 0_usize;

        for f in &result.flows {
            dac += f.dac * dt;
            curtailed += f.curtailment * dt;
            unmet += f.unmet * dt;
            backup += f.backup * dt;
            electrolyser += f.electrolyser * dt;
            export += f.export * dt;
            import += f.import * dt;
            if f.dac > 0.0 {
                dac_steps += 1;
            }
            if f.unmet > 0.0 {
                unmet_steps += 1;
            }
            if f.net_before_dispatch < 0.0 {
                deficit_steps += 1;
            }
        }

        let terminal = result.terminal_state();
        let storage = (0..result.storage_count())
            .map(|i| ReservoirSummary {
                name: caps.storage_names.get(i).cloned().unwrap_or_default(),
                capacity_gwh: caps.storage_gwh[i],
                min_level_gwh: min_level(
                    result,
                    |s| s.storage_gwh[i],
                    result.initial_state.storage_gwh[i],
                ),
                terminal_level_gwh: terminal.storage_gwh[i],
            })
            .collect();
        let hydrogen = ReservoirSummary {
            name: "hydrogen".to_string(),
            capacity_gwh: caps.hydrogen_gwh,
            min_level_gwh: min_level(result, |s| s.hydrogen_gwh, result.initial_state.hydrogen_gwh),
            terminal_level_gwh: terminal.hydrogen_gwh,
        };

        let annual_dac = per_year(dac, years);
        let annual_co2_removal_mt = caps
            .dac_specific_energy_mwh_per_t
            .map(|mwh_per_t| annual_dac * 1e3 / mwh_per_t / 1e6);

        Self {
            steps,
            step_hours: dt,
            years,
            storage,
            hydrogen,
            total_dac_energy_gwh: dac,
            annual_dac_energy_gwh: annual_dac,
            dac_capacity_factor: ratio(dac, caps.dac_max_power_gw * total_hours),
            dac_operating_fraction: ratio(dac_steps as f64, steps as f64),
            annual_co2_removal_mt,
            total_curtailed_gwh: curtailed,
            annual_curtailed_gwh: per_year(curtailed, years),
            total_unmet_gwh: unmet,
            annual_unmet_gwh: per_year(unmet, years),
            unmet_steps,
            total_backup_gwh: backup,
            backup_utilisation: ratio(backup, caps.backup_max_power_gw * total_hours),
            total_electrolyser_gwh: electrolyser,
            total_export_gwh: export,
            total_import_gwh: import,
            deficit_step_fraction: ratio(deficit_steps as f64, steps as f64),
        }
    }

    /// True when no step left demand unmet.
    pub fn is_reliable(&self) -> bool {
        self.unmet_steps == 0
    }
}

/// Alias for [`SummaryMetrics::from_result`].
pub fn analyze(result: &SimulationResult) -> SummaryMetrics {
    SummaryMetrics::from_result(result)
}

fn min_level(
    result: &SimulationResult,
    level: impl Fn(&ReservoirState) -> f64,
    initial: f64,
) -> f64 {
    result.levels.iter().map(level).reduce(f64::min).unwrap_or(initial)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 { numerator / denominator } else { 0.0 }
}

fn per_year(total: f64, years: f64) -> f64 {
    ratio(total, years)
}

impl fmt::Display for SummaryMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Summary ---")?;
        writeln!(
            f,
            "Period:                {} steps of {} h ({:.2} years)",
            self.steps, self.step_hours, self.years
        )?;
        for s in self.storage.iter().chain(std::iter::once(&self.hydrogen)) {
            writeln!(
                f,
                "Storage {:<14} min {:.1} GWh, end {:.1} GWh of {:.1} GWh",
                format!("{}:", s.name),
                s.min_level_gwh,
                s.terminal_level_gwh,
                s.capacity_gwh
            )?;
        }
        writeln!(
            f,
            "DAC energy:            {:.1} GWh ({:.1} GWh/yr)",
            self.total_dac_energy_gwh, self.annual_dac_energy_gwh
        )?;
        writeln!(
            f,
            "DAC capacity factor:   {:.1}% (active {:.1}% of steps)",
            100.0 * self.dac_capacity_factor,
            100.0 * self.dac_operating_fraction
        )?;
        if let Some(mt) = self.annual_co2_removal_mt {
            writeln!(f, "CO2 removal:           {mt:.2} Mt/yr")?;
        }
        writeln!(
            f,
            "Curtailed:             {:.1} GWh ({:.1} GWh/yr)",
            self.total_curtailed_gwh, self.annual_curtailed_gwh
        )?;
        writeln!(
            f,
            "Unmet demand:          {:.1} GWh ({:.1} GWh/yr, {} steps)",
            self.total_unmet_gwh, self.annual_unmet_gwh, self.unmet_steps
        )?;
        writeln!(
            f,
            "Backup generation:     {:.1} GWh ({:.1}% utilisation)",
            self.total_backup_gwh,
            100.0 * self.backup_utilisation
        )?;
        writeln!(f, "Electrolysis:          {:.1} GWh", self.total_electrolyser_gwh)?;
        writeln!(
            f,
            "Interconnector:        export {:.1} GWh, import {:.1} GWh",
            self.total_export_gwh, self.total_import_gwh
        )?;
        write!(
            f,
            "Deficit steps:         {:.1}%",
            100.0 * self.deficit_step_fraction
        )
    }
}
