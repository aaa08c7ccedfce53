//! Simulation loop: aligns inputs, threads reservoir state through the
//! dispatch step, and enforces conservation and bounds after every step.

use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SimError};
use crate::series::{self, Aligned, TimeSeries};
use crate::units::{Dimension, Unit};

use super::assets::AssetConfig;
use super::clock::Clock;
use super::dispatch;
use super::types::{FlowRecord, ReservoirState, ResultCapacities, SimulationResult, StepInput};

/// Relative tolerance for the per-step balance and reservoir bookkeeping checks.
const INVARIANT_TOLERANCE: f64 = 1e-9;

/// Owns the reservoir state of one run and advances it one step at a time.
///
/// The configuration is borrowed read-only, so concurrent runs can share it.
pub struct Engine<'a> {
    config: &'a AssetConfig,
    state: ReservoirState,
}

impl<'a> Engine<'a> {
    /// Creates an engine positioned before the first step.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] if `config` is invalid or
    /// `initial_state` lies outside the configured capacities.
    pub fn new(config: &'a AssetConfig, initial_state: ReservoirState) -> Result<Self> {
        config.validate()?;
        config.validate_state(&initial_state)?;
        Ok(Self {
            config,
            state: initial_state,
        })
    }

    /// Executes one dispatch step and checks its invariants.
    ///
    /// # Arguments
    ///
    /// * `t` - Step index, used in error reports
    /// * `input` - Demand, supply, and step length for this step
    ///
    /// # Returns
    ///
    /// The step's flow record. The engine's state has advanced.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] for malformed input and
    /// [`SimError::InvariantViolation`] if the step breaks conservation or bounds.
    /// On error the state is left unchanged.
    pub fn step(&mut self, t: usize, input: StepInput) -> Result<FlowRecord> {
        let (next, flow) = dispatch::step(input, &self.state, self.config)
            .map_err(|e| annotate_step(e, t))?;
        check_invariants(t, &self.state, &next, &flow, self.config, input.step_hours)?;
        self.state = next;
        Ok(flow)
    }

    /// Current reservoir levels.
    pub fn state(&self) -> &ReservoirState {
        &self.state
    }
}

/// Runs the full simulation over the common index of `demand` and `supply`.
///
/// # Arguments
///
/// * `demand` - Delivered demand, any power unit
/// * `supply` - Available generation, any power unit
/// * `config` - Asset configuration, validated before the first step
/// * `initial_state` - Reservoir levels at the start of the run
///
/// # Returns
///
/// A [`SimulationResult`] with one flow record and one level snapshot per
/// aligned step, plus any alignment warning.
///
/// # Errors
///
/// * [`SimError::Configuration`] - invalid configuration, initial state, or step input
/// * [`SimError::UnitMismatch`] - either series is not a power
/// * [`SimError::InvalidInput`] - the series share no timestamps or differ in step
/// * [`SimError::InvariantViolation`] - a step broke conservation or bounds
pub fn run(
    demand: &TimeSeries,
    supply: &TimeSeries,
    config: &AssetConfig,
    initial_state: ReservoirState,
) -> Result<SimulationResult> {
    run_with_imports(demand, supply, None, config, initial_state)
}

/// Like [`run`], with the interconnector's sending end limited per step by
/// `imports`.
///
/// `imports` is the power the neighbouring grids can offer at each step. It
/// must share the aligned step length and cover every aligned timestamp.
/// With `None` the interconnector rating is the only limit.
///
/// # Errors
///
/// As [`run`], plus [`SimError::UnitMismatch`] if `imports` is not a power and
/// [`SimError::InvalidInput`] if it misses an aligned timestamp.
#[instrument(
    level = "debug",
    skip_all,
    fields(demand = demand.name(), supply = supply.name(), imports = imports.map(TimeSeries::name))
)]
pub fn run_with_imports(
    demand: &TimeSeries,
    supply: &TimeSeries,
    imports: Option<&TimeSeries>,
    config: &AssetConfig,
    initial_state: ReservoirState,
) -> Result<SimulationResult> {
    let mut engine = Engine::new(config, initial_state)?;

    demand.expect_dimension(Dimension::Power, "demand series")?;
    supply.expect_dimension(Dimension::Power, "supply series")?;
    let demand = demand.to_unit(Unit::Gigawatt)?;
    let supply = supply.to_unit(Unit::Gigawatt)?;

    let aligned = series::align(&demand, &supply)?;
    let warnings: Vec<_> = aligned.warning.into_iter().collect();
    for w in &warnings {
        warn!(
            dropped = w.dropped_steps,
            total = w.total_steps,
            "{w}; simulating the intersected range"
        );
    }

    let step_hours = aligned.step_hours();
    let n = aligned.len();
    let import_limits = imports
        .map(|series| import_limits_for(series, &aligned))
        .transpose()?;
    debug!(steps = n, step_hours, "starting run");

    let mut flows = Vec::with_capacity(n);
    let mut levels = Vec::with_capacity(n);
    Clock::new(n).try_run(|t| {
        let input = StepInput {
            demand_gw: aligned.left[t],
            supply_gw: aligned.right[t],
            step_hours,
            import_limit_gw: import_limits.as_ref().map(|limits| limits[t]),
        };
        flows.push(engine.step(t, input)?);
        levels.push(*engine.state());
        Ok::<(), SimError>(())
    })?;

    let unmet_steps = flows.iter().filter(|f| f.unmet > 0.0).count();
    info!(steps = n, unmet_steps, "run complete");

    Ok(SimulationResult {
        timestamps: aligned.timestamps,
        step_hours,
        flows,
        levels,
        initial_state,
        capacities: capacities_of(config),
        warnings,
    })
}

/// Picks the import availability (GW) for every aligned timestamp.
fn import_limits_for(imports: &TimeSeries, aligned: &Aligned) -> Result<Vec<f64>> {
    imports.expect_dimension(Dimension::Power, "import availability series")?;
    let imports = imports.to_unit(Unit::Gigawatt)?;
    if imports.step() != aligned.step {
        return Err(SimError::InvalidInput(format!(
            "import availability step {}s differs from the simulation step {}s",
            imports.step().num_seconds(),
            aligned.step.num_seconds()
        )));
    }
    let first = imports.timestamps()[0];
    let step_seconds = aligned.step.num_seconds();
    aligned
        .timestamps
        .iter()
        .map(|&t| {
            let offset = (t - first).num_seconds();
            usize::try_from(offset / step_seconds)
                .ok()
                .filter(|_| offset % step_seconds == 0)
                .and_then(|i| imports.values().get(i).copied())
                .ok_or_else(|| {
                    SimError::InvalidInput(format!("import availability has no value at {t}"))
                })
        })
        .collect()
}

fn capacities_of(config: &AssetConfig) -> ResultCapacities {
    ResultCapacities {
        storage_names: config.storage.iter().map(|a| a.name.clone()).collect(),
        storage_gwh: config.storage.iter().map(|a| a.capacity_gwh).collect(),
        hydrogen_gwh: config.hydrogen.capacity_gwh,
        dac_max_power_gw: config.dac.max_power_gw,
        dac_specific_energy_mwh_per_t: config.dac.specific_energy_mwh_per_t,
        backup_max_power_gw: config.backup.max_power_gw,
    }
}

/// Prefixes malformed-input errors with the step index.
fn annotate_step(error: SimError, t: usize) -> SimError {
    match error {
        SimError::Configuration(mut errors) => {
            for e in &mut errors {
                e.field = format!("step[{t}].{}", e.field);
            }
            SimError::Configuration(errors)
        }
        other => other,
    }
}

/// Verifies the balance identity, non-negative channels, reservoir bookkeeping,
/// and reservoir bounds for one step.
///
/// # Errors
///
/// Returns [`SimError::InvariantViolation`] describing the first failed check.
pub fn check_invariants(
    t: usize,
    before: &ReservoirState,
    after: &ReservoirState,
    flow: &FlowRecord,
    config: &AssetConfig,
    step_hours: f64,
) -> Result<()> {
    let violation = |message: String| SimError::InvariantViolation { step: t, message };

    let channels = [
        ("transmission_loss", flow.transmission_loss),
        ("electrolyser", flow.electrolyser),
        ("hydrogen_discharge", flow.hydrogen_discharge),
        ("dac", flow.dac),
        ("backup", flow.backup),
        ("export", flow.export),
        ("import", flow.import),
        ("curtailment", flow.curtailment),
        ("unmet", flow.unmet),
    ];
    for (name, value) in channels {
        if !(value.is_finite() && value >= 0.0) {
            return Err(violation(format!("{name} flow is {value}")));
        }
    }

    let scale = flow.sources().abs().max(1.0);
    let residual = flow.balance_residual();
    if residual.abs() > INVARIANT_TOLERANCE * scale {
        return Err(violation(format!(
            "energy balance off by {residual:e} GW (sources {}, sinks {})",
            flow.sources(),
            flow.sinks()
        )));
    }

    for i in 0..before.storage_gwh.len() {
        let (capacity, eta) = config
            .storage
            .get(i)
            .map_or((0.0, 1.0), |a| (a.capacity_gwh, a.round_trip_efficiency));
        let (charge, discharge) = (flow.storage_charge[i], flow.storage_discharge[i]);
        if !(charge >= 0.0 && discharge >= 0.0) {
            return Err(violation(format!("storage[{i}] has a negative flow")));
        }
        let expected = (charge * eta - discharge) * step_hours;
        check_reservoir(
            &format!("storage[{i}]"),
            before.storage_gwh[i],
            after.storage_gwh[i],
            expected,
            capacity,
        )
        .map_err(violation)?;
    }

    let expected_h2 =
        (flow.electrolyser * config.electrolyser.efficiency - flow.hydrogen_discharge) * step_hours;
    check_reservoir(
        "hydrogen",
        before.hydrogen_gwh,
        after.hydrogen_gwh,
        expected_h2,
        config.hydrogen.capacity_gwh,
    )
    .map_err(violation)
}

fn check_reservoir(
    name: &str,
    before: f64,
    after: f64,
    expected_delta: f64,
    capacity: f64,
) -> std::result::Result<(), String> {
    if !(0.0..=capacity).contains(&after) {
        return Err(format!("{name} level {after} GWh outside [0, {capacity}] GWh"));
    }
    let drift = (after - before) - expected_delta;
    if drift.abs() > INVARIANT_TOLERANCE * capacity.max(1.0) {
        return Err(format!(
            "{name} level moved by {} GWh but flows account for {expected_delta} GWh",
            after - before
        ));
    }
    Ok(())
}
