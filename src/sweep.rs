//! Renewable capacity sweeps: one independent run per capacity, in parallel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug_span, info, warn};

use crate::error::{Result, SimError};
use crate::series::TimeSeries;
use crate::sim::assets::AssetConfig;
use crate::sim::engine;
use crate::sim::kpi::SummaryMetrics;
use crate::sim::types::ReservoirState;
use crate::supply::{CapacityFactors, SupplyModel};

/// Upper bound on the points [`capacity_range`] will generate.
pub const MAX_SWEEP_POINTS: usize = 10_000;

/// Cooperative cancellation shared between a sweep and whoever may stop it.
///
/// Cloning shares the flag. Runs already in progress finish; runs not yet
/// started report [`SweepOutcome::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct SweepControl {
    cancelled: Arc<AtomicBool>,
}

impl SweepControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// The shared flag, for registering with a signal handler.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

/// Result of one sweep point.
#[derive(Debug)]
pub enum SweepOutcome {
    Completed(SummaryMetrics),
    /// The point's configuration or inputs were rejected; the sweep carried on.
    Failed(SimError),
    /// Not reported: cancelled before it started, or past the first reliable
    /// capacity when stopping early.
    Cancelled,
}

impl SweepOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn metrics(&self) -> Option<&SummaryMetrics> {
        match self {
            Self::Completed(metrics) => Some(metrics),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct SweepRun {
    pub renewable_capacity_gw: f64,
    pub outcome: SweepOutcome,
}

/// Inputs shared by every point of a sweep.
#[derive(Debug, Clone, Copy)]
pub struct SweepInputs<'a> {
    pub demand: &'a TimeSeries,
    pub factors: &'a CapacityFactors,
    /// Fleet whose renewable capacity is replaced at each point.
    pub supply: SupplyModel,
    pub config: &'a AssetConfig,
    pub initial_state: ReservoirState,
    /// Per-step import availability, shared by every point.
    pub imports: Option<&'a TimeSeries>,
}

/// Sweep-wide options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOptions {
    /// Stop at the smallest capacity with no unmet demand.
    pub stop_when_reliable: bool,
}

/// Capacities from `from` up to but excluding `to`, every `step` GW.
///
/// # Errors
///
/// Returns [`SimError::Configuration`] for a non-positive step, negative
/// bounds, an empty range, or more than [`MAX_SWEEP_POINTS`] points.
pub fn capacity_range(from: f64, to: f64, step: f64) -> Result<Vec<f64>> {
    if !(step.is_finite() && step > 0.0) {
        return Err(SimError::config("sweep.step", format!("must be positive, got {step} GW")));
    }
    if !(from.is_finite() && from >= 0.0) {
        return Err(SimError::config("sweep.from", format!("must be non-negative, got {from} GW")));
    }
    if !(to.is_finite() && to > from) {
        return Err(SimError::config(
            "sweep.to",
            format!("must be greater than sweep.from ({from} GW), got {to} GW"),
        ));
    }
    // Index-based so accumulated rounding never adds or drops a point.
    let count = ((to - from) / step - 1e-9).ceil();
    if count > MAX_SWEEP_POINTS as f64 {
        return Err(SimError::config(
            "sweep.step",
            format!(
                "{step} GW from {from} to {to} GW gives {count} points, \
                 at most {MAX_SWEEP_POINTS}"
            ),
        ));
    }
    let count = count as usize;
    Ok((0..count).map(|i| from + step * i as f64).collect())
}

/// Simulates every capacity in `capacities` against the same demand, capacity
/// factors, and assets.
///
/// Points run in parallel, each with its own reservoir state starting from
/// `inputs.initial_state`. Results come back in input order. With
/// `stop_when_reliable`, capacities are processed in ascending batches and
/// every point above the first reliable one is reported as cancelled.
pub fn run_sweep(
    capacities: &[f64],
    inputs: &SweepInputs<'_>,
    options: SweepOptions,
    control: &SweepControl,
) -> Vec<SweepRun> {
    let run_point = |capacity: f64| -> SweepRun {
        if control.is_cancelled() {
            return SweepRun {
                renewable_capacity_gw: capacity,
                outcome: SweepOutcome::Cancelled,
            };
        }
        let _span = debug_span!("sweep_point", capacity_gw = capacity).entered();
        let outcome = match simulate_point(capacity, inputs) {
            Ok(metrics) => SweepOutcome::Completed(metrics),
            Err(e) => {
                warn!(capacity_gw = capacity, error = %e, "sweep point failed");
                SweepOutcome::Failed(e)
            }
        };
        SweepRun {
            renewable_capacity_gw: capacity,
            outcome,
        }
    };

    let runs = if options.stop_when_reliable {
        sweep_until_reliable(capacities, control, run_point)
    } else {
        capacities.par_iter().map(|&c| run_point(c)).collect()
    };

    let completed = runs
        .iter()
        .filter(|r| matches!(r.outcome, SweepOutcome::Completed(_)))
        .count();
    info!(points = runs.len(), completed, "sweep finished");
    runs
}

fn sweep_until_reliable(
    capacities: &[f64],
    control: &SweepControl,
    run_point: impl Fn(f64) -> SweepRun + Sync,
) -> Vec<SweepRun> {
    let mut order: Vec<usize> = (0..capacities.len()).collect();
    order.sort_by(|&a, &b| capacities[a].total_cmp(&capacities[b]));

    let batch = rayon::current_num_threads().max(1);
    let mut slots: Vec<Option<SweepRun>> = (0..capacities.len()).map(|_| None).collect();
    let mut reliable_at: Option<f64> = None;

    for chunk in order.chunks(batch) {
        if reliable_at.is_some() || control.is_cancelled() {
            break;
        }
        let done: Vec<(usize, SweepRun)> = chunk
            .par_iter()
            .map(|&i| (i, run_point(capacities[i])))
            .collect();
        for (i, run) in done {
            if run.outcome.metrics().is_some_and(SummaryMetrics::is_reliable) {
                let c = run.renewable_capacity_gw;
                reliable_at = Some(reliable_at.map_or(c, |r: f64| r.min(c)));
            }
            slots[i] = Some(run);
        }
    }

    slots
        .into_iter()
        .zip(capacities)
        .map(|(slot, &capacity)| match (slot, reliable_at) {
            (Some(run), Some(limit)) if capacity > limit => SweepRun {
                renewable_capacity_gw: run.renewable_capacity_gw,
                outcome: SweepOutcome::Cancelled,
            },
            (Some(run), _) => run,
            (None, _) => SweepRun {
                renewable_capacity_gw: capacity,
                outcome: SweepOutcome::Cancelled,
            },
        })
        .collect()
}

fn simulate_point(capacity: f64, inputs: &SweepInputs<'_>) -> Result<SummaryMetrics> {
    let supply = inputs.supply.with_renewable_capacity(capacity).supply(inputs.factors)?;
    let result = engine::run_with_imports(
        inputs.demand,
        &supply,
        inputs.imports,
        inputs.config,
        inputs.initial_state,
    )?;
    Ok(SummaryMetrics::from_result(&result))
}

/// Smallest capacity whose run left no demand unmet.
pub fn first_reliable(runs: &[SweepRun]) -> Option<f64> {
    runs.iter()
        .filter(|r| r.outcome.metrics().is_some_and(SummaryMetrics::is_reliable))
        .map(|r| r.renewable_capacity_gw)
        .reduce(f64::min)
}
