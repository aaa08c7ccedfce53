//! Fixed-step, timestamp-indexed series and index alignment.

use chrono::{NaiveDateTime, TimeDelta};

use crate::error::{AlignmentWarning, Result, SimError};
use crate::units::{Dimension, Quantity, Unit};

/// An ordered, constant-step series of values sharing one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
    unit: Unit,
    step: TimeDelta,
}

impl TimeSeries {
    /// Builds a series from explicit timestamps, inferring the step.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInput`] if lengths differ, fewer than two
    /// samples are given, timestamps are not strictly increasing, or the
    /// spacing is irregular.
    pub fn new(
        name: impl Into<String>,
        timestamps: Vec<NaiveDateTime>,
        values: Vec<f64>,
        unit: Unit,
    ) -> Result<Self> {
        let name = name.into();
        if timestamps.len() != values.len() {
            return Err(SimError::InvalidInput(format!(
                "series \"{name}\" has {} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if timestamps.len() < 2 {
            return Err(SimError::InvalidInput(format!(
                "series \"{name}\" needs at least two samples to infer its step"
            )));
        }
        let step = timestamps[1] - timestamps[0];
        if step <= TimeDelta::zero() {
            return Err(SimError::InvalidInput(format!(
                "series \"{name}\" timestamps are not strictly increasing at {}",
                timestamps[1]
            )));
        }
        if let Some(pair) = timestamps.windows(2).find(|w| w[1] - w[0] != step) {
            return Err(SimError::InvalidInput(format!(
                "series \"{name}\" has irregular spacing at {} (expected a step of {}s)",
                pair[1],
                step.num_seconds()
            )));
        }
        Ok(Self {
            name,
            timestamps,
            values,
            unit,
            step,
        })
    }

    /// Builds a regular series starting at `start` with the given `step`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInput`] for an empty series or a non-positive step.
    pub fn from_start(
        name: impl Into<String>,
        start: NaiveDateTime,
        step: TimeDelta,
        values: Vec<f64>,
        unit: Unit,
    ) -> Result<Self> {
        let name = name.into();
        if values.is_empty() {
            return Err(SimError::InvalidInput(format!("series \"{name}\" is empty")));
        }
        if step <= TimeDelta::zero() {
            return Err(SimError::InvalidInput(format!(
                "series \"{name}\" step must be positive"
            )));
        }
        let timestamps = (0..values.len())
            .map(|i| start + step * i as i32)
            .collect();
        Ok(Self {
            name,
            timestamps,
            values,
            unit,
            step,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn step(&self) -> TimeDelta {
        self.step
    }

    /// Step length in hours.
    pub fn step_hours(&self) -> f64 {
        self.step.num_seconds() as f64 / 3600.0
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    /// Fails unless the series measures `dimension`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnitMismatch`] naming `context`.
    pub fn expect_dimension(&self, dimension: Dimension, context: &str) -> Result<()> {
        if self.dimension() != dimension {
            return Err(SimError::UnitMismatch {
                context: format!("{context} \"{}\"", self.name),
                expected: dimension,
                found: self.unit,
            });
        }
        Ok(())
    }

    /// Returns a copy with every value converted to `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnitMismatch`] if `unit` measures a different dimension.
    pub fn to_unit(&self, unit: Unit) -> Result<Self> {
        let factor = Quantity::new(1.0, self.unit).value_in(unit)?;
        Ok(Self {
            values: self.values.iter().map(|v| v * factor).collect(),
            unit,
            ..self.clone()
        })
    }

    /// Element-wise map producing a new series with `unit`.
    pub fn map(&self, name: impl Into<String>, unit: Unit, f: impl Fn(f64) -> f64) -> Self {
        Self {
            name: name.into(),
            timestamps: self.timestamps.clone(),
            values: self.values.iter().copied().map(f).collect(),
            unit,
            step: self.step,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }
}

/// Two series restricted to their common timestamps.
#[derive(Debug, Clone)]
pub struct Aligned {
    pub timestamps: Vec<NaiveDateTime>,
    pub left: Vec<f64>,
    pub right: Vec<f64>,
    pub step: TimeDelta,
    /// Present when the intersection dropped any step.
    pub warning: Option<AlignmentWarning>,
}

impl Aligned {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn step_hours(&self) -> f64 {
        self.step.num_seconds() as f64 / 3600.0
    }
}

/// Intersects the indices of `left` and `right`, keeping timestamp order.
///
/// Both series must share a step; resampling is the caller's job. Because each
/// series is a contiguous regular grid, the intersection is too.
///
/// # Errors
///
/// Returns [`SimError::InvalidInput`] on differing steps or an empty intersection.
pub fn align(left: &TimeSeries, right: &TimeSeries) -> Result<Aligned> {
    if left.step != right.step {
        return Err(SimError::InvalidInput(format!(
            "series \"{}\" and \"{}\" have different steps ({}s vs {}s)",
            left.name,
            right.name,
            left.step.num_seconds(),
            right.step.num_seconds()
        )));
    }

    let capacity = left.len().min(right.len());
    let mut timestamps = Vec::with_capacity(capacity);
    let mut lv = Vec::with_capacity(capacity);
    let mut rv = Vec::with_capacity(capacity);

    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        let (a, b) = (left.timestamps[i], right.timestamps[j]);
        if a == b {
            timestamps.push(a);
            lv.push(left.values[i]);
            rv.push(right.values[j]);
            i += 1;
            j += 1;
        } else if a < b {
            i += 1;
        } else {
            j += 1;
        }
    }

    if timestamps.is_empty() {
        return Err(SimError::InvalidInput(format!(
            "series \"{}\" and \"{}\" share no timestamps",
            left.name, right.name
        )));
    }

    let total = left.len().max(right.len());
    let dropped = total - timestamps.len();
    let warning = (dropped > 0).then(|| AlignmentWarning {
        dropped_steps: dropped,
        total_steps: total,
        dropped_fraction: dropped as f64 / total as f64,
    });

    Ok(Aligned {
        timestamps,
        left: lv,
        right: rv,
        step: left.step,
        warning,
    })
}
