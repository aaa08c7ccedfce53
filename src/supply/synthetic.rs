//! Seeded synthetic demand and weather profiles for runs without input files.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::error::Result;
use crate::series::TimeSeries;
use crate::units::{HOURS_PER_YEAR, Unit};

/// Generates Gaussian noise using the Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and the given standard deviation
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    z0 * std_dev
}

/// Position within the year in [0, 1), measured from 1 January.
fn year_position(t: NaiveDateTime) -> f64 {
    let hours = t.ordinal0() as f64 * 24.0 + t.hour() as f64 + t.minute() as f64 / 60.0;
    (hours / HOURS_PER_YEAR).fract()
}

/// Hour of day in [0, 24).
fn hour_of_day(t: NaiveDateTime) -> f64 {
    t.hour() as f64 + t.minute() as f64 / 60.0
}

fn timestamps(start: NaiveDateTime, step: TimeDelta, steps: usize) -> Vec<NaiveDateTime> {
    (0..steps).map(|i| start + step * i as i32).collect()
}

/// Electricity demand with an annual cycle, a daily cycle, and Gaussian noise.
///
/// The annual component peaks on 1 January and the daily component at 18:00.
/// The daily component only shows up for sub-daily steps; at a daily step it is
/// sampled at midnight every day and acts as a constant offset, so it is
/// skipped.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, TimeDelta};
/// use grid_dac_sim::supply::synthetic::DemandProfile;
///
/// let start = NaiveDate::from_ymd_opt(2050, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let mut profile = DemandProfile::new(40.0, 8.0, 5.0, 1.0, 42);
/// let demand = profile.series(start, TimeDelta::days(1), 365).unwrap();
/// assert_eq!(demand.len(), 365);
/// ```
#[derive(Debug, Clone)]
pub struct DemandProfile {
    /// Mean demand in GW
    pub mean_gw: f64,

    /// Half the winter/summer swing in GW
    pub seasonal_amplitude_gw: f64,

    /// Half the evening-peak/night swing in GW
    pub daily_amplitude_gw: f64,

    /// Standard deviation of the noise in GW
    pub noise_std_gw: f64,

    rng: StdRng,
}

impl DemandProfile {
    /// Creates a demand profile.
    ///
    /// # Arguments
    ///
    /// * `mean_gw` - Mean demand in GW
    /// * `seasonal_amplitude_gw` - Amplitude of the annual cycle in GW
    /// * `daily_amplitude_gw` - Amplitude of the daily cycle in GW
    /// * `noise_std_gw` - Standard deviation of the Gaussian noise in GW
    /// * `seed` - Random seed for reproducible noise
    pub fn new(
        mean_gw: f64,
        seasonal_amplitude_gw: f64,
        daily_amplitude_gw: f64,
        noise_std_gw: f64,
        seed: u64,
    ) -> Self {
        Self {
            mean_gw,
            seasonal_amplitude_gw,
            daily_amplitude_gw,
            noise_std_gw,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Mean demand over a step starting at `t`. Never negative.
    pub fn demand_gw(&mut self, t: NaiveDateTime, step: TimeDelta) -> f64 {
        let seasonal = self.seasonal_amplitude_gw * (2.0 * PI * year_position(t)).cos();
        let daily = if step < TimeDelta::days(1) {
            self.daily_amplitude_gw * (2.0 * PI * (hour_of_day(t) - 18.0) / 24.0).cos()
        } else {
            0.0
        };
        let noise = gaussian_noise(&mut self.rng, self.noise_std_gw);
        (self.mean_gw + seasonal + daily + noise).max(0.0)
    }

    /// Draws `steps` consecutive samples into a power series in GW.
    ///
    /// # Errors
    ///
    /// Returns an error if `steps` is zero or `step` is not positive.
    pub fn series(
        &mut self,
        start: NaiveDateTime,
        step: TimeDelta,
        steps: usize,
    ) -> Result<TimeSeries> {
        let values = timestamps(start, step, steps)
            .into_iter()
            .map(|t| self.demand_gw(t, step))
            .collect();
        TimeSeries::from_start("demand", start, step, values, Unit::Gigawatt)
    }
}

/// Minimum relative weather anomaly (deep lull).
const ANOMALY_MIN: f64 = -1.0;
/// Maximum relative weather anomaly (storm or clear-sky spell).
const ANOMALY_MAX: f64 = 2.0;

/// Capacity factor of one technology with correlated weather variability.
///
/// A seasonal mean is scaled by a relative anomaly that follows an AR(1)
/// process:
///
/// ```text
/// a(t) = alpha * a(t-1) + noise(t)
/// s(t) = 1 + seasonal * cos(2π (doy - peak) / 365.25)
/// cf(t) = clamp(mean * s(t) * shape(t) * (1 + a(t)), 0, 1)
/// ```
///
/// `shape` is a daylight half-sine for solar at sub-daily steps, scaled so it
/// averages to one over a day, and 1 otherwise.
#[derive(Debug, Clone)]
pub struct CapacityFactorProfile {
    /// Long-run mean capacity factor.
    pub mean: f64,

    /// Relative amplitude of the annual cycle.
    pub seasonal_amplitude: f64,

    /// Day of year (0-based) with the highest seasonal mean.
    pub peak_day: f64,

    /// Output follows the sun at sub-daily steps.
    pub diurnal: bool,

    /// AR(1) persistence (0.0 = uncorrelated, 1.0 = fully persistent).
    pub alpha: f64,

    /// Standard deviation of the AR(1) innovation.
    pub noise_std: f64,

    anomaly: f64,
    rng: StdRng,
}

impl CapacityFactorProfile {
    /// Creates a profile.
    ///
    /// `alpha` is clamped to [0, 1] and `noise_std` to be non-negative.
    pub fn new(
        mean: f64,
        seasonal_amplitude: f64,
        peak_day: f64,
        diurnal: bool,
        alpha: f64,
        noise_std: f64,
        seed: u64,
    ) -> Self {
        Self {
            mean,
            seasonal_amplitude,
            peak_day,
            diurnal,
            alpha: alpha.clamp(0.0, 1.0),
            noise_std: noise_std.max(0.0),
            anomaly: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Solar PV: low mean, strong summer peak, daylight only.
    pub fn solar(alpha: f64, noise_std: f64, seed: u64) -> Self {
        Self::new(0.108, 0.6, 172.0, true, alpha, noise_std, seed)
    }

    /// Offshore wind: high mean, winter peak.
    pub fn offshore(alpha: f64, noise_std: f64, seed: u64) -> Self {
        Self::new(0.383, 0.25, 15.0, false, alpha, noise_std, seed)
    }

    /// Onshore wind: medium mean, winter peak.
    pub fn onshore(alpha: f64, noise_std: f64, seed: u64) -> Self {
        Self::new(0.293, 0.3, 15.0, false, alpha, noise_std, seed)
    }

    fn advance_anomaly(&mut self) -> f64 {
        let epsilon = gaussian_noise(&mut self.rng, self.noise_std);
        self.anomaly = (self.alpha * self.anomaly + epsilon).clamp(ANOMALY_MIN, ANOMALY_MAX);
        self.anomaly
    }

    fn daylight_shape(&self, t: NaiveDateTime, step: TimeDelta) -> f64 {
        if !self.diurnal || step >= TimeDelta::days(1) {
            return 1.0;
        }
        let h = hour_of_day(t);
        if (6.0..18.0).contains(&h) {
            // Half-sine over 12 daylight hours averages 1/π over the whole day.
            PI * (PI * (h - 6.0) / 12.0).sin()
        } else {
            0.0
        }
    }

    /// Capacity factor for a step starting at `t`, in [0, 1].
    pub fn capacity_factor(&mut self, t: NaiveDateTime, step: TimeDelta) -> f64 {
        let anomaly = self.advance_anomaly();
        let day = year_position(t) * 365.25;
        let phase = 2.0 * PI * (day - self.peak_day) / 365.25;
        let seasonal = 1.0 + self.seasonal_amplitude * phase.cos();
        let cf = self.mean * seasonal * self.daylight_shape(t, step) * (1.0 + anomaly);
        cf.clamp(0.0, 1.0)
    }

    /// Draws `steps` consecutive samples into a fraction series.
    ///
    /// # Errors
    ///
    /// Returns an error if `steps` is zero or `step` is not positive.
    pub fn series(
        &mut self,
        name: &str,
        start: NaiveDateTime,
        step: TimeDelta,
        steps: usize,
    ) -> Result<TimeSeries> {
        let values = timestamps(start, step, steps)
            .into_iter()
            .map(|t| self.capacity_factor(t, step))
            .collect();
        TimeSeries::from_start(name, start, step, values, Unit::Fraction)
    }
}
