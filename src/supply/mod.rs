//! Generation supply: renewable fleet times capacity factors plus firm capacity.

pub mod synthetic;

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::error::{ConfigError, Result, SimError};
use crate::series::TimeSeries;
use crate::units::{Dimension, Unit};

use synthetic::CapacityFactorProfile;

/// Share of installed renewable capacity per technology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenewableMix {
    pub solar: f64,
    pub offshore: f64,
    pub onshore: f64,
}

impl Default for RenewableMix {
    fn default() -> Self {
        Self {
            solar: 0.2,
            offshore: 0.56,
            onshore: 0.24,
        }
    }
}

impl RenewableMix {
    fn validate(&self, errors: &mut Vec<ConfigError>) {
        for (name, share) in [
            ("solar", self.solar),
            ("offshore", self.offshore),
            ("onshore", self.onshore),
        ] {
            if !(0.0..=1.0).contains(&share) {
                errors.push(ConfigError::new(
                    format!("supply.{name}_share"),
                    format!("must be within [0, 1], got {share}"),
                ));
            }
        }
        let total = self.solar + self.offshore + self.onshore;
        if (total - 1.0).abs() > 1e-6 {
            errors.push(ConfigError::new(
                "supply",
                format!("technology shares must sum to 1, got {total}"),
            ));
        }
    }
}

/// Hourly (or daily) capacity factors of the three renewable technologies.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityFactors {
    pub solar: TimeSeries,
    pub offshore: TimeSeries,
    pub onshore: TimeSeries,
}

impl CapacityFactors {
    /// Bundles three capacity factor series.
    ///
    /// # Errors
    ///
    /// * [`SimError::UnitMismatch`] if a series is not a ratio
    /// * [`SimError::InvalidInput`] if the series do not share timestamps
    pub fn new(solar: TimeSeries, offshore: TimeSeries, onshore: TimeSeries) -> Result<Self> {
        for series in [&solar, &offshore, &onshore] {
            series.expect_dimension(Dimension::Ratio, series.name())?;
        }
        if solar.timestamps() != offshore.timestamps()
            || solar.timestamps() != onshore.timestamps()
        {
            return Err(SimError::InvalidInput(
                "capacity factor series must share the same timestamps".to_string(),
            ));
        }
        Ok(Self {
            solar: solar.to_unit(Unit::Fraction)?,
            offshore: offshore.to_unit(Unit::Fraction)?,
            onshore: onshore.to_unit(Unit::Fraction)?,
        })
    }

    /// Picks the `solar`, `offshore`, and `onshore` columns out of a table.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInput`] if a column is missing.
    pub fn from_columns(columns: Vec<TimeSeries>) -> Result<Self> {
        let mut solar = None;
        let mut offshore = None;
        let mut onshore = None;
        for column in columns {
            match column.name().to_ascii_lowercase().as_str() {
                "solar" => solar = Some(column),
                "offshore" => offshore = Some(column),
                "onshore" => onshore = Some(column),
                _ => {}
            }
        }
        let missing = |name: &str| {
            SimError::InvalidInput(format!("capacity factors are missing a \"{name}\" column"))
        };
        Self::new(
            solar.ok_or_else(|| missing("solar"))?,
            offshore.ok_or_else(|| missing("offshore"))?,
            onshore.ok_or_else(|| missing("onshore"))?,
        )
    }

    /// Seeded synthetic capacity factors for all three technologies.
    ///
    /// # Errors
    ///
    /// Returns an error if `steps` is zero or `step` is not positive.
    pub fn synthetic(
        start: NaiveDateTime,
        step: TimeDelta,
        steps: usize,
        alpha: f64,
        noise_std: f64,
        seed: u64,
    ) -> Result<Self> {
        let solar = CapacityFactorProfile::solar(alpha, noise_std, seed.wrapping_add(1))
            .series("solar", start, step, steps)?;
        let offshore = CapacityFactorProfile::offshore(alpha, noise_std, seed.wrapping_add(2))
            .series("offshore", start, step, steps)?;
        let onshore = CapacityFactorProfile::onshore(alpha, noise_std, seed.wrapping_add(3))
            .series("onshore", start, step, steps)?;
        Ok(Self {
            solar,
            offshore,
            onshore,
        })
    }

    pub fn len(&self) -> usize {
        self.solar.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solar.is_empty()
    }
}

/// Installed generation fleet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SupplyModel {
    /// Total installed renewable capacity (GW), split by `mix`.
    pub renewable_capacity_gw: f64,
    pub mix: RenewableMix,
    /// Firm (nuclear) capacity in GW.
    pub firm_capacity_gw: f64,
    /// Constant availability of the firm fleet.
    pub firm_capacity_factor: f64,
}

impl Default for SupplyModel {
    fn default() -> Self {
        Self {
            renewable_capacity_gw: 300.0,
            mix: RenewableMix::default(),
            firm_capacity_gw: 12.0,
            firm_capacity_factor: 0.9,
        }
    }
}

impl SupplyModel {
    /// Same fleet with a different renewable build-out.
    pub fn with_renewable_capacity(mut self, renewable_capacity_gw: f64) -> Self {
        self.renewable_capacity_gw = renewable_capacity_gw;
        self
    }

    /// Checks capacities, availability, and the technology mix.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] listing every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if !self.renewable_capacity_gw.is_finite() || self.renewable_capacity_gw < 0.0 {
            errors.push(ConfigError::new(
                "supply.renewable_capacity",
                format!("must be non-negative, got {} GW", self.renewable_capacity_gw),
            ));
        }
        if !self.firm_capacity_gw.is_finite() || self.firm_capacity_gw < 0.0 {
            errors.push(ConfigError::new(
                "supply.firm_capacity",
                format!("must be non-negative, got {} GW", self.firm_capacity_gw),
            ));
        }
        if !(0.0..=1.0).contains(&self.firm_capacity_factor) {
            errors.push(ConfigError::new(
                "supply.firm_capacity_factor",
                format!("must be within [0, 1], got {}", self.firm_capacity_factor),
            ));
        }
        self.mix.validate(&mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SimError::Configuration(errors))
        }
    }

    /// Available generation per step in GW.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid fleet.
    pub fn supply(&self, factors: &CapacityFactors) -> Result<TimeSeries> {
        self.validate()?;
        let firm = self.firm_capacity_gw * self.firm_capacity_factor;
        let values = factors
            .solar
            .values()
            .iter()
            .zip(factors.offshore.values())
            .zip(factors.onshore.values())
            .map(|((solar, offshore), onshore)| {
                let renewable = self.mix.solar * solar
                    + self.mix.offshore * offshore
                    + self.mix.onshore * onshore;
                self.renewable_capacity_gw * renewable + firm
            })
            .collect();
        TimeSeries::from_start(
            "supply",
            factors.solar.timestamps()[0],
            factors.solar.step(),
            values,
            Unit::Gigawatt,
        )
    }
}
