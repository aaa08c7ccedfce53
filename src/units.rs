//! Physical quantities tagged with units.
//!
//! Every configured parameter and input series carries a [`Unit`]. Conversion
//! between units is explicit via [`Quantity::to`] and only allowed within one
//! [`Dimension`]; anything else is a [`SimError::UnitMismatch`]. The engine
//! works on plain `f64` in canonical units (GW, GWh, fractions, hours) once the
//! boundary checks have passed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SimError};

/// Molar mass of CO2 in g/mol.
pub const MOLAR_MASS_CO2_G_PER_MOL: f64 = 44.01;

/// Hours in an average year (365.25 days).
pub const HOURS_PER_YEAR: f64 = 24.0 * 365.25;

/// Physical dimension of a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Power,
    Energy,
    /// Dimensionless ratio (efficiency, loss factor, capacity factor).
    Ratio,
    /// Energy per mass of CO2 captured.
    SpecificEnergy,
    Duration,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Power => "power",
            Self::Energy => "energy",
            Self::Ratio => "ratio",
            Self::SpecificEnergy => "specific energy",
            Self::Duration => "duration",
        };
        f.write_str(name)
    }
}

/// Supported units. Each belongs to exactly one [`Dimension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Watt,
    Kilowatt,
    Megawatt,
    Gigawatt,
    Terawatt,
    WattHour,
    KilowattHour,
    MegawattHour,
    GigawattHour,
    TerawattHour,
    Fraction,
    Percent,
    KilowattHourPerTonne,
    MegawattHourPerTonne,
    GigajoulePerTonne,
    KilojoulePerMole,
    Hour,
    Day,
}

impl Unit {
    /// Dimension this unit measures.
    pub fn dimension(self) -> Dimension {
        match self {
            Self::Watt | Self::Kilowatt | Self::Megawatt | Self::Gigawatt | Self::Terawatt => {
                Dimension::Power
            }
            Self::WattHour
            | Self::KilowattHour
            | Self::MegawattHour
            | Self::GigawattHour
            | Self::TerawattHour => Dimension::Energy,
            Self::Fraction | Self::Percent => Dimension::Ratio,
            Self::KilowattHourPerTonne
            | Self::MegawattHourPerTonne
            | Self::GigajoulePerTonne
            | Self::KilojoulePerMole => Dimension::SpecificEnergy,
            Self::Hour | Self::Day => Dimension::Duration,
        }
    }

    /// Multiplier to the canonical unit of the dimension
    /// (GW, GWh, fraction, MWh/tCO2, hour).
    pub fn scale(self) -> f64 {
        match self {
            Self::Watt | Self::WattHour => 1e-9,
            Self::Kilowatt | Self::KilowattHour => 1e-6,
            Self::Megawatt | Self::MegawattHour => 1e-3,
            Self::Gigawatt | Self::GigawattHour => 1.0,
            Self::Terawatt | Self::TerawattHour => 1e3,
            Self::Fraction => 1.0,
            Self::Percent => 0.01,
            Self::KilowattHourPerTonne => 1e-3,
            Self::MegawattHourPerTonne => 1.0,
            Self::GigajoulePerTonne => 1.0 / 3.6,
            // kJ/mol * (1e6 g/t / M) = kJ/t, then / 3.6e6 kJ/MWh
            Self::KilojoulePerMole => 1.0 / (MOLAR_MASS_CO2_G_PER_MOL * 3.6),
            Self::Hour => 1.0,
            Self::Day => 24.0,
        }
    }

    /// Canonical unit for `dimension`.
    pub fn canonical(dimension: Dimension) -> Self {
        match dimension {
            Dimension::Power => Self::Gigawatt,
            Dimension::Energy => Self::GigawattHour,
            Dimension::Ratio => Self::Fraction,
            Dimension::SpecificEnergy => Self::MegawattHourPerTonne,
            Dimension::Duration => Self::Hour,
        }
    }

    /// Short symbol used in text and CSV headers.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Watt => "W",
            Self::Kilowatt => "kW",
            Self::Megawatt => "MW",
            Self::Gigawatt => "GW",
            Self::Terawatt => "TW",
            Self::WattHour => "Wh",
            Self::KilowattHour => "kWh",
            Self::MegawattHour => "MWh",
            Self::GigawattHour => "GWh",
            Self::TerawattHour => "TWh",
            Self::Fraction => "-",
            Self::Percent => "%",
            Self::KilowattHourPerTonne => "kWh/tCO2",
            Self::MegawattHourPerTonne => "MWh/tCO2",
            Self::GigajoulePerTonne => "GJ/tCO2",
            Self::KilojoulePerMole => "kJ/molCO2",
            Self::Hour => "h",
            Self::Day => "d",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        let unit = match s.trim() {
            "W" => Self::Watt,
            "kW" => Self::Kilowatt,
            "MW" => Self::Megawatt,
            "GW" => Self::Gigawatt,
            "TW" => Self::Terawatt,
            "Wh" => Self::WattHour,
            "kWh" => Self::KilowattHour,
            "MWh" => Self::MegawattHour,
            "GWh" => Self::GigawattHour,
            "TWh" => Self::TerawattHour,
            "" | "-" | "fraction" => Self::Fraction,
            "%" | "percent" => Self::Percent,
            "kWh/t" | "kWh/tCO2" => Self::KilowattHourPerTonne,
            "MWh/t" | "MWh/tCO2" => Self::MegawattHourPerTonne,
            "GJ/t" | "GJ/tCO2" => Self::GigajoulePerTonne,
            "kJ/mol" | "kJ/molCO2" => Self::KilojoulePerMole,
            "h" | "hour" | "hours" => Self::Hour,
            "d" | "day" | "days" => Self::Day,
            other => return Err(SimError::InvalidInput(format!("unknown unit \"{other}\""))),
        };
        Ok(unit)
    }
}

/// A magnitude paired with its unit.
///
/// # Examples
///
/// ```
/// use grid_dac_sim::units::{Quantity, Unit};
///
/// let q: Quantity = "1500 MW".parse().unwrap();
/// assert_eq!(q.to(Unit::Gigawatt).unwrap().value, 1.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn gigawatts(value: f64) -> Self {
        Self::new(value, Unit::Gigawatt)
    }

    pub fn gigawatt_hours(value: f64) -> Self {
        Self::new(value, Unit::GigawattHour)
    }

    pub fn fraction(value: f64) -> Self {
        Self::new(value, Unit::Fraction)
    }

    pub fn hours(value: f64) -> Self {
        Self::new(value, Unit::Hour)
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    /// Converts to `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnitMismatch`] if `unit` measures a different dimension.
    pub fn to(&self, unit: Unit) -> Result<Self> {
        if unit.dimension() != self.dimension() {
            return Err(SimError::UnitMismatch {
                context: format!("conversion of {self} to {unit}"),
                expected: unit.dimension(),
                found: self.unit,
            });
        }
        Ok(Self::new(self.value * self.unit.scale() / unit.scale(), unit))
    }

    /// Magnitude expressed in `unit`.
    ///
    /// # Errors
    ///
    /// Same as [`Quantity::to`].
    pub fn value_in(&self, unit: Unit) -> Result<f64> {
        self.to(unit).map(|q| q.value)
    }

    /// Asserts the dimension at a boundary and returns the canonical magnitude.
    ///
    /// # Arguments
    ///
    /// * `dimension` - Dimension the caller expects
    /// * `context` - What the quantity is used for, reported on mismatch
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnitMismatch`] if the dimension differs.
    pub fn canonical(&self, dimension: Dimension, context: &str) -> Result<f64> {
        if self.dimension() != dimension {
            return Err(SimError::UnitMismatch {
                context: context.to_string(),
                expected: dimension,
                found: self.unit,
            });
        }
        Ok(self.value * self.unit.scale())
    }

    /// Sum of two quantities of the same dimension, in `self`'s unit.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnitMismatch`] on differing dimensions.
    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        let rhs = other.to(self.unit)?;
        Ok(Self::new(self.value + rhs.value, self.unit))
    }

    /// Difference of two quantities of the same dimension, in `self`'s unit.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnitMismatch`] on differing dimensions.
    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        let rhs = other.to(self.unit)?;
        Ok(Self::new(self.value - rhs.value, self.unit))
    }

    /// Energy delivered by a constant power over `duration`, in GWh.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnitMismatch`] unless `self` is a power and
    /// `duration` a duration.
    pub fn energy_over(&self, duration: &Self) -> Result<Self> {
        let gw = self.canonical(Dimension::Power, "power to energy conversion")?;
        let hours = duration.canonical(Dimension::Duration, "power to energy conversion")?;
        Ok(Self::gigawatt_hours(gw * hours))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Unit::Fraction => write!(f, "{}", self.value),
            Unit::Percent => write!(f, "{}%", self.value),
            unit => write!(f, "{} {}", self.value, unit),
        }
    }
}

impl FromStr for Quantity {
    type Err = SimError;

    /// Parses `"<number> <unit>"`, `"<number>%"` or a bare number (a fraction).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (number, unit) = match s.split_once(char::is_whitespace) {
            Some((number, unit)) => (number, unit.parse()?),
            None => match s.strip_suffix('%') {
                Some(number) => (number, Unit::Percent),
                None => (s, Unit::Fraction),
            },
        };
        let value = number
            .parse::<f64>()
            .map_err(|e| SimError::InvalidInput(format!("bad quantity \"{s}\": {e}")))?;
        Ok(Self::new(value, unit))
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Raw::Number(value) => Ok(Self::fraction(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("12 GW", 12.0, Unit::Gigawatt)]
    #[case("1500 MW", 1500.0, Unit::Megawatt)]
    #[case("0.74", 0.74, Unit::Fraction)]
    #[case("74%", 74.0, Unit::Percent)]
    #[case("101 kJ/mol", 101.0, Unit::KilojoulePerMole)]
    #[case("1 d", 1.0, Unit::Day)]
    fn parses_quantities(#[case] text: &str, #[case] value: f64, #[case] unit: Unit) {
        let q: Quantity = text.parse().unwrap();
        assert_eq!(q, Quantity::new(value, unit));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!("3 furlongs".parse::<Quantity>().is_err());
        assert!("abc GW".parse::<Quantity>().is_err());
    }

    #[test]
    fn converts_within_dimension() {
        let q = Quantity::new(2.5, Unit::TerawattHour);
        assert_relative_eq!(q.value_in(Unit::GigawattHour).unwrap(), 2500.0);
        assert_relative_eq!(
            Quantity::new(74.0, Unit::Percent).value_in(Unit::Fraction).unwrap(),
            0.74
        );
    }

    #[test]
    fn conversion_across_dimensions_fails() {
        let err = Quantity::gigawatts(1.0).to(Unit::GigawattHour).unwrap_err();
        assert!(matches!(
            err,
            SimError::UnitMismatch {
                expected: Dimension::Energy,
                found: Unit::Gigawatt,
                ..
            }
        ));
    }

    #[test]
    fn canonical_checks_dimension() {
        let q = Quantity::new(500.0, Unit::Megawatt);
        assert_relative_eq!(q.canonical(Dimension::Power, "test").unwrap(), 0.5);
        assert!(q.canonical(Dimension::Energy, "test").is_err());
    }

    #[test]
    fn dac_specific_energy_from_molar_basis() {
        // 162 kJ/mol ~ 1.02 MWh per tonne of CO2
        let q = Quantity::new(162.0, Unit::KilojoulePerMole);
        let mwh_per_t = q.value_in(Unit::MegawattHourPerTonne).unwrap();
        assert_relative_eq!(mwh_per_t, 162.0 / (44.01 * 3.6), max_relative = 1e-12);
        assert_relative_eq!(
            Quantity::new(3.6, Unit::GigajoulePerTonne)
                .value_in(Unit::MegawattHourPerTonne)
                .unwrap(),
            1.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn checked_arithmetic_requires_matching_dimension() {
        let a = Quantity::gigawatts(1.0);
        let b = Quantity::new(500.0, Unit::Megawatt);
        assert_relative_eq!(a.checked_add(&b).unwrap().value, 1.5);
        assert_relative_eq!(a.checked_sub(&b).unwrap().value, 0.5);
        assert!(a.checked_add(&Quantity::fraction(0.5)).is_err());
    }

    #[test]
    fn power_over_a_day_is_energy() {
        let e = Quantity::gigawatts(1.0)
            .energy_over(&Quantity::new(1.0, Unit::Day))
            .unwrap();
        assert_eq!(e, Quantity::gigawatt_hours(24.0));
        assert!(Quantity::gigawatt_hours(1.0)
            .energy_over(&Quantity::hours(1.0))
            .is_err());
    }

    #[test]
    fn deserializes_from_string_or_number() {
        #[derive(Deserialize)]
        struct Doc {
            power: Quantity,
            ratio: Quantity,
        }
        let doc: Doc = toml::from_str("power = \"3 GW\"\nratio = 0.8").unwrap();
        assert_eq!(doc.power, Quantity::gigawatts(3.0));
        assert_eq!(doc.ratio, Quantity::fraction(0.8));
    }
}
