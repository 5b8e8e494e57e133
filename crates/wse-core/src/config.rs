use chrono::Duration;
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{Result, WseError};
use crate::units::PressureUnit;

pub const DEFAULT_FLUID_DENSITY: f64 = 1000.0;
pub const DEFAULT_MERGE_TOLERANCE_MINUTES: i64 = 15;
pub const DEFAULT_SHIFT_THRESHOLD_M: f64 = 0.15;

/// Names of the raw columns holding each reading in a loaded table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub timestamp: String,
    pub pressure: String,
    pub temperature: Option<String>,
}

impl ColumnMapping {
    pub fn new(timestamp: impl Into<String>, pressure: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            pressure: pressure.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: impl Into<String>) -> Self {
        self.temperature = Some(temperature.into());
        self
    }
}

/// Physical and alignment settings for one processing run.
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    reference_datum: f64,
    fluid_density: f64,
    pressure_units: PressureUnit,
    timezone: Option<Tz>,
    merge_tolerance: Duration,
}

impl ProcessingConfig {
    pub fn new(
        reference_datum: f64,
        fluid_density: f64,
        pressure_units: PressureUnit,
        timezone: Option<Tz>,
        merge_tolerance: Duration,
    ) -> Result<Self> {
        if !reference_datum.is_finite() {
            return Err(WseError::InvalidConfig(format!(
                "reference datum must be finite, got {reference_datum}"
            )));
        }
        if !fluid_density.is_finite() || fluid_density <= 0.0 {
            return Err(WseError::InvalidConfig(format!(
                "fluid density must be greater than zero, got {fluid_density}"
            )));
        }
        if merge_tolerance < Duration::zero() {
            return Err(WseError::InvalidConfig(format!(
                "merge tolerance must not be negative, got {merge_tolerance}"
            )));
        }

        Ok(Self {
            reference_datum,
            fluid_density,
            pressure_units,
            timezone,
            merge_tolerance,
        })
    }

    /// Freshwater, kPa, no timezone and a 15 minute tolerance.
    pub fn with_defaults(reference_datum: f64) -> Result<Self> {
        Self::new(
            reference_datum,
            DEFAULT_FLUID_DENSITY,
            PressureUnit::Kpa,
            None,
            Duration::minutes(DEFAULT_MERGE_TOLERANCE_MINUTES),
        )
    }

    pub fn reference_datum(&self) -> f64 {
        self.reference_datum
    }

    pub fn fluid_density(&self) -> f64 {
        self.fluid_density
    }

    pub fn pressure_units(&self) -> PressureUnit {
        self.pressure_units
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }

    pub fn merge_tolerance(&self) -> Duration {
        self.merge_tolerance
    }
}

/// Whether water temperatures are screened against a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TemperatureCheck {
    Disabled,
    Enabled(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QaqcConfig {
    shift_threshold: f64,
    temperature_check: TemperatureCheck,
}

impl QaqcConfig {
    pub fn new(shift_threshold: f64, temperature_check: TemperatureCheck) -> Result<Self> {
        if !shift_threshold.is_finite() || shift_threshold < 0.0 {
            return Err(WseError::InvalidConfig(format!(
                "shift threshold must be a non-negative number of metres, got {shift_threshold}"
            )));
        }
        if let TemperatureCheck::Enabled(threshold) = temperature_check {
            if !threshold.is_finite() {
                return Err(WseError::InvalidConfig(format!(
                    "temperature threshold must be finite, got {threshold}"
                )));
            }
        }

        Ok(Self {
            shift_threshold,
            temperature_check,
        })
    }

    pub fn shift_threshold(&self) -> f64 {
        self.shift_threshold
    }

    pub fn temperature_check(&self) -> TemperatureCheck {
        self.temperature_check
    }
}

impl Default for QaqcConfig {
    fn default() -> Self {
        Self {
            shift_threshold: DEFAULT_SHIFT_THRESHOLD_M,
            temperature_check: TemperatureCheck::Disabled,
        }
    }
}

/// Parses an IANA zone name such as `America/Chicago`.
pub fn parse_timezone(value: &str) -> Result<Tz> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|_| WseError::InvalidConfig(format!("unknown timezone '{}'", value.trim())))
}

/// Parses a tolerance written as `<number><unit>`, e.g. `15min`, `30s` or `1h`.
pub fn parse_tolerance(value: &str) -> Result<Duration> {
    let trimmed = value.trim();
    let split = trimmed
        .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
        .unwrap_or(trimmed.len());
    let (amount, unit) = trimmed.split_at(split);

    let amount: f64 = amount
        .parse()
        .map_err(|_| WseError::InvalidConfig(format!("invalid merge tolerance '{trimmed}'")))?;

    let unit_millis = match unit.trim() {
        "ms" | "L" => 1.0,
        "s" | "S" | "sec" => 1_000.0,
        "" | "min" | "m" | "T" => 60_000.0,
        "h" | "H" | "hr" => 3_600_000.0,
        "d" | "D" => 86_400_000.0,
        other => {
            return Err(WseError::InvalidConfig(format!(
                "unknown merge tolerance unit '{other}' in '{trimmed}'"
            )))
        }
    };

    let millis = amount * unit_millis;
    if !millis.is_finite() {
        return Err(WseError::InvalidConfig(format!(
            "invalid merge tolerance '{trimmed}'"
        )));
    }

    Ok(Duration::milliseconds(millis.round() as i64))
}
