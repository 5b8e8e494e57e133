use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WseError};

pub const KPA_TO_PASCAL: f64 = 1000.0;
pub const PSI_TO_PASCAL: f64 = 6894.757293168;

/// Pressure units a logger export can be reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PressureUnit {
    Kpa,
    Psi,
}

impl PressureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PressureUnit::Kpa => "kPa",
            PressureUnit::Psi => "psi",
        }
    }

    /// Multiplier taking a reading in this unit to Pascal.
    pub fn conversion_factor(&self) -> f64 {
        match self {
            PressureUnit::Kpa => KPA_TO_PASCAL,
            PressureUnit::Psi => PSI_TO_PASCAL,
        }
    }

    pub fn value_to_pascal(&self, value: f64) -> f64 {
        value * self.conversion_factor()
    }

    pub fn to_pascal(&self, values: &Float64Chunked) -> Float64Chunked {
        values * self.conversion_factor()
    }
}

impl fmt::Display for PressureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PressureUnit {
    type Err = WseError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "kpa" => Ok(PressureUnit::Kpa),
            "psi" => Ok(PressureUnit::Psi),
            _ => Err(WseError::UnsupportedUnit(value.trim().to_string())),
        }
    }
}

/// Converts a column of pressure readings to Pascal. Nulls stay null.
pub fn to_pascal(values: &Float64Chunked, unit: &str) -> Result<Float64Chunked> {
    let unit: PressureUnit = unit.parse()?;
    Ok(unit.to_pascal(values))
}
