use polars::prelude::*;

use crate::config::ProcessingConfig;
use crate::error::Result;
use crate::schema::{present_columns, require_column, MergedColumn};
use crate::units::PressureUnit;

pub const GRAVITY_M_S2: f64 = 9.80665;

/// Converts a gauge pressure reading to a water column height in metres.
pub fn gauge_to_depth(gauge_pressure: f64, fluid_density: f64, units: PressureUnit) -> f64 {
    units.value_to_pascal(gauge_pressure) / (fluid_density * GRAVITY_M_S2)
}

/// Adds gauge pressure, water depth and water-surface elevation to an aligned frame.
pub fn compute_wse(aligned: &DataFrame, config: &ProcessingConfig) -> Result<DataFrame> {
    let water = require_column(aligned, MergedColumn::WaterPressure)?.f64()?;
    let baro = require_column(aligned, MergedColumn::BarometricPressure)?.f64()?;

    let gauge: Float64Chunked = (water - baro)
        .with_name(MergedColumn::GaugePressure.canonical_name().into());
    let pascal = config.pressure_units().to_pascal(&gauge);
    let depth: Float64Chunked = (pascal / (config.fluid_density() * GRAVITY_M_S2))
        .with_name(MergedColumn::WaterDepth.canonical_name().into());
    let wse: Float64Chunked = (&depth + config.reference_datum())
        .with_name(MergedColumn::WaterSurfaceElevation.canonical_name().into());

    let mut output = aligned.clone();
    output.with_column(gauge.into_series())?;
    output.with_column(depth.into_series())?;
    output.with_column(wse.into_series())?;

    let ordered = present_columns(&output);
    Ok(output.select(ordered)?)
}
