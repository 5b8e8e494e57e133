use polars::prelude::*;
use tracing::debug;

use crate::config::{QaqcConfig, TemperatureCheck};
use crate::error::Result;
use crate::schema::{require_column, FlagColumn, MergedColumn};

fn flagged_rows(
    df: &DataFrame,
    flagged: Vec<(usize, f64)>,
    annotation: FlagColumn,
) -> Result<DataFrame> {
    let (indices, values): (Vec<IdxSize>, Vec<f64>) = flagged
        .into_iter()
        .map(|(idx, value)| (idx as IdxSize, value))
        .unzip();

    let mut output = df.take(&IdxCa::from_vec("idx".into(), indices))?;
    output.with_column(Series::new(annotation.canonical_name().into(), values))?;
    Ok(output)
}

/// Rows whose water depth moved by more than the shift threshold since the previous row.
///
/// The frame is expected in timestamp order. The first row has no predecessor and is never
/// flagged; a null depth on either side of a step is skipped.
pub fn flag_shifts(merged: &DataFrame, config: &QaqcConfig) -> Result<DataFrame> {
    let depth = require_column(merged, MergedColumn::WaterDepth)?.f64()?;
    let threshold = config.shift_threshold();

    let mut flagged = Vec::new();
    for idx in 1..merged.height() {
        if let (Some(previous), Some(current)) = (depth.get(idx - 1), depth.get(idx)) {
            let change = (current - previous).abs();
            if change > threshold {
                flagged.push((idx, change));
            }
        }
    }

    debug!(flagged = flagged.len(), threshold, "depth shift screening");
    flagged_rows(merged, flagged, FlagColumn::DepthChange)
}

/// Rows whose water temperature exceeds the configured ceiling.
///
/// A disabled check, or a frame without water temperatures, yields an empty frame with the
/// input's columns.
pub fn flag_temperature(merged: &DataFrame, config: &QaqcConfig) -> Result<DataFrame> {
    let threshold = match config.temperature_check() {
        TemperatureCheck::Disabled => return Ok(merged.clear()),
        TemperatureCheck::Enabled(threshold) => threshold,
    };
    let Ok(temperature) = merged.column(MergedColumn::WaterTemperature.canonical_name()) else {
        return Ok(merged.clear());
    };
    let temperature = temperature.f64()?;

    let flagged: Vec<(usize, f64)> = temperature
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| {
            value
                .filter(|value| *value > threshold)
                .map(|value| (idx, value - threshold))
        })
        .collect();

    debug!(flagged = flagged.len(), threshold, "temperature screening");
    flagged_rows(merged, flagged, FlagColumn::TemperatureExcess)
}
