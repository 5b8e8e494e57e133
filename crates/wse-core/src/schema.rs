use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::Serialize;

use crate::error::{Result, WseError};
use crate::timestamps::naive_from_micros;

/// Columns of the merged water/barometric record, in canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergedColumn {
    Timestamp,
    WaterPressure,
    BarometricPressure,
    GaugePressure,
    WaterDepth,
    WaterSurfaceElevation,
    WaterTemperature,
    AirTemperature,
}

impl MergedColumn {
    pub const ALL: [MergedColumn; 8] = [
        MergedColumn::Timestamp,
        MergedColumn::WaterPressure,
        MergedColumn::BarometricPressure,
        MergedColumn::GaugePressure,
        MergedColumn::WaterDepth,
        MergedColumn::WaterSurfaceElevation,
        MergedColumn::WaterTemperature,
        MergedColumn::AirTemperature,
    ];

    /// Every column that is averaged by the periodic summaries.
    pub const NUMERIC: [MergedColumn; 7] = [
        MergedColumn::WaterPressure,
        MergedColumn::BarometricPressure,
        MergedColumn::GaugePressure,
        MergedColumn::WaterDepth,
        MergedColumn::WaterSurfaceElevation,
        MergedColumn::WaterTemperature,
        MergedColumn::AirTemperature,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            MergedColumn::Timestamp => "timestamp",
            MergedColumn::WaterPressure => "water_pressure",
            MergedColumn::BarometricPressure => "barometric_pressure",
            MergedColumn::GaugePressure => "gauge_pressure",
            MergedColumn::WaterDepth => "water_depth_m",
            MergedColumn::WaterSurfaceElevation => "water_surface_elevation",
            MergedColumn::WaterTemperature => "water_temperature",
            MergedColumn::AirTemperature => "air_temperature",
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            MergedColumn::WaterTemperature | MergedColumn::AirTemperature
        )
    }
}

/// Annotation columns appended by the QA/QC detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagColumn {
    DepthChange,
    TemperatureExcess,
}

impl FlagColumn {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            FlagColumn::DepthChange => "depth_change",
            FlagColumn::TemperatureExcess => "temperature_excess",
        }
    }
}

/// Key columns of the daily and weekly summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummaryColumn {
    Date,
    WeekEnding,
    SampleCount,
}

impl SummaryColumn {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            SummaryColumn::Date => "date",
            SummaryColumn::WeekEnding => "week_ending",
            SummaryColumn::SampleCount => "sample_count",
        }
    }
}

pub(crate) fn has_column(df: &DataFrame, column: MergedColumn) -> bool {
    df.column(column.canonical_name()).is_ok()
}

pub(crate) fn require_column(df: &DataFrame, column: MergedColumn) -> Result<&Column> {
    df.column(column.canonical_name())
        .map_err(|_| WseError::MissingColumn(column.canonical_name().to_string()))
}

/// Names of the merged columns present in `df`, in canonical order.
pub(crate) fn present_columns(df: &DataFrame) -> Vec<&'static str> {
    MergedColumn::ALL
        .iter()
        .filter(|column| has_column(df, **column))
        .map(|column| column.canonical_name())
        .collect()
}

/// One row of a merged frame, read back into a typed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub timestamp: NaiveDateTime,
    pub water_pressure: f64,
    pub barometric_pressure: f64,
    pub gauge_pressure: f64,
    pub water_depth_m: f64,
    pub water_surface_elevation: f64,
    pub water_temperature: Option<f64>,
    pub air_temperature: Option<f64>,
}

impl MergedRecord {
    /// Reads every fully-populated row of a merged frame. Rows with a null in a required
    /// column are skipped.
    pub fn from_frame(df: &DataFrame) -> Result<Vec<MergedRecord>> {
        Ok(Self::from_frame_indexed(df)?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    /// Like [`MergedRecord::from_frame`], keeping each record's row index.
    pub fn from_frame_indexed(df: &DataFrame) -> Result<Vec<(usize, MergedRecord)>> {
        let timestamp = require_column(df, MergedColumn::Timestamp)?.datetime()?;
        let water = require_column(df, MergedColumn::WaterPressure)?.f64()?;
        let baro = require_column(df, MergedColumn::BarometricPressure)?.f64()?;
        let gauge = require_column(df, MergedColumn::GaugePressure)?.f64()?;
        let depth = require_column(df, MergedColumn::WaterDepth)?.f64()?;
        let wse = require_column(df, MergedColumn::WaterSurfaceElevation)?.f64()?;
        let water_temp = optional_f64(df, MergedColumn::WaterTemperature)?;
        let air_temp = optional_f64(df, MergedColumn::AirTemperature)?;

        let mut records = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            let (Some(ts), Some(water), Some(baro), Some(gauge), Some(depth), Some(wse)) = (
                timestamp.get(idx),
                water.get(idx),
                baro.get(idx),
                gauge.get(idx),
                depth.get(idx),
                wse.get(idx),
            ) else {
                continue;
            };
            let Some(timestamp) = naive_from_micros(ts) else {
                continue;
            };

            records.push((idx, MergedRecord {
                timestamp,
                water_pressure: water,
                barometric_pressure: baro,
                gauge_pressure: gauge,
                water_depth_m: depth,
                water_surface_elevation: wse,
                water_temperature: water_temp.and_then(|ca| ca.get(idx)),
                air_temperature: air_temp.and_then(|ca| ca.get(idx)),
            }));
        }

        Ok(records)
    }
}

fn optional_f64(df: &DataFrame, column: MergedColumn) -> Result<Option<&Float64Chunked>> {
    match df.column(column.canonical_name()) {
        Ok(col) => Ok(Some(col.f64()?)),
        Err(_) => Ok(None),
    }
}
