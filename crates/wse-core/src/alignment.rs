use polars::prelude::*;
use tracing::{debug, warn};

use crate::config::{ColumnMapping, ProcessingConfig};
use crate::error::{Result, WseError};
use crate::schema::MergedColumn;
use crate::timestamps::{datetime_series, parse_timestamp_column, SampleTime};

/// A raw sensor table together with the names of its reading columns.
#[derive(Debug, Clone, Copy)]
pub struct SensorSeries<'a> {
    pub frame: &'a DataFrame,
    pub columns: &'a ColumnMapping,
}

impl<'a> SensorSeries<'a> {
    pub fn new(frame: &'a DataFrame, columns: &'a ColumnMapping) -> Self {
        Self { frame, columns }
    }
}

#[derive(Debug, Clone)]
pub struct Alignment {
    pub frame: DataFrame,
    pub input_rows: usize,
    pub dropped_rows: usize,
}

struct Readings {
    times: Vec<Option<SampleTime>>,
    pressure: Float64Chunked,
    temperature: Option<Float64Chunked>,
}

impl Readings {
    fn load(series: SensorSeries<'_>, config: &ProcessingConfig) -> Result<Self> {
        let mapping = series.columns;
        let times = parse_timestamp_column(
            raw_column(series.frame, &mapping.timestamp)?,
            config.timezone(),
        )?;
        let pressure = numeric_column(series.frame, &mapping.pressure)?;
        let temperature = mapping
            .temperature
            .as_deref()
            .map(|name| numeric_column(series.frame, name))
            .transpose()?;

        Ok(Self {
            times,
            pressure,
            temperature,
        })
    }

    /// Row indices with a parsed timestamp, stable-sorted by instant.
    fn sorted_rows(&self) -> Vec<(SampleTime, usize)> {
        let mut rows: Vec<(SampleTime, usize)> = self
            .times
            .iter()
            .enumerate()
            .filter_map(|(idx, time)| time.map(|t| (t, idx)))
            .collect();
        rows.sort_by_key(|(time, _)| time.instant_micros);
        rows
    }
}

fn raw_column<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a Column> {
    frame
        .column(name)
        .map_err(|_| WseError::MissingColumn(name.to_string()))
}

fn numeric_column(frame: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let casted = raw_column(frame, name)?.cast(&DataType::Float64)?;
    Ok(casted.f64()?.clone())
}

/// Merges the barometric series onto the water series by nearest timestamp.
///
/// Every water row is matched against the closest barometric sample (earlier sample on an
/// exact tie). Matches farther apart than the merge tolerance are discarded, and rows left
/// without a timestamp, water pressure or barometric pressure are dropped.
pub fn align_series(
    water: SensorSeries<'_>,
    barometric: SensorSeries<'_>,
    config: &ProcessingConfig,
) -> Result<Alignment> {
    let water_readings = Readings::load(water, config)?;
    let baro_readings = Readings::load(barometric, config)?;

    let water_rows = water_readings.sorted_rows();
    let baro_rows = baro_readings.sorted_rows();
    let tolerance = config
        .merge_tolerance()
        .num_microseconds()
        .unwrap_or(i64::MAX);

    let capacity = water_rows.len();
    let mut timestamps = Vec::with_capacity(capacity);
    let mut water_pressure = Vec::with_capacity(capacity);
    let mut baro_pressure = Vec::with_capacity(capacity);
    let mut water_temperature = Vec::with_capacity(capacity);
    let mut air_temperature = Vec::with_capacity(capacity);

    let mut unmatched = 0usize;
    let mut cursor = 0usize;

    for (time, water_idx) in &water_rows {
        let target = time.instant_micros;
        while cursor < baro_rows.len() && baro_rows[cursor].0.instant_micros <= target {
            cursor += 1;
        }

        let backward = cursor.checked_sub(1).map(|idx| {
            let (candidate, row) = &baro_rows[idx];
            (target.saturating_sub(candidate.instant_micros), *row)
        });
        let forward = baro_rows
            .get(cursor)
            .map(|(candidate, idx)| (candidate.instant_micros.saturating_sub(target), *idx));

        let nearest = match (backward, forward) {
            (Some(back), Some(fwd)) => Some(if back.0 <= fwd.0 { back } else { fwd }),
            (Some(back), None) => Some(back),
            (None, fwd) => fwd,
        };

        let Some(baro_idx) = nearest
            .filter(|(distance, _)| *distance <= tolerance)
            .map(|(_, idx)| idx)
        else {
            unmatched += 1;
            continue;
        };

        let (Some(water_value), Some(baro_value)) = (
            water_readings.pressure.get(*water_idx),
            baro_readings.pressure.get(baro_idx),
        ) else {
            continue;
        };

        timestamps.push(Some(time.wall_micros));
        water_pressure.push(water_value);
        baro_pressure.push(baro_value);
        water_temperature.push(
            water_readings
                .temperature
                .as_ref()
                .and_then(|ca| ca.get(*water_idx)),
        );
        air_temperature.push(
            baro_readings
                .temperature
                .as_ref()
                .and_then(|ca| ca.get(baro_idx)),
        );
    }

    let mut columns: Vec<Column> = vec![
        datetime_series(MergedColumn::Timestamp.canonical_name(), timestamps)?.into(),
        Series::new(
            MergedColumn::WaterPressure.canonical_name().into(),
            water_pressure,
        )
        .into(),
        Series::new(
            MergedColumn::BarometricPressure.canonical_name().into(),
            baro_pressure,
        )
        .into(),
    ];
    if water_readings.temperature.is_some() {
        columns.push(
            Series::new(
                MergedColumn::WaterTemperature.canonical_name().into(),
                water_temperature,
            )
            .into(),
        );
    }
    if baro_readings.temperature.is_some() {
        columns.push(
            Series::new(
                MergedColumn::AirTemperature.canonical_name().into(),
                air_temperature,
            )
            .into(),
        );
    }

    let frame = DataFrame::new(columns)?;
    let input_rows = water.frame.height();
    let dropped_rows = input_rows - frame.height();

    debug!(
        water_rows = input_rows,
        barometric_rows = barometric.frame.height(),
        matched = frame.height(),
        outside_tolerance = unmatched,
        "aligned water and barometric series"
    );
    if dropped_rows > 0 {
        warn!(
            dropped_rows,
            "water rows dropped during alignment (unparseable time, missing pressure or no barometric sample within tolerance)"
        );
    }

    Ok(Alignment {
        frame,
        input_rows,
        dropped_rows,
    })
}
