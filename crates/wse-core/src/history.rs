use std::collections::HashMap;

use polars::prelude::*;
use tracing::debug;

use crate::error::{Result, WseError};
use crate::schema::{has_column, present_columns, require_column, MergedColumn};
use crate::timestamps::{datetime_series, parse_timestamp_column};

#[derive(Debug, Clone)]
pub struct Combined {
    pub frame: DataFrame,
    pub history_rows: usize,
    pub replaced_rows: usize,
}

/// Coerces a previously exported table back into the merged schema.
///
/// Timestamps are re-parsed as wall-clock values, reading columns are cast to `Float64`
/// and columns outside the schema are dropped.
pub fn conform_to_schema(table: &DataFrame) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::new();

    for column in MergedColumn::ALL {
        let name = column.canonical_name();
        let Ok(raw) = table.column(name) else {
            if column.is_optional() {
                continue;
            }
            return Err(WseError::MissingColumn(name.to_string()));
        };

        if column == MergedColumn::Timestamp {
            let wall: Vec<Option<i64>> = parse_timestamp_column(raw, None)?
                .into_iter()
                .map(|time| time.map(|t| t.wall_micros))
                .collect();
            columns.push(datetime_series(name, wall)?.into());
        } else {
            columns.push(raw.cast(&DataType::Float64)?);
        }
    }

    Ok(DataFrame::new(columns)?)
}

fn with_optional_columns(frame: DataFrame, other: &DataFrame) -> Result<DataFrame> {
    let mut frame = frame;
    for column in [MergedColumn::WaterTemperature, MergedColumn::AirTemperature] {
        if has_column(other, column) && !has_column(&frame, column) {
            let nulls = Series::full_null(
                column.canonical_name().into(),
                frame.height(),
                &DataType::Float64,
            );
            frame.with_column(nulls)?;
        }
    }
    let ordered = present_columns(&frame);
    Ok(frame.select(ordered)?)
}

/// Appends freshly computed rows to a historical table.
///
/// Rows sharing a timestamp keep the later occurrence, so fresh data replaces history.
/// Timestamps are wall-clock values: two instants an hour apart inside a DST fold compare
/// equal here.
/// The result is sorted ascending by timestamp.
pub fn combine_with_history(history: &DataFrame, fresh: &DataFrame) -> Result<Combined> {
    let history = conform_to_schema(history)?;
    let fresh = conform_to_schema(fresh)?;

    let history = with_optional_columns(history, &fresh)?;
    let fresh = with_optional_columns(fresh, &history)?;
    let history_rows = history.height();

    let stacked = history.vstack(&fresh)?;
    let timestamps = require_column(&stacked, MergedColumn::Timestamp)?.datetime()?;

    let mut last_seen: HashMap<i64, usize> = HashMap::with_capacity(stacked.height());
    for idx in 0..stacked.height() {
        if let Some(ts) = timestamps.get(idx) {
            last_seen.insert(ts, idx);
        }
    }

    let mut keep: Vec<(i64, usize)> = last_seen.into_iter().collect();
    keep.sort_by_key(|(ts, idx)| (*ts, *idx));

    let null_timestamps = timestamps.null_count();
    let replaced_rows = stacked.height() - null_timestamps - keep.len();

    let indices: Vec<IdxSize> = keep.into_iter().map(|(_, idx)| idx as IdxSize).collect();
    let frame = stacked.take(&IdxCa::from_vec("idx".into(), indices))?;

    debug!(
        history_rows,
        fresh_rows = fresh.height(),
        replaced_rows,
        combined_rows = frame.height(),
        "combined fresh record with history"
    );

    Ok(Combined {
        frame,
        history_rows,
        replaced_rows,
    })
}
