use chrono::offset::LocalResult;
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone as _, Timelike, Utc,
};
use chrono_tz::Tz;
use polars::prelude::*;

use crate::error::Result;

const MAX_GAP_MINUTES: i64 = 24 * 60;

// Two-digit year layouts come first: `%Y` would also accept "24" as year 0024.
static DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

static DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%y", "%m/%d/%Y"];

/// A parsed sample time: the instant used for alignment and the wall-clock value reported
/// in output tables. Both are microseconds; without a timezone they coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleTime {
    pub instant_micros: i64,
    pub wall_micros: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RawTimestamp {
    Naive(NaiveDateTime),
    Offset(DateTime<FixedOffset>),
    Utc(DateTime<Utc>),
}

/// Parses a raw timestamp column of any supported dtype. Values that cannot be parsed or
/// localized are returned as `None`.
///
/// Offset-carrying values that land in a DST fold of `timezone` keep distinct instants but
/// share one wall-clock value, so they collapse to a single row once merged with history.
pub fn parse_timestamp_column(column: &Column, timezone: Option<Tz>) -> Result<Vec<Option<SampleTime>>> {
    let raw = raw_timestamps(column)?;
    Ok(raw
        .into_iter()
        .map(|value| value.and_then(|raw| resolve(raw, timezone)))
        .collect())
}

fn raw_timestamps(column: &Column) -> Result<Vec<Option<RawTimestamp>>> {
    let dtype = column.dtype().clone();
    let values = match dtype {
        DataType::Datetime(unit, tz) => {
            let physical = column.cast(&DataType::Int64)?;
            let physical = physical.i64()?;
            physical
                .into_iter()
                .map(|value| {
                    let micros = value.map(|v| match unit {
                        TimeUnit::Nanoseconds => v.div_euclid(1_000),
                        TimeUnit::Microseconds => v,
                        TimeUnit::Milliseconds => v * 1_000,
                    })?;
                    let naive = naive_from_micros(micros)?;
                    Some(if tz.is_some() {
                        RawTimestamp::Utc(naive.and_utc())
                    } else {
                        RawTimestamp::Naive(naive)
                    })
                })
                .collect()
        }
        DataType::Date => {
            let days = column.cast(&DataType::Int32)?;
            days.i32()?
                .into_iter()
                .map(|value| {
                    let date = NaiveDate::from_ymd_opt(1970, 1, 1)?
                        .checked_add_signed(Duration::days(i64::from(value?)))?;
                    date.and_hms_opt(0, 0, 0).map(RawTimestamp::Naive)
                })
                .collect()
        }
        DataType::String => column
            .str()?
            .into_iter()
            .map(|value| value.and_then(parse_timestamp_text))
            .collect(),
        ref other if other.is_integer() || other.is_float() => {
            let seconds = column.cast(&DataType::Float64)?;
            seconds
                .f64()?
                .into_iter()
                .map(|value| {
                    let seconds = value.filter(|v| v.is_finite())?;
                    let micros = (seconds * 1_000_000.0).round() as i64;
                    DateTime::<Utc>::from_timestamp_micros(micros).map(RawTimestamp::Utc)
                })
                .collect()
        }
        _ => {
            let text = column.cast(&DataType::String)?;
            text.str()?
                .into_iter()
                .map(|value| value.and_then(parse_timestamp_text))
                .collect()
        }
    };
    Ok(values)
}

fn parse_timestamp_text(value: &str) -> Option<RawTimestamp> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(RawTimestamp::Offset(dt));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(RawTimestamp::Naive(dt));
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.and_hms_opt(0, 0, 0).map(RawTimestamp::Naive);
        }
    }

    None
}

fn resolve(raw: RawTimestamp, timezone: Option<Tz>) -> Option<SampleTime> {
    match (raw, timezone) {
        (RawTimestamp::Naive(naive), None) => {
            let micros = naive_to_micros(naive);
            Some(SampleTime {
                instant_micros: micros,
                wall_micros: micros,
            })
        }
        (RawTimestamp::Naive(naive), Some(tz)) => {
            let local = localize(naive, tz)?;
            Some(SampleTime {
                instant_micros: local.timestamp_micros(),
                wall_micros: naive_to_micros(local.naive_local()),
            })
        }
        (RawTimestamp::Offset(dt), tz) => resolve(RawTimestamp::Utc(dt.with_timezone(&Utc)), tz),
        (RawTimestamp::Utc(dt), None) => {
            let micros = dt.timestamp_micros();
            Some(SampleTime {
                instant_micros: micros,
                wall_micros: micros,
            })
        }
        (RawTimestamp::Utc(dt), Some(tz)) => {
            let local = dt.with_timezone(&tz);
            Some(SampleTime {
                instant_micros: dt.timestamp_micros(),
                wall_micros: naive_to_micros(local.naive_local()),
            })
        }
    }
}

/// Attaches `tz` to a wall-clock time. Ambiguous times (DST fold) yield `None`; times
/// inside a DST gap move forward to the first valid minute after the gap.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(_, _) => None,
        LocalResult::None => shift_forward(naive, tz),
    }
}

fn shift_forward(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    let mut candidate = naive.with_second(0)?.with_nanosecond(0)?;
    for _ in 0..MAX_GAP_MINUTES {
        candidate += Duration::minutes(1);
        if let LocalResult::Single(dt) = tz.from_local_datetime(&candidate) {
            return Some(dt);
        }
    }
    None
}

pub fn naive_from_micros(value: i64) -> Option<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp_micros(value).map(|dt| dt.naive_utc())
}

pub fn naive_to_micros(value: NaiveDateTime) -> i64 {
    value.and_utc().timestamp_micros()
}

/// Builds a naive microsecond `Datetime` series from wall-clock values.
pub(crate) fn datetime_series(name: &str, values: Vec<Option<i64>>) -> Result<Series> {
    let series = Series::new(name.into(), values)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    Ok(series)
}
