use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use polars::prelude::*;

use crate::error::Result;
use crate::schema::{has_column, require_column, MergedColumn, SummaryColumn};
use crate::timestamps::naive_from_micros;

#[derive(Debug, Clone)]
pub struct Summaries {
    pub daily: DataFrame,
    pub weekly: DataFrame,
}

/// Last day (Sunday) of the Monday-to-Sunday week containing `date`.
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    let days_to_sunday = 6 - i64::from(date.weekday().num_days_from_monday());
    date + Duration::days(days_to_sunday)
}

struct GroupAccumulator {
    rows: u32,
    sums: Vec<f64>,
    counts: Vec<u32>,
}

impl GroupAccumulator {
    fn new(width: usize) -> Self {
        Self {
            rows: 0,
            sums: vec![0.0; width],
            counts: vec![0; width],
        }
    }
}

/// Daily and weekly means of every numeric column of a merged frame.
///
/// Periods without rows are omitted rather than filled.
pub fn summarise(merged: &DataFrame) -> Result<Summaries> {
    Ok(Summaries {
        daily: summarise_by(merged, SummaryColumn::Date, |date| date)?,
        weekly: summarise_by(merged, SummaryColumn::WeekEnding, week_ending)?,
    })
}

fn summarise_by<F>(merged: &DataFrame, key: SummaryColumn, period_of: F) -> Result<DataFrame>
where
    F: Fn(NaiveDate) -> NaiveDate,
{
    let timestamps = require_column(merged, MergedColumn::Timestamp)?.datetime()?;

    let numeric: Vec<MergedColumn> = MergedColumn::NUMERIC
        .into_iter()
        .filter(|column| has_column(merged, *column))
        .collect();
    let mut values: Vec<&Float64Chunked> = Vec::with_capacity(numeric.len());
    for column in &numeric {
        values.push(require_column(merged, *column)?.f64()?);
    }

    let mut groups: BTreeMap<NaiveDate, GroupAccumulator> = BTreeMap::new();
    for idx in 0..merged.height() {
        let Some(date) = timestamps
            .get(idx)
            .and_then(naive_from_micros)
            .map(|ts| period_of(ts.date()))
        else {
            continue;
        };

        let group = groups
            .entry(date)
            .or_insert_with(|| GroupAccumulator::new(values.len()));
        group.rows += 1;
        for (slot, ca) in values.iter().enumerate() {
            if let Some(value) = ca.get(idx) {
                group.sums[slot] += value;
                group.counts[slot] += 1;
            }
        }
    }

    let epoch = NaiveDate::default();
    let keys: Vec<i32> = groups
        .keys()
        .map(|date| (*date - epoch).num_days() as i32)
        .collect();
    let sample_counts: Vec<u32> = groups.values().map(|group| group.rows).collect();

    let mut columns: Vec<Column> = vec![
        Series::new(key.canonical_name().into(), keys)
            .cast(&DataType::Date)?
            .into(),
        Series::new(SummaryColumn::SampleCount.canonical_name().into(), sample_counts).into(),
    ];

    for (slot, column) in numeric.iter().enumerate() {
        let means: Vec<Option<f64>> = groups
            .values()
            .map(|group| {
                let count = group.counts[slot];
                (count > 0).then(|| group.sums[slot] / f64::from(count))
            })
            .collect();
        columns.push(Series::new(column.canonical_name().into(), means).into());
    }

    Ok(DataFrame::new(columns)?)
}
