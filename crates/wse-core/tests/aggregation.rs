use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

use wse_core::aggregation::{summarise, week_ending};
use wse_core::timestamps::naive_to_micros;
use wse_core::WseError;

fn ts(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn merged(rows: &[(NaiveDateTime, f64, Option<f64>)]) -> PolarsResult<DataFrame> {
    let timestamps: Vec<i64> = rows.iter().map(|(t, _, _)| naive_to_micros(*t)).collect();
    let depth: Vec<f64> = rows.iter().map(|(_, d, _)| *d).collect();
    let temperature: Vec<Option<f64>> = rows.iter().map(|(_, _, t)| *t).collect();

    DataFrame::new(vec![
        Series::new("timestamp".into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
            .into(),
        Series::new("water_depth_m".into(), depth.clone()).into(),
        Series::new(
            "water_surface_elevation".into(),
            depth.iter().map(|d| d + 100.0).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("water_temperature".into(), temperature).into(),
    ])
}

fn dates(df: &DataFrame, column: &str) -> PolarsResult<Vec<NaiveDate>> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    Ok(df
        .column(column)?
        .date()?
        .into_no_null_iter()
        .map(|days| epoch + chrono::Duration::days(i64::from(days)))
        .collect())
}

#[test]
fn week_ending_is_the_following_sunday() {
    // 2024-06-03 is a Monday.
    let sunday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
    for day in 3..=9 {
        let date = NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        assert_eq!(week_ending(date), sunday, "{date}");
    }
    let next_monday = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
    assert_eq!(
        week_ending(next_monday),
        NaiveDate::from_ymd_opt(2024, 6, 16).unwrap()
    );
}

#[test]
fn daily_means_per_calendar_day() -> PolarsResult<()> {
    let df = merged(&[
        (ts(3, 0), 1.0, Some(10.0)),
        (ts(3, 12), 2.0, None),
        (ts(4, 6), 4.0, Some(12.0)),
    ])?;
    let summaries = summarise(&df).unwrap();

    assert_eq!(
        summaries.daily.get_column_names_str(),
        vec![
            "date",
            "sample_count",
            "water_depth_m",
            "water_surface_elevation",
            "water_temperature"
        ]
    );
    assert_eq!(
        dates(&summaries.daily, "date")?,
        vec![
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 4).unwrap()
        ]
    );

    let counts: Vec<u32> = summaries
        .daily
        .column("sample_count")?
        .u32()?
        .into_no_null_iter()
        .collect();
    assert_eq!(counts, vec![2, 1]);

    let depth = summaries.daily.column("water_depth_m")?.f64()?;
    assert_eq!(depth.get(0), Some(1.5));
    assert_eq!(depth.get(1), Some(4.0));

    // Nulls are left out of the mean rather than counted as zero.
    let temperature = summaries.daily.column("water_temperature")?.f64()?;
    assert_eq!(temperature.get(0), Some(10.0));
    Ok(())
}

#[test]
fn gaps_are_not_filled() -> PolarsResult<()> {
    let df = merged(&[(ts(3, 0), 1.0, None), (ts(20, 0), 3.0, None)])?;
    let summaries = summarise(&df).unwrap();

    assert_eq!(summaries.daily.height(), 2);
    assert_eq!(
        dates(&summaries.weekly, "week_ending")?,
        vec![
            NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 23).unwrap()
        ]
    );
    // An all-null column still averages to null.
    assert_eq!(summaries.weekly.column("water_temperature")?.null_count(), 2);
    Ok(())
}

#[test]
fn weekly_mean_matches_weighted_daily_means() -> PolarsResult<()> {
    let df = merged(&[
        (ts(3, 0), 1.0, None),
        (ts(3, 1), 2.0, None),
        (ts(3, 2), 3.0, None),
        (ts(5, 0), 10.0, None),
        (ts(9, 23), 6.0, None),
    ])?;
    let summaries = summarise(&df).unwrap();
    assert_eq!(summaries.weekly.height(), 1);

    let counts: Vec<f64> = summaries
        .daily
        .column("sample_count")?
        .u32()?
        .into_no_null_iter()
        .map(f64::from)
        .collect();
    let means: Vec<f64> = summaries
        .daily
        .column("water_depth_m")?
        .f64()?
        .into_no_null_iter()
        .collect();
    let weighted = counts.iter().zip(&means).map(|(c, m)| c * m).sum::<f64>()
        / counts.iter().sum::<f64>();

    let weekly = summaries
        .weekly
        .column("water_depth_m")?
        .f64()?
        .get(0)
        .unwrap();
    assert!((weekly - weighted).abs() < 1e-12);
    assert!((weekly - 22.0 / 5.0).abs() < 1e-12);
    Ok(())
}

#[test]
fn empty_frame_yields_empty_summaries() -> PolarsResult<()> {
    let df = merged(&[])?;
    let summaries = summarise(&df).unwrap();
    assert_eq!(summaries.daily.height(), 0);
    assert_eq!(summaries.weekly.height(), 0);
    assert!(summaries.weekly.column("week_ending").is_ok());
    Ok(())
}

#[test]
fn missing_timestamp_is_an_error() -> PolarsResult<()> {
    let df = df!("water_depth_m" => &[1.0f64])?;
    let err = summarise(&df).unwrap_err();
    assert!(matches!(err, WseError::MissingColumn(name) if name == "timestamp"));
    Ok(())
}
