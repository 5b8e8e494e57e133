use chrono::Duration;
use polars::prelude::*;

use wse_core::alignment::SensorSeries;
use wse_core::export::{
    read_parquet, truncate_sheet_name, write_manifest, CsvDirectorySink, ExportSink,
    ParquetDirectorySink, MANIFEST_FILE,
};
use wse_core::pipeline::{
    COMBINED_SHEET, DAILY_SHEET, DEPTH_FLAGS_SHEET, TEMPERATURE_FLAGS_SHEET, WEEKLY_SHEET,
};
use wse_core::{
    process, ColumnMapping, PipelineInputs, ProcessingConfig, ProcessingReport, PressureUnit,
    QaqcConfig, TemperatureCheck,
};

fn water_table() -> PolarsResult<DataFrame> {
    df!(
        "Date Time, GMT-05:00" => &[
            "06/01/24 12:00:00 PM",
            "06/01/24 12:15:00 PM",
            "06/01/24 12:30:00 PM",
            "06/03/24 08:00:00 AM",
        ],
        "Abs Pres, kPa" => &["101.6", "101.7", "105.0", "101.8"],
        "Temp, °C" => &["18.0", "18.5", "26.0", "19.0"],
    )
}

fn baro_table() -> PolarsResult<DataFrame> {
    df!(
        "Timestamp" => &[
            "2024-06-01 12:00:00",
            "2024-06-01 12:15:00",
            "2024-06-01 12:30:00",
            "2024-06-03 08:05:00",
        ],
        "Barometric Pressure (kPa)" => &["101.3", "101.3", "101.3", "101.3"],
    )
}

fn run(history: Option<&DataFrame>) -> ProcessingReport {
    let water = water_table().unwrap();
    let baro = baro_table().unwrap();
    let water_columns =
        ColumnMapping::new("Date Time, GMT-05:00", "Abs Pres, kPa").with_temperature("Temp, °C");
    let baro_columns = ColumnMapping::new("Timestamp", "Barometric Pressure (kPa)");

    let config =
        ProcessingConfig::new(100.0, 1000.0, PressureUnit::Kpa, None, Duration::minutes(15))
            .unwrap();
    let qaqc = QaqcConfig::new(0.15, TemperatureCheck::Enabled(25.0)).unwrap();

    process(
        PipelineInputs {
            water: SensorSeries::new(&water, &water_columns),
            barometric: SensorSeries::new(&baro, &baro_columns),
            history,
        },
        &config,
        &qaqc,
    )
    .unwrap()
}

#[test]
fn processes_a_fresh_record_end_to_end() -> PolarsResult<()> {
    let report = run(None);

    assert_eq!(report.stats.water_rows, 4);
    assert_eq!(report.stats.computed_rows, 4);
    assert_eq!(report.stats.dropped_in_alignment, 0);
    assert_eq!(report.stats.history_rows, 0);
    assert_eq!(report.stats.combined_rows, 4);
    assert_eq!(report.stats.daily_rows, 2);
    assert_eq!(report.stats.weekly_rows, 2);

    let wse = report.combined.column("water_surface_elevation")?.f64()?;
    assert!((wse.get(0).unwrap() - 100.0306).abs() < 1e-4);
    assert!((wse.get(1).unwrap() - 100.0408).abs() < 1e-4);

    // 101.7 -> 105.0 kPa is a jump of ~0.34 m, and the return to 101.8 another.
    assert_eq!(report.depth_flags.height(), 2);
    assert_eq!(report.temperature_flags.height(), 1);
    assert_eq!(
        report.temperature_flags.column("water_temperature")?.f64()?.get(0),
        Some(26.0)
    );
    Ok(())
}

#[test]
fn sheets_are_listed_in_report_order() {
    let report = run(None);
    let names: Vec<&str> = report.sheets().iter().map(|sheet| sheet.name).collect();
    assert_eq!(
        names,
        vec![
            COMBINED_SHEET,
            DAILY_SHEET,
            WEEKLY_SHEET,
            DEPTH_FLAGS_SHEET,
            TEMPERATURE_FLAGS_SHEET
        ]
    );
}

#[test]
fn history_is_merged_before_summaries() -> PolarsResult<()> {
    let first = run(None);
    let second = run(Some(&first.combined));

    assert_eq!(second.stats.history_rows, 4);
    assert_eq!(second.stats.replaced_history_rows, 4);
    assert_eq!(second.combined.height(), 4);
    assert!(second.combined.equals_missing(&first.combined));
    Ok(())
}

#[test]
fn empty_history_is_ignored() {
    let history = run(None).combined.clear();
    let report = run(Some(&history));
    assert_eq!(report.stats.history_rows, 0);
    assert_eq!(report.combined.height(), 4);
}

#[test]
fn csv_sink_writes_one_file_per_sheet() -> Result<(), Box<dyn std::error::Error>> {
    let report = run(None);
    let dir = tempfile::tempdir()?;

    let written = CsvDirectorySink::new(dir.path()).write_sheets(&report.sheets())?;
    assert_eq!(written.len(), 5);
    assert!(written.iter().all(|path| path.exists()));

    let combined = std::fs::read_to_string(dir.path().join("combined_timeseries.csv"))?;
    let mut lines = combined.lines();
    assert_eq!(
        lines.next(),
        Some("timestamp,water_pressure,barometric_pressure,gauge_pressure,water_depth_m,water_surface_elevation,water_temperature")
    );
    assert!(lines.next().unwrap().starts_with("2024-06-01T12:00:00,101.6,101.3,"));
    assert_eq!(lines.count(), 3);

    let daily = std::fs::read_to_string(dir.path().join("daily_summary.csv"))?;
    let mut daily_lines = daily.lines();
    assert_eq!(
        daily_lines.next(),
        Some("date,sample_count,water_pressure,barometric_pressure,gauge_pressure,water_depth_m,water_surface_elevation,water_temperature")
    );
    let first_day: Vec<&str> = daily_lines.next().unwrap().split(',').collect();
    assert_eq!(&first_day[..2], &["2024-06-01", "3"]);
    let mean = |idx: usize| first_day[idx].parse::<f64>().unwrap();
    assert!((mean(2) - (101.6 + 101.7 + 105.0) / 3.0).abs() < 1e-9);
    assert!((mean(3) - 101.3).abs() < 1e-9);
    assert!((mean(4) - (0.3 + 0.4 + 3.7) / 3.0).abs() < 1e-9);
    assert!((mean(7) - (18.0 + 18.5 + 26.0) / 3.0).abs() < 1e-9);

    let flags = std::fs::read_to_string(dir.path().join("qaqc_temperature_flags.csv"))?;
    assert!(flags.lines().next().unwrap().ends_with("temperature_excess"));
    Ok(())
}

#[test]
fn parquet_sink_round_trips_the_combined_sheet() -> Result<(), Box<dyn std::error::Error>> {
    let report = run(None);
    let dir = tempfile::tempdir()?;

    let written = ParquetDirectorySink::new(dir.path()).write_sheets(&report.sheets())?;
    let restored = read_parquet(&written[0])?;
    assert!(restored.equals_missing(&report.combined));

    let manifest = write_manifest(dir.path(), &report.stats)?;
    assert_eq!(manifest, dir.path().join(MANIFEST_FILE));
    let stats: serde_json::Value = serde_json::from_slice(&std::fs::read(manifest)?)?;
    assert_eq!(stats["combined_rows"], 4);
    Ok(())
}

#[test]
fn long_sheet_names_are_truncated() {
    let name = "a_very_long_quality_control_sheet_name";
    assert_eq!(truncate_sheet_name(name).chars().count(), 31);
    assert_eq!(truncate_sheet_name(DEPTH_FLAGS_SHEET), DEPTH_FLAGS_SHEET);
}
