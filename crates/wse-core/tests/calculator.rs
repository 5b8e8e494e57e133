use chrono::{Duration, NaiveDate};
use polars::prelude::*;

use wse_core::calculator::{compute_wse, gauge_to_depth, GRAVITY_M_S2};
use wse_core::timestamps::naive_to_micros;
use wse_core::{MergedRecord, ProcessingConfig, PressureUnit, WseError};

fn aligned_frame(water: &[f64], baro: &[f64]) -> PolarsResult<DataFrame> {
    let start = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let timestamps: Vec<i64> = (0..water.len())
        .map(|step| naive_to_micros(start + Duration::minutes(15 * step as i64)))
        .collect();
    let timestamp = Series::new("timestamp".into(), timestamps)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;

    DataFrame::new(vec![
        timestamp.into(),
        Series::new("water_pressure".into(), water.to_vec()).into(),
        Series::new("barometric_pressure".into(), baro.to_vec()).into(),
    ])
}

fn config(units: PressureUnit) -> ProcessingConfig {
    ProcessingConfig::new(100.0, 1000.0, units, None, Duration::minutes(15)).unwrap()
}

#[test]
fn compensates_water_pressure_into_elevation() -> PolarsResult<()> {
    let aligned = aligned_frame(&[101.6, 101.7], &[101.3, 101.3])?;
    let computed = compute_wse(&aligned, &config(PressureUnit::Kpa)).unwrap();

    assert_eq!(
        computed.get_column_names_str(),
        vec![
            "timestamp",
            "water_pressure",
            "barometric_pressure",
            "gauge_pressure",
            "water_depth_m",
            "water_surface_elevation"
        ]
    );

    let records = MergedRecord::from_frame(&computed).unwrap();
    assert_eq!(records.len(), 2);
    let expected_depth = [0.0306, 0.0408];
    for (record, depth) in records.iter().zip(expected_depth) {
        assert!((record.water_depth_m - depth).abs() < 1e-4, "{record:?}");
        assert!(
            (record.water_surface_elevation - (100.0 + depth)).abs() < 1e-4,
            "{record:?}"
        );
        assert!(
            (record.water_surface_elevation - record.water_depth_m - 100.0).abs() < 1e-9,
            "datum offset drifted: {record:?}"
        );
    }
    Ok(())
}

#[test]
fn psi_readings_scale_to_pascals() {
    let depth = gauge_to_depth(1.0, 1000.0, PressureUnit::Psi);
    assert!((depth - 6894.757293168 / (1000.0 * GRAVITY_M_S2)).abs() < 1e-12);
    assert!((depth - 0.70307).abs() < 1e-4);
}

#[test]
fn depth_is_monotonic_in_water_pressure() -> PolarsResult<()> {
    let aligned = aligned_frame(&[101.0, 101.5, 102.0, 103.5], &[101.0; 4])?;
    let computed = compute_wse(&aligned, &config(PressureUnit::Kpa)).unwrap();

    let depths: Vec<f64> = computed
        .column("water_depth_m")?
        .f64()?
        .into_no_null_iter()
        .collect();
    assert!(depths.windows(2).all(|pair| pair[0] < pair[1]), "{depths:?}");
    assert_eq!(depths[0], 0.0);
    Ok(())
}

#[test]
fn negative_gauge_pressure_is_kept() -> PolarsResult<()> {
    let aligned = aligned_frame(&[100.8], &[101.3])?;
    let computed = compute_wse(&aligned, &config(PressureUnit::Kpa)).unwrap();

    let depth = computed.column("water_depth_m")?.f64()?.get(0).unwrap();
    let gauge = computed.column("gauge_pressure")?.f64()?.get(0).unwrap();
    assert!((gauge + 0.5).abs() < 1e-9);
    assert!(depth < 0.0);
    Ok(())
}

#[test]
fn null_pressure_propagates_as_null() -> PolarsResult<()> {
    let mut aligned = aligned_frame(&[101.6, 101.7], &[101.3, 101.3])?;
    aligned.with_column(Series::new(
        "barometric_pressure".into(),
        vec![Some(101.3), None],
    ))?;

    let computed = compute_wse(&aligned, &config(PressureUnit::Kpa)).unwrap();
    let wse = computed.column("water_surface_elevation")?.f64()?;
    assert!(wse.get(0).is_some());
    assert_eq!(wse.get(1), None);
    Ok(())
}

#[test]
fn missing_barometric_column_is_an_error() -> PolarsResult<()> {
    let aligned = aligned_frame(&[101.6], &[101.3])?.drop("barometric_pressure")?;
    let err = compute_wse(&aligned, &config(PressureUnit::Kpa)).unwrap_err();
    assert!(matches!(err, WseError::MissingColumn(name) if name == "barometric_pressure"));
    Ok(())
}
