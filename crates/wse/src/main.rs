use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wse_core::alignment::SensorSeries;
use wse_core::config::{parse_timezone, parse_tolerance};
use wse_core::export::{
    read_parquet, write_manifest, CsvDirectorySink, ExportSink, ParquetDirectorySink,
};
use wse_core::history::conform_to_schema;
use wse_core::{
    process, ColumnMapping, FlagColumn, MergedColumn, MergedRecord, PipelineInputs,
    ProcessingConfig, ProcessingReport, PressureUnit, QaqcConfig, RunStats, TemperatureCheck,
};
use wse_loader::{load_dataset, ParsedDataset};

const PREVIEW_ROWS: usize = 20;

#[derive(Parser, Debug)]
#[command(author, version, about = "Barometric compensation and QA/QC for water level loggers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the columns detected in a logger export
    Inspect(InspectArgs),
    /// Compute water-surface elevation, summaries and QA/QC flags
    Process(ProcessArgs),
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Logger export (.hobo, .csv or .txt)
    file: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
enum OutputFormat {
    Csv,
    Parquet,
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Submerged (water) logger export
    #[arg(long)]
    water: PathBuf,
    /// Above-water (barometric) logger export
    #[arg(long)]
    baro: PathBuf,
    /// Previously exported combined series (.csv or .parquet) to extend
    #[arg(long)]
    history: Option<PathBuf>,
    /// Elevation of the water surface when depth is zero
    #[arg(long)]
    reference_datum: f64,
    /// Fluid density in kg/m³
    #[arg(long, default_value_t = 1000.0)]
    density: f64,
    /// Pressure units of both loggers (kPa or psi)
    #[arg(long, default_value = "kPa")]
    units: String,
    /// IANA timezone used to localize logger timestamps, e.g. America/Chicago
    #[arg(long)]
    timezone: Option<String>,
    /// Largest gap allowed between matched water and barometric readings
    #[arg(long, default_value = "15min")]
    merge_tolerance: String,
    /// Depth change (m) between consecutive readings flagged as a shift
    #[arg(long, default_value_t = 0.15)]
    shift_threshold: f64,
    /// Enables the temperature check with this ceiling in °C
    #[arg(long)]
    temperature_threshold: Option<f64>,
    #[command(flatten)]
    columns: ColumnOverrides,
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
    /// Directory receiving the exported sheets and manifest
    #[arg(long)]
    output_dir: PathBuf,
}

#[derive(Args, Debug, Default)]
struct ColumnOverrides {
    #[arg(long)]
    water_timestamp: Option<String>,
    #[arg(long)]
    water_pressure: Option<String>,
    #[arg(long)]
    water_temperature: Option<String>,
    #[arg(long)]
    baro_timestamp: Option<String>,
    #[arg(long)]
    baro_pressure: Option<String>,
    #[arg(long)]
    baro_temperature: Option<String>,
}

#[derive(Debug, Serialize)]
struct InputRecord {
    role: &'static str,
    path: String,
    format: Option<&'static str>,
    blake3: String,
    rows: usize,
    columns: Option<ColumnMapping>,
}

#[derive(Debug, Serialize)]
struct RunManifest {
    generated_at: String,
    inputs: Vec<InputRecord>,
    reference_datum: f64,
    fluid_density: f64,
    pressure_units: PressureUnit,
    timezone: Option<String>,
    merge_tolerance: String,
    qaqc: QaqcConfig,
    format: OutputFormat,
    sheets: Vec<String>,
    stats: RunStats,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Inspect(args) => handle_inspect(args),
        Command::Process(args) => handle_process(args),
    }
}

fn read_input(path: &Path) -> Result<(ParsedDataset, String)> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let hash = blake3::hash(&raw).to_hex().to_string();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let suffix = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dataset = load_dataset(&name, &raw, &suffix)
        .with_context(|| format!("failed to load {}", path.display()))?;
    info!(file = %name, rows = dataset.data.height(), "loaded dataset");
    Ok((dataset, hash))
}

fn handle_inspect(args: InspectArgs) -> Result<()> {
    let (dataset, hash) = read_input(&args.file)?;

    let mut table = Table::new();
    table.set_header(vec!["Role", "Detected column"]);
    let detected = &dataset.columns;
    for (role, column) in [
        ("timestamp", &detected.timestamp),
        ("pressure", &detected.pressure),
        ("temperature", &detected.temperature),
    ] {
        table.add_row(vec![role, column.as_deref().unwrap_or("-")]);
    }

    println!(
        "{} ({} format, {} rows, blake3 {})",
        dataset.name,
        dataset.format,
        dataset.data.height(),
        hash
    );
    println!("{table}");
    println!("Columns: {}", dataset.data.get_column_names_str().join(", "));
    Ok(())
}

fn resolve_mapping(
    dataset: &ParsedDataset,
    timestamp: &Option<String>,
    pressure: &Option<String>,
    temperature: &Option<String>,
) -> Result<ColumnMapping> {
    let detected = &dataset.columns;
    let timestamp = timestamp
        .clone()
        .or_else(|| detected.timestamp.clone())
        .ok_or_else(|| anyhow!("no timestamp column found in {}", dataset.name))?;
    let pressure = pressure
        .clone()
        .or_else(|| detected.pressure.clone())
        .ok_or_else(|| anyhow!("no pressure column found in {}", dataset.name))?;

    let mapping = ColumnMapping::new(timestamp, pressure);
    Ok(match temperature.clone().or_else(|| detected.temperature.clone()) {
        Some(column) => mapping.with_temperature(column),
        None => mapping,
    })
}

fn load_history(path: &Path) -> Result<(DataFrame, String)> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let (frame, hash) = if extension == "parquet" {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let frame = read_parquet(path)
            .with_context(|| format!("failed to read parquet history {}", path.display()))?;
        (frame, blake3::hash(&raw).to_hex().to_string())
    } else {
        let (dataset, hash) = read_input(path)?;
        (dataset.data, hash)
    };

    let conformed = conform_to_schema(&frame)
        .with_context(|| format!("historical dataset {} is not a combined series", path.display()))?;
    Ok((conformed, hash))
}

fn handle_process(args: ProcessArgs) -> Result<()> {
    let units: PressureUnit = args.units.parse()?;
    let timezone = args.timezone.as_deref().map(parse_timezone).transpose()?;
    let tolerance = parse_tolerance(&args.merge_tolerance)?;
    let config = ProcessingConfig::new(
        args.reference_datum,
        args.density,
        units,
        timezone,
        tolerance,
    )?;
    let temperature_check = match args.temperature_threshold {
        Some(threshold) => TemperatureCheck::Enabled(threshold),
        None => TemperatureCheck::Disabled,
    };
    let qaqc = QaqcConfig::new(args.shift_threshold, temperature_check)?;

    let (water, water_hash) = read_input(&args.water)?;
    let (baro, baro_hash) = read_input(&args.baro)?;
    let overrides = &args.columns;
    let water_columns = resolve_mapping(
        &water,
        &overrides.water_timestamp,
        &overrides.water_pressure,
        &overrides.water_temperature,
    )?;
    let baro_columns = resolve_mapping(
        &baro,
        &overrides.baro_timestamp,
        &overrides.baro_pressure,
        &overrides.baro_temperature,
    )?;

    let history = args.history.as_deref().map(load_history).transpose()?;

    let report = process(
        PipelineInputs {
            water: SensorSeries::new(&water.data, &water_columns),
            barometric: SensorSeries::new(&baro.data, &baro_columns),
            history: history.as_ref().map(|(frame, _)| frame),
        },
        &config,
        &qaqc,
    )?;

    if report.combined.height() == 0 {
        warn!(
            water_rows = report.stats.water_rows,
            dropped = report.stats.dropped_in_alignment,
            merge_tolerance = %args.merge_tolerance,
            "no rows survived alignment; exporting empty sheets"
        );
    }

    print_summary(&report)?;

    let sink: Box<dyn ExportSink> = match args.format {
        OutputFormat::Csv => Box::new(CsvDirectorySink::new(&args.output_dir)),
        OutputFormat::Parquet => Box::new(ParquetDirectorySink::new(&args.output_dir)),
    };
    let written = sink
        .write_sheets(&report.sheets())
        .with_context(|| format!("failed to export sheets to {}", args.output_dir.display()))?;

    let mut inputs = vec![
        InputRecord {
            role: "water",
            path: args.water.display().to_string(),
            format: Some(water.format),
            blake3: water_hash,
            rows: water.data.height(),
            columns: Some(water_columns),
        },
        InputRecord {
            role: "barometric",
            path: args.baro.display().to_string(),
            format: Some(baro.format),
            blake3: baro_hash,
            rows: baro.data.height(),
            columns: Some(baro_columns),
        },
    ];
    if let (Some(path), Some((frame, hash))) = (&args.history, history) {
        inputs.push(InputRecord {
            role: "history",
            path: path.display().to_string(),
            format: None,
            blake3: hash,
            rows: frame.height(),
            columns: None,
        });
    }

    let manifest = RunManifest {
        generated_at: Utc::now().to_rfc3339(),
        inputs,
        reference_datum: config.reference_datum(),
        fluid_density: config.fluid_density(),
        pressure_units: config.pressure_units(),
        timezone: config.timezone().map(|tz| tz.name().to_string()),
        merge_tolerance: args.merge_tolerance.clone(),
        qaqc,
        format: args.format,
        sheets: written.iter().map(|path| path.display().to_string()).collect(),
        stats: report.stats.clone(),
    };
    let manifest_path = write_manifest(&args.output_dir, &manifest)?;

    println!(
        "Wrote {} sheets and {} to {}",
        written.len(),
        manifest_path.display(),
        args.output_dir.display()
    );
    Ok(())
}

fn print_summary(report: &ProcessingReport) -> Result<()> {
    let stats = &report.stats;
    println!(
        "Combined series: {} rows ({} water rows dropped during alignment, {} historical rows, {} replaced)",
        stats.combined_rows, stats.dropped_in_alignment, stats.history_rows, stats.replaced_history_rows
    );
    println!(
        "Summaries: {} days, {} weeks",
        stats.daily_rows, stats.weekly_rows
    );
    if stats.dropped_in_alignment > 0 {
        warn!(
            dropped = stats.dropped_in_alignment,
            "some water readings had no usable barometric match"
        );
    }

    if report.depth_flags.height() == 0 {
        println!("No depth shifts detected above threshold");
    } else {
        println!("Potential depth shifts detected: {}", report.depth_flags.height());
        println!(
            "{}",
            flag_table(
                &report.depth_flags,
                FlagColumn::DepthChange,
                MergedColumn::WaterDepth,
                |record| record.water_depth_m,
            )?
        );
    }

    if report.temperature_flags.height() > 0 {
        println!(
            "Temperature exceedances found: {}",
            report.temperature_flags.height()
        );
        println!(
            "{}",
            flag_table(
                &report.temperature_flags,
                FlagColumn::TemperatureExcess,
                MergedColumn::WaterTemperature,
                |record| record.water_temperature.unwrap_or(f64::NAN),
            )?
        );
    }
    Ok(())
}

fn flag_table(
    flags: &DataFrame,
    annotation: FlagColumn,
    value_column: MergedColumn,
    value_of: impl Fn(&MergedRecord) -> f64,
) -> Result<Table> {
    let records = MergedRecord::from_frame_indexed(flags)?;
    let deltas = flags.column(annotation.canonical_name())?.f64()?;

    let mut table = Table::new();
    table.set_header(vec![
        MergedColumn::Timestamp.canonical_name(),
        value_column.canonical_name(),
        annotation.canonical_name(),
    ]);
    for (idx, record) in records.iter().take(PREVIEW_ROWS) {
        table.add_row(vec![
            record.timestamp.to_string(),
            format!("{:.4}", value_of(record)),
            deltas
                .get(*idx)
                .map(|delta| format!("{delta:.4}"))
                .unwrap_or_default(),
        ]);
    }
    Ok(table)
}
