use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::timestamps::naive_from_micros;

/// Longest sheet name a spreadsheet workbook accepts.
pub const SHEET_NAME_LIMIT: usize = 31;

pub const MANIFEST_FILE: &str = "manifest.json";

const ISO_DATETIME: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A named table handed to an export sink.
#[derive(Debug, Clone, Copy)]
pub struct ReportSheet<'a> {
    pub name: &'a str,
    pub frame: &'a DataFrame,
}

impl<'a> ReportSheet<'a> {
    pub fn new(name: &'a str, frame: &'a DataFrame) -> Self {
        Self { name, frame }
    }
}

pub fn truncate_sheet_name(name: &str) -> String {
    name.chars().take(SHEET_NAME_LIMIT).collect()
}

pub trait ExportSink {
    /// Writes every sheet and returns the paths that were created.
    fn write_sheets(&self, sheets: &[ReportSheet<'_>]) -> Result<Vec<PathBuf>>;
}

/// Writes one CSV file per sheet into a directory.
#[derive(Debug, Clone)]
pub struct CsvDirectorySink {
    directory: PathBuf,
}

impl CsvDirectorySink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn write_one(&self, sheet: &ReportSheet<'_>) -> Result<PathBuf> {
        let path = self
            .directory
            .join(format!("{}.csv", truncate_sheet_name(sheet.name)));
        let mut writer = csv::Writer::from_path(&path)?;

        let columns = sheet.frame.get_columns();
        writer.write_record(columns.iter().map(|column| column.name().as_str()))?;

        for row in 0..sheet.frame.height() {
            let mut record = Vec::with_capacity(columns.len());
            for column in columns {
                record.push(format_cell(column.get(row)?));
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(path)
    }
}

fn format_cell(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(text) => text.to_string(),
        AnyValue::StringOwned(text) => text.to_string(),
        AnyValue::Float64(number) => number.to_string(),
        AnyValue::Datetime(raw, unit, _) => {
            let micros = match unit {
                TimeUnit::Nanoseconds => raw.div_euclid(1_000),
                TimeUnit::Microseconds => raw,
                TimeUnit::Milliseconds => raw * 1_000,
            };
            naive_from_micros(micros)
                .map(|ts| ts.format(ISO_DATETIME).to_string())
                .unwrap_or_else(|| raw.to_string())
        }
        AnyValue::Date(days) => NaiveDate::default()
            .checked_add_signed(Duration::days(i64::from(days)))
            .map(|date| date.to_string())
            .unwrap_or_else(|| days.to_string()),
        other => other.to_string(),
    }
}

impl ExportSink for CsvDirectorySink {
    fn write_sheets(&self, sheets: &[ReportSheet<'_>]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.directory)?;
        let mut written = Vec::with_capacity(sheets.len());
        for sheet in sheets {
            written.push(self.write_one(sheet)?);
        }
        info!(directory = %self.directory.display(), sheets = written.len(), "wrote CSV sheets");
        Ok(written)
    }
}

/// Writes one zstd-compressed Parquet file per sheet into a directory.
#[derive(Debug, Clone)]
pub struct ParquetDirectorySink {
    directory: PathBuf,
}

impl ParquetDirectorySink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl ExportSink for ParquetDirectorySink {
    fn write_sheets(&self, sheets: &[ReportSheet<'_>]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.directory)?;
        let mut written = Vec::with_capacity(sheets.len());
        for sheet in sheets {
            let path = self
                .directory
                .join(format!("{}.parquet", truncate_sheet_name(sheet.name)));
            let mut file = File::create(&path)?;
            let mut frame = sheet.frame.clone();
            ParquetWriter::new(&mut file)
                .with_compression(ParquetCompression::Zstd(None))
                .with_statistics(StatisticsOptions::default())
                .finish(&mut frame)?;
            written.push(path);
        }
        info!(directory = %self.directory.display(), sheets = written.len(), "wrote Parquet sheets");
        Ok(written)
    }
}

/// Writes a pretty-printed JSON manifest next to the exported sheets.
pub fn write_manifest<T: Serialize>(directory: &Path, manifest: &T) -> Result<PathBuf> {
    fs::create_dir_all(directory)?;
    let path = directory.join(MANIFEST_FILE);
    let bytes = serde_json::to_vec_pretty(manifest)?;
    fs::write(&path, bytes)?;
    Ok(path)
}

/// Reads a sheet previously written by [`ParquetDirectorySink`].
pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)?;
    Ok(ParquetReader::new(file).finish()?)
}
