mod delimited;
mod hobo;

use std::collections::HashSet;

use csv::{ReaderBuilder, Trim};
use polars::prelude::*;

use crate::errors::LoaderError;

pub use delimited::DelimitedFormat;
pub use hobo::HoboFormat;

/// Decodes raw file bytes as UTF-8 (with or without BOM), falling back to Latin-1.
pub fn decode_bytes(raw: &[u8]) -> String {
    let without_bom = raw.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(raw);
    match std::str::from_utf8(without_bom) {
        Ok(text) => text.to_string(),
        Err(_) => without_bom.iter().map(|&byte| char::from(byte)).collect(),
    }
}

/// Reads a delimited text table with a header row into text columns.
///
/// Cells are trimmed and empty cells become null. Short rows are padded with nulls and
/// surplus cells are ignored.
pub(crate) fn read_table(
    format: &'static str,
    content: &str,
    delimiter: u8,
) -> Result<DataFrame, LoaderError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| LoaderError::Csv { format, source })?
        .clone();
    let names = unique_column_names(headers.iter());
    let width = names.len();

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); width];
    for record in reader.records() {
        let record = record.map_err(|source| LoaderError::Csv { format, source })?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        for (idx, column) in values.iter_mut().enumerate() {
            let cell = record.get(idx).filter(|cell| !cell.is_empty());
            column.push(cell.map(str::to_string));
        }
    }

    if values.first().map_or(true, |column| column.is_empty()) {
        return Err(LoaderError::EmptyData { format });
    }

    let columns: Vec<Column> = names
        .into_iter()
        .zip(values)
        .map(|(name, column)| Series::new(name.into(), column).into())
        .collect();

    Ok(DataFrame::new(columns)?)
}

fn unique_column_names<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .enumerate()
        .map(|(idx, header)| {
            let base = if header.is_empty() {
                format!("column_{idx}")
            } else {
                header.to_string()
            };
            let mut name = base.clone();
            let mut suffix = 1;
            while !seen.insert(name.clone()) {
                name = format!("{base}_{suffix}");
                suffix += 1;
            }
            name
        })
        .collect()
}
