use crate::detect::detect_columns;
use crate::errors::LoaderError;
use crate::formats::{decode_bytes, DelimitedFormat, HoboFormat};
use crate::model::ParsedDataset;
use polars::prelude::DataFrame;

pub trait DatasetFormat {
    fn name(&self) -> &'static str;
    /// Lowercase file suffixes, without the leading dot.
    fn suffixes(&self) -> &'static [&'static str];
    fn parse(&self, content: &str) -> Result<DataFrame, LoaderError>;
}

/// Loads an uploaded file, choosing the format from its suffix (`.hobo`, `.csv`, `.txt`).
pub fn load_dataset(name: &str, raw: &[u8], suffix: &str) -> Result<ParsedDataset, LoaderError> {
    let hobo = HoboFormat;
    let delimited = DelimitedFormat;
    let formats: [&dyn DatasetFormat; 2] = [&hobo, &delimited];
    load_with_formats(name, raw, suffix, &formats)
}

pub fn load_with_formats(
    name: &str,
    raw: &[u8],
    suffix: &str,
    formats: &[&dyn DatasetFormat],
) -> Result<ParsedDataset, LoaderError> {
    let normalized = suffix.trim().trim_start_matches('.').to_ascii_lowercase();
    let format = formats
        .iter()
        .find(|format| format.suffixes().contains(&normalized.as_str()))
        .ok_or_else(|| LoaderError::UnsupportedFileType {
            name: name.to_string(),
            suffix: suffix.to_string(),
        })?;

    let content = decode_bytes(raw);
    let data = format.parse(&content)?;
    let columns = detect_columns(&data.get_column_names_str());

    Ok(ParsedDataset {
        name: name.to_string(),
        format: format.name(),
        data,
        columns,
    })
}
