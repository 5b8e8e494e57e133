use polars::prelude::DataFrame;
use wse_core::ColumnMapping;

/// Column names inferred from a table's header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedColumns {
    pub timestamp: Option<String>,
    pub pressure: Option<String>,
    pub temperature: Option<String>,
}

impl DetectedColumns {
    /// The column mapping the core expects, when both timestamp and pressure were found.
    pub fn mapping(&self) -> Option<ColumnMapping> {
        let timestamp = self.timestamp.as_ref()?;
        let pressure = self.pressure.as_ref()?;
        let mapping = ColumnMapping::new(timestamp.clone(), pressure.clone());
        Some(match &self.temperature {
            Some(temperature) => mapping.with_temperature(temperature.clone()),
            None => mapping,
        })
    }
}

/// A loaded logger export: every column as text plus the inferred column identities.
#[derive(Debug, Clone)]
pub struct ParsedDataset {
    pub name: String,
    /// Name of the format that parsed the file.
    pub format: &'static str,
    pub data: DataFrame,
    pub columns: DetectedColumns,
}
