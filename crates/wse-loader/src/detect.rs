use crate::model::DetectedColumns;

pub const TIMESTAMP_CANDIDATES: &[&str] = &["date time", "datetime", "timestamp", "time"];
pub const PRESSURE_CANDIDATES: &[&str] =
    &["pressure", "abs pressure", "water pressure", "kpa", "psi"];
pub const TEMPERATURE_CANDIDATES: &[&str] = &["temp", "temperature"];

/// First column whose lowercase name contains a candidate, trying candidates in order.
pub fn find_column<S: AsRef<str>>(columns: &[S], candidates: &[&str]) -> Option<String> {
    let lowered: Vec<(String, &str)> = columns
        .iter()
        .map(|column| (column.as_ref().to_lowercase(), column.as_ref()))
        .collect();

    candidates.iter().find_map(|candidate| {
        lowered
            .iter()
            .find(|(key, _)| key.contains(candidate))
            .map(|(_, original)| (*original).to_string())
    })
}

pub fn detect_columns<S: AsRef<str>>(columns: &[S]) -> DetectedColumns {
    DetectedColumns {
        timestamp: find_column(columns, TIMESTAMP_CANDIDATES),
        pressure: find_column(columns, PRESSURE_CANDIDATES),
        temperature: find_column(columns, TEMPERATURE_CANDIDATES),
    }
}
