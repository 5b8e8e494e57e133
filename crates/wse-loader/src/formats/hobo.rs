use polars::prelude::DataFrame;

use crate::errors::LoaderError;
use crate::registry::DatasetFormat;

use super::read_table;

const DELIMITERS: [u8; 3] = [b',', b'\t', b';'];

/// HOBOware text exports: a metadata preamble followed by a header row naming the
/// "Date Time" column.
pub struct HoboFormat;

impl HoboFormat {
    const NAME: &'static str = "HOBO";

    /// Index of the header row: the first line mentioning both "date" and "time".
    pub fn find_header_line<'a>(lines: impl IntoIterator<Item = &'a str>) -> usize {
        lines
            .into_iter()
            .position(|line| {
                let normalized = line.to_lowercase();
                normalized.contains("date") && normalized.contains("time")
            })
            .unwrap_or(0)
    }

    /// Most frequent delimiter in the header row, defaulting to a comma.
    pub fn sniff_delimiter(header: &str) -> u8 {
        DELIMITERS
            .iter()
            .copied()
            .map(|delimiter| {
                let count = header.bytes().filter(|byte| *byte == delimiter).count();
                (count, delimiter)
            })
            .filter(|(count, _)| *count > 0)
            .max_by_key(|(count, _)| *count)
            .map(|(_, delimiter)| delimiter)
            .unwrap_or(b',')
    }
}

impl DatasetFormat for HoboFormat {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn suffixes(&self) -> &'static [&'static str] {
        &["hobo"]
    }

    fn parse(&self, content: &str) -> Result<DataFrame, LoaderError> {
        let lines: Vec<&str> = content.lines().collect();
        let header_idx = Self::find_header_line(lines.iter().copied());
        let body = lines.get(header_idx..).unwrap_or_default().join("\n");
        let delimiter = lines
            .get(header_idx)
            .map(|header| Self::sniff_delimiter(header))
            .unwrap_or(b',');
        read_table(Self::NAME, &body, delimiter)
    }
}
