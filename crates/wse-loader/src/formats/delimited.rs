use polars::prelude::DataFrame;

use crate::errors::LoaderError;
use crate::registry::DatasetFormat;

use super::read_table;

/// Plain comma-separated exports with the header on the first line.
pub struct DelimitedFormat;

impl DelimitedFormat {
    const NAME: &'static str = "DELIMITED";
}

impl DatasetFormat for DelimitedFormat {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn suffixes(&self) -> &'static [&'static str] {
        &["csv", "txt"]
    }

    fn parse(&self, content: &str) -> Result<DataFrame, LoaderError> {
        read_table(Self::NAME, content, b',')
    }
}
