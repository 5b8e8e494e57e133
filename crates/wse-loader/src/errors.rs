use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("unsupported file type '{suffix}' for {name}")]
    UnsupportedFileType { name: String, suffix: String },

    #[error("{format} CSV error: {source}")]
    Csv {
        format: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{format} file did not contain any data rows")]
    EmptyData { format: &'static str },

    #[error("failed to build table: {0}")]
    Polars(#[from] polars::error::PolarsError),
}
