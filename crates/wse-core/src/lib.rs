pub mod aggregation;
pub mod alignment;
pub mod calculator;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod pipeline;
pub mod qaqc;
pub mod schema;
pub mod timestamps;
pub mod units;

pub use config::{ColumnMapping, ProcessingConfig, QaqcConfig, TemperatureCheck};
pub use error::{Result, WseError};
pub use pipeline::{process, PipelineInputs, ProcessingReport, RunStats};
pub use schema::{FlagColumn, MergedColumn, MergedRecord, SummaryColumn};
pub use units::PressureUnit;
