use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::info;

use crate::aggregation::summarise;
use crate::alignment::{align_series, SensorSeries};
use crate::calculator::compute_wse;
use crate::config::{ProcessingConfig, QaqcConfig};
use crate::error::Result;
use crate::export::ReportSheet;
use crate::history::combine_with_history;
use crate::qaqc::{flag_shifts, flag_temperature};

pub const COMBINED_SHEET: &str = "combined_timeseries";
pub const DAILY_SHEET: &str = "daily_summary";
pub const WEEKLY_SHEET: &str = "weekly_summary";
pub const DEPTH_FLAGS_SHEET: &str = "qaqc_depth_flags";
pub const TEMPERATURE_FLAGS_SHEET: &str = "qaqc_temperature_flags";

/// The tables one processing run starts from.
#[derive(Debug, Clone, Copy)]
pub struct PipelineInputs<'a> {
    pub water: SensorSeries<'a>,
    pub barometric: SensorSeries<'a>,
    pub history: Option<&'a DataFrame>,
}

/// Row counts a caller can surface to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub water_rows: usize,
    pub barometric_rows: usize,
    pub dropped_in_alignment: usize,
    pub computed_rows: usize,
    pub history_rows: usize,
    pub replaced_history_rows: usize,
    pub combined_rows: usize,
    pub daily_rows: usize,
    pub weekly_rows: usize,
    pub depth_flags: usize,
    pub temperature_flags: usize,
}

#[derive(Debug, Clone)]
pub struct ProcessingReport {
    pub combined: DataFrame,
    pub daily: DataFrame,
    pub weekly: DataFrame,
    pub depth_flags: DataFrame,
    pub temperature_flags: DataFrame,
    pub stats: RunStats,
}

impl ProcessingReport {
    /// Sheet name to table mapping handed to an export sink.
    pub fn sheets(&self) -> Vec<ReportSheet<'_>> {
        vec![
            ReportSheet::new(COMBINED_SHEET, &self.combined),
            ReportSheet::new(DAILY_SHEET, &self.daily),
            ReportSheet::new(WEEKLY_SHEET, &self.weekly),
            ReportSheet::new(DEPTH_FLAGS_SHEET, &self.depth_flags),
            ReportSheet::new(TEMPERATURE_FLAGS_SHEET, &self.temperature_flags),
        ]
    }
}

/// Aligns, compensates, merges history, summarises and screens one pair of sensor tables.
pub fn process(
    inputs: PipelineInputs<'_>,
    config: &ProcessingConfig,
    qaqc: &QaqcConfig,
) -> Result<ProcessingReport> {
    let mut stats = RunStats {
        water_rows: inputs.water.frame.height(),
        barometric_rows: inputs.barometric.frame.height(),
        ..RunStats::default()
    };

    let alignment = align_series(inputs.water, inputs.barometric, config)?;
    stats.dropped_in_alignment = alignment.dropped_rows;
    info!(
        matched = alignment.frame.height(),
        dropped = alignment.dropped_rows,
        "alignment complete"
    );

    let computed = compute_wse(&alignment.frame, config)?;
    stats.computed_rows = computed.height();
    info!(
        rows = computed.height(),
        units = %config.pressure_units(),
        "water surface elevation computed"
    );

    let combined = match inputs.history {
        Some(history) if history.height() > 0 => {
            let combined = combine_with_history(history, &computed)?;
            stats.history_rows = combined.history_rows;
            stats.replaced_history_rows = combined.replaced_rows;
            info!(
                history_rows = combined.history_rows,
                replaced = combined.replaced_rows,
                "merged with historical dataset"
            );
            combined.frame
        }
        _ => computed,
    };
    stats.combined_rows = combined.height();

    let summaries = summarise(&combined)?;
    stats.daily_rows = summaries.daily.height();
    stats.weekly_rows = summaries.weekly.height();

    let depth_flags = flag_shifts(&combined, qaqc)?;
    let temperature_flags = flag_temperature(&combined, qaqc)?;
    stats.depth_flags = depth_flags.height();
    stats.temperature_flags = temperature_flags.height();
    info!(
        depth_flags = stats.depth_flags,
        temperature_flags = stats.temperature_flags,
        "quality screening complete"
    );

    Ok(ProcessingReport {
        combined,
        daily: summaries.daily,
        weekly: summaries.weekly,
        depth_flags,
        temperature_flags,
        stats,
    })
}
