use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::enrich::{self, Dictionaries};
use crate::domain::filter::SessionFilter;
use crate::domain::intervals;
use crate::domain::models::{
    EnrichedSession, RawChangeRow, StationMetadata, WindowMetricPoint,
};
use crate::domain::normalize;
use crate::domain::rolling;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("event log is empty: nothing to analyze")]
    EmptyEventLog,
    #[error("sliding window must be between 1 and 90 days, got {0}")]
    WindowOutOfRange(u32),
}

/// Recoverable conditions observed during a run. None of these abort the
/// pipeline; the caller decides whether and how to report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineWarnings {
    pub malformed_rows: u64,
    pub negative_duration_sessions: u64,
    pub open_sessions: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Enriched sessions surviving the filter stage, ordered by station id
    /// and start time.
    pub sessions: Vec<EnrichedSession>,
    /// Rolling metric points, ordered by date.
    pub metrics: Vec<WindowMetricPoint>,
    /// Earliest and latest start day of the underlying closed sessions,
    /// before any filtering. `None` when no session ever closed.
    pub data_range: Option<(NaiveDate, NaiveDate)>,
    pub warnings: PipelineWarnings,
}

/// Runs the full event-to-metrics pipeline: normalize, build intervals,
/// enrich, filter, aggregate. Every stage is a pure function; the only hard
/// failures are an entirely empty event source and an out-of-range window.
///
/// The observed data range for window coverage is taken from the enriched
/// table before filtering, so the coverage rule reflects true data
/// availability rather than the current selection.
pub fn run(
    rows: &[RawChangeRow],
    metadata: &BTreeMap<String, StationMetadata>,
    dictionaries: &Dictionaries,
    filter: &SessionFilter,
    window_days: u32,
) -> Result<PipelineOutput, PipelineError> {
    if rows.is_empty() {
        return Err(PipelineError::EmptyEventLog);
    }
    if window_days < rolling::MIN_WINDOW_DAYS || window_days > rolling::MAX_WINDOW_DAYS {
        return Err(PipelineError::WindowOutOfRange(window_days));
    }

    let normalized = normalize::normalize(rows);
    let sessions = intervals::build_sessions(&normalized);
    let open_sessions = sessions
        .iter()
        .filter(|session| session.ended_at.is_none())
        .count() as u64;

    let enrichment = enrich::enrich(&sessions, metadata, dictionaries);
    let data_range = rolling::observed_day_range(&enrichment.sessions);

    let filtered = filter.apply(&enrichment.sessions);
    let metrics = match data_range {
        Some(range) => rolling::compute(&filtered, window_days, range, filter.date_range),
        None => Vec::new(),
    };

    Ok(PipelineOutput {
        sessions: filtered,
        metrics,
        data_range,
        warnings: PipelineWarnings {
            malformed_rows: normalized.malformed_rows,
            negative_duration_sessions: enrichment.negative_duration_sessions,
            open_sessions,
        },
    })
}
