use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::domain::models::{EnrichedSession, WindowMetricPoint};
use crate::domain::utilization::CityUtilization;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create export directory: {0}")]
    CreateDir(#[source] std::io::Error),
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
}

pub const SESSIONS_HEADER: &[&str] = &[
    "uuid",
    "product_id",
    "started_at",
    "ended_at",
    "duration_sec",
    "duration_minutes",
    "station_name",
    "product_title",
    "city",
    "processor",
    "graphic_names",
    "free_trial",
    "product_count",
    "ram_bytes",
    "graphic_ram_bytes",
    "longitude",
    "latitude",
];

pub const METRICS_HEADER: &[&str] = &[
    "date",
    "window_days",
    "active_stations_window",
    "played_hours_window",
];

pub const UTILIZATION_HEADER: &[&str] = &[
    "city",
    "busy_hours",
    "station_count",
    "capacity_hours",
    "utilization_pct",
];

/// Writes the enriched session table. Headers are part of the output
/// contract; downstream rendering binds to these column names.
pub fn write_sessions_csv(path: &str, sessions: &[EnrichedSession]) -> Result<(), ExportError> {
    ensure_parent_dir(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(SESSIONS_HEADER)?;

    for session in sessions {
        writer.write_record(&[
            session.station_id.clone(),
            session.product_id.to_string(),
            format_timestamp(session.started_at),
            session.ended_at.map(format_timestamp).unwrap_or_default(),
            format_optional_float(session.duration_sec),
            format_optional_float(session.duration_minutes),
            session.station_name.clone().unwrap_or_default(),
            session.product_title.clone().unwrap_or_default(),
            session.city.clone().unwrap_or_default(),
            session.processor.clone().unwrap_or_default(),
            session.graphic_names.clone().unwrap_or_default(),
            session
                .free_trial
                .map(|flag| i64::from(flag).to_string())
                .unwrap_or_default(),
            format_optional_int(session.product_count),
            format_optional_int(session.ram_bytes),
            format_optional_int(session.graphic_ram_bytes),
            format_optional_float(session.longitude),
            format_optional_float(session.latitude),
        ])?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_metrics_csv(path: &str, points: &[WindowMetricPoint]) -> Result<(), ExportError> {
    ensure_parent_dir(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(METRICS_HEADER)?;

    for point in points {
        writer.write_record(&[
            point.date.to_string(),
            point.window_days.to_string(),
            point.active_stations.to_string(),
            point.played_hours.to_string(),
        ])?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_utilization_csv(
    path: &str,
    cities: &[CityUtilization],
) -> Result<(), ExportError> {
    ensure_parent_dir(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(UTILIZATION_HEADER)?;

    for city in cities {
        writer.write_record(&[
            city.city.clone(),
            city.busy_hours.to_string(),
            city.station_count.to_string(),
            city.capacity_hours.to_string(),
            city.utilization_pct.to_string(),
        ])?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn ensure_parent_dir(path: &str) -> Result<(), ExportError> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(ExportError::CreateDir)?;
    }
    Ok(())
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_optional_float(value: Option<f64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

fn format_optional_int(value: Option<i64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}
