use chrono::{DateTime, NaiveDate, Utc};

/// Occupancy state reported by the station log. Anything the log emits that
/// is neither FREE nor BUSY is kept, normalized to upper case, so the
/// interval builder can still treat it as "not busy".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccupancyState {
    Free,
    Busy,
    Other(String),
}

impl OccupancyState {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        match trimmed.to_ascii_uppercase().as_str() {
            "FREE" => Some(Self::Free),
            "BUSY" => Some(Self::Busy),
            other => Some(Self::Other(other.to_string())),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

/// One row of the `station_changes` table, untouched. Timestamps stay as
/// strings here; parsing and validation happen in the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChangeRow {
    pub id: i64,
    pub station_id: String,
    pub old_state: String,
    pub new_state: String,
    pub old_product_id: Option<i64>,
    pub new_product_id: Option<i64>,
    pub changed_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub station_id: String,
    pub old_state: OccupancyState,
    pub new_state: OccupancyState,
    pub old_product_id: Option<i64>,
    pub new_product_id: Option<i64>,
    pub changed_at: DateTime<Utc>,
}

/// A busy interval for one station running one product. `ended_at` is `None`
/// when the log ends before the station leaves BUSY.
#[derive(Debug, Clone, PartialEq)]
pub struct BusySession {
    pub station_id: String,
    pub product_id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Station attributes from the directory cache. Everything except the id is
/// optional; a station missing from the directory simply enriches to nulls.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StationMetadata {
    pub station_id: String,
    pub name: Option<String>,
    pub city: Option<String>,
    pub processor: Option<String>,
    pub graphic_names: Option<String>,
    pub free_trial: Option<bool>,
    pub product_count: Option<i64>,
    pub ram_bytes: Option<i64>,
    pub graphic_ram_bytes: Option<i64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedSession {
    pub station_id: String,
    pub product_id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_sec: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub station_name: Option<String>,
    pub product_title: Option<String>,
    pub city: Option<String>,
    pub processor: Option<String>,
    pub graphic_names: Option<String>,
    pub free_trial: Option<bool>,
    pub product_count: Option<i64>,
    pub ram_bytes: Option<i64>,
    pub graphic_ram_bytes: Option<i64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

impl EnrichedSession {
    pub fn start_day(&self) -> NaiveDate {
        self.started_at.date_naive()
    }
}

/// One point of the sliding-window metric series: the trailing window of
/// `window_days` calendar days ending at `date`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMetricPoint {
    pub date: NaiveDate,
    pub window_days: u32,
    pub active_stations: u64,
    pub played_hours: f64,
}
