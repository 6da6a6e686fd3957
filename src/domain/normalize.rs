use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::models::{ChangeEvent, OccupancyState, RawChangeRow};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedEvents {
    /// Events per station, ordered by timestamp ascending. Keyed by a
    /// BTreeMap so downstream iteration order is deterministic.
    pub per_station: BTreeMap<String, Vec<ChangeEvent>>,
    pub malformed_rows: u64,
}

impl NormalizedEvents {
    pub fn event_count(&self) -> usize {
        self.per_station.values().map(Vec::len).sum()
    }
}

/// Validates, deduplicates and orders raw change rows per station.
///
/// Rows with an unparseable timestamp, an empty station id or an empty
/// state field are skipped and counted; transition legality is not checked
/// here. Ties at equal timestamps keep original input order, so the result
/// is stable and re-running the normalizer on its own output changes
/// nothing.
pub fn normalize(rows: &[RawChangeRow]) -> NormalizedEvents {
    let mut per_station: BTreeMap<String, Vec<ChangeEvent>> = BTreeMap::new();
    let mut malformed_rows = 0_u64;

    for row in rows {
        let Some(event) = parse_row(row) else {
            malformed_rows += 1;
            continue;
        };
        per_station
            .entry(event.station_id.clone())
            .or_default()
            .push(event);
    }

    for events in per_station.values_mut() {
        let ordered = order_and_dedup(std::mem::take(events));
        *events = ordered;
    }

    NormalizedEvents {
        per_station,
        malformed_rows,
    }
}

/// Stable-sorts a single station's events by timestamp and drops exact
/// duplicates. Exposed separately so the idempotence property can be
/// checked directly on normalized output.
pub fn order_and_dedup(mut events: Vec<ChangeEvent>) -> Vec<ChangeEvent> {
    events.sort_by_key(|event| event.changed_at);

    let mut out: Vec<ChangeEvent> = Vec::with_capacity(events.len());
    for event in events {
        // A duplicate necessarily shares the timestamp, so only the trailing
        // run of equal-timestamp events needs to be inspected.
        let duplicate = out
            .iter()
            .rev()
            .take_while(|prev| prev.changed_at == event.changed_at)
            .any(|prev| *prev == event);

        if !duplicate {
            out.push(event);
        }
    }

    out
}

fn parse_row(row: &RawChangeRow) -> Option<ChangeEvent> {
    let station_id = row.station_id.trim();
    if station_id.is_empty() {
        return None;
    }

    let old_state = OccupancyState::parse(&row.old_state)?;
    let new_state = OccupancyState::parse(&row.new_state)?;
    let changed_at = parse_timestamp(&row.changed_at)?;

    Some(ChangeEvent {
        station_id: station_id.to_string(),
        old_state,
        new_state,
        old_product_id: row.old_product_id,
        new_product_id: row.new_product_id,
        changed_at,
    })
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    // Sqlite exports commonly store naive timestamps; treat them as UTC.
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed.and_utc());
        }
    }

    None
}
