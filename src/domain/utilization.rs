use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::domain::models::{EnrichedSession, StationMetadata};

const UNKNOWN_CITY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UtilizationSummary {
    pub busy_hours: f64,
    pub station_count: u64,
    pub days: i64,
    pub capacity_hours: f64,
    pub utilization_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityUtilization {
    pub city: String,
    pub busy_hours: f64,
    pub station_count: u64,
    pub capacity_hours: f64,
    pub utilization_pct: f64,
}

/// Capacity utilization over the filtered session table: busy hours against
/// `stations * 24h * days`, overall and per city.
///
/// The station scope is the directory cache, so stations that never played
/// in the selected range still count toward capacity. When the cache is
/// empty, the stations seen in the sessions stand in for the scope. The day
/// span comes from the selected date range when one is set, otherwise from
/// the sessions' start days.
pub fn compute(
    sessions: &[EnrichedSession],
    station_scope: &BTreeMap<String, StationMetadata>,
    date_range: Option<(NaiveDate, NaiveDate)>,
) -> (UtilizationSummary, Vec<CityUtilization>) {
    let days = match date_range.map(ordered) {
        Some((start, end)) => span_days(start, end),
        None => match session_day_span(sessions) {
            Some((start, end)) => span_days(start, end),
            None => return (UtilizationSummary::default(), Vec::new()),
        },
    };

    let busy_hours = sessions
        .iter()
        .filter_map(|session| session.duration_sec)
        .sum::<f64>()
        / 3600.0;

    let station_count = if station_scope.is_empty() {
        distinct_stations(sessions)
    } else {
        station_scope.len() as u64
    };

    let capacity_hours = if days > 0 {
        station_count as f64 * 24.0 * days as f64
    } else {
        0.0
    };
    let summary = UtilizationSummary {
        busy_hours,
        station_count,
        days,
        capacity_hours,
        utilization_pct: percentage(busy_hours, capacity_hours),
    };

    if sessions.is_empty() {
        return (summary, Vec::new());
    }

    let mut busy_by_city: BTreeMap<String, f64> = BTreeMap::new();
    for session in sessions {
        let Some(duration_sec) = session.duration_sec else {
            continue;
        };
        *busy_by_city.entry(city_of(session.city.as_deref())).or_insert(0.0) +=
            duration_sec / 3600.0;
    }

    let stations_by_city = if station_scope.is_empty() {
        let mut by_city: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
        for session in sessions {
            by_city
                .entry(city_of(session.city.as_deref()))
                .or_default()
                .insert(session.station_id.as_str());
        }
        by_city
    } else {
        let mut by_city: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
        for (station_id, metadata) in station_scope {
            by_city
                .entry(city_of(metadata.city.as_deref()))
                .or_default()
                .insert(station_id.as_str());
        }
        by_city
    };

    // Only cities with busy time get a row; scope-only cities contribute
    // nothing to report.
    let mut rows: Vec<CityUtilization> = busy_by_city
        .into_iter()
        .map(|(city, busy_hours)| {
            let station_count = stations_by_city
                .get(&city)
                .map(|stations| stations.len() as u64)
                .unwrap_or(0);
            let capacity_hours = station_count as f64 * 24.0 * days as f64;
            CityUtilization {
                utilization_pct: percentage(busy_hours, capacity_hours),
                city,
                busy_hours,
                station_count,
                capacity_hours,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.utilization_pct
            .partial_cmp(&a.utilization_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.city.cmp(&b.city))
    });

    (summary, rows)
}

fn city_of(city: Option<&str>) -> String {
    match city {
        Some(city) if !city.trim().is_empty() => city.to_string(),
        _ => UNKNOWN_CITY.to_string(),
    }
}

fn distinct_stations(sessions: &[EnrichedSession]) -> u64 {
    sessions
        .iter()
        .map(|session| session.station_id.as_str())
        .collect::<BTreeSet<_>>()
        .len() as u64
}

fn session_day_span(sessions: &[EnrichedSession]) -> Option<(NaiveDate, NaiveDate)> {
    let mut span: Option<(NaiveDate, NaiveDate)> = None;
    for session in sessions {
        let day = session.start_day();
        span = Some(match span {
            None => (day, day),
            Some((first, last)) => (first.min(day), last.max(day)),
        });
    }
    span
}

fn span_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

fn ordered((a, b): (NaiveDate, NaiveDate)) -> (NaiveDate, NaiveDate) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{DateTime, NaiveDate, Utc};

    use super::compute;
    use crate::domain::models::{EnrichedSession, StationMetadata};

    fn day(raw: &str) -> NaiveDate {
        raw.parse().expect("test date should parse")
    }

    fn session(
        station: &str,
        city: Option<&str>,
        start: &str,
        duration_sec: Option<f64>,
    ) -> EnrichedSession {
        let started_at: DateTime<Utc> = DateTime::parse_from_rfc3339(start)
            .expect("test timestamp should parse")
            .with_timezone(&Utc);
        EnrichedSession {
            station_id: station.to_string(),
            product_id: 1,
            started_at,
            ended_at: None,
            duration_sec,
            duration_minutes: duration_sec.map(|seconds| seconds / 60.0),
            station_name: None,
            product_title: None,
            city: city.map(str::to_string),
            processor: None,
            graphic_names: None,
            free_trial: None,
            product_count: None,
            ram_bytes: None,
            graphic_ram_bytes: None,
            longitude: None,
            latitude: None,
        }
    }

    fn scope_entry(station: &str, city: Option<&str>) -> (String, StationMetadata) {
        (
            station.to_string(),
            StationMetadata {
                station_id: station.to_string(),
                city: city.map(str::to_string),
                ..StationMetadata::default()
            },
        )
    }

    #[test]
    fn summary_uses_scope_capacity_over_the_selected_range() {
        let sessions = vec![
            session("st-a", Some("Kazan"), "2026-03-01T10:00:00Z", Some(6.0 * 3600.0)),
            session("st-a", Some("Kazan"), "2026-03-02T10:00:00Z", Some(6.0 * 3600.0)),
        ];
        let scope = BTreeMap::from([
            scope_entry("st-a", Some("Kazan")),
            scope_entry("st-b", Some("Kazan")),
        ]);

        let (summary, _) = compute(
            &sessions,
            &scope,
            Some((day("2026-03-01"), day("2026-03-02"))),
        );

        assert_eq!(summary.days, 2);
        assert_eq!(summary.station_count, 2);
        assert!((summary.busy_hours - 12.0).abs() < 1e-9);
        // 2 stations * 24h * 2 days
        assert!((summary.capacity_hours - 96.0).abs() < 1e-9);
        assert!((summary.utilization_pct - 12.5).abs() < 1e-9);
    }

    #[test]
    fn idle_scope_stations_still_count_toward_capacity() {
        let sessions = vec![session(
            "st-a",
            Some("Kazan"),
            "2026-03-01T10:00:00Z",
            Some(24.0 * 3600.0),
        )];
        let scope = BTreeMap::from([
            scope_entry("st-a", Some("Kazan")),
            scope_entry("st-b", Some("Kazan")),
            scope_entry("st-c", Some("Kazan")),
            scope_entry("st-d", Some("Kazan")),
        ]);

        let (summary, cities) = compute(
            &sessions,
            &scope,
            Some((day("2026-03-01"), day("2026-03-01"))),
        );

        assert_eq!(summary.station_count, 4);
        assert!((summary.utilization_pct - 25.0).abs() < 1e-9);
        assert_eq!(cities[0].station_count, 4);
    }

    #[test]
    fn falls_back_to_session_stations_and_days_without_scope_or_range() {
        let sessions = vec![
            session("st-a", Some("Kazan"), "2026-03-01T10:00:00Z", Some(3600.0)),
            session("st-b", Some("Kazan"), "2026-03-03T10:00:00Z", Some(3600.0)),
        ];

        let (summary, _) = compute(&sessions, &BTreeMap::new(), None);

        assert_eq!(summary.days, 3);
        assert_eq!(summary.station_count, 2);
        assert!((summary.capacity_hours - 144.0).abs() < 1e-9);
    }

    #[test]
    fn city_rows_sort_by_utilization_descending() {
        let sessions = vec![
            session("st-a", Some("Kazan"), "2026-03-01T10:00:00Z", Some(2.0 * 3600.0)),
            session("st-b", Some("Moscow"), "2026-03-01T10:00:00Z", Some(8.0 * 3600.0)),
        ];
        let scope = BTreeMap::from([
            scope_entry("st-a", Some("Kazan")),
            scope_entry("st-b", Some("Moscow")),
        ]);

        let (_, cities) = compute(
            &sessions,
            &scope,
            Some((day("2026-03-01"), day("2026-03-01"))),
        );

        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].city, "Moscow");
        assert!((cities[0].utilization_pct - 100.0 * 8.0 / 24.0).abs() < 1e-9);
        assert_eq!(cities[1].city, "Kazan");
    }

    #[test]
    fn sessions_without_a_city_bucket_as_unknown() {
        let sessions = vec![session("st-a", None, "2026-03-01T10:00:00Z", Some(3600.0))];

        let (_, cities) = compute(
            &sessions,
            &BTreeMap::new(),
            Some((day("2026-03-01"), day("2026-03-01"))),
        );

        assert_eq!(cities.len(), 1);
        assert_eq!(cities[0].city, "Unknown");
        assert_eq!(cities[0].station_count, 1);
    }

    #[test]
    fn selected_range_keeps_summary_when_no_sessions_match() {
        let scope = BTreeMap::from([scope_entry("st-a", Some("Kazan"))]);

        let (summary, cities) = compute(
            &[],
            &scope,
            Some((day("2026-03-01"), day("2026-03-05"))),
        );

        assert_eq!(summary.days, 5);
        assert_eq!(summary.station_count, 1);
        assert_eq!(summary.busy_hours, 0.0);
        assert_eq!(summary.utilization_pct, 0.0);
        assert!(cities.is_empty());
    }

    #[test]
    fn no_sessions_and_no_range_yields_empty_output() {
        let (summary, cities) = compute(&[], &BTreeMap::new(), None);

        assert_eq!(summary.days, 0);
        assert_eq!(summary.capacity_hours, 0.0);
        assert!(cities.is_empty());
    }

    #[test]
    fn open_sessions_add_no_busy_hours_but_count_as_stations() {
        let sessions = vec![
            session("st-a", Some("Kazan"), "2026-03-01T10:00:00Z", Some(3600.0)),
            session("st-b", Some("Kazan"), "2026-03-01T12:00:00Z", None),
        ];

        let (summary, cities) = compute(
            &sessions,
            &BTreeMap::new(),
            Some((day("2026-03-01"), day("2026-03-01"))),
        );

        assert!((summary.busy_hours - 1.0).abs() < 1e-9);
        assert_eq!(summary.station_count, 2);
        assert_eq!(cities[0].station_count, 2);
    }
}
