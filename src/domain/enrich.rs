use std::collections::BTreeMap;

use crate::domain::models::{BusySession, EnrichedSession, StationMetadata};

/// Human-readable name lookups fetched from the directory service.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionaries {
    pub station_names: BTreeMap<String, String>,
    pub product_titles: BTreeMap<i64, String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnrichmentOutcome {
    pub sessions: Vec<EnrichedSession>,
    pub negative_duration_sessions: u64,
}

/// Computes durations and left-joins station metadata and name dictionaries
/// onto the session table.
///
/// A closed session whose end precedes its start is a data error: it is
/// dropped and counted. Unterminated sessions keep a null duration. Missing
/// metadata never drops a session; the enrichment fields just stay null.
pub fn enrich(
    sessions: &[BusySession],
    metadata: &BTreeMap<String, StationMetadata>,
    dictionaries: &Dictionaries,
) -> EnrichmentOutcome {
    let mut outcome = EnrichmentOutcome::default();

    for session in sessions {
        let duration_sec = match session.ended_at {
            Some(ended_at) => {
                let millis = ended_at
                    .signed_duration_since(session.started_at)
                    .num_milliseconds();
                if millis < 0 {
                    outcome.negative_duration_sessions += 1;
                    continue;
                }
                Some(millis as f64 / 1000.0)
            }
            None => None,
        };

        let station = metadata.get(&session.station_id);
        let station_name = dictionaries
            .station_names
            .get(&session.station_id)
            .cloned()
            .or_else(|| station.and_then(|meta| meta.name.clone()));

        outcome.sessions.push(EnrichedSession {
            station_id: session.station_id.clone(),
            product_id: session.product_id,
            started_at: session.started_at,
            ended_at: session.ended_at,
            duration_sec,
            duration_minutes: duration_sec.map(|seconds| seconds / 60.0),
            station_name,
            product_title: dictionaries.product_titles.get(&session.product_id).cloned(),
            city: station.and_then(|meta| meta.city.clone()),
            processor: station.and_then(|meta| meta.processor.clone()),
            graphic_names: station.and_then(|meta| meta.graphic_names.clone()),
            free_trial: station.and_then(|meta| meta.free_trial),
            product_count: station.and_then(|meta| meta.product_count),
            ram_bytes: station.and_then(|meta| meta.ram_bytes),
            graphic_ram_bytes: station.and_then(|meta| meta.graphic_ram_bytes),
            longitude: station.and_then(|meta| meta.longitude),
            latitude: station.and_then(|meta| meta.latitude),
        });
    }

    outcome
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{DateTime, Utc};

    use super::{Dictionaries, enrich};
    use crate::domain::models::{BusySession, StationMetadata};

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .expect("test timestamp should parse")
            .with_timezone(&Utc)
    }

    fn session(station: &str, start: &str, end: Option<&str>) -> BusySession {
        BusySession {
            station_id: station.to_string(),
            product_id: 7,
            started_at: at(start),
            ended_at: end.map(at),
        }
    }

    #[test]
    fn computes_duration_in_seconds_and_minutes() {
        let sessions = vec![session(
            "st-a",
            "2026-03-01T10:00:00Z",
            Some("2026-03-01T12:00:00Z"),
        )];

        let outcome = enrich(&sessions, &BTreeMap::new(), &Dictionaries::default());

        assert_eq!(outcome.sessions.len(), 1);
        assert_eq!(outcome.sessions[0].duration_sec, Some(7200.0));
        assert_eq!(outcome.sessions[0].duration_minutes, Some(120.0));
    }

    #[test]
    fn drops_negative_durations_with_a_count() {
        let sessions = vec![
            session("st-a", "2026-03-01T12:00:00Z", Some("2026-03-01T10:00:00Z")),
            session("st-a", "2026-03-02T10:00:00Z", Some("2026-03-02T11:00:00Z")),
        ];

        let outcome = enrich(&sessions, &BTreeMap::new(), &Dictionaries::default());

        assert_eq!(outcome.negative_duration_sessions, 1);
        assert_eq!(outcome.sessions.len(), 1);
        assert_eq!(outcome.sessions[0].duration_sec, Some(3600.0));
    }

    #[test]
    fn open_sessions_keep_null_duration() {
        let sessions = vec![session("st-a", "2026-03-01T10:00:00Z", None)];

        let outcome = enrich(&sessions, &BTreeMap::new(), &Dictionaries::default());

        assert_eq!(outcome.sessions[0].duration_sec, None);
        assert_eq!(outcome.sessions[0].duration_minutes, None);
    }

    #[test]
    fn joins_metadata_and_dictionaries_by_station() {
        let sessions = vec![session(
            "st-a",
            "2026-03-01T10:00:00Z",
            Some("2026-03-01T11:00:00Z"),
        )];
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "st-a".to_string(),
            StationMetadata {
                station_id: "st-a".to_string(),
                city: Some("Novosibirsk".to_string()),
                processor: Some("AMD Ryzen 7 5800X".to_string()),
                free_trial: Some(true),
                ram_bytes: Some(34_359_738_368),
                ..StationMetadata::default()
            },
        );
        let mut dictionaries = Dictionaries::default();
        dictionaries
            .station_names
            .insert("st-a".to_string(), "Aurora-01".to_string());
        dictionaries.product_titles.insert(7, "Cyber Race".to_string());

        let outcome = enrich(&sessions, &metadata, &dictionaries);

        let enriched = &outcome.sessions[0];
        assert_eq!(enriched.station_name.as_deref(), Some("Aurora-01"));
        assert_eq!(enriched.product_title.as_deref(), Some("Cyber Race"));
        assert_eq!(enriched.city.as_deref(), Some("Novosibirsk"));
        assert_eq!(enriched.free_trial, Some(true));
        assert_eq!(enriched.ram_bytes, Some(34_359_738_368));
    }

    #[test]
    fn keeps_sessions_without_metadata_match() {
        let sessions = vec![session(
            "unknown-station",
            "2026-03-01T10:00:00Z",
            Some("2026-03-01T11:00:00Z"),
        )];

        let outcome = enrich(&sessions, &BTreeMap::new(), &Dictionaries::default());

        assert_eq!(outcome.sessions.len(), 1);
        let enriched = &outcome.sessions[0];
        assert_eq!(enriched.station_name, None);
        assert_eq!(enriched.city, None);
        assert_eq!(enriched.free_trial, None);
    }

    #[test]
    fn falls_back_to_metadata_name_when_dictionary_misses() {
        let sessions = vec![session(
            "st-a",
            "2026-03-01T10:00:00Z",
            Some("2026-03-01T11:00:00Z"),
        )];
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "st-a".to_string(),
            StationMetadata {
                station_id: "st-a".to_string(),
                name: Some("Directory-Name".to_string()),
                ..StationMetadata::default()
            },
        );

        let outcome = enrich(&sessions, &metadata, &Dictionaries::default());

        assert_eq!(
            outcome.sessions[0].station_name.as_deref(),
            Some("Directory-Name")
        );
    }

    #[test]
    fn duration_is_consistent_with_start_and_end() {
        let sessions = vec![
            session("st-a", "2026-03-01T10:00:00Z", Some("2026-03-01T12:30:00Z")),
            session("st-a", "2026-03-02T08:15:00Z", Some("2026-03-02T09:00:00Z")),
            session("st-a", "2026-03-03T23:00:00Z", None),
        ];

        let outcome = enrich(&sessions, &BTreeMap::new(), &Dictionaries::default());

        let total_from_fields: f64 = outcome
            .sessions
            .iter()
            .filter_map(|enriched| enriched.duration_sec)
            .sum();
        let total_from_bounds: f64 = outcome
            .sessions
            .iter()
            .filter_map(|enriched| {
                enriched.ended_at.map(|ended| {
                    ended
                        .signed_duration_since(enriched.started_at)
                        .num_milliseconds() as f64
                        / 1000.0
                })
            })
            .sum();

        assert_eq!(total_from_fields, total_from_bounds);
    }
}
