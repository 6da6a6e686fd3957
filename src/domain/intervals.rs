use chrono::{DateTime, Utc};

use crate::domain::models::{BusySession, ChangeEvent};
use crate::domain::normalize::NormalizedEvents;

#[derive(Debug, Clone, Copy, PartialEq)]
enum StationPhase {
    Idle,
    InSession {
        product_id: i64,
        started_at: DateTime<Utc>,
    },
}

/// Replays each station's ordered events through a two-state machine and
/// emits busy intervals.
///
/// Rules, in order of appearance in the event stream:
/// - idle + BUSY with a product id opens a session at that timestamp;
/// - idle + BUSY without a product id stays idle (the interval could not be
///   attributed to anything);
/// - in-session + non-BUSY closes the session;
/// - in-session + BUSY with a different product id closes the session and
///   opens a new one at the same timestamp, so every session carries exactly
///   one product;
/// - everything else is a no-op.
///
/// A station left in-session when its log ends yields a session with
/// `ended_at = None`.
pub fn build_sessions(events: &NormalizedEvents) -> Vec<BusySession> {
    let mut sessions = Vec::new();

    for (station_id, station_events) in &events.per_station {
        build_station_sessions(station_id, station_events, &mut sessions);
    }

    sessions
}

fn build_station_sessions(
    station_id: &str,
    events: &[ChangeEvent],
    out: &mut Vec<BusySession>,
) {
    let mut phase = StationPhase::Idle;

    for event in events {
        phase = match phase {
            StationPhase::Idle => {
                if event.new_state.is_busy()
                    && let Some(product_id) = event.new_product_id
                {
                    StationPhase::InSession {
                        product_id,
                        started_at: event.changed_at,
                    }
                } else {
                    StationPhase::Idle
                }
            }
            StationPhase::InSession {
                product_id,
                started_at,
            } => {
                if event.new_state.is_busy() {
                    match event.new_product_id {
                        Some(next_product) if next_product != product_id => {
                            out.push(BusySession {
                                station_id: station_id.to_string(),
                                product_id,
                                started_at,
                                ended_at: Some(event.changed_at),
                            });
                            StationPhase::InSession {
                                product_id: next_product,
                                started_at: event.changed_at,
                            }
                        }
                        _ => StationPhase::InSession {
                            product_id,
                            started_at,
                        },
                    }
                } else {
                    out.push(BusySession {
                        station_id: station_id.to_string(),
                        product_id,
                        started_at,
                        ended_at: Some(event.changed_at),
                    });
                    StationPhase::Idle
                }
            }
        };
    }

    if let StationPhase::InSession {
        product_id,
        started_at,
    } = phase
    {
        out.push(BusySession {
            station_id: station_id.to_string(),
            product_id,
            started_at,
            ended_at: None,
        });
    }
}
