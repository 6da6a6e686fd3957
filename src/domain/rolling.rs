use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use crate::domain::models::{EnrichedSession, WindowMetricPoint};

pub const MIN_WINDOW_DAYS: u32 = 1;
pub const MAX_WINDOW_DAYS: u32 = 90;

/// Earliest and latest start day across closed sessions. This is the "true
/// data availability" range the coverage rule is judged against, so callers
/// must compute it before applying any date filter.
pub fn observed_day_range(sessions: &[EnrichedSession]) -> Option<(NaiveDate, NaiveDate)> {
    let mut range: Option<(NaiveDate, NaiveDate)> = None;

    for session in sessions {
        if session.duration_sec.is_none() {
            continue;
        }
        let day = session.start_day();
        range = Some(match range {
            None => (day, day),
            Some((first, last)) => (first.min(day), last.max(day)),
        });
    }

    range
}

/// Computes per-day rolling metrics over the filtered session table.
///
/// For each emitted day `D` the window is the `window_days` calendar days
/// ending at `D` inclusive. `active_stations` counts distinct stations with
/// at least one session starting in the window; `played_hours` sums those
/// sessions' durations. Sessions without a duration contribute to neither.
///
/// A day is only emitted when its whole window lies inside `data_range`;
/// leading partial windows are suppressed instead of being reported low.
/// The sweep is incremental: one pass adding day `D` and dropping day
/// `D - window_days`, never a per-day rescan.
pub fn compute(
    sessions: &[EnrichedSession],
    window_days: u32,
    data_range: (NaiveDate, NaiveDate),
    display_range: Option<(NaiveDate, NaiveDate)>,
) -> Vec<WindowMetricPoint> {
    if window_days < MIN_WINDOW_DAYS || window_days > MAX_WINDOW_DAYS {
        return Vec::new();
    }

    let (first_data, last_data) = ordered(data_range);
    let (display_start, display_end) = match display_range.map(ordered) {
        Some((start, end)) => (start, end),
        None => (first_data, last_data),
    };

    let sweep_start = display_start.max(first_data);
    let sweep_end = display_end.min(last_data);
    let Some(visible_start) = sweep_start.checked_add_days(Days::new(u64::from(window_days) - 1))
    else {
        return Vec::new();
    };
    if visible_start > sweep_end {
        return Vec::new();
    }

    let mut daily_seconds: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut daily_stations: BTreeMap<NaiveDate, Vec<&str>> = BTreeMap::new();
    for session in sessions {
        let Some(duration_sec) = session.duration_sec else {
            continue;
        };
        let day = session.start_day();
        if day < sweep_start || day > sweep_end {
            continue;
        }
        *daily_seconds.entry(day).or_insert(0.0) += duration_sec;
        daily_stations
            .entry(day)
            .or_default()
            .push(session.station_id.as_str());
    }

    let mut points = Vec::new();
    let mut window_seconds = 0.0_f64;
    let mut presence: BTreeMap<&str, u64> = BTreeMap::new();

    let mut day = sweep_start;
    loop {
        window_seconds += daily_seconds.get(&day).copied().unwrap_or(0.0);
        if let Some(stations) = daily_stations.get(&day) {
            for station in stations {
                *presence.entry(station).or_insert(0) += 1;
            }
        }

        if let Some(drop_day) = day.checked_sub_days(Days::new(u64::from(window_days))) {
            if let Some(dropped) = daily_seconds.get(&drop_day) {
                window_seconds -= dropped;
            }
            if let Some(stations) = daily_stations.get(&drop_day) {
                for station in stations {
                    if let Some(count) = presence.get_mut(station) {
                        *count -= 1;
                        if *count == 0 {
                            presence.remove(station);
                        }
                    }
                }
            }
        }

        if day >= visible_start {
            points.push(WindowMetricPoint {
                date: day,
                window_days,
                active_stations: presence.len() as u64,
                played_hours: window_seconds / 3600.0,
            });
        }

        if day >= sweep_end {
            break;
        }
        let Some(next) = day.succ_opt() else {
            break;
        };
        day = next;
    }

    points
}

fn ordered((a, b): (NaiveDate, NaiveDate)) -> (NaiveDate, NaiveDate) {
    if a <= b { (a, b) } else { (b, a) }
}
