use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::domain::models::EnrichedSession;

/// Conjunctive session predicates. Every field is independently optional;
/// an unset predicate (or an empty selection set) passes everything, so any
/// combination of filters composes without ordering concerns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionFilter {
    /// Inclusive range on the session's start day.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Sessions longer than this are treated as data errors. Sessions with
    /// no duration (still open) pass through.
    pub max_session_hours: Option<f64>,
    pub stations: Option<BTreeSet<String>>,
    pub products: Option<BTreeSet<i64>>,
    pub cities: Option<BTreeSet<String>>,
    pub processors: Option<BTreeSet<String>>,
    pub graphics: Option<BTreeSet<String>>,
    pub free_trial_only: bool,
    pub product_count_range: Option<(i64, i64)>,
    pub ram_range: Option<(i64, i64)>,
    pub graphic_ram_range: Option<(i64, i64)>,
}

impl SessionFilter {
    pub fn apply(&self, sessions: &[EnrichedSession]) -> Vec<EnrichedSession> {
        sessions
            .iter()
            .filter(|session| self.matches(session))
            .cloned()
            .collect()
    }

    pub fn matches(&self, session: &EnrichedSession) -> bool {
        if let Some((start, end)) = ordered(self.date_range) {
            let day = session.start_day();
            if day < start || day > end {
                return false;
            }
        }

        if let Some(max_hours) = self.max_session_hours
            && let Some(duration_sec) = session.duration_sec
            && duration_sec > max_hours * 3600.0
        {
            return false;
        }

        if !set_matches(self.stations.as_ref(), Some(&session.station_id)) {
            return false;
        }
        if let Some(products) = self.products.as_ref()
            && !products.is_empty()
            && !products.contains(&session.product_id)
        {
            return false;
        }
        if !set_matches(self.cities.as_ref(), session.city.as_ref()) {
            return false;
        }
        if !set_matches(self.processors.as_ref(), session.processor.as_ref()) {
            return false;
        }
        if !set_matches(self.graphics.as_ref(), session.graphic_names.as_ref()) {
            return false;
        }

        if self.free_trial_only && session.free_trial != Some(true) {
            return false;
        }

        range_matches(self.product_count_range, session.product_count)
            && range_matches(self.ram_range, session.ram_bytes)
            && range_matches(self.graphic_ram_range, session.graphic_ram_bytes)
    }
}

fn ordered(range: Option<(NaiveDate, NaiveDate)>) -> Option<(NaiveDate, NaiveDate)> {
    range.map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
}

/// Empty or unset selection passes; an active selection requires the value
/// to be present and selected.
fn set_matches<T: Ord>(selection: Option<&BTreeSet<T>>, value: Option<&T>) -> bool {
    match selection {
        None => true,
        Some(set) if set.is_empty() => true,
        Some(set) => match value {
            Some(value) => set.contains(value),
            None => false,
        },
    }
}

fn range_matches(range: Option<(i64, i64)>, value: Option<i64>) -> bool {
    match range {
        None => true,
        Some((low, high)) => match value {
            Some(value) => value >= low.min(high) && value <= low.max(high),
            None => false,
        },
    }
}
