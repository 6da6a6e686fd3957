use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::adapters::directory::DEFAULT_BASE_URL;
use crate::app::AppError;
use crate::domain::filter::SessionFilter;
use crate::domain::rolling::{MAX_WINDOW_DAYS, MIN_WINDOW_DAYS};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub max_session_hours: f64,
    pub window_days: u32,
    pub range_start: Option<NaiveDate>,
    pub range_end: Option<NaiveDate>,
    pub filter_stations: Option<BTreeSet<String>>,
    pub filter_products: Option<BTreeSet<i64>>,
    pub filter_cities: Option<BTreeSet<String>>,
    pub free_trial_only: bool,
    pub sessions_csv_path: String,
    pub metrics_csv_path: String,
    pub utilization_csv_path: String,
    pub directory_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("DB_PATH")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::config("DB_PATH is required"))?;

        let max_session_hours = parse_or_default(&lookup, "MAX_SESSION_HOURS", 30.0_f64)?;
        if max_session_hours <= 0.0 {
            return Err(AppError::config("MAX_SESSION_HOURS must be positive"));
        }

        let window_days = parse_or_default(&lookup, "WINDOW_DAYS", 7_u32)?;
        if window_days < MIN_WINDOW_DAYS || window_days > MAX_WINDOW_DAYS {
            return Err(AppError::config(format!(
                "WINDOW_DAYS must be between {MIN_WINDOW_DAYS} and {MAX_WINDOW_DAYS}"
            )));
        }

        let range_start = parse_optional_date(&lookup, "RANGE_START")?;
        let range_end = parse_optional_date(&lookup, "RANGE_END")?;
        if let (Some(start), Some(end)) = (range_start, range_end)
            && start > end
        {
            return Err(AppError::config("RANGE_START must not be after RANGE_END"));
        }
        if range_start.is_some() != range_end.is_some() {
            return Err(AppError::config(
                "RANGE_START and RANGE_END must be set together",
            ));
        }

        let filter_products = match parse_list(&lookup, "FILTER_PRODUCTS") {
            None => None,
            Some(raw) => {
                let mut products = BTreeSet::new();
                for value in raw {
                    let product_id = value.parse::<i64>().map_err(|_| {
                        AppError::config("FILTER_PRODUCTS must be a comma-separated list of integers")
                    })?;
                    products.insert(product_id);
                }
                Some(products)
            }
        };

        Ok(Self {
            db_path,
            max_session_hours,
            window_days,
            range_start,
            range_end,
            filter_stations: parse_list(&lookup, "FILTER_STATIONS")
                .map(|values| values.into_iter().collect()),
            filter_products,
            filter_cities: parse_list(&lookup, "FILTER_CITIES")
                .map(|values| values.into_iter().collect()),
            free_trial_only: parse_or_default(&lookup, "FREE_TRIAL_ONLY", false)?,
            sessions_csv_path: lookup("SESSIONS_CSV_PATH")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "./out/busy_sessions.csv".to_string()),
            metrics_csv_path: lookup("METRICS_CSV_PATH")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "./out/window_metrics.csv".to_string()),
            utilization_csv_path: lookup("UTILIZATION_CSV_PATH")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "./out/city_utilization.csv".to_string()),
            directory_base_url: lookup("DIRECTORY_BASE_URL")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    pub fn session_filter(&self) -> SessionFilter {
        SessionFilter {
            date_range: match (self.range_start, self.range_end) {
                (Some(start), Some(end)) => Some((start, end)),
                _ => None,
            },
            max_session_hours: Some(self.max_session_hours),
            stations: self.filter_stations.clone(),
            products: self.filter_products.clone(),
            cities: self.filter_cities.clone(),
            free_trial_only: self.free_trial_only,
            ..SessionFilter::default()
        }
    }
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} has an invalid value"))),
        None => Ok(default),
    }
}

fn parse_optional_date<F>(lookup: &F, key: &str) -> Result<Option<NaiveDate>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<NaiveDate>()
                .map(Some)
                .map_err(|_| AppError::config(format!("{key} must be a date like 2026-03-01")))
        }
    }
}

fn parse_list<F>(lookup: &F, key: &str) -> Option<Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    let values: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();

    if values.is_empty() { None } else { Some(values) }
}
