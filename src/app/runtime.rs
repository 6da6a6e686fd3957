use crate::adapters::{db, export};
use crate::app::AppError;
use crate::app::config::AppConfig;
use crate::domain::enrich::Dictionaries;
use crate::domain::pipeline;
use crate::domain::utilization;

/// Loads the change log and directory cache, runs the pipeline once and
/// writes the output tables. One invocation, one full recompute; there is
/// no incremental state between runs.
pub fn run(config: AppConfig) -> Result<(), AppError> {
    let mut connection =
        db::open_connection(&config.db_path).map_err(AppError::database_init)?;
    db::run_migrations(&mut connection).map_err(AppError::database_init)?;

    let rows = db::load_station_changes(&connection).map_err(AppError::database_init)?;
    let metadata = db::load_station_directory(&connection).map_err(AppError::database_init)?;
    let product_titles = db::load_product_titles(&connection).map_err(AppError::database_init)?;

    tracing::info!(
        change_rows = rows.len(),
        directory_entries = metadata.len(),
        product_titles = product_titles.len(),
        "source data loaded"
    );

    let dictionaries = Dictionaries {
        station_names: metadata
            .iter()
            .filter_map(|(station_id, entry)| {
                entry
                    .name
                    .as_ref()
                    .map(|name| (station_id.clone(), name.clone()))
            })
            .collect(),
        product_titles,
    };

    let filter = config.session_filter();
    let output = pipeline::run(
        &rows,
        &metadata,
        &dictionaries,
        &filter,
        config.window_days,
    )
    .map_err(AppError::pipeline)?;

    if output.warnings.malformed_rows > 0 || output.warnings.negative_duration_sessions > 0 {
        tracing::warn!(
            malformed_rows = output.warnings.malformed_rows,
            negative_duration_sessions = output.warnings.negative_duration_sessions,
            "source log contained rows that could not be used"
        );
    }

    match output.data_range {
        Some((first_day, last_day)) => tracing::info!(
            sessions = output.sessions.len(),
            open_sessions = output.warnings.open_sessions,
            metric_points = output.metrics.len(),
            first_data_day = %first_day,
            last_data_day = %last_day,
            "pipeline finished"
        ),
        None => tracing::info!(
            sessions = output.sessions.len(),
            open_sessions = output.warnings.open_sessions,
            "pipeline finished without any closed session"
        ),
    }

    let (utilization_summary, city_utilization) =
        utilization::compute(&output.sessions, &metadata, filter.date_range);
    tracing::info!(
        busy_hours = utilization_summary.busy_hours,
        stations_in_scope = utilization_summary.station_count,
        days = utilization_summary.days,
        utilization_pct = utilization_summary.utilization_pct,
        "capacity utilization computed"
    );

    export::write_sessions_csv(&config.sessions_csv_path, &output.sessions)
        .map_err(AppError::export)?;
    export::write_metrics_csv(&config.metrics_csv_path, &output.metrics)
        .map_err(AppError::export)?;
    export::write_utilization_csv(&config.utilization_csv_path, &city_utilization)
        .map_err(AppError::export)?;

    tracing::info!(
        sessions_csv = %config.sessions_csv_path,
        metrics_csv = %config.metrics_csv_path,
        utilization_csv = %config.utilization_csv_path,
        "export complete"
    );

    Ok(())
}
