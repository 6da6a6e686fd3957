mod config;
mod error;
mod logging;
mod runtime;

pub use error::AppError;

pub fn run() -> Result<(), AppError> {
    logging::init()?;

    // Optional .env for local runs; a missing file is not an error.
    let _ = dotenvy::dotenv();

    let config = config::AppConfig::from_env()?;

    tracing::info!(
        db_path = %config.db_path,
        max_session_hours = config.max_session_hours,
        window_days = config.window_days,
        sessions_csv_path = %config.sessions_csv_path,
        metrics_csv_path = %config.metrics_csv_path,
        "application bootstrap initialized"
    );

    runtime::run(config)
}
