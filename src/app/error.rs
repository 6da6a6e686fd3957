use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to initialize database: {0}")]
    DatabaseInit(String),
    #[error("pipeline failed: {0}")]
    Pipeline(String),
    #[error("failed to export results: {0}")]
    Export(String),
}

impl AppError {
    pub fn logging_init<E: std::fmt::Display>(error: E) -> Self {
        Self::LoggingInit(error.to_string())
    }

    pub fn config<E: std::fmt::Display>(error: E) -> Self {
        Self::Config(error.to_string())
    }

    pub fn database_init<E: std::fmt::Display>(error: E) -> Self {
        Self::DatabaseInit(error.to_string())
    }

    pub fn pipeline<E: std::fmt::Display>(error: E) -> Self {
        Self::Pipeline(error.to_string())
    }

    pub fn export<E: std::fmt::Display>(error: E) -> Self {
        Self::Export(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn maps_logging_init_error_message() {
        let err = AppError::logging_init("subscriber already set");
        assert_eq!(
            err.to_string(),
            "failed to initialize logging: subscriber already set"
        );
    }

    #[test]
    fn maps_pipeline_error_message() {
        let err = AppError::pipeline("event log is empty: nothing to analyze");
        assert_eq!(
            err.to_string(),
            "pipeline failed: event log is empty: nothing to analyze"
        );
    }
}
