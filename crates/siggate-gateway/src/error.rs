//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Admission error: {0}")]
    Admission(#[from] siggate_admission::AdmissionError),

    #[error("Sizing error: {0}")]
    Sizing(#[from] siggate_core::SizingError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] siggate_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
