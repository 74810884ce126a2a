#[cfg(feature = "python")]
use pyo3::exceptions::PyRuntimeError;
#[cfg(feature = "python")]
use pyo3::PyErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorklistError {
    #[error("Input missing: {0}")]
    InputMissing(String),

    #[error("Parse failure in column '{column}': {message}")]
    ParseFailure { column: String, message: String },

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Encoding failure: {0}")]
    EncodingFailure(String),

    #[error("Sample index: {0}")]
    SampleIndex(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorklistError {
    pub fn parse(column: impl Into<String>, message: impl Into<String>) -> Self {
        WorklistError::ParseFailure {
            column: column.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorklistError>;

#[cfg(feature = "python")]
impl From<WorklistError> for PyErr {
    fn from(err: WorklistError) -> PyErr {
        PyRuntimeError::new_err(err.to_string())
    }
}

