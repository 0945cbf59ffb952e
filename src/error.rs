use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarginError>;

#[derive(Error, Debug)]
pub enum MarginError {
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "python")]
impl From<MarginError> for pyo3::PyErr {
    fn from(err: MarginError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyRuntimeError, PyValueError};
        match err {
            MarginError::InvalidScenario(_) | MarginError::InvalidInput(_) => {
                PyValueError::new_err(err.to_string())
            }
            other => PyRuntimeError::new_err(other.to_string()),
        }
    }
}
