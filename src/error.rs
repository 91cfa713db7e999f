//! Ошибки пайплайна

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("step '{step}': column '{column}' not found in table")]
    SchemaMismatch { step: String, column: String },

    #[error("step '{step}' has no learned parameters for column '{column}'")]
    UnfittedStep { step: String, column: String },

    #[error("pipeline is not fitted")]
    NotFitted,

    #[error("column '{column}': category '{label}' was not seen during fit")]
    UnseenCategory { column: String, label: String },

    #[error("column '{column}' is not {expected}")]
    TypeMismatch { column: String, expected: &'static str },

    #[error("column '{column}': invalid value {value} ({reason})")]
    InvalidValue {
        column: String,
        value: f64,
        reason: &'static str,
    },

    #[error("column '{column}' still has missing values")]
    MissingValue { column: String },

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("data error: {0}")]
    Data(String),

    #[error("estimator error: {0}")]
    Estimator(String),

    #[error("model was fitted with configuration {found}, expected {expected}")]
    FingerprintMismatch { expected: String, found: String },

    #[error("unsupported model format version {0}")]
    UnsupportedFormat(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub(crate) fn schema(step: &str, column: &str) -> Self {
        Self::SchemaMismatch {
            step: step.to_string(),
            column: column.to_string(),
        }
    }

    pub(crate) fn unfitted(step: &str, column: &str) -> Self {
        Self::UnfittedStep {
            step: step.to_string(),
            column: column.to_string(),
        }
    }
}
