//! Feature Pipeline - инженерия признаков для табличных данных и линейные модели

pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod params;
pub mod persistence;
pub mod pipeline;
pub mod preprocessing;
pub mod types;

pub use config::*;
pub use error::{PipelineError, Result};
pub use models::*;
pub use params::*;
pub use pipeline::{FeaturePipeline, FittedPipeline};
pub use preprocessing::*;
pub use types::*;

// Re-export для удобства
pub use dataset::{load_csv, train_test_split, CsvOptions, Split};
pub use persistence::{load_pipeline, save_pipeline};
