//! Сохранение обученных параметров в bincode

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::{FeaturePipeline, FittedPipeline};

pub const FORMAT_VERSION: u32 = 1;

/// Обёртка файла: версия формата, отпечаток конфигурации и сам объект
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    format_version: u32,
    fingerprint: Option<String>,
    payload: Vec<u8>,
}

fn write_envelope(envelope: &Envelope, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, envelope)?;
    Ok(())
}

fn read_envelope(path: &Path) -> Result<Envelope> {
    let reader = BufReader::new(File::open(path)?);
    let envelope: Envelope = bincode::deserialize_from(reader)?;
    if envelope.format_version != FORMAT_VERSION {
        return Err(PipelineError::UnsupportedFormat(envelope.format_version));
    }
    Ok(envelope)
}

/// Сохраняет любой serde-объект (параметры шага, модель и т.п.)
pub fn save<T: Serialize>(object: &T, path: impl AsRef<Path>) -> Result<()> {
    let envelope = Envelope {
        format_version: FORMAT_VERSION,
        fingerprint: None,
        payload: bincode::serialize(object)?,
    };
    write_envelope(&envelope, path.as_ref())
}

pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let envelope = read_envelope(path.as_ref())?;
    Ok(bincode::deserialize(&envelope.payload)?)
}

/// Сохраняет обученный пайплайн вместе с отпечатком его конфигурации
pub fn save_pipeline(pipeline: &FeaturePipeline, path: impl AsRef<Path>) -> Result<()> {
    let fitted = pipeline.fitted()?;
    let envelope = Envelope {
        format_version: FORMAT_VERSION,
        fingerprint: Some(fitted.fingerprint.clone()),
        payload: bincode::serialize(fitted)?,
    };
    write_envelope(&envelope, path.as_ref())?;
    tracing::info!(path = %path.as_ref().display(), "Pipeline saved");
    Ok(())
}

/// Загружает пайплайн; файл, обученный под другой конфигурацией, отклоняется
pub fn load_pipeline(path: impl AsRef<Path>, config: PipelineConfig) -> Result<FeaturePipeline> {
    let envelope = read_envelope(path.as_ref())?;
    let expected = config.fingerprint()?;
    let found = envelope.fingerprint.unwrap_or_default();
    if found != expected {
        return Err(PipelineError::FingerprintMismatch { expected, found });
    }

    let fitted: FittedPipeline = bincode::deserialize(&envelope.payload)?;
    FeaturePipeline::from_fitted(config, fitted)
}
