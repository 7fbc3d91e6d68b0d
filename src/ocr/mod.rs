//! Text extraction: the engine seam and the adapter that enforces its call contract.
//!
//! A [`TextEngine`] is a concrete recognition backend. [`TextExtractionAdapter`]
//! wraps any engine with a bounded timeout, drops empty output and tags the
//! result with the variant it came from. Backends never report "no text" as an
//! error, and the adapter never turns an error into "no text".

mod ocrs_engine;
mod tesseract;

use std::future::Future;
use std::time::Duration;

use log::debug;

pub use ocrs_engine::OcrsEngine;
pub use tesseract::TesseractEngine;

use crate::config::{EngineKind, ExtractionSettings};
use crate::detection::preprocessing::Variant;
use crate::error::{ConfigError, ExtractionError};
use crate::models::ExtractionResult;

/// Raw engine output for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub confidence: f32,
}

impl Recognition {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Common interface for recognition backends.
pub trait TextEngine: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when the image holds no readable text.
    fn recognize(
        &self,
        variant: &Variant,
    ) -> impl Future<Output = Result<Option<Recognition>, ExtractionError>> + Send;
}

pub struct TextExtractionAdapter<E> {
    engine: E,
    timeout: Duration,
}

impl<E: TextEngine> TextExtractionAdapter<E> {
    pub fn new(engine: E, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::invalid("extraction.timeout_ms", "must be non-zero"));
        }
        Ok(Self { engine, timeout })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub async fn extract(&self, variant: &Variant) -> Result<Option<ExtractionResult>, ExtractionError> {
        let recognition = tokio::time::timeout(self.timeout, self.engine.recognize(variant))
            .await
            .map_err(|_| ExtractionError::Timeout {
                engine: self.engine.name().to_string(),
                after: self.timeout,
            })??;

        let Some(recognition) = recognition else {
            return Ok(None);
        };
        let text = recognition.text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let confidence = if recognition.confidence.is_finite() {
            recognition.confidence.clamp(0.0, 100.0)
        } else {
            0.0
        };
        debug!(
            "{} read {:?} from {} variant (confidence {:.1})",
            self.engine.name(),
            text,
            variant.kind,
            confidence
        );
        Ok(Some(ExtractionResult {
            text: text.to_string(),
            confidence,
            source_variant: variant.kind,
        }))
    }
}

/// Backend selected at runtime from settings.
pub enum EngineBackend {
    Tesseract(TesseractEngine),
    Ocrs(OcrsEngine),
}

impl EngineBackend {
    pub fn from_settings(settings: &ExtractionSettings) -> anyhow::Result<Self> {
        settings.validate()?;
        Ok(match settings.engine {
            EngineKind::Tesseract => EngineBackend::Tesseract(TesseractEngine::new(
                settings.tesseract_path.clone(),
                settings.whitelist.clone(),
                settings.page_seg_modes.clone(),
            )),
            EngineKind::Ocrs => EngineBackend::Ocrs(OcrsEngine::load(
                settings.ocrs_model_dir.as_deref(),
                &settings.whitelist,
                settings.ocrs_confidence,
            )?),
        })
    }
}

impl TextEngine for EngineBackend {
    fn name(&self) -> &str {
        match self {
            EngineBackend::Tesseract(engine) => engine.name(),
            EngineBackend::Ocrs(engine) => engine.name(),
        }
    }

    async fn recognize(&self, variant: &Variant) -> Result<Option<Recognition>, ExtractionError> {
        match self {
            EngineBackend::Tesseract(engine) => engine.recognize(variant).await,
            EngineBackend::Ocrs(engine) => engine.recognize(variant).await,
        }
    }
}
