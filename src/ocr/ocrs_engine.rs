use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;

use super::{Recognition, TextEngine};
use crate::detection::preprocessing::Variant;
use crate::error::ExtractionError;

const ENGINE_NAME: &str = "ocrs";

/// In-process recognition with the `ocrs` neural engine.
///
/// ocrs does not score its output, so every reading carries the configured
/// `confidence`.
pub struct OcrsEngine {
    engine: Arc<OcrEngine>,
    confidence: f32,
}

impl OcrsEngine {
    /// Load detection and recognition models from `model_dir`, or from the
    /// standard `~/.cache/ocrs` location when none is given.
    pub fn load(model_dir: Option<&Path>, whitelist: &str, confidence: f32) -> anyhow::Result<Self> {
        let model_dir = match model_dir {
            Some(dir) => dir.to_path_buf(),
            None => default_model_dir()?,
        };
        let detection_model_path = model_dir.join("text-detection.rten");
        let recognition_model_path = model_dir.join("text-recognition.rten");

        if !detection_model_path.exists() || !recognition_model_path.exists() {
            anyhow::bail!(
                "OCR models not found. Expected locations:\n  - {}\n  - {}",
                detection_model_path.display(),
                recognition_model_path.display()
            );
        }

        let detection_model = Model::load_file(&detection_model_path)
            .with_context(|| format!("Failed to load {}", detection_model_path.display()))?;
        let recognition_model = Model::load_file(&recognition_model_path)
            .with_context(|| format!("Failed to load {}", recognition_model_path.display()))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            allowed_chars: Some(whitelist.to_string()),
            ..Default::default()
        })?;

        Ok(Self {
            engine: Arc::new(engine),
            confidence,
        })
    }
}

fn default_model_dir() -> anyhow::Result<PathBuf> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("cannot locate home directory for the ocrs model cache")?;
    Ok(Path::new(&home_dir).join(".cache/ocrs"))
}

impl TextEngine for OcrsEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    async fn recognize(&self, variant: &Variant) -> Result<Option<Recognition>, ExtractionError> {
        let engine = self.engine.clone();
        let img = DynamicImage::ImageLuma8(variant.image.clone()).to_rgb8();

        // Model inference is CPU-bound; keep it off the async workers.
        let text = tokio::task::spawn_blocking(move || -> Result<String, String> {
            let source =
                ImageSource::from_bytes(img.as_raw(), img.dimensions()).map_err(|e| e.to_string())?;
            let input = engine.prepare_input(source).map_err(|e| e.to_string())?;
            engine.get_text(&input).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| ExtractionError::unavailable(ENGINE_NAME, e.to_string()))?
        .map_err(|message| ExtractionError::unavailable(ENGINE_NAME, message))?;

        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(Recognition::new(text, self.confidence)))
    }
}
