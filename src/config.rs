//! Runtime settings, loaded from a TOML file.
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration. [`Settings::validate`] must pass before any frame is processed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const PLATE_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub region: RegionSettings,
    pub preprocessing: PreprocessingSettings,
    pub extraction: ExtractionSettings,
    pub validation: ValidationSettings,
    pub suppression: SuppressionSettings,
    pub session: SessionSettings,
    pub storage: StorageSettings,
}

/// Bounds a candidate region must satisfy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegionSettings {
    pub min_area: u32,
    pub max_area: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl Default for RegionSettings {
    fn default() -> Self {
        Self {
            min_area: 3000,
            max_area: 50000,
            min_width: 100,
            min_height: 30,
            min_aspect: 2.0,
            max_aspect: 6.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreprocessingSettings {
    pub blur_sigma: f32,
    /// Subtracted from the local mean in the adaptive threshold.
    pub adaptive_offset: f32,
    pub adaptive_sigma: f32,
    pub clahe_clip_limit: f32,
    pub clahe_grid: u32,
}

impl Default for PreprocessingSettings {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            adaptive_offset: 2.0,
            adaptive_sigma: 2.0,
            clahe_clip_limit: 2.0,
            clahe_grid: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Tesseract,
    Ocrs,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub engine: EngineKind,
    pub timeout_ms: u64,
    pub whitelist: String,
    pub tesseract_path: PathBuf,
    pub page_seg_modes: Vec<u8>,
    pub ocrs_model_dir: Option<PathBuf>,
    /// Reported for every ocrs reading, which carries no score of its own.
    pub ocrs_confidence: f32,
}

impl ExtractionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            engine: EngineKind::Tesseract,
            timeout_ms: 1000,
            whitelist: PLATE_ALPHABET.to_string(),
            tesseract_path: PathBuf::from("tesseract"),
            page_seg_modes: vec![7, 8],
            ocrs_model_dir: None,
            ocrs_confidence: 90.0,
        }
    }
}

/// Whether characters outside the allowed set are dropped before the
/// length and charset rules run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    #[default]
    Strict,
    Lenient,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// On the 0..=100 scale used by [`crate::models::ExtractionResult`].
    pub min_confidence: f32,
    pub min_length: usize,
    pub max_length: usize,
    pub allowed_chars: String,
    pub normalization: Normalization,
    /// Optional regex the whole normalized plate must match.
    pub pattern: Option<String>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            min_confidence: 80.0,
            min_length: 4,
            max_length: 10,
            allowed_chars: PLATE_ALPHABET.to_string(),
            normalization: Normalization::Strict,
            pattern: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SuppressionSettings {
    pub enabled: bool,
    pub cooldown_secs: f64,
}

impl SuppressionSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_secs)
    }
}

impl Default for SuppressionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_secs: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Process every Nth frame.
    pub frame_skip: u32,
    pub performance_window: usize,
    /// Consecutive failing frames before the engine is reported degraded.
    pub degraded_after: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            frame_skip: 1,
            performance_window: 30,
            degraded_after: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub database: PathBuf,
    pub csv: PathBuf,
    pub images_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("database/plates.db"),
            csv: PathBuf::from("exports/detected_plates.csv"),
            images_dir: PathBuf::from("saved_plates"),
        }
    }
}

impl Settings {
    /// Load and validate settings. `None` means built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Settings::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.region.validate()?;
        self.preprocessing.validate()?;
        self.extraction.validate()?;
        self.validation.validate()?;
        self.suppression.validate()?;

        if self.session.frame_skip < 1 {
            return Err(ConfigError::invalid("session.frame_skip", "must be at least 1"));
        }
        if self.session.performance_window == 0 {
            return Err(ConfigError::invalid(
                "session.performance_window",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl RegionSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_area > self.max_area {
            return Err(ConfigError::invalid(
                "region.min_area",
                format!("{} exceeds max_area {}", self.min_area, self.max_area),
            ));
        }
        if !(self.min_aspect > 0.0 && self.min_aspect <= self.max_aspect) {
            return Err(ConfigError::invalid(
                "region.min_aspect",
                format!(
                    "aspect range {}..{} is empty or non-positive",
                    self.min_aspect, self.max_aspect
                ),
            ));
        }
        Ok(())
    }
}

impl PreprocessingSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.blur_sigma > 0.0) {
            return Err(ConfigError::invalid("preprocessing.blur_sigma", "must be positive"));
        }
        if !(self.adaptive_sigma > 0.0) {
            return Err(ConfigError::invalid(
                "preprocessing.adaptive_sigma",
                "must be positive",
            ));
        }
        if !(self.clahe_clip_limit >= 1.0) {
            return Err(ConfigError::invalid(
                "preprocessing.clahe_clip_limit",
                "must be at least 1.0",
            ));
        }
        if self.clahe_grid == 0 {
            return Err(ConfigError::invalid("preprocessing.clahe_grid", "must be at least 1"));
        }
        Ok(())
    }
}

impl ExtractionSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid("extraction.timeout_ms", "must be non-zero"));
        }
        if self.whitelist.trim().is_empty() {
            return Err(ConfigError::invalid("extraction.whitelist", "must not be empty"));
        }
        if self.engine == EngineKind::Tesseract && self.page_seg_modes.is_empty() {
            return Err(ConfigError::invalid(
                "extraction.page_seg_modes",
                "at least one mode is required",
            ));
        }
        if !(0.0..=100.0).contains(&self.ocrs_confidence) {
            return Err(ConfigError::invalid(
                "extraction.ocrs_confidence",
                "must be within 0..=100",
            ));
        }
        Ok(())
    }
}

impl ValidationSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(ConfigError::invalid(
                "validation.min_confidence",
                format!("{} is outside 0..=100", self.min_confidence),
            ));
        }
        if self.min_length == 0 {
            return Err(ConfigError::invalid("validation.min_length", "must be at least 1"));
        }
        if self.min_length > self.max_length {
            return Err(ConfigError::invalid(
                "validation.min_length",
                format!("{} exceeds max_length {}", self.min_length, self.max_length),
            ));
        }
        if self.allowed_chars.chars().all(char::is_whitespace) {
            return Err(ConfigError::invalid(
                "validation.allowed_chars",
                "allowed character set is empty",
            ));
        }
        Ok(())
    }
}

impl SuppressionSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cooldown_secs.is_finite() || self.cooldown_secs < 0.0 {
            return Err(ConfigError::invalid(
                "suppression.cooldown_secs",
                "must be a non-negative number of seconds",
            ));
        }
        Ok(())
    }
}
