use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Hard failure of a recognition engine call.
///
/// Distinct from "no text found", which is `Ok(None)` on every extraction API.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{engine} engine unavailable: {message}")]
    Unavailable { engine: String, message: String },
    #[error("{engine} engine timed out after {after:?}")]
    Timeout { engine: String, after: Duration },
}

impl ExtractionError {
    pub fn unavailable(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            engine: engine.into(),
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("invalid plate pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
