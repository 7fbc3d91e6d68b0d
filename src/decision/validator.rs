use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;

use crate::config::{Normalization, ValidationSettings};
use crate::error::ConfigError;
use crate::models::{Candidate, DecisionReason};

/// Plate text and confidence that passed every rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPlate {
    pub plate: String,
    pub confidence: f32,
}

/// Why a candidate was rejected. Maps onto a [`DecisionReason`].
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    LowConfidence { confidence: f32, minimum: f32 },
    TooShort { length: usize, minimum: usize },
    TooLong { length: usize, maximum: usize },
    DisallowedChar(char),
    PatternMismatch,
}

impl Rejection {
    pub fn reason(&self) -> DecisionReason {
        match self {
            Rejection::LowConfidence { .. } => DecisionReason::LowConfidence,
            _ => DecisionReason::InvalidFormat,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::LowConfidence { confidence, minimum } => {
                write!(f, "confidence {confidence:.1} below {minimum:.1}")
            }
            Rejection::TooShort { length, minimum } => {
                write!(f, "{length} characters, need at least {minimum}")
            }
            Rejection::TooLong { length, maximum } => {
                write!(f, "{length} characters, allowed at most {maximum}")
            }
            Rejection::DisallowedChar(c) => write!(f, "disallowed character {c:?}"),
            Rejection::PatternMismatch => f.write_str("does not match plate pattern"),
        }
    }
}

/// Domain rules for plate text. Stateless after construction.
#[derive(Debug, Clone)]
pub struct FormatValidator {
    min_confidence: f32,
    min_length: usize,
    max_length: usize,
    allowed: BTreeSet<char>,
    normalization: Normalization,
    pattern: Option<Regex>,
}

impl FormatValidator {
    pub fn new(settings: &ValidationSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let pattern = settings
            .pattern
            .as_deref()
            .map(|p| Regex::new(&format!("^(?:{p})$")))
            .transpose()?;

        Ok(Self {
            min_confidence: settings.min_confidence,
            min_length: settings.min_length,
            max_length: settings.max_length,
            allowed: settings.allowed_chars.chars().filter(|c| !c.is_whitespace()).collect(),
            normalization: settings.normalization,
            pattern,
        })
    }

    /// Strip whitespace and uppercase; in lenient mode also drop anything
    /// outside the allowed set.
    pub fn normalize(&self, text: &str) -> String {
        let upper = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_uppercase);
        match self.normalization {
            Normalization::Strict => upper.collect(),
            Normalization::Lenient => upper.filter(|c| self.allowed.contains(c)).collect(),
        }
    }

    /// Apply the rules in order, stopping at the first failure.
    pub fn validate(&self, candidate: &Candidate) -> Result<ValidPlate, Rejection> {
        let confidence = candidate.confidence();
        if confidence < self.min_confidence {
            return Err(Rejection::LowConfidence {
                confidence,
                minimum: self.min_confidence,
            });
        }

        let plate = self.normalize(candidate.text());
        let length = plate.chars().count();
        if length < self.min_length {
            return Err(Rejection::TooShort {
                length,
                minimum: self.min_length,
            });
        }
        if length > self.max_length {
            return Err(Rejection::TooLong {
                length,
                maximum: self.max_length,
            });
        }
        if let Some(c) = plate.chars().find(|c| !self.allowed.contains(c)) {
            return Err(Rejection::DisallowedChar(c));
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&plate) {
                return Err(Rejection::PatternMismatch);
            }
        }

        Ok(ValidPlate { plate, confidence })
    }
}
