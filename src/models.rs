use std::fmt;
use std::time::Duration;

use image::DynamicImage;
use time::OffsetDateTime;

use crate::detection::preprocessing::VariantKind;

/// Bounding box in the source frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

/// A rectangle of a frame hypothesized to contain a plate, with its pixels.
#[derive(Debug, Clone)]
pub struct Region {
    pub bbox: BoundingBox,
    pub image: DynamicImage,
}

impl Region {
    pub fn new(bbox: BoundingBox, image: DynamicImage) -> Self {
        Self { bbox, image }
    }

    /// Crop `bbox` out of `frame`, clamped to the frame bounds.
    pub fn crop(frame: &DynamicImage, bbox: BoundingBox) -> Self {
        let x = bbox.x.min(frame.width());
        let y = bbox.y.min(frame.height());
        let width = bbox.width.min(frame.width() - x);
        let height = bbox.height.min(frame.height() - y);
        let bbox = BoundingBox::new(x, y, width, height);
        Self {
            bbox,
            image: frame.crop_imm(x, y, width, height),
        }
    }
}

/// Text read from one variant of one region.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub text: String,
    /// Engine confidence on a 0..=100 scale.
    pub confidence: f32,
    pub source_variant: VariantKind,
}

/// The best extraction for a region in the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub result: ExtractionResult,
    /// Position of the winning variant in preprocessing order.
    pub variant_index: usize,
}

impl Candidate {
    pub fn text(&self) -> &str {
        &self.result.text
    }

    pub fn confidence(&self) -> f32 {
        self.result.confidence
    }

    pub fn variant(&self) -> VariantKind {
        self.result.source_variant
    }
}

/// A candidate that passed format validation.
#[derive(Debug, Clone)]
pub struct ValidatedReading {
    pub plate: String,
    pub confidence: f32,
    pub source_variant: VariantKind,
    pub region: Region,
    pub timestamp: OffsetDateTime,
    /// From the start of the frame (or single-region call) to the decision.
    pub processing_time: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionReason {
    New,
    Duplicate,
    LowConfidence,
    InvalidFormat,
    NoText,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::New => "NEW",
            DecisionReason::Duplicate => "DUPLICATE",
            DecisionReason::LowConfidence => "LOW_CONFIDENCE",
            DecisionReason::InvalidFormat => "INVALID_FORMAT",
            DecisionReason::NoText => "NO_TEXT",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verdict for one region in one frame.
#[derive(Debug, Clone)]
pub struct Decision {
    pub accepted: bool,
    pub reason: DecisionReason,
    pub bbox: BoundingBox,
    pub reading: Option<ValidatedReading>,
    /// The selected candidate, when extraction found any text.
    pub candidate: Option<Candidate>,
}

impl Decision {
    pub fn no_text(bbox: BoundingBox) -> Self {
        Self {
            accepted: false,
            reason: DecisionReason::NoText,
            bbox,
            reading: None,
            candidate: None,
        }
    }

    pub fn rejected(bbox: BoundingBox, reason: DecisionReason, candidate: Candidate) -> Self {
        Self {
            accepted: false,
            reason,
            bbox,
            reading: None,
            candidate: Some(candidate),
        }
    }

    pub fn new_plate(reading: ValidatedReading, candidate: Candidate) -> Self {
        Self {
            accepted: true,
            reason: DecisionReason::New,
            bbox: reading.region.bbox,
            reading: Some(reading),
            candidate: Some(candidate),
        }
    }

    pub fn duplicate(reading: ValidatedReading, candidate: Candidate) -> Self {
        Self {
            accepted: false,
            reason: DecisionReason::Duplicate,
            bbox: reading.region.bbox,
            reading: Some(reading),
            candidate: Some(candidate),
        }
    }

    /// Plate text to show for this decision, normalized when available.
    pub fn display_text(&self) -> Option<&str> {
        self.reading
            .as_ref()
            .map(|r| r.plate.as_str())
            .or_else(|| self.candidate.as_ref().map(Candidate::text))
    }
}
