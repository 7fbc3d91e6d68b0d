pub mod clock;
pub mod config;
pub mod decision;
pub mod detection;
pub mod error;
pub mod frames;
pub mod models;
pub mod ocr;
pub mod overlay;
pub mod pipeline;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Normalization, Settings};
pub use decision::{
    CandidateSelector, DecisionEngine, DuplicateSuppressionManager, FormatValidator, FrameReport,
    RegionOutcome,
};
pub use detection::{PreprocessingBank, RegionDetector, RegionFilter, Variant, VariantKind};
pub use error::{ConfigError, ExtractionError};
pub use models::{
    BoundingBox, Candidate, Decision, DecisionReason, ExtractionResult, Region, ValidatedReading,
};
pub use ocr::{EngineBackend, Recognition, TextEngine, TextExtractionAdapter};
pub use pipeline::{EngineHealth, FrameSummary, PerformanceMonitor, Session};
pub use store::{PersistenceGateway, PlateStore};
