#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from platewatch for tests
pub use platewatch::detection::{Variant, VariantKind};
pub use platewatch::{
    BoundingBox, Decision, DecisionEngine, DecisionReason, ManualClock, Region, RegionOutcome,
    Settings,
};
