pub mod engine;
pub mod selector;
pub mod suppression;
pub mod validator;

pub use engine::{DecisionEngine, FrameReport, RegionOutcome};
pub use selector::{CandidateSelector, pick_best};
pub use suppression::DuplicateSuppressionManager;
pub use validator::{FormatValidator, Rejection, ValidPlate};
