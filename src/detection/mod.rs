pub mod contours;
pub mod preprocessing;
pub mod regions;

pub use preprocessing::{PreprocessingBank, Variant, VariantKind};
pub use regions::{EdgeRegionDetector, FullFrameDetector, RegionDetector, RegionFilter};
