use image::DynamicImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

use crate::config::RegionSettings;
use crate::detection::contours::find_contours;
use crate::detection::preprocessing::{apply_blur, detect_edges, to_grayscale};
use crate::error::ConfigError;
use crate::models::{BoundingBox, Region};

/// Proposes plate-shaped regions in a frame.
pub trait RegionDetector: Send + Sync {
    fn detect(&self, frame: &DynamicImage) -> Vec<Region>;
}

/// Area bounds every region must satisfy before the decision engine sees it.
#[derive(Debug, Clone, Copy)]
pub struct RegionFilter {
    pub min_area: u64,
    pub max_area: u64,
}

impl RegionFilter {
    pub fn new(settings: &RegionSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            min_area: settings.min_area as u64,
            max_area: settings.max_area as u64,
        })
    }

    pub fn admits(&self, bbox: &BoundingBox) -> bool {
        (self.min_area..=self.max_area).contains(&bbox.area())
    }
}

/// Treats the whole frame as a single region, for inputs that are already plate crops.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullFrameDetector;

impl RegionDetector for FullFrameDetector {
    fn detect(&self, frame: &DynamicImage) -> Vec<Region> {
        let bbox = BoundingBox::new(0, 0, frame.width(), frame.height());
        vec![Region::new(bbox, frame.clone())]
    }
}

/// Edge-based plate proposals: Canny edges, dilated so characters merge with
/// the plate border, grouped into connected components and filtered by shape.
#[derive(Debug, Clone)]
pub struct EdgeRegionDetector {
    pub blur_sigma: f32,
    pub low_threshold: f32,
    pub high_threshold: f32,
    pub dilation: u8,
    pub min_width: u32,
    pub min_height: u32,
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl EdgeRegionDetector {
    pub fn new(settings: &RegionSettings) -> Self {
        Self {
            blur_sigma: 1.5,
            low_threshold: 50.0,
            high_threshold: 100.0,
            dilation: 2,
            min_width: settings.min_width,
            min_height: settings.min_height,
            min_aspect: settings.min_aspect,
            max_aspect: settings.max_aspect,
        }
    }

    fn is_plate_shaped(&self, bbox: &BoundingBox) -> bool {
        let aspect = bbox.aspect_ratio();
        bbox.width >= self.min_width
            && bbox.height >= self.min_height
            && aspect >= self.min_aspect
            && aspect <= self.max_aspect
    }
}

impl RegionDetector for EdgeRegionDetector {
    fn detect(&self, frame: &DynamicImage) -> Vec<Region> {
        let gray = to_grayscale(frame);
        let blurred = apply_blur(&gray, self.blur_sigma);
        let edges = detect_edges(&blurred, self.low_threshold, self.high_threshold);
        let merged = dilate(&edges, Norm::LInf, self.dilation);

        find_contours(&merged, 10)
            .into_iter()
            .map(|c| c.bounding_box())
            .filter(|bbox| self.is_plate_shaped(bbox))
            .map(|bbox| Region::crop(frame, bbox))
            .collect()
    }
}

impl<D: RegionDetector + ?Sized> RegionDetector for Box<D> {
    fn detect(&self, frame: &DynamicImage) -> Vec<Region> {
        (**self).detect(frame)
    }
}
