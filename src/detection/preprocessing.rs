use std::fmt;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

use crate::config::PreprocessingSettings;
use crate::error::ConfigError;
use crate::models::Region;

/// Smallest side a blurred variant is computed for.
const MIN_FILTER_SIDE: u32 = 3;

/// Preprocessing transforms, in generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantKind {
    Grayscale,
    AdaptiveThreshold,
    Otsu,
    ContrastEnhanced,
}

impl VariantKind {
    pub const ALL: [VariantKind; 4] = [
        VariantKind::Grayscale,
        VariantKind::AdaptiveThreshold,
        VariantKind::Otsu,
        VariantKind::ContrastEnhanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Grayscale => "grayscale",
            VariantKind::AdaptiveThreshold => "adaptive-threshold",
            VariantKind::Otsu => "otsu",
            VariantKind::ContrastEnhanced => "contrast-enhanced",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One preprocessed rendering of a region.
#[derive(Debug, Clone)]
pub struct Variant {
    pub kind: VariantKind,
    pub image: GrayImage,
}

/// Derives lighting-robust variants of a region.
#[derive(Debug, Clone)]
pub struct PreprocessingBank {
    settings: PreprocessingSettings,
}

impl PreprocessingBank {
    pub fn new(settings: PreprocessingSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// Variants in [`VariantKind::ALL`] order. Transforms that cannot be
    /// computed for this region are left out, so the result may be short or empty.
    pub fn generate(&self, region: &Region) -> Vec<Variant> {
        let gray = to_grayscale(&region.image);
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let mut variants = Vec::with_capacity(VariantKind::ALL.len());
        let filterable = width >= MIN_FILTER_SIDE && height >= MIN_FILTER_SIDE;

        if filterable {
            let blurred = apply_blur(&gray, self.settings.blur_sigma);
            variants.push(Variant {
                kind: VariantKind::AdaptiveThreshold,
                image: adaptive_threshold(
                    &blurred,
                    self.settings.adaptive_sigma,
                    self.settings.adaptive_offset,
                ),
            });
            variants.push(Variant {
                kind: VariantKind::Otsu,
                image: otsu_threshold(&blurred),
            });
            let enhanced = clahe(&gray, self.settings.clahe_clip_limit, self.settings.clahe_grid);
            variants.push(Variant {
                kind: VariantKind::ContrastEnhanced,
                image: otsu_threshold(&enhanced),
            });
        }

        variants.insert(
            0,
            Variant {
                kind: VariantKind::Grayscale,
                image: gray,
            },
        );
        variants
    }
}

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(img, sigma)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Global binarization at the Otsu level; pixels above it become white.
pub fn otsu_threshold(img: &GrayImage) -> GrayImage {
    threshold(img, otsu_level(img), ThresholdType::Binary)
}

/// Local binarization against a Gaussian-weighted neighbourhood mean.
///
/// A pixel is white when it is brighter than its local mean minus `offset`.
pub fn adaptive_threshold(img: &GrayImage, sigma: f32, offset: f32) -> GrayImage {
    let local_mean = gaussian_blur_f32(img, sigma);
    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels() {
        let threshold = local_mean.get_pixel(x, y)[0] as f32 - offset;
        let value = if pixel[0] as f32 > threshold { 255 } else { 0 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into at most `grid` x `grid` tiles. Each tile gets an
/// equalization lookup table from its clipped histogram, and every pixel is
/// mapped by bilinear interpolation between the four nearest tile tables.
pub fn clahe(img: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }
    let tiles_x = grid.clamp(1, width) as usize;
    let tiles_y = grid.clamp(1, height) as usize;

    let mut luts = vec![[0u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        let y0 = (ty as u32 * height) / tiles_y as u32;
        let y1 = ((ty as u32 + 1) * height) / tiles_y as u32;
        for tx in 0..tiles_x {
            let x0 = (tx as u32 * width) / tiles_x as u32;
            let x1 = ((tx as u32 + 1) * width) / tiles_x as u32;

            let mut histogram = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    histogram[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let pixels = (x1 - x0) * (y1 - y0);
            luts[ty * tiles_x + tx] = tile_lut(&mut histogram, pixels, clip_limit);
        }
    }

    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;
    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels() {
        let (tx0, tx1, ax) = neighbours(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = neighbours(y, tile_h, tiles_y);
        let v = pixel[0] as usize;

        let top = luts[ty0 * tiles_x + tx0][v] as f32 * (1.0 - ax)
            + luts[ty0 * tiles_x + tx1][v] as f32 * ax;
        let bottom = luts[ty1 * tiles_x + tx0][v] as f32 * (1.0 - ax)
            + luts[ty1 * tiles_x + tx1][v] as f32 * ax;
        let value = top * (1.0 - ay) + bottom * ay;
        out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
    }
    out
}

fn tile_lut(histogram: &mut [u32; 256], pixels: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if pixels == 0 {
        return lut;
    }

    let limit = ((clip_limit * pixels as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in histogram.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in histogram.iter_mut().enumerate() {
        *bin += share + u32::from(i < remainder);
    }

    let mut cumulative = 0u32;
    for (i, bin) in histogram.iter().enumerate() {
        cumulative += bin;
        lut[i] = ((cumulative as f32 * 255.0) / pixels as f32).round().min(255.0) as u8;
    }
    lut
}

/// Indices of the two tiles whose centres surround `pos`, and the weight of the second.
fn neighbours(pos: u32, tile_size: f32, tiles: usize) -> (usize, usize, f32) {
    let g = (pos as f32 + 0.5) / tile_size - 0.5;
    let last = tiles - 1;
    let t0 = (g.floor().max(0.0) as usize).min(last);
    let t1 = (t0 + 1).min(last);
    let weight = if t1 == t0 { 0.0 } else { (g - t0 as f32).clamp(0.0, 1.0) };
    (t0, t1, weight)
}
