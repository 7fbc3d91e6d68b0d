use std::collections::HashMap;

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::models::BoundingBox;

/// Connected blob of edge pixels.
#[derive(Debug, Clone)]
pub struct Contour {
    pub label: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub pixel_count: u32,
}

impl Contour {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.min_x, self.min_y, self.width(), self.height())
    }
}

/// Find contours in binary edge image using connected components
pub fn find_contours(edges: &GrayImage, min_pixels: u32) -> Vec<Contour> {
    let labeled = connected_components(edges, Connectivity::Eight, Luma([0]));

    let mut regions: HashMap<u32, (u32, u32, u32, u32, u32)> = HashMap::new();
    for (x, y, label) in labeled.enumerate_pixels() {
        let label_val = label[0];
        if label_val == 0 {
            continue; // background
        }

        regions
            .entry(label_val)
            .and_modify(|(min_x, min_y, max_x, max_y, count)| {
                *min_x = (*min_x).min(x);
                *min_y = (*min_y).min(y);
                *max_x = (*max_x).max(x);
                *max_y = (*max_y).max(y);
                *count += 1;
            })
            .or_insert((x, y, x, y, 1));
    }

    let mut contours: Vec<Contour> = regions
        .into_iter()
        .map(|(label, (min_x, min_y, max_x, max_y, count))| Contour {
            label,
            min_x,
            min_y,
            max_x,
            max_y,
            pixel_count: count,
        })
        .filter(|c| c.pixel_count >= min_pixels)
        .collect();
    // HashMap order is random; keep detections stable between runs
    contours.sort_by_key(|c| (c.min_y, c.min_x, c.label));
    contours
}
