use std::path::{Path, PathBuf};

use anyhow::Context;
use image::{DynamicImage, ImageReader};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// Image files replayed as a frame sequence.
///
/// Directories are expanded to the images they contain, in lexical order.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    paths: Vec<PathBuf>,
}

impl FrameSequence {
    pub fn from_inputs(inputs: &[PathBuf]) -> anyhow::Result<Self> {
        let mut paths = Vec::new();
        for input in inputs {
            if input.is_dir() {
                let mut entries: Vec<PathBuf> = std::fs::read_dir(input)
                    .with_context(|| format!("Failed to read directory {:?}", input))?
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|path| is_image(path))
                    .collect();
                entries.sort();
                paths.extend(entries);
            } else {
                paths.push(input.clone());
            }
        }
        Ok(Self { paths })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, anyhow::Result<DynamicImage>)> {
        self.paths.iter().map(|path| (path.as_path(), load_frame(path)))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn load_frame(path: &Path) -> anyhow::Result<DynamicImage> {
    ImageReader::open(path)
        .with_context(|| format!("Failed to open frame {:?}", path))?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode frame {:?}: {}", path, e))
}
