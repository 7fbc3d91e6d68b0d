use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;

use super::has_content;

/// One exported detection. Column names match the historical CSV layout.
#[derive(Debug, Clone, Serialize)]
pub struct CsvRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Plate_Number")]
    pub plate_number: String,
    #[serde(rename = "Confidence")]
    pub confidence: String,
    #[serde(rename = "Image_Path")]
    pub image_path: String,
}

/// Append-only CSV file; the header is written when the file is new.
#[derive(Debug, Clone)]
pub struct CsvExport {
    path: PathBuf,
}

impl CsvExport {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn append(&self, record: &CsvRecord) -> anyhow::Result<()> {
        let write_header = !has_content(&self.path);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open CSV export {:?}", self.path))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}
