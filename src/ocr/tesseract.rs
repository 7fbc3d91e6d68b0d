use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;

use image::{DynamicImage, ImageFormat};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Recognition, TextEngine};
use crate::detection::preprocessing::Variant;
use crate::error::ExtractionError;

const ENGINE_NAME: &str = "tesseract";

/// Runs the tesseract executable once per page segmentation mode and keeps
/// the most confident reading.
///
/// The image goes in as PNG on stdin and word-level TSV comes back on stdout.
/// Child processes are killed if the call is dropped (timeout or shutdown).
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    whitelist: String,
    page_seg_modes: Vec<u8>,
}

impl TesseractEngine {
    pub fn new(binary: PathBuf, whitelist: String, page_seg_modes: Vec<u8>) -> Self {
        Self {
            binary,
            whitelist,
            page_seg_modes,
        }
    }

    async fn run(&self, png: &[u8], psm: u8) -> Result<Option<Recognition>, ExtractionError> {
        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("--psm")
            .arg(psm.to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", self.whitelist))
            .arg("tsv")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ExtractionError::unavailable(
                    ENGINE_NAME,
                    format!("failed to launch {}: {e}", self.binary.display()),
                )
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExtractionError::unavailable(ENGINE_NAME, "stdin was not captured"))?;
        stdin
            .write_all(png)
            .await
            .map_err(|e| ExtractionError::unavailable(ENGINE_NAME, format!("failed to send image: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExtractionError::unavailable(ENGINE_NAME, e.to_string()))?;
        if !output.status.success() {
            return Err(ExtractionError::unavailable(
                ENGINE_NAME,
                format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl TextEngine for TesseractEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    async fn recognize(&self, variant: &Variant) -> Result<Option<Recognition>, ExtractionError> {
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(variant.image.clone())
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ExtractionError::unavailable(ENGINE_NAME, format!("failed to encode image: {e}")))?;

        let mut best: Option<Recognition> = None;
        for &psm in &self.page_seg_modes {
            if let Some(reading) = self.run(&png, psm).await? {
                if best.as_ref().is_none_or(|b| reading.confidence > b.confidence) {
                    best = Some(reading);
                }
            }
        }
        Ok(best)
    }
}

/// Join the confident words of a tesseract TSV report.
///
/// Only word rows (level 5) with a positive confidence count; the reading's
/// confidence is the mean over those words.
fn parse_tsv(tsv: &str) -> Option<Recognition> {
    let mut text = String::new();
    let mut confidences = Vec::new();

    for line in tsv.lines().skip(1) {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < 12 || columns[0] != "5" {
            continue;
        }
        let Ok(confidence) = columns[10].trim().parse::<f32>() else {
            continue;
        };
        let word = columns[11].trim();
        if confidence > 0.0 && !word.is_empty() {
            text.push_str(word);
            confidences.push(confidence);
        }
    }

    if text.is_empty() {
        return None;
    }
    let mean = confidences.iter().sum::<f32>() / confidences.len() as f32;
    Some(Recognition::new(text, mean))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn words_are_joined_and_confidence_averaged() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t200\t50\t-1\t\n\
             5\t1\t1\t1\t1\t1\t4\t6\t80\t30\t90.5\tAB12\n\
             5\t1\t1\t1\t1\t2\t90\t6\t90\t30\t79.5\tCD3\n"
        );
        let reading = parse_tsv(&tsv).unwrap();
        assert_eq!(reading.text, "AB12CD3");
        assert!((reading.confidence - 85.0).abs() < 1e-4);
    }

    #[test]
    fn unconfident_and_empty_words_are_ignored() {
        let tsv = format!(
            "{HEADER}\n\
             5\t1\t1\t1\t1\t1\t4\t6\t80\t30\t0\tXX\n\
             5\t1\t1\t1\t1\t2\t4\t6\t80\t30\t95\t \n"
        );
        assert_eq!(parse_tsv(&tsv), None);
    }

    #[test]
    fn header_only_report_has_no_text() {
        assert_eq!(parse_tsv(HEADER), None);
    }
}
