use log::{debug, info};

use crate::models::Decision;

/// Read-only consumer of every decision, accepted or not.
pub trait Overlay: Send {
    fn show(&mut self, frame_index: u64, decisions: &[&Decision]);
}

/// Writes decisions to the log instead of drawing them.
#[derive(Debug, Default)]
pub struct LogOverlay;

impl Overlay for LogOverlay {
    fn show(&mut self, frame_index: u64, decisions: &[&Decision]) {
        for decision in decisions {
            let text = decision.display_text().unwrap_or("-");
            let confidence = decision
                .candidate
                .as_ref()
                .map(|c| format!("{:.1}%", c.confidence()))
                .unwrap_or_default();
            if decision.accepted {
                info!(
                    "frame {frame_index}: [{}] {} {} at {}",
                    decision.reason, text, confidence, decision.bbox
                );
            } else {
                debug!(
                    "frame {frame_index}: [{}] {} {} at {}",
                    decision.reason, text, confidence, decision.bbox
                );
            }
        }
    }
}

/// Keeps every decision it is shown. Useful for replays and tests.
#[derive(Debug, Default)]
pub struct RecordingOverlay {
    pub frames: Vec<(u64, Vec<Decision>)>,
}

impl Overlay for RecordingOverlay {
    fn show(&mut self, frame_index: u64, decisions: &[&Decision]) {
        self.frames
            .push((frame_index, decisions.iter().map(|d| (*d).clone()).collect()));
    }
}
