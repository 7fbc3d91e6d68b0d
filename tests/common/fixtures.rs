use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image::{DynamicImage, GrayImage, Luma};
use parking_lot::Mutex;
use platewatch::detection::Variant;
use platewatch::{
    BoundingBox, DecisionEngine, ExtractionError, ManualClock, Recognition, Region, Settings,
    TextEngine, ValidatedReading,
};
use platewatch::store::PersistenceGateway;
use time::OffsetDateTime;
use time::macros::datetime;

/// 2026-10-16 08:00:00 UTC, the start of every scripted session.
pub const START: OffsetDateTime = datetime!(2026-10-16 08:00:00 UTC);

/// What the scripted engine answers for one variant.
#[derive(Debug, Clone)]
pub enum Script {
    Text(&'static str, f32),
    Empty,
    Fail,
    /// Never answers; only useful with a paused tokio clock.
    Hang,
}

type ScriptFn = dyn Fn(&Variant) -> Script + Send + Sync;

/// Engine whose answers are decided by a closure over the variant.
pub struct ScriptedEngine {
    script: Box<ScriptFn>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(script: impl Fn(&Variant) -> Script + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    /// Same answer for every variant.
    pub fn constant(script: Script) -> Self {
        Self::new(move |_| script.clone())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn recognize(&self, variant: &Variant) -> Result<Option<Recognition>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (self.script)(variant) {
            Script::Text(text, confidence) => Ok(Some(Recognition::new(text, confidence))),
            Script::Empty => Ok(None),
            Script::Fail => Err(ExtractionError::unavailable("scripted", "engine crashed")),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
        }
    }
}

/// Gateway that remembers what it was asked to persist.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    pub plates: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingGateway {
    pub fn failing() -> Self {
        Self {
            plates: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn persisted(&self) -> Vec<String> {
        self.plates.lock().clone()
    }
}

impl PersistenceGateway for RecordingGateway {
    async fn persist(&self, reading: &ValidatedReading) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("disk full");
        }
        self.plates.lock().push(reading.plate.clone());
        Ok(())
    }
}

/// Defaults with a 10 second suppression window.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.suppression.cooldown_secs = 10.0;
    settings
}

/// Decision engine on a manual clock starting at [`START`].
pub fn build_engine(
    settings: &Settings,
    engine: ScriptedEngine,
) -> (DecisionEngine<ScriptedEngine>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    let decision_engine = DecisionEngine::from_settings(settings, engine, clock.clone())
        .expect("test settings should be valid");
    (decision_engine, clock)
}

/// Uniform mid-gray image.
pub fn gray_frame(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([128u8])))
}

/// Region at `(x, 0)` with a uniform image of the given size.
pub fn region(x: u32, width: u32, height: u32) -> Region {
    Region::new(BoundingBox::new(x, 0, width, height), gray_frame(width, height))
}

/// 200x40 region, comfortably inside the default area bounds.
pub fn plate_region(x: u32) -> Region {
    region(x, 200, 40)
}
