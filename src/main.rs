use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use log::{error, info, warn};

use platewatch::config::{EngineKind, Settings};
use platewatch::detection::{EdgeRegionDetector, FullFrameDetector, RegionDetector};
use platewatch::frames::FrameSequence;
use platewatch::overlay::LogOverlay;
use platewatch::{Clock, DecisionEngine, EngineBackend, PlateStore, Session, SystemClock, TextEngine};

#[derive(Parser)]
#[command(name = "platewatch")]
#[command(about = "Read license plates from a frame sequence and log each new plate once")]
struct Cli {
    /// Frame images, or directories of them (processed in name order)
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// TOML settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the recognition engine from the settings file
    #[arg(long, value_enum)]
    engine: Option<EngineKind>,

    /// Treat each frame as an already-cropped plate
    #[arg(long)]
    full_frame: bool,

    /// Decide plates without writing records, exports or images
    #[arg(long)]
    no_save: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(engine) = args.engine {
        settings.extraction.engine = engine;
    }
    info!("configuration loaded");

    let frames = FrameSequence::from_inputs(&args.inputs)?;
    if frames.is_empty() {
        anyhow::bail!("no frames found in {:?}", args.inputs);
    }

    let backend = EngineBackend::from_settings(&settings.extraction)?;
    info!("recognition engine: {}", backend.name());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = DecisionEngine::from_settings(&settings, backend, clock.clone())?;

    let store = if args.no_save {
        None
    } else {
        Some(PlateStore::open(&settings.storage).await?)
    };

    let detector: Box<dyn RegionDetector> = if args.full_frame {
        Box::new(FullFrameDetector)
    } else {
        Box::new(EdgeRegionDetector::new(&settings.region))
    };

    let mut session = Session::new(detector, engine, store, LogOverlay, &settings.session);
    info!("processing {} frames (Ctrl-C to stop)", frames.len());

    // Ctrl-C stops the run between frames, never inside one, so a frame's
    // accepted plates are always persisted once registered.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupted.store(true, Ordering::SeqCst);
            }
        });
    }

    for (path, frame) in frames.iter() {
        if interrupted.load(Ordering::SeqCst) {
            info!("interrupted");
            break;
        }
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!("skipping {:?}: {:#}", path, e);
                continue;
            }
        };

        if let Some(summary) = session.process(&frame).await {
            if summary.accepted > 0 {
                info!("{:?}: {} new plate(s)", path, summary.accepted);
            }
        }
    }

    println!("\n=== Session Summary ===");
    println!("Frames seen: {}", session.frames_seen());
    println!("Frames processed: {}", session.frames_processed());
    println!("New plates: {}", session.plates_accepted());
    println!("Average FPS: {:.1}", session.fps());
    if session.health().is_degraded() {
        println!("Recognition engine: DEGRADED");
    }

    if let Some(store) = session.gateway() {
        match store.statistics(clock.now().date()).await {
            Ok(stats) => {
                println!("Today: {} detections, {} unique plates", stats.total, stats.unique);
                println!("Average confidence: {:.1}%", stats.average_confidence);
            }
            Err(e) => error!("failed to read statistics: {:#}", e),
        }
        println!("\nData saved in:");
        println!("  Database: {}", settings.storage.database.display());
        println!("  CSV: {}", settings.storage.csv.display());
        println!("  Images: {}/", settings.storage.images_dir.display());
        store.close().await;
    }

    Ok(())
}
