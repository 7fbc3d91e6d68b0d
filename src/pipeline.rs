use std::collections::VecDeque;
use std::time::{Duration, Instant};

use image::DynamicImage;
use log::{error, info, warn};

use crate::config::SessionSettings;
use crate::decision::{DecisionEngine, FrameReport};
use crate::detection::regions::RegionDetector;
use crate::models::Decision;
use crate::ocr::TextEngine;
use crate::overlay::Overlay;
use crate::store::PersistenceGateway;

/// Rolling frame-rate estimate.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    frame_times: VecDeque<Duration>,
    capacity: usize,
}

impl PerformanceMonitor {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frame_times: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn add_frame_time(&mut self, duration: Duration) {
        if self.frame_times.len() == self.capacity {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(duration);
    }

    pub fn fps(&self) -> f64 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let total: Duration = self.frame_times.iter().sum();
        if total.is_zero() {
            return 0.0;
        }
        self.frame_times.len() as f64 / total.as_secs_f64()
    }
}

/// Tracks consecutive frames in which the recognition engine failed.
#[derive(Debug, Clone)]
pub struct EngineHealth {
    degraded_after: u32,
    consecutive_failures: u32,
}

impl EngineHealth {
    pub fn new(degraded_after: u32) -> Self {
        Self {
            degraded_after: degraded_after.max(1),
            consecutive_failures: 0,
        }
    }

    pub fn record_frame(&mut self, failures: usize) {
        let was_degraded = self.is_degraded();
        if failures > 0 {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        } else {
            self.consecutive_failures = 0;
        }

        match (was_degraded, self.is_degraded()) {
            (false, true) => warn!(
                "recognition engine degraded: failures in {} consecutive frames",
                self.consecutive_failures
            ),
            (true, false) => info!("recognition engine recovered"),
            _ => {}
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.consecutive_failures >= self.degraded_after
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

/// What one processed frame produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameSummary {
    pub frame_index: u64,
    pub regions: usize,
    pub decisions: usize,
    pub accepted: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub discarded: usize,
}

/// Drives frames through detection, decision, persistence and display.
pub struct Session<D, E, P, O> {
    detector: D,
    engine: DecisionEngine<E>,
    gateway: Option<P>,
    overlay: O,
    monitor: PerformanceMonitor,
    health: EngineHealth,
    frame_skip: u64,
    frame_count: u64,
    processed: u64,
    accepted: u64,
}

impl<D, E, P, O> Session<D, E, P, O>
where
    D: RegionDetector,
    E: TextEngine,
    P: PersistenceGateway,
    O: Overlay,
{
    /// `gateway` may be `None` to run without saving anything.
    pub fn new(
        detector: D,
        engine: DecisionEngine<E>,
        gateway: Option<P>,
        overlay: O,
        settings: &SessionSettings,
    ) -> Self {
        Self {
            detector,
            engine,
            gateway,
            overlay,
            monitor: PerformanceMonitor::new(settings.performance_window),
            health: EngineHealth::new(settings.degraded_after),
            frame_skip: u64::from(settings.frame_skip.max(1)),
            frame_count: 0,
            processed: 0,
            accepted: 0,
        }
    }

    /// Feed the next frame. Returns `None` when the frame is skipped.
    pub async fn process(&mut self, frame: &DynamicImage) -> Option<FrameSummary> {
        self.frame_count += 1;
        if self.frame_count % self.frame_skip != 0 {
            return None;
        }
        let started = Instant::now();

        let regions = self.detector.detect(frame);
        let region_count = regions.len();
        let report = self.engine.process_frame(regions).await;

        let persisted = self.persist_accepted(&report).await;
        let decisions: Vec<&Decision> = report.decisions().collect();
        self.overlay.show(self.frame_count, &decisions);

        let failures = report.failures();
        self.health.record_frame(failures);
        self.monitor.add_frame_time(started.elapsed());

        let accepted = decisions.iter().filter(|d| d.accepted).count();
        self.processed += 1;
        self.accepted += accepted as u64;

        Some(FrameSummary {
            frame_index: self.frame_count,
            regions: region_count,
            decisions: decisions.len(),
            accepted,
            persisted,
            skipped: failures,
            discarded: report.discarded,
        })
    }

    async fn persist_accepted(&self, report: &FrameReport) -> usize {
        let Some(gateway) = &self.gateway else {
            return 0;
        };

        let mut persisted = 0;
        for reading in report.accepted() {
            match gateway.persist(reading).await {
                Ok(()) => persisted += 1,
                Err(e) => error!("failed to save plate {}: {:#}", reading.plate, e),
            }
        }
        persisted
    }

    pub fn engine(&self) -> &DecisionEngine<E> {
        &self.engine
    }

    pub fn gateway(&self) -> Option<&P> {
        self.gateway.as_ref()
    }

    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    pub fn health(&self) -> &EngineHealth {
        &self.health
    }

    pub fn fps(&self) -> f64 {
        self.monitor.fps()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frame_count
    }

    pub fn frames_processed(&self) -> u64 {
        self.processed
    }

    pub fn plates_accepted(&self) -> u64 {
        self.accepted
    }
}
