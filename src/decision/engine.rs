use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use log::{debug, info, warn};
use time::OffsetDateTime;

use super::selector::CandidateSelector;
use super::suppression::DuplicateSuppressionManager;
use super::validator::{FormatValidator, Rejection, ValidPlate};
use crate::clock::Clock;
use crate::config::Settings;
use crate::detection::preprocessing::PreprocessingBank;
use crate::detection::regions::RegionFilter;
use crate::error::{ConfigError, ExtractionError};
use crate::models::{BoundingBox, Candidate, Decision, Region, ValidatedReading};
use crate::ocr::{TextEngine, TextExtractionAdapter};

/// Result of the suppression-independent part of the chain.
enum Evaluation {
    NoText,
    Rejected(Candidate, Rejection),
    Valid(Candidate, ValidPlate),
}

/// What happened to one admitted region of a frame.
#[derive(Debug)]
pub enum RegionOutcome {
    Decided(Decision),
    /// The engine failed for this region; nothing was decided or registered.
    Skipped {
        bbox: BoundingBox,
        error: ExtractionError,
    },
}

#[derive(Debug, Default)]
pub struct FrameReport {
    /// One entry per admitted region, in input order.
    pub outcomes: Vec<RegionOutcome>,
    /// Regions dropped by the area filter before evaluation.
    pub discarded: usize,
}

impl FrameReport {
    pub fn decisions(&self) -> impl Iterator<Item = &Decision> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            RegionOutcome::Decided(decision) => Some(decision),
            RegionOutcome::Skipped { .. } => None,
        })
    }

    pub fn accepted(&self) -> impl Iterator<Item = &ValidatedReading> {
        self.decisions()
            .filter(|d| d.accepted)
            .filter_map(|d| d.reading.as_ref())
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RegionOutcome::Skipped { .. }))
            .count()
    }
}

/// Turns plate regions into decisions: preprocess, extract, select,
/// validate, then consult the suppression window.
pub struct DecisionEngine<E> {
    filter: RegionFilter,
    bank: PreprocessingBank,
    selector: CandidateSelector<E>,
    validator: FormatValidator,
    suppression: Arc<DuplicateSuppressionManager>,
    clock: Arc<dyn Clock>,
}

impl<E: TextEngine> DecisionEngine<E> {
    pub fn new(
        filter: RegionFilter,
        bank: PreprocessingBank,
        selector: CandidateSelector<E>,
        validator: FormatValidator,
        suppression: Arc<DuplicateSuppressionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            filter,
            bank,
            selector,
            validator,
            suppression,
            clock,
        }
    }

    /// Build every component from settings. Fails on invalid configuration.
    pub fn from_settings(
        settings: &Settings,
        engine: E,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let adapter = TextExtractionAdapter::new(engine, settings.extraction.timeout())?;
        Ok(Self::new(
            RegionFilter::new(&settings.region)?,
            PreprocessingBank::new(settings.preprocessing.clone())?,
            CandidateSelector::new(adapter),
            FormatValidator::new(&settings.validation)?,
            Arc::new(DuplicateSuppressionManager::from_settings(&settings.suppression)?),
            clock,
        ))
    }

    pub fn suppression(&self) -> &Arc<DuplicateSuppressionManager> {
        &self.suppression
    }

    pub fn validator(&self) -> &FormatValidator {
        &self.validator
    }

    pub fn engine(&self) -> &E {
        self.selector.adapter().engine()
    }

    /// Decide a single region. The area filter is not applied here.
    pub async fn decide(&self, region: Region) -> Result<Decision, ExtractionError> {
        let started = Instant::now();
        let evaluation = self.evaluate(&region).await?;
        Ok(self.conclude(region, evaluation, self.clock.now(), started.elapsed()))
    }

    /// Decide every region of one frame.
    ///
    /// Regions outside the area bounds are discarded. The rest are evaluated
    /// concurrently; suppression is then consulted one region at a time in
    /// input order, so identical plates in one frame yield a single NEW.
    ///
    /// Nothing is registered until every region has been evaluated, so
    /// dropping the future early leaves the suppression window untouched.
    pub async fn process_frame(&self, regions: Vec<Region>) -> FrameReport {
        let started = Instant::now();
        let (admitted, rejected): (Vec<Region>, Vec<Region>) =
            regions.into_iter().partition(|r| self.filter.admits(&r.bbox));
        if !rejected.is_empty() {
            debug!("discarded {} regions outside area bounds", rejected.len());
        }

        let evaluations = join_all(admitted.iter().map(|region| self.evaluate(region))).await;

        let now = self.clock.now();
        let elapsed = started.elapsed();
        let outcomes = admitted
            .into_iter()
            .zip(evaluations)
            .map(|(region, evaluation)| match evaluation {
                Ok(evaluation) => {
                    RegionOutcome::Decided(self.conclude(region, evaluation, now, elapsed))
                }
                Err(error) => {
                    warn!("skipping region {}: {}", region.bbox, error);
                    RegionOutcome::Skipped {
                        bbox: region.bbox,
                        error,
                    }
                }
            })
            .collect();

        FrameReport {
            outcomes,
            discarded: rejected.len(),
        }
    }

    async fn evaluate(&self, region: &Region) -> Result<Evaluation, ExtractionError> {
        let variants = self.bank.generate(region);
        let Some(candidate) = self.selector.select(region, &variants).await? else {
            return Ok(Evaluation::NoText);
        };

        Ok(match self.validator.validate(&candidate) {
            Ok(valid) => Evaluation::Valid(candidate, valid),
            Err(rejection) => Evaluation::Rejected(candidate, rejection),
        })
    }

    fn conclude(
        &self,
        region: Region,
        evaluation: Evaluation,
        now: OffsetDateTime,
        processing_time: Duration,
    ) -> Decision {
        match evaluation {
            Evaluation::NoText => Decision::no_text(region.bbox),
            Evaluation::Rejected(candidate, rejection) => {
                debug!("rejected {:?} at {}: {}", candidate.text(), region.bbox, rejection);
                Decision::rejected(region.bbox, rejection.reason(), candidate)
            }
            Evaluation::Valid(candidate, valid) => {
                let reading = ValidatedReading {
                    plate: valid.plate,
                    confidence: valid.confidence,
                    source_variant: candidate.variant(),
                    region,
                    timestamp: now,
                    processing_time,
                };
                if self.suppression.check_and_register(&reading.plate, now) {
                    info!(
                        "new plate {} ({:.1}%, {})",
                        reading.plate, reading.confidence, reading.source_variant
                    );
                    Decision::new_plate(reading, candidate)
                } else {
                    debug!("duplicate plate {}", reading.plate);
                    Decision::duplicate(reading, candidate)
                }
            }
        }
    }
}
