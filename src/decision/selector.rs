use std::cmp::Ordering;

use futures_util::future::try_join_all;
use log::debug;

use crate::detection::preprocessing::Variant;
use crate::error::ExtractionError;
use crate::models::{Candidate, ExtractionResult, Region};
use crate::ocr::{TextEngine, TextExtractionAdapter};

/// Ensembles extraction over every variant of a region.
pub struct CandidateSelector<E> {
    adapter: TextExtractionAdapter<E>,
}

impl<E: TextEngine> CandidateSelector<E> {
    pub fn new(adapter: TextExtractionAdapter<E>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &TextExtractionAdapter<E> {
        &self.adapter
    }

    /// Extract from every variant concurrently and pick the best reading.
    ///
    /// Any hard engine failure fails the whole region.
    pub async fn select(
        &self,
        region: &Region,
        variants: &[Variant],
    ) -> Result<Option<Candidate>, ExtractionError> {
        let results = try_join_all(variants.iter().map(|v| self.adapter.extract(v))).await?;
        let best = pick_best(results);

        match &best {
            Some(candidate) => debug!(
                "region {}: best of {} variants is {:?} from {} ({:.1})",
                region.bbox,
                variants.len(),
                candidate.text(),
                candidate.variant(),
                candidate.confidence()
            ),
            None => debug!("region {}: no text in {} variants", region.bbox, variants.len()),
        }
        Ok(best)
    }
}

/// Highest confidence wins; ties go to the earliest position.
///
/// `results` is indexed by variant generation order, with `None` for variants
/// that produced no text.
pub fn pick_best(results: Vec<Option<ExtractionResult>>) -> Option<Candidate> {
    results
        .into_iter()
        .enumerate()
        .filter_map(|(variant_index, result)| result.map(|result| Candidate { result, variant_index }))
        .max_by(rank)
}

fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    a.confidence()
        .total_cmp(&b.confidence())
        .then_with(|| b.variant_index.cmp(&a.variant_index))
}
