//! Integration tests for candidate selection across preprocessing variants.

mod common;

use std::time::Duration;

use platewatch::decision::{CandidateSelector, pick_best};
use platewatch::{ExtractionResult, PreprocessingBank, TextExtractionAdapter};

use common::*;

fn result(text: &str, confidence: f32, kind: VariantKind) -> Option<ExtractionResult> {
    Some(ExtractionResult {
        text: text.to_string(),
        confidence,
        source_variant: kind,
    })
}

fn selector(engine: ScriptedEngine) -> CandidateSelector<ScriptedEngine> {
    let adapter = TextExtractionAdapter::new(engine, Duration::from_secs(1))
        .expect("non-zero timeout");
    CandidateSelector::new(adapter)
}

fn variants(region: &Region) -> Vec<Variant> {
    PreprocessingBank::new(Settings::default().preprocessing)
        .expect("default preprocessing is valid")
        .generate(region)
}

#[test]
fn test_best_is_maximum_under_any_order() {
    let readings = [
        ("AAA111", 55.0, VariantKind::Grayscale),
        ("BBB222", 91.0, VariantKind::AdaptiveThreshold),
        ("CCC333", 70.0, VariantKind::Otsu),
    ];
    let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

    for order in orders {
        let mut results: Vec<_> = order
            .iter()
            .map(|&i| result(readings[i].0, readings[i].1, readings[i].2))
            .collect();
        results.push(None);

        let best = pick_best(results).expect("three readings present");
        assert_eq!(best.text(), "BBB222", "order {:?}", order);
        assert_eq!(best.confidence(), 91.0);
    }
}

#[test]
fn test_ties_go_to_earliest_variant_every_time() {
    for _ in 0..10 {
        let best = pick_best(vec![
            None,
            result("FIRST1", 80.0, VariantKind::AdaptiveThreshold),
            result("SECOND", 80.0, VariantKind::Otsu),
            result("THIRD3", 80.0, VariantKind::ContrastEnhanced),
        ])
        .expect("readings present");
        assert_eq!(best.text(), "FIRST1");
        assert_eq!(best.variant_index, 1);
    }
}

#[test]
fn test_all_empty_yields_no_candidate() {
    assert!(pick_best(vec![None, None, None, None]).is_none());
    assert!(pick_best(Vec::new()).is_none());
}

#[tokio::test]
async fn test_select_tags_winning_variant() -> anyhow::Result<()> {
    let selector = selector(ScriptedEngine::new(|variant| match variant.kind {
        VariantKind::Otsu => Script::Text("OTS123", 97.0),
        _ => Script::Text("OTHER1", 60.0),
    }));
    let region = plate_region(0);

    let candidate = selector
        .select(&region, &variants(&region))
        .await?
        .expect("text was found");

    assert_eq!(candidate.text(), "OTS123");
    assert_eq!(candidate.variant(), VariantKind::Otsu);
    assert_eq!(candidate.variant_index, 2);

    Ok(())
}

#[tokio::test]
async fn test_select_fails_when_any_variant_fails() {
    let selector = selector(ScriptedEngine::new(|variant| match variant.kind {
        VariantKind::ContrastEnhanced => Script::Fail,
        _ => Script::Text("ABC123", 99.0),
    }));
    let region = plate_region(0);

    let outcome = selector.select(&region, &variants(&region)).await;

    assert!(outcome.is_err());
}

#[tokio::test]
async fn test_select_clamps_engine_confidence() -> anyhow::Result<()> {
    let selector = selector(ScriptedEngine::new(|variant| match variant.kind {
        VariantKind::Grayscale => Script::Text("HIGH12", 140.0),
        VariantKind::AdaptiveThreshold => Script::Text("NAN123", f32::NAN),
        _ => Script::Empty,
    }));
    let region = plate_region(0);

    let candidate = selector
        .select(&region, &variants(&region))
        .await?
        .expect("text was found");

    assert_eq!(candidate.text(), "HIGH12");
    assert_eq!(candidate.confidence(), 100.0);

    Ok(())
}
