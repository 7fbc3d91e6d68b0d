//! Integration tests for plate format rules.

mod common;

use platewatch::config::ValidationSettings;
use platewatch::decision::Rejection;
use platewatch::{Candidate, ConfigError, ExtractionResult, FormatValidator, Normalization};

use common::*;

fn candidate(text: &str, confidence: f32) -> Candidate {
    Candidate {
        result: ExtractionResult {
            text: text.to_string(),
            confidence,
            source_variant: VariantKind::Grayscale,
        },
        variant_index: 0,
    }
}

fn rules(min_length: usize, max_length: usize) -> ValidationSettings {
    ValidationSettings {
        min_confidence: 80.0,
        min_length,
        max_length,
        ..ValidationSettings::default()
    }
}

fn validator(settings: &ValidationSettings) -> FormatValidator {
    FormatValidator::new(settings).expect("valid rules")
}

#[test]
fn test_length_boundaries() {
    let v = validator(&rules(6, 8));

    assert!(matches!(
        v.validate(&candidate("ABC12", 95.0)),
        Err(Rejection::TooShort { length: 5, .. })
    ));
    assert_eq!(v.validate(&candidate("ABC123", 95.0)).map(|p| p.plate), Ok("ABC123".to_string()));
    assert_eq!(
        v.validate(&candidate("ABCD1234", 95.0)).map(|p| p.plate),
        Ok("ABCD1234".to_string())
    );
    assert!(matches!(
        v.validate(&candidate("ABCD12345", 95.0)),
        Err(Rejection::TooLong { length: 9, .. })
    ));
}

#[test]
fn test_confidence_boundary_is_inclusive() {
    let v = validator(&rules(6, 8));

    assert!(v.validate(&candidate("ABC123", 80.0)).is_ok());
    let rejection = v.validate(&candidate("ABC123", 79.9)).unwrap_err();
    assert_eq!(rejection.reason(), DecisionReason::LowConfidence);
}

#[test]
fn test_low_confidence_reported_before_format() {
    let v = validator(&rules(6, 8));

    let rejection = v.validate(&candidate("??", 10.0)).unwrap_err();
    assert!(matches!(rejection, Rejection::LowConfidence { .. }));
}

#[test]
fn test_strict_mode_rejects_foreign_characters() {
    let v = validator(&rules(6, 8));

    assert_eq!(v.validate(&candidate("AB-1234", 95.0)), Err(Rejection::DisallowedChar('-')));
    assert_eq!(
        v.validate(&candidate("AB-1234", 95.0)).unwrap_err().reason(),
        DecisionReason::InvalidFormat
    );
}

#[test]
fn test_lenient_mode_drops_foreign_characters() {
    let settings = ValidationSettings {
        normalization: Normalization::Lenient,
        ..rules(6, 8)
    };
    let v = validator(&settings);

    let plate = v.validate(&candidate(" ab-12.34 ", 95.0)).expect("lenient accepts");
    assert_eq!(plate.plate, "AB1234");
    assert_eq!(plate.confidence, 95.0);

    // Length is measured after dropping
    assert!(matches!(
        v.validate(&candidate("A-B-C-1-2", 95.0)),
        Err(Rejection::TooShort { length: 5, .. })
    ));
}

#[test]
fn test_normalize_is_idempotent() {
    for normalization in [Normalization::Strict, Normalization::Lenient] {
        let v = validator(&ValidationSettings {
            normalization,
            ..rules(4, 10)
        });
        for raw in ["ab 123c", "  X y-Z 9 ", "ÄBC123", "", "plate\t42"] {
            let once = v.normalize(raw);
            assert_eq!(v.normalize(&once), once, "{:?} under {:?}", raw, normalization);
        }
    }
}

#[test]
fn test_normalize_strips_whitespace_and_uppercases() {
    let v = validator(&rules(4, 10));
    assert_eq!(v.normalize(" ab 12\tcd\n"), "AB12CD");
}

#[test]
fn test_pattern_must_match_whole_plate() {
    let settings = ValidationSettings {
        pattern: Some("[A-Z]{3}[0-9]{3}".to_string()),
        ..rules(6, 8)
    };
    let v = validator(&settings);

    assert!(v.validate(&candidate("ABC123", 95.0)).is_ok());
    assert_eq!(v.validate(&candidate("AB1234", 95.0)), Err(Rejection::PatternMismatch));
    assert_eq!(v.validate(&candidate("XABC123", 95.0)), Err(Rejection::PatternMismatch));
}

#[test]
fn test_invalid_rules_are_rejected() {
    let inverted = rules(9, 4);
    assert!(matches!(
        FormatValidator::new(&inverted),
        Err(ConfigError::Invalid { field: "validation.min_length", .. })
    ));

    let empty_alphabet = ValidationSettings {
        allowed_chars: "   ".to_string(),
        ..rules(4, 10)
    };
    assert!(matches!(FormatValidator::new(&empty_alphabet), Err(ConfigError::Invalid { .. })));

    let bad_pattern = ValidationSettings {
        pattern: Some("([A-Z".to_string()),
        ..rules(4, 10)
    };
    assert!(matches!(FormatValidator::new(&bad_pattern), Err(ConfigError::Pattern(_))));

    let out_of_range = ValidationSettings {
        min_confidence: 150.0,
        ..rules(4, 10)
    };
    assert!(FormatValidator::new(&out_of_range).is_err());
}
