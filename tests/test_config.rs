//! Integration tests for loading settings from TOML.

mod common;

use std::io::Write;
use std::time::Duration;

use platewatch::config::EngineKind;
use platewatch::{ConfigError, Normalization};
use tempfile::NamedTempFile;

use common::*;

fn config_file(contents: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    file.write_all(contents.as_bytes())?;
    Ok(file)
}

#[test]
fn test_defaults_without_file() -> anyhow::Result<()> {
    let settings = Settings::load(None)?;

    assert_eq!(settings.validation.min_confidence, 80.0);
    assert_eq!(settings.validation.normalization, Normalization::Strict);
    assert_eq!(settings.suppression.cooldown(), Duration::from_secs(5));
    assert_eq!(settings.extraction.engine, EngineKind::Tesseract);
    assert_eq!(settings.region.min_area, 3000);
    assert_eq!(settings.session.frame_skip, 1);

    Ok(())
}

#[test]
fn test_partial_file_keeps_other_defaults() -> anyhow::Result<()> {
    let file = config_file(
        r#"
[validation]
min_confidence = 75.0
min_length = 5
normalization = "lenient"
pattern = "[A-Z]{2}[0-9]{3,4}"

[suppression]
cooldown_secs = 2.5

[extraction]
engine = "ocrs"
timeout_ms = 400
"#,
    )?;

    let settings = Settings::load(Some(file.path()))?;

    assert_eq!(settings.validation.min_confidence, 75.0);
    assert_eq!(settings.validation.min_length, 5);
    assert_eq!(settings.validation.max_length, 10);
    assert_eq!(settings.validation.normalization, Normalization::Lenient);
    assert_eq!(settings.validation.pattern.as_deref(), Some("[A-Z]{2}[0-9]{3,4}"));
    assert_eq!(settings.suppression.cooldown(), Duration::from_millis(2500));
    assert!(settings.suppression.enabled);
    assert_eq!(settings.extraction.engine, EngineKind::Ocrs);
    assert_eq!(settings.extraction.timeout(), Duration::from_millis(400));
    assert_eq!(settings.region.max_area, 50000);

    Ok(())
}

#[test]
fn test_missing_file_is_read_error() {
    let result = Settings::load(Some(std::path::Path::new("/nonexistent/platewatch.toml")));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn test_malformed_file_is_parse_error() -> anyhow::Result<()> {
    let file = config_file("[validation\nmin_length = ")?;
    assert!(matches!(Settings::load(Some(file.path())), Err(ConfigError::Parse { .. })));

    let file = config_file("[extraction]\nengine = \"paddle\"\n")?;
    assert!(matches!(Settings::load(Some(file.path())), Err(ConfigError::Parse { .. })));

    Ok(())
}

#[test]
fn test_invalid_values_are_rejected() -> anyhow::Result<()> {
    let cases = [
        ("[validation]\nmin_length = 9\nmax_length = 4\n", "validation.min_length"),
        ("[validation]\nallowed_chars = \"\"\n", "validation.allowed_chars"),
        ("[region]\nmin_area = 60000\n", "region.min_area"),
        ("[extraction]\ntimeout_ms = 0\n", "extraction.timeout_ms"),
        ("[suppression]\ncooldown_secs = -3.0\n", "suppression.cooldown_secs"),
        ("[session]\nframe_skip = 0\n", "session.frame_skip"),
    ];

    for (contents, expected) in cases {
        let file = config_file(contents)?;
        match Settings::load(Some(file.path())) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
            other => panic!("{} should be invalid, got {:?}", expected, other.map(|_| ())),
        }
    }

    Ok(())
}

#[test]
fn test_engine_construction_rejects_bad_pattern() {
    let mut settings = Settings::default();
    settings.validation.pattern = Some("([".to_string());

    let result = DecisionEngine::from_settings(
        &settings,
        ScriptedEngine::constant(Script::Empty),
        std::sync::Arc::new(ManualClock::default()),
    );
    assert!(matches!(result, Err(ConfigError::Pattern(_))));
}
