use std::collections::HashMap;

use parking_lot::Mutex;
use time::OffsetDateTime;

use crate::config::SuppressionSettings;
use crate::error::ConfigError;

/// Remembers recently accepted plates so one vehicle lingering in frame is
/// logged once per cool-down window.
///
/// Entries expire lazily: nothing runs in the background, stale entries are
/// dropped the next time a plate is admitted.
#[derive(Debug)]
pub struct DuplicateSuppressionManager {
    cooldown: time::Duration,
    enabled: bool,
    entries: Mutex<HashMap<String, OffsetDateTime>>,
}

impl DuplicateSuppressionManager {
    pub fn new(cooldown: std::time::Duration) -> Self {
        Self {
            cooldown: time::Duration::try_from(cooldown).unwrap_or(time::Duration::MAX),
            enabled: true,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &SuppressionSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let mut manager = Self::new(settings.cooldown());
        manager.enabled = settings.enabled;
        Ok(manager)
    }

    /// `true` if `plate` may be accepted at `now`, in which case it is
    /// registered with that time. A duplicate leaves the state untouched.
    ///
    /// Check and registration happen under one lock, so concurrent callers
    /// with the same plate cannot both be allowed.
    pub fn check_and_register(&self, plate: &str, now: OffsetDateTime) -> bool {
        if !self.enabled {
            return true;
        }

        let mut entries = self.entries.lock();
        if let Some(&last) = entries.get(plate) {
            if now - last <= self.cooldown {
                return false;
            }
        }

        entries.retain(|_, last| now - *last <= self.cooldown);
        entries.insert(plate.to_string(), now);
        true
    }

    pub fn last_accepted(&self, plate: &str) -> Option<OffsetDateTime> {
        self.entries.lock().get(plate).copied()
    }

    /// Number of tracked plates, including ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
