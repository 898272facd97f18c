//! User-configurable timer settings.
//!
//! Persisted JSON-encoded under the `userSettings` key. An absent or
//! unreadable key falls back to defaults -- settings are never a reason
//! for the timer to refuse to run.

use serde::{Deserialize, Serialize};

use crate::blocking::{AppId, BlockingMode};
use crate::error::{ConfigError, PersistenceError};
use crate::session::SessionKind;
use crate::storage::{self, keys, PreferenceStore};

/// Session durations, cycle length, and shielding policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfiguration {
    #[serde(default = "default_focus_secs")]
    pub focus_secs: u64,
    #[serde(default = "default_short_break_secs")]
    pub short_break_secs: u64,
    #[serde(default = "default_long_break_secs")]
    pub long_break_secs: u64,
    /// Completed focus sessions between long breaks.
    #[serde(default = "default_sessions_before_long_break")]
    pub sessions_before_long_break: u32,
    #[serde(default)]
    pub blocking_mode: BlockingMode,
    /// Apps that stay reachable in whitelist mode.
    #[serde(default)]
    pub allow_list: Vec<AppId>,
}

fn default_focus_secs() -> u64 {
    25 * 60
}
fn default_short_break_secs() -> u64 {
    5 * 60
}
fn default_long_break_secs() -> u64 {
    15 * 60
}
fn default_sessions_before_long_break() -> u32 {
    4
}

impl Default for TimerConfiguration {
    fn default() -> Self {
        Self {
            focus_secs: default_focus_secs(),
            short_break_secs: default_short_break_secs(),
            long_break_secs: default_long_break_secs(),
            sessions_before_long_break: default_sessions_before_long_break(),
            blocking_mode: BlockingMode::default(),
            allow_list: Vec::new(),
        }
    }
}

impl TimerConfiguration {
    /// Planned length in seconds for a session of `kind`.
    pub fn duration_secs(&self, kind: SessionKind) -> u64 {
        match kind {
            SessionKind::Focus => self.focus_secs,
            SessionKind::ShortBreak => self.short_break_secs,
            SessionKind::LongBreak => self.long_break_secs,
        }
    }

    /// Reject zero durations and a zero cycle length.
    ///
    /// # Errors
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("focus_secs", self.focus_secs),
            ("short_break_secs", self.short_break_secs),
            ("long_break_secs", self.long_break_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: "duration must be positive".to_string(),
                });
            }
        }
        if self.sessions_before_long_break == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sessions_before_long_break",
                message: "cycle length must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Load from the store, falling back to defaults when the key is
    /// absent or unreadable.
    pub fn load(store: &dyn PreferenceStore) -> Self {
        match storage::get_json(store, keys::USER_SETTINGS) {
            Ok(Some(cfg)) => cfg,
            Ok(None) => Self::default(),
            Err(e) => {
                eprintln!("Warning: failed to load user settings, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// Persist to the store.
    ///
    /// # Errors
    /// Returns an error if encoding or the store write fails.
    pub fn save(&self, store: &dyn PreferenceStore) -> Result<(), PersistenceError> {
        storage::set_json(store, keys::USER_SETTINGS, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = TimerConfiguration::default();
        assert_eq!(cfg.focus_secs, 1500);
        assert_eq!(cfg.short_break_secs, 300);
        assert_eq!(cfg.long_break_secs, 900);
        assert_eq!(cfg.sessions_before_long_break, 4);
        assert_eq!(cfg.blocking_mode, BlockingMode::Strict);
        assert!(cfg.allow_list.is_empty());
    }

    #[test]
    fn duration_by_kind() {
        let cfg = TimerConfiguration::default();
        assert_eq!(cfg.duration_secs(SessionKind::Focus), 1500);
        assert_eq!(cfg.duration_secs(SessionKind::ShortBreak), 300);
        assert_eq!(cfg.duration_secs(SessionKind::LongBreak), 900);
    }

    #[test]
    fn validate_rejects_zero_durations() {
        let mut cfg = TimerConfiguration::default();
        cfg.focus_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = TimerConfiguration::default();
        cfg.sessions_before_long_break = 0;
        assert!(cfg.validate().is_err());

        assert!(TimerConfiguration::default().validate().is_ok());
    }

    #[test]
    fn load_falls_back_to_defaults_on_absent_key() {
        let store = MemoryStore::new();
        assert_eq!(TimerConfiguration::load(&store), TimerConfiguration::default());
    }

    #[test]
    fn load_falls_back_to_defaults_on_corrupt_value() {
        let store = MemoryStore::new();
        store.set_raw(keys::USER_SETTINGS, "{corrupt").unwrap();
        assert_eq!(TimerConfiguration::load(&store), TimerConfiguration::default());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let store = MemoryStore::new();
        let mut cfg = TimerConfiguration::default();
        cfg.focus_secs = 50 * 60;
        cfg.blocking_mode = BlockingMode::Whitelist;
        cfg.allow_list = vec!["com.example.music".into()];
        cfg.save(&store).unwrap();
        assert_eq!(TimerConfiguration::load(&store), cfg);
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let store = MemoryStore::new();
        store
            .set_raw(keys::USER_SETTINGS, r#"{"focusSecs": 600}"#)
            .unwrap();
        let cfg = TimerConfiguration::load(&store);
        assert_eq!(cfg.focus_secs, 600);
        assert_eq!(cfg.short_break_secs, 300);
        assert_eq!(cfg.blocking_mode, BlockingMode::Strict);
    }
}
