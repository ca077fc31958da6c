//! Process-wide configuration and per-subscriber settings. `Config` is
//! loaded once and immutable; `SimSettings` may be overridden per-IMSI
//! by an external settings store.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Immutable, process-wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub root_dir: PathBuf,
    /// Seconds between retry attempts (default mirrors the original's
    /// `mms_settings.c` default of 5).
    pub retry_secs: u64,
    /// Seconds the bearer stays open with nothing in flight before the
    /// dispatcher closes it (default 20, per `mms_settings.c`).
    pub network_idle_secs: u64,
    /// Seconds of total dispatcher idleness before a `done` signal is
    /// emitted to the delegate (default 30).
    pub idle_secs: u64,
    pub keep_temp_files: bool,
    pub attic_enabled: bool,
    pub convert_to_utf8: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("/var/lib/mms"),
            retry_secs: 5,
            network_idle_secs: 20,
            idle_secs: 30,
            keep_temp_files: false,
            attic_enabled: true,
            convert_to_utf8: false,
        }
    }
}

impl Config {
    pub fn message_dir(&self, id: &str) -> PathBuf {
        self.root_dir.join("msg").join(id)
    }

    pub fn parts_dir(&self, id: &str) -> PathBuf {
        self.message_dir(id).join("parts")
    }

    pub fn encode_dir(&self, id: &str) -> PathBuf {
        self.message_dir(id).join("encode")
    }

    pub fn convert_dir(&self, id: &str) -> PathBuf {
        self.message_dir(id).join("convert")
    }

    pub fn attic_dir(&self) -> PathBuf {
        self.root_dir.join("attic")
    }
}

/// Per-subscriber-identity settings, mutable and keyed by IMSI by the
/// caller (this type itself just holds one IMSI's worth of values). A
/// global default plus per-IMSI overrides are the settings store's
/// concern; this type is what it hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSettings {
    pub user_agent: String,
    pub uaprof: Option<String>,
    /// Max encoded PDU bytes; 0 = unlimited.
    pub size_limit: u64,
    /// Resize target in pixels (default 1_310_720, a 1280x1024-class
    /// budget, per `mms_settings.c`).
    pub max_pixels: u32,
    pub allow_dr: bool,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            user_agent: "mms-rs/0.1".to_string(),
            uaprof: None,
            size_limit: 0,
            max_pixels: 1_310_720,
            allow_dr: true,
        }
    }
}

/// Per-IMSI settings lookup. Tasks call this instead of reaching for
/// `SimSettings::default()` so a host process can back it with a real
/// per-subscriber store that the user may edit between calls.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn settings(&self, imsi: &str) -> SimSettings;
}

/// A `SettingsStore` with no backing store: every IMSI gets the
/// process-wide defaults. Used where a host process hasn't wired up a
/// real one yet.
pub struct DefaultSettingsStore;

#[async_trait]
impl SettingsStore for DefaultSettingsStore {
    async fn settings(&self, _imsi: &str) -> SimSettings {
        SimSettings::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_dir_layout_nests_parts_under_msg_id() {
        let cfg = Config {
            root_dir: PathBuf::from("/data/mms"),
            ..Default::default()
        };
        assert_eq!(cfg.message_dir("42"), PathBuf::from("/data/mms/msg/42"));
        assert_eq!(cfg.parts_dir("42"), PathBuf::from("/data/mms/msg/42/parts"));
        assert_eq!(cfg.attic_dir(), PathBuf::from("/data/mms/attic"));
    }
}
