//! Chat configuration
//!
//! Deserialized from the same TOML manifest as the engine options.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Options for the chat subsystem.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Directory under which room directories are created
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// How long a delivery waits for a recipient's reader before giving up
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,
    /// Maximum number of deliveries in flight at once
    #[serde(default = "default_max_fanout")]
    pub max_fanout: usize,
}

fn default_root() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_open_timeout_ms() -> u64 {
    5_000
}

fn default_max_fanout() -> usize {
    8
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            open_timeout_ms: default_open_timeout_ms(),
            max_fanout: default_max_fanout(),
        }
    }
}

impl ChatConfig {
    /// Parse from a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// The delivery deadline as a duration.
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }
}
