//! Engine configuration
//!
//! Loaded from TOML by hosts that carry a config file; every field has a
//! default so an empty document (or no document at all) is valid.

use serde::Deserialize;

/// Options for the execution engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Shell name used as the prefix of diagnostic lines (default: `shellish`).
    #[serde(default = "default_name")]
    pub name: String,
    /// Colon-separated search-path value. When unset, resolution reads the
    /// `PATH` variable from the shell state.
    #[serde(default)]
    pub path: Option<String>,
}

fn default_name() -> String {
    "shellish".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            path: None,
        }
    }
}

impl EngineConfig {
    /// Parse a config from a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.name, "shellish");
        assert!(config.path.is_none());
    }

    #[test]
    fn test_empty_document() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.name, "shellish");
    }

    #[test]
    fn test_explicit_fields() {
        let config = EngineConfig::from_toml_str(
            "name = \"mysh\"\npath = \"/usr/bin:/bin\"\n",
        )
        .unwrap();
        assert_eq!(config.name, "mysh");
        assert_eq!(config.path.as_deref(), Some("/usr/bin:/bin"));
    }
}
