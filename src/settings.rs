//! Server address settings
//!
//! Host and port for the server to bind and the client to dial, read
//! from a small JSON file (`settings.json` by convention). A missing
//! file falls back to the defaults.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::SettingsError;

/// Default bind/dial address parts.
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 4444;

/// Host and port of the chat server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Load from `path` if it exists, otherwise use the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "settings file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// The `host:port` form used for bind and connect calls.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.addr(), "127.0.0.1:4444");
    }

    #[test]
    fn test_parse_json() {
        let settings: Settings =
            serde_json::from_str(r#"{"host": "0.0.0.0", "port": 5555}"#).unwrap();
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 5555);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let settings = Settings::load_or_default("definitely-not-here.json").unwrap();
        assert_eq!(settings, Settings::default());
    }
}
