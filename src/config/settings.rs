use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// Client configuration, loaded from `.passvault.toml`.
///
/// Every field has a sensible default so the client works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the local REST server.
    #[serde(default = "default_local_server_url")]
    pub local_server_url: String,

    /// Request timeout for server calls, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Device description sent with transfer-token requests.
    #[serde(default = "default_device_info")]
    pub device_info: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_local_server_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_device_info() -> String {
    format!("passvault-core/{}", env!("CARGO_PKG_VERSION"))
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            local_server_url: default_local_server_url(),
            timeout_ms: default_timeout_ms(),
            device_info: default_device_info(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for.
    const FILE_NAME: &'static str = ".passvault.toml";

    /// Load settings from `<dir>/.passvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.local_server_url, "http://localhost:3001");
        assert_eq!(s.timeout_ms, 5_000);
        assert!(s.device_info.starts_with("passvault-core/"));
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.local_server_url, "http://localhost:3001");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
local_server_url = "http://127.0.0.1:4100"
timeout_ms = 2500
device_info = "workstation"
"#;
        fs::write(tmp.path().join(".passvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.local_server_url, "http://127.0.0.1:4100");
        assert_eq!(settings.timeout_ms, 2_500);
        assert_eq!(settings.device_info, "workstation");
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        let config = "timeout_ms = 10000\n";
        fs::write(tmp.path().join(".passvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.timeout_ms, 10_000);
        // Rest should be defaults
        assert_eq!(settings.local_server_url, "http://localhost:3001");
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".passvault.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(result.is_err());
    }
}
