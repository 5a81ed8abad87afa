use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_ws_path() -> String {
    "/ws/driver/updates/".to_string()
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Client configuration, loaded from `config.toml` in the platform config
/// directory with environment overrides applied on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Development switch: when set, the runner skips backend device-token
    /// registration since there is no real backend to talk to.
    #[serde(default)]
    pub mock_mode: bool,
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            mock_mode: false,
            ws_path: default_ws_path(),
        }
    }
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            // Use XDG config directory on Linux
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("fuelnet-client")
        } else {
            // Use home directory with dot prefix on Windows/Mac
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".fuelnet-client")
        };

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
            info!("Created config directory: {:?}", config_dir);
        }

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        debug!("Loading config from: {:?}", config_path);

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?
        } else {
            info!("Config file doesn't exist, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        debug!("Saving config to: {:?}", config_path);

        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Apply a `key value` update from the CLI. Keys mirror the TOML fields.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api_base_url" => self.api_base_url = value.to_string(),
            "mock_mode" => self.mock_mode = parse_bool(value),
            "ws_path" => self.ws_path = value.to_string(),
            _ => bail!("unknown config key '{key}' (expected api_base_url, mock_mode, or ws_path)"),
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("FUELNET_API_BASE_URL") {
            if !url.is_empty() {
                self.api_base_url = url;
            }
        }
        if let Ok(mock) = std::env::var("FUELNET_MOCK_MODE") {
            self.mock_mode = parse_bool(&mock);
        }
    }

    /// WebSocket endpoint derived from the API base URL by scheme rewrite.
    pub fn ws_url(&self) -> String {
        let base = self.api_base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        let path = if self.ws_path.starts_with('/') {
            self.ws_path.clone()
        } else {
            format!("/{}", self.ws_path)
        };
        format!("{ws_base}{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_rewrites_scheme_and_appends_path() {
        let config = Config {
            api_base_url: "http://192.168.1.20:8000/".into(),
            mock_mode: false,
            ws_path: "/ws/driver/updates/".into(),
        };
        assert_eq!(config.ws_url(), "ws://192.168.1.20:8000/ws/driver/updates/");

        let tls = Config { api_base_url: "https://api.fuelnet.example".into(), ..config };
        assert_eq!(tls.ws_url(), "wss://api.fuelnet.example/ws/driver/updates/");
    }

    #[test]
    fn ws_path_gets_leading_slash() {
        let config = Config {
            api_base_url: "http://localhost:8000".into(),
            mock_mode: false,
            ws_path: "ws".into(),
        };
        assert_eq!(config.ws_url(), "ws://localhost:8000/ws");
    }

    #[test]
    fn set_value_updates_known_keys() {
        let mut config = Config::default();
        config.set_value("api_base_url", "http://10.0.0.2:9000").unwrap();
        config.set_value("mock_mode", "true").unwrap();
        config.set_value("ws_path", "/ws/ops/").unwrap();
        assert_eq!(config.api_base_url, "http://10.0.0.2:9000");
        assert!(config.mock_mode);
        assert_eq!(config.ws_path, "/ws/ops/");

        config.set_value("mock_mode", "0").unwrap();
        assert!(!config.mock_mode);
    }

    #[test]
    fn set_value_rejects_unknown_keys() {
        let mut config = Config::default();
        let err = config.set_value("api_url", "x").unwrap_err();
        assert!(err.to_string().contains("unknown config key"));
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert!(!config.mock_mode);
        assert_eq!(config.ws_path, "/ws/driver/updates/");
    }
}
