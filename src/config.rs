use std::path::{Path, PathBuf};

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

/// Origin of the companion extension, the only origin CORS admits.
pub const DEFAULT_EXTENSION_ORIGIN: &str = "chrome-extension://bokafafkjfefkghmafmpapidlbeliacp";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub model: String,
    pub allowed_origin: String,
    pub rate_limit_points: u32,
    pub rate_limit_window_secs: u64,
    pub youtube_base_url: String,
    pub openai_base_url: String,
    /// Read from the environment, never from the config file.
    #[serde(skip)]
    pub openai_api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            model: "gpt-3.5-turbo".to_string(),
            allowed_origin: DEFAULT_EXTENSION_ORIGIN.to_string(),
            rate_limit_points: 2,
            rate_limit_window_secs: 60,
            youtube_base_url: "https://www.youtube.com".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            openai_api_key: String::new(),
        }
    }
}

impl Config {
    /// Load config from the given file (or ~/.config/ytsum/config.toml if it
    /// exists), then apply environment overrides. `OPENAI_API_KEY` is
    /// required; `PORT` overrides the file value.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
        let mut config: Config = if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            debug!("No config file found at {}", path.display());
            Config::default()
        };

        config.openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| eyre::eyre!("OPENAI_API_KEY environment variable not set"))?;

        if let Ok(port) = std::env::var("PORT") {
            config.port = port
                .parse()
                .map_err(|_| eyre::eyre!("PORT environment variable is not a valid port: {port}"))?;
        }

        Ok(config)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytsum")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
port = 8080
model = "gpt-4o-mini"
allowed_origin = "chrome-extension://aaaabbbbccccddddeeeeffffgggghhhh"
rate_limit_points = 5
rate_limit_window_secs = 30
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.allowed_origin, "chrome-extension://aaaabbbbccccddddeeeeffffgggghhhh");
        assert_eq!(config.rate_limit_points, 5);
        assert_eq!(config.rate_limit_window_secs, 30);
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.allowed_origin, DEFAULT_EXTENSION_ORIGIN);
        assert_eq!(config.rate_limit_points, 2);
        assert_eq!(config.rate_limit_window_secs, 60);
        assert_eq!(config.youtube_base_url, "https://www.youtube.com");
        assert_eq!(config.openai_base_url, "https://api.openai.com");
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(r#"model = "gpt-4o""#).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_api_key_never_read_from_file() {
        let config: Config = toml::from_str(r#"openai_api_key = "sk-leaked""#).unwrap_or_default();
        assert!(config.openai_api_key.is_empty());
    }
}
