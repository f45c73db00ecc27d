//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.lynn/config.json`) and environment.
//! Only two concerns exist: where the relay listens and how it reaches the
//! generative-language API.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Relay server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Generative model settings (model name, credential, endpoint).
    #[serde(default)]
    pub model: ModelConfig,
}

/// Relay bind address and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for the HTTP relay (default 8080). Overridden by the PORT env.
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

fn default_server_port() -> u16 {
    8080
}

fn default_server_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
        }
    }
}

/// Generative model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Model id passed to the generative-language API.
    #[serde(default = "default_model_name")]
    pub name: String,

    /// API credential. Overridden by the API_KEY env when set.
    pub api_key: Option<String>,

    /// Base URL override for the generative-language API (e.g. a local stub
    /// in tests). When unset, the public endpoint is used.
    pub base_url: Option<String>,
}

fn default_model_name() -> String {
    "gemini-2.5-flash".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            api_key: None,
            base_url: None,
        }
    }
}

/// Resolve the API credential: env API_KEY overrides config.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    std::env::var("API_KEY")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .model
                .api_key
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the relay port: env PORT overrides config when it parses as u16.
pub fn resolve_port(config: &Config) -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(config.server.port)
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("LYNN_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".lynn").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Default location of the persisted conversation (`~/.lynn/history.json`).
pub fn default_history_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".lynn").join("history.json"))
        .unwrap_or_else(|| PathBuf::from("history.json"))
}

/// Load config from the default path (or LYNN_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_port_and_bind() {
        let s = ServerConfig::default();
        assert_eq!(s.port, 8080);
        assert_eq!(s.bind, "127.0.0.1");
    }

    #[test]
    fn default_model_is_flash() {
        let m = ModelConfig::default();
        assert_eq!(m.name, "gemini-2.5-flash");
        assert!(m.api_key.is_none());
        assert!(m.base_url.is_none());
    }

    #[test]
    fn parses_partial_config() {
        let config: Config =
            serde_json::from_str(r#"{"server":{"port":3000},"model":{"apiKey":"k"}}"#)
                .expect("parse config");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.model.api_key.as_deref(), Some("k"));
        assert_eq!(config.model.name, "gemini-2.5-flash");
    }

    #[test]
    fn api_key_from_config_when_env_unset() {
        let mut config = Config::default();
        config.model.api_key = Some("  secret  ".to_string());
        // A set API_KEY in the test environment would shadow the config value.
        if std::env::var("API_KEY").is_err() {
            assert_eq!(resolve_api_key(&config).as_deref(), Some("secret"));
        }
    }
}
