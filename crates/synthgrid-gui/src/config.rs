//! App config persistence

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use synthgrid_core::{DEFAULT_LOOKAHEAD_SECS, DEFAULT_PX_PER_BEAT};
use synthgrid_services::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub repository: RepositoryConfig,
    pub transport: TransportConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session file; defaults to the user data directory
    pub path: Option<PathBuf>,
}

impl SessionConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| data_dir().join("session.json"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub base_url: String,
    pub username: String,
    pub page_size: u32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            username: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub lookahead_secs: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            lookahead_secs: DEFAULT_LOOKAHEAD_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Initial zoom for a new session
    pub px_per_beat: f64,
    pub lane_height: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            px_per_beat: DEFAULT_PX_PER_BEAT,
            lane_height: 48.0,
        }
    }
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("synthgrid")
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("synthgrid")
        .join("config.toml")
}

fn parse_config(text: &str) -> AppConfig {
    toml::from_str(text).unwrap_or_else(|e| {
        tracing::warn!("Invalid config, using defaults: {e}");
        AppConfig::default()
    })
}

pub fn load_config() -> AppConfig {
    let path = config_path();
    std::fs::read_to_string(&path)
        .ok()
        .map(|s| parse_config(&s))
        .unwrap_or_default()
}

pub fn save_config(config: &AppConfig) {
    let path = config_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(s) = toml::to_string_pretty(config) else { return };
    let _ = std::fs::write(&path, s);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
            [repository]
            username = "ana"

            [view]
            lane_height = 64.0
            "#,
        );
        assert_eq!(config.repository.username, "ana");
        assert_eq!(config.repository.page_size, 12);
        assert_eq!(config.repository.base_url, "http://localhost:8000");
        assert_eq!(config.view.lane_height, 64.0);
        assert_eq!(config.view.px_per_beat, 40.0);
        assert_eq!(config.transport.lookahead_secs, 0.1);
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let config = parse_config("[transport]\nlookahead_secs = \"soon\"");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_round_trip() {
        let mut config = AppConfig::default();
        config.session.path = Some(PathBuf::from("/tmp/s.json"));
        config.transport.lookahead_secs = 0.25;
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(parse_config(&text), config);
        assert_eq!(config.session.resolved_path(), PathBuf::from("/tmp/s.json"));
    }
}
