// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SERVER_ENV: &str = "IPTV_CLIENT_SERVER";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub player: PlayerConfig,
    pub playback: PlaybackConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub stall_grace_ms: u64,
    pub seek_grace_ms: u64,
    pub start_retry_ms: u64,
    /// Play live channels through the compat endpoint first.
    pub compat_live: bool,
    pub default_ext: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub row_limit: usize,
    pub category_ttl_secs: u64,
    pub stream_ttl_secs: u64,
    pub search_ttl_secs: u64,
    pub info_ttl_secs: u64,
    pub warm_live_categories: usize,
    pub warm_other_categories: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: "mpv".to_string(),
            args: vec!["--quiet".to_string()],
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            stall_grace_ms: 5_000,
            seek_grace_ms: 6_000,
            start_retry_ms: 1_000,
            compat_live: true,
            default_ext: "mp4".to_string(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            row_limit: 10,
            category_ttl_secs: 600,
            stream_ttl_secs: 300,
            search_ttl_secs: 60,
            info_ttl_secs: 1200,
            warm_live_categories: 6,
            warm_other_categories: 10,
        }
    }
}

impl PlaybackConfig {
    pub fn stall_grace(&self) -> Duration {
        Duration::from_millis(self.stall_grace_ms)
    }

    pub fn seek_grace(&self) -> Duration {
        Duration::from_millis(self.seek_grace_ms)
    }

    pub fn start_retry(&self) -> Duration {
        Duration::from_millis(self.start_retry_ms)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Config {
        let mut config = if path.as_ref().exists() {
            Self::load(&path).unwrap_or_else(|e| {
                tracing::warn!("Could not load config file, using defaults: {:#}", e);
                Self::default()
            })
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(SERVER_ENV)
            && !url.trim().is_empty()
        {
            config.server.url = url.trim().to_string();
        }

        config
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config to TOML")?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("iptv-client").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            url = "https://tv.example.com"

            [playback]
            stall_grace_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.server.url, "https://tv.example.com");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.playback.stall_grace(), Duration::from_millis(2500));
        assert_eq!(config.playback.seek_grace_ms, 6000);
        assert_eq!(config.catalog.row_limit, 10);
        assert_eq!(config.player.command, "mpv");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.catalog.row_limit = 4;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.catalog.row_limit, 4);
    }

    #[test]
    fn load_errors_carry_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).starts_with("Failed to read config file"));

        std::fs::write(&path, "catalog = [").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).starts_with("Failed to parse TOML configuration"));
        assert_eq!(Config::load_or_default(&path).catalog.row_limit, 10);
    }
}
