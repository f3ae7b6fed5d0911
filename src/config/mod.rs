// Configuration management for tunedeck
// Loads/saves config.toml, with sensible defaults when it is missing

mod settings;

pub use settings::{Settings, SettingsStore, Theme};

use crate::notify::DEFAULT_NOTIFICATION_DURATION;
use anyhow::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "tunedeck";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Opened when no last folder is stored.
    pub music_directory: PathBuf,
    pub log_directory: PathBuf,
    pub lyrics: LyricsConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricsConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_notifications: bool,
    pub notification_duration_ms: u64,
    pub frames_per_second: u32,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            music_directory: dirs::audio_dir()
                .or_else(|| dirs::home_dir().map(|home| home.join("Music")))
                .unwrap_or_else(|| PathBuf::from(".")),
            log_directory: data_dir.join("logs"),
            lyrics: LyricsConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.lyrics.ovh/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_notifications: true,
            notification_duration_ms: DEFAULT_NOTIFICATION_DURATION.as_millis() as u64,
            frames_per_second: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Reads `path`, writing the defaults there first if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        Ok(config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join(APP_DIR))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Clamped so a zero in the file can't stall the frame loop.
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.ui.frames_per_second.clamp(1, 240)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.lyrics.endpoint, "https://api.lyrics.ovh/v1");
        assert_eq!(config.ui.notification_duration_ms, 5000);
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ui]\nshow_notifications = false\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(!config.ui.show_notifications);
        assert_eq!(config.ui.frames_per_second, 30);
        assert_eq!(config.lyrics.timeout_secs, 10);
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "ui = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn frame_interval_never_zero() {
        let mut config = Config::default();
        config.ui.frames_per_second = 0;
        assert_eq!(config.frame_interval(), std::time::Duration::from_secs(1));
    }
}
