use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// Reads the terminal's `COLORFGBG` (`"fg;bg"`). Background colours 0-6
    /// and 8 are dark; anything unparseable or unset counts as dark.
    pub fn from_colorfgbg(value: Option<&str>) -> Self {
        let background = value
            .and_then(|v| v.rsplit(';').next())
            .and_then(|bg| bg.trim().parse::<u8>().ok());
        match background {
            Some(0..=6) | Some(8) | None => Theme::Dark,
            Some(_) => Theme::Light,
        }
    }

    pub fn from_environment() -> Self {
        Self::from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// Persisted user choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub last_folder_path: Option<PathBuf>,
    pub volume_state: u8,
    /// `None` follows the environment.
    pub theme_preference: Option<Theme>,
    pub visualizations_hidden: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_folder_path: None,
            volume_state: 100,
            theme_preference: None,
            visualizations_hidden: false,
        }
    }
}

/// Key-value persistence for [`Settings`]. Every setter rewrites the whole
/// file; the last write wins.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Missing or unreadable files give the defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<Settings>(&content) {
                Ok(mut settings) => {
                    settings.volume_state = settings.volume_state.min(100);
                    settings
                }
                Err(e) => {
                    warn!("Ignoring corrupt settings in {}: {}", path.display(), e);
                    Settings::default()
                }
            },
            Err(e) => {
                debug!("No settings at {} ({}), using defaults", path.display(), e);
                Settings::default()
            }
        };
        Self { path, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Stored preference, else the environment's.
    pub fn theme(&self) -> Theme {
        self.settings.theme_preference.unwrap_or_else(Theme::from_environment)
    }

    pub fn set_last_folder(&mut self, folder: &Path) -> Result<()> {
        self.settings.last_folder_path = Some(folder.to_path_buf());
        self.persist()
    }

    pub fn set_volume(&mut self, volume: u8) -> Result<()> {
        self.settings.volume_state = volume.min(100);
        self.persist()
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.settings.theme_preference = Some(theme);
        self.persist()
    }

    pub fn set_visualizations_hidden(&mut self, hidden: bool) -> Result<()> {
        self.settings.visualizations_hidden = hidden;
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string_pretty(&self.settings)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.toml"));
        assert_eq!(store.settings(), &Settings::default());
        assert_eq!(store.settings().volume_state, 100);
        assert!(!store.settings().visualizations_hidden);
    }

    #[test]
    fn setters_persist_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("settings.toml");

        let mut store = SettingsStore::open(&path);
        store.set_last_folder(Path::new("/music/albums")).unwrap();
        store.set_volume(140).unwrap();
        store.set_theme(Theme::Light).unwrap();
        store.set_visualizations_hidden(true).unwrap();

        let reopened = SettingsStore::open(&path);
        assert_eq!(reopened.settings().last_folder_path, Some(PathBuf::from("/music/albums")));
        assert_eq!(reopened.settings().volume_state, 100);
        assert_eq!(reopened.theme(), Theme::Light);
        assert!(reopened.settings().visualizations_hidden);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "volume_state = \"loud\"").unwrap();
        assert_eq!(SettingsStore::open(&path).settings(), &Settings::default());
    }

    #[test]
    fn theme_is_stored_lowercase() {
        let text = toml::to_string(&Settings {
            theme_preference: Some(Theme::Dark),
            ..Settings::default()
        })
        .unwrap();
        assert!(text.contains("theme_preference = \"dark\""));
    }

    #[test]
    fn colorfgbg_background_decides() {
        assert_eq!(Theme::from_colorfgbg(Some("15;0")), Theme::Dark);
        assert_eq!(Theme::from_colorfgbg(Some("0;15")), Theme::Light);
        assert_eq!(Theme::from_colorfgbg(Some("0;default;8")), Theme::Dark);
        assert_eq!(Theme::from_colorfgbg(Some("garbage")), Theme::Dark);
        assert_eq!(Theme::from_colorfgbg(None), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
    }
}
