use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "woda-upgrade";
const SETTINGS_FILE: &str = "settings.json";

/// Paths remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_component_path: Option<PathBuf>,
}

pub fn default_settings_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
        .ok_or_else(|| anyhow!("no configuration directory on this platform"))
}

impl Settings {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_slice(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    /// Loads the user's settings, falling back to defaults with a warning.
    pub fn load() -> Self {
        match default_settings_path().and_then(|path| Self::load_from(&path)) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("cannot load settings: {err:#}");
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        if let Err(err) = default_settings_path().and_then(|path| self.save_to(&path)) {
            tracing::warn!("cannot save settings: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn settings_round_trip_through_json() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("nested/settings.json");
        let settings = Settings {
            last_path: Some(PathBuf::from("/work/MyWidget")),
            last_component_path: None,
        };
        settings.save_to(&path).expect("save");
        let text = fs::read_to_string(&path).expect("read");
        assert!(!text.contains("last_component_path"));
        assert_eq!(Settings::load_from(&path).expect("load"), settings);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let temp = tempdir().expect("temp dir");
        let loaded = Settings::load_from(&temp.path().join("absent.json")).expect("load");
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("settings.json");
        fs::write(&path, "{not json").expect("write");
        assert!(Settings::load_from(&path).is_err());
    }
}
