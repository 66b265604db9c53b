use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_API_KEY_ENV, DEFAULT_ENDPOINT, DEFAULT_FRAME_COUNT, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE,
    DEFAULT_TIMEOUT_SECS,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine config directory")]
    NoConfigDir,
}

/// Persisted defaults for sampling, encoding and the inference endpoint.
///
/// The API key itself is never stored; only the name of the environment
/// variable that holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub frame_count: usize,
    pub jpeg_quality: u8,
    pub max_edge: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            frame_count: DEFAULT_FRAME_COUNT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_edge: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// `<config dir>/ClipNarrator/settings.json`.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ClipNarrator").join("settings.json"))
    }

    /// Loads the user's settings file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring settings file: {e}");
                Self::default()
            }
        }
    }

    /// Loads settings from an explicit path. Missing fields take defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SettingsError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(|e| SettingsError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    /// Resolves the API key through `lookup`, keyed by `api_key_env`.
    /// Blank values count as unset.
    pub fn api_key_with(&self, lookup: impl FnOnce(&str) -> Option<String>) -> Option<String> {
        lookup(&self.api_key_env).filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_constants() {
        let s = Settings::default();
        assert_eq!(s.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(s.model, DEFAULT_MODEL);
        assert_eq!(s.frame_count, 5);
        assert_eq!(s.max_tokens, 800);
        assert_eq!(s.temperature, 0.9);
        assert_eq!(s.max_edge, None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let settings = Settings {
            model: "some-vision-model".to_string(),
            frame_count: 8,
            max_edge: Some(768),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{ "frame_count": 3 }"#).unwrap();

        let s = Settings::load_from(&path).unwrap();
        assert_eq!(s.frame_count, 3);
        assert_eq!(s.model, DEFAULT_MODEL);
        assert_eq!(s.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Settings::load_from(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.json");
        assert!(matches!(
            Settings::load_from(&path),
            Err(SettingsError::Read { .. })
        ));
    }

    #[test]
    fn test_api_key_looks_up_named_variable() {
        let s = Settings {
            api_key_env: "MY_VISION_KEY".to_string(),
            ..Settings::default()
        };
        let key = s.api_key_with(|name| {
            assert_eq!(name, "MY_VISION_KEY");
            Some("sk-test".to_string())
        });
        assert_eq!(key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_blank_api_key_is_none() {
        let s = Settings::default();
        assert_eq!(s.api_key_with(|_| Some("   ".to_string())), None);
        assert_eq!(s.api_key_with(|_| None), None);
    }

    #[test]
    fn test_unset_env_variable_is_none() {
        let s = Settings {
            api_key_env: "CLIPNARRATOR_KEY_NEVER_SET_3F9A".to_string(),
            ..Settings::default()
        };
        assert_eq!(s.api_key(), None);
    }

    #[test]
    fn test_config_path_names_app_dir() {
        if let Some(path) = Settings::config_path() {
            assert!(path.to_string_lossy().contains("ClipNarrator"));
            assert!(path.ends_with("settings.json"));
        }
    }
}
