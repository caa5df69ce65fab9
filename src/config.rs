use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "lull";
const SETTINGS_FILE: &str = "settings.json";
const STREAM_CACHE_DIR: &str = "stream_cache";
pub const CONFIG_DIR_ENV: &str = "LULL_CONFIG_DIR";

/// User settings, read once at startup. Nothing is ever written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,
    #[serde(default = "default_volume_steps")]
    pub volume_steps: u8,
    /// Keep downloaded tracks between runs.
    #[serde(default = "default_stream_cache")]
    pub stream_cache: bool,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_initial_volume() -> f32 {
    1.0
}

fn default_volume_steps() -> u8 {
    10
}

fn default_stream_cache() -> bool {
    true
}

fn default_log_filter() -> String {
    String::from("info")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_volume: default_initial_volume(),
            volume_steps: default_volume_steps(),
            stream_cache: default_stream_cache(),
            log_filter: default_log_filter(),
        }
    }
}

impl Settings {
    fn sanitized(mut self) -> Self {
        self.initial_volume = crate::model::clamp_volume(self.initial_volume);
        self.volume_steps = self.volume_steps.clamp(1, 100);
        if self.log_filter.trim().is_empty() {
            self.log_filter = default_log_filter();
        }
        self
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

/// Directory for downloaded tracks. When caching is off this is a per-process
/// directory under the system temp dir that is removed on exit.
pub fn stream_cache_dir(settings: &Settings) -> Result<PathBuf> {
    if settings.stream_cache {
        return Ok(config_root()?.join(STREAM_CACHE_DIR));
    }
    Ok(env::temp_dir().join(format!("{APP_DIR}-{STREAM_CACHE_DIR}-{}", std::process::id())))
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path()?)
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings.sanitized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let settings = load_settings_from(&dir.path().join(SETTINGS_FILE)).expect("load");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{ "initial_volume": 0.4 }"#).expect("write");

        let settings = load_settings_from(&path).expect("load");
        assert_eq!(settings.initial_volume, 0.4);
        assert_eq!(settings.volume_steps, 10);
        assert!(settings.stream_cache);
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            r#"{ "initial_volume": 3.5, "volume_steps": 0, "log_filter": "  " }"#,
        )
        .expect("write");

        let settings = load_settings_from(&path).expect("load");
        assert_eq!(settings.initial_volume, 1.0);
        assert_eq!(settings.volume_steps, 1);
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").expect("write");

        let err = load_settings_from(&path).expect_err("parse should fail");
        assert!(format!("{err:#}").contains("failed to parse settings file"));
    }

    #[test]
    fn config_dir_override_is_honoured() {
        let dir = tempdir().expect("tempdir");
        unsafe {
            env::set_var(CONFIG_DIR_ENV, dir.path().to_string_lossy().as_ref());
        }

        assert_eq!(settings_path().expect("path"), dir.path().join(SETTINGS_FILE));
        let cached = Settings::default();
        assert_eq!(
            stream_cache_dir(&cached).expect("cache dir"),
            dir.path().join(STREAM_CACHE_DIR)
        );
        let throwaway = Settings {
            stream_cache: false,
            ..Settings::default()
        };
        assert!(
            stream_cache_dir(&throwaway)
                .expect("temp cache dir")
                .starts_with(env::temp_dir())
        );
    }
}
