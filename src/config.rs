use std::path::PathBuf;

use crate::models::Theme;

/// Storage key holding the task collection.
pub const TASKS_KEY: &str = "tasks_v1";
/// Storage key holding the theme preference.
pub const THEME_KEY: &str = "theme_preference";
/// Every key owned by the application. `Storage::clear_all` removes exactly these.
pub const APP_KEYS: [&str; 2] = [TASKS_KEY, THEME_KEY];

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TASKDECK_DATA_DIR";
/// Environment variable selecting the theme used when none is stored.
pub const THEME_ENV: &str = "TASKDECK_THEME";

/// Runtime settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub default_theme: Theme,
}

impl Config {
    /// Resolves the configuration from the environment.
    ///
    /// The data directory is determined in the following order:
    /// 1. `TASKDECK_DATA_DIR` environment variable.
    /// 2. `~/.local/share/taskdeck` (on Linux).
    /// 3. `./taskdeck` (fallback).
    pub fn from_env() -> Self {
        let data_dir = std::env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());
        let default_theme = std::env::var(THEME_ENV)
            .ok()
            .and_then(|raw| raw.trim().to_lowercase().parse().ok())
            .unwrap_or_default();
        Config { data_dir, default_theme }
    }

    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = data_dir;
        self
    }
}

fn default_data_dir() -> PathBuf {
    let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    p.push("taskdeck");
    p
}
