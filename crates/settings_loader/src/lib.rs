//! # Settings Loader
//!
//! Loads the journal's `settings.json`: where the key/value store lives on disk and
//! which log filter the binaries start with. Every field has a default, so an empty
//! object (or no file at all, via the fallback helpers) is a valid configuration.
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! let settings = settings_loader::load_settings("config/settings.json")?;
//!
//! let path = Some(PathBuf::from("settings.json"));
//! let settings = settings_loader::load_settings_or_default(path.as_ref())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use models::Settings;

/// Overrides the store location from settings.json.
pub const STORE_ENV: &str = "JOURNAL_STORE";
/// Overrides the log filter from settings.json.
pub const LOG_ENV: &str = "JOURNAL_LOG";

/// Loads settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    Ok(settings)
}

/// Loads settings from a default location (settings.json in the current directory)
pub fn load_default_settings() -> Result<Settings> {
    load_settings("settings.json")
}

/// Uses the explicit path when given (errors are reported), otherwise the default
/// location if it exists, otherwise built-in defaults. Environment overrides are applied last.
pub fn load_settings_or_default(path: Option<&PathBuf>) -> Result<Settings> {
    let settings = match path {
        Some(settings_path) => load_settings(settings_path)?,
        None if default_settings_exist() => load_default_settings()?,
        None => {
            tracing::debug!("No settings.json found, using defaults");
            Settings::default()
        }
    };
    Ok(apply_env_overrides(settings))
}

/// Replaces fields with `JOURNAL_STORE` / `JOURNAL_LOG` when those are set and non-empty.
pub fn apply_env_overrides(settings: Settings) -> Settings {
    apply_overrides(
        settings,
        env::var(STORE_ENV).ok(),
        env::var(LOG_ENV).ok(),
    )
}

fn apply_overrides(
    mut settings: Settings,
    store_path: Option<String>,
    log_filter: Option<String>,
) -> Settings {
    if let Some(p) = store_path.filter(|p| !p.trim().is_empty()) {
        settings.store_path = PathBuf::from(p);
    }
    if let Some(f) = log_filter.filter(|f| !f.trim().is_empty()) {
        settings.log_filter = f;
    }
    settings
}

/// Checks if a settings file exists at the given path
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}

/// Checks if the default settings file (settings.json) exists
pub fn default_settings_exist() -> bool {
    settings_file_exists("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_settings_with_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"store_path": "/tmp/journal", "log_filter": "debug"}"#).unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.store_path, PathBuf::from("/tmp/journal"));
        assert_eq!(settings.log_filter, "debug");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{}").unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.store_path, PathBuf::from("data"));
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn test_malformed_settings_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_settings(&path).unwrap_err();
        assert!(err.to_string().contains("Parsing settings JSON"));
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(load_settings_or_default(Some(&path)).is_err());
    }

    #[test]
    fn test_overrides_replace_only_non_empty_values() {
        let settings = apply_overrides(
            Settings::default(),
            Some("/srv/journal".to_string()),
            Some("  ".to_string()),
        );
        assert_eq!(settings.store_path, PathBuf::from("/srv/journal"));
        assert_eq!(settings.log_filter, "info");
    }
}
