use std::path::PathBuf;

use clap::ValueEnum;
use directories::ProjectDirs;
use serde::Deserialize;

/// How loaded tracks get their initial rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RatingPolicy {
    /// Bucket the CSV popularity column into 1-5 stars.
    #[default]
    Popularity,
    /// Draw a uniform 1-5 rating per track.
    Random,
}

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the file is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// CSV file loaded at startup when `--csv` is not given.
    pub csv_path: Option<PathBuf>,
    /// Number of loaded tracks queued into the playlist.
    pub playlist_limit: usize,
    pub rating_policy: RatingPolicy,
    /// Fixed seed for shuffles and random ratings. Unset means OS entropy.
    pub shuffle_seed: Option<u64>,
    /// Rows shown per dashboard section.
    pub dashboard_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            csv_path: None,
            playlist_limit: 100,
            rating_policy: RatingPolicy::Popularity,
            shuffle_seed: None,
            dashboard_size: 5,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/playwise/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::from_toml_str(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Get the config file path.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.playlist_limit, 100);
        assert_eq!(config.dashboard_size, 5);
        assert_eq!(config.rating_policy, RatingPolicy::Popularity);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            csv_path = "/music/SpotifySongs.csv"
            rating_policy = "random"
            shuffle_seed = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.csv_path, Some(PathBuf::from("/music/SpotifySongs.csv")));
        assert_eq!(config.rating_policy, RatingPolicy::Random);
        assert_eq!(config.shuffle_seed, Some(42));
        assert_eq!(config.playlist_limit, 100);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_toml_str("rating_policy = \"loudness\"").is_err());
        assert!(AppConfig::from_toml_str("playlist_limit = -1").is_err());
    }
}
