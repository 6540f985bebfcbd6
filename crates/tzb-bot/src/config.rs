//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use tzb_core::directory::DEFAULT_LINK_TIMEOUT_MINUTES;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Community assumed when a command does not name one.
    pub default_community: String,
    /// Community-wide source timezone for unregistered requesters.
    pub fallback_timezone: Option<String>,
    /// Validity window for registration links, in minutes.
    pub link_timeout_minutes: i64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("default_community", &self.default_community)
            .field("fallback_timezone", &self.fallback_timezone)
            .field("link_timeout_minutes", &self.link_timeout_minutes)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("tzb.db"),
            default_community: "default".to_string(),
            fallback_timezone: None,
            link_timeout_minutes: DEFAULT_LINK_TIMEOUT_MINUTES,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TZB_*)
        figment = figment.merge(Env::prefixed("TZB_"));

        figment.extract()
    }

    /// The configured fallback timezone, validated.
    pub fn fallback_zone(&self) -> Result<Option<chrono_tz::Tz>, tzb_core::EngineError> {
        self.fallback_timezone
            .as_deref()
            .map(tzb_core::directory::validate_zone)
            .transpose()
    }
}

/// Returns the platform-specific config directory for tzb.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tzb"))
}

/// Returns the platform-specific data directory for tzb.
///
/// On Linux: `~/.local/share/tzb`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("tzb"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_returns_some() {
        assert!(dirs_data_path().is_some());
    }

    #[test]
    fn test_dirs_data_path_ends_with_tzb() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "tzb");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("tzb.db"));
    }

    #[test]
    fn test_default_link_timeout_matches_directory_default() {
        assert_eq!(Config::default().link_timeout_minutes, 30);
    }

    #[test]
    fn test_fallback_zone_validates() {
        let mut config = Config::default();
        assert_eq!(config.fallback_zone().unwrap(), None);

        config.fallback_timezone = Some("Europe/London".to_string());
        assert_eq!(
            config.fallback_zone().unwrap(),
            Some(chrono_tz::Europe::London)
        );

        config.fallback_timezone = Some("Not/AZone".to_string());
        assert!(config.fallback_zone().is_err());
    }
}
