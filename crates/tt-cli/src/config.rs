//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::Duration;
use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tt_core::{RoundingConfig, RoundingMode};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// IANA timezone used for calendar boundaries and labels.
    pub timezone: String,

    /// Rounding applied to every frame in reports.
    pub rounding_mode: RoundingMode,

    /// Rounding size in minutes; zero disables rounding.
    pub rounding_minutes: i64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("timezone", &self.timezone)
            .field("rounding_mode", &self.rounding_mode)
            .field("rounding_minutes", &self.rounding_minutes)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("tt.db"),
            timezone: detect_timezone(),
            rounding_mode: RoundingMode::None,
            rounding_minutes: 0,
        }
    }
}

impl Config {
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

        // Load from environment variables (TT_*)
        figment = figment.merge(Env::prefixed("TT_"));

        figment.extract()
    }

    /// Parses the configured timezone.
    pub fn tz(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|err| anyhow!("invalid timezone {:?}: {err}", self.timezone))
    }

    /// Rounding for reports, with per-invocation overrides.
    pub fn rounding(
        &self,
        mode: Option<RoundingMode>,
        minutes: Option<i64>,
    ) -> anyhow::Result<RoundingConfig> {
        let minutes = minutes.unwrap_or(self.rounding_minutes);
        let size = Duration::try_minutes(minutes)
            .with_context(|| format!("rounding size out of range: {minutes} minutes"))?;
        Ok(RoundingConfig::new(mode.unwrap_or(self.rounding_mode), size))
    }
}

/// Returns the system timezone, or UTC if it cannot be detected.
fn detect_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Returns the platform-specific config directory for tt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tt"))
}

/// Returns the platform-specific data directory for tt.
///
/// On Linux: `~/.local/share/tt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("tt"))
}
