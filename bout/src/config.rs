//! Bout configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::corner::Corner;
use crate::error::{MatchError, MatchResult};

/// Default strike count that ends the match
pub const DEFAULT_THRESHOLD: u32 = 26;

/// Default probability that a strike knocks the opponent down
pub const DEFAULT_KNOCKDOWN_CHANCE: f64 = 0.3;

/// Default upper bound of a knockdown, in milliseconds
pub const DEFAULT_MAX_RECOVERY_MS: u64 = 250;

/// Default upper bound of the pause after a strike, in milliseconds
pub const DEFAULT_MAX_PACE_MS: u64 = 500;

/// Main configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Match parameters
    #[serde(rename = "match")]
    pub bout: MatchConfig,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// An explicit path must load. Otherwise the first discovered file that
    /// parses wins, and a broken one is skipped with a warning.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::discover() {
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => tracing::warn!("Failed to load config from {}: {}", candidate.display(), e),
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed here; the full load reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::discover(),
        };
        candidates.into_iter().find_map(|path| {
            let content = fs::read_to_string(path).ok()?;
            serde_yaml::from_str::<Self>(&content).ok()
        })?
        .log_level
    }

    /// Existing config files in lookup order: ./.bout.yml, then <config_dir>/bout/bout.yml
    fn discover() -> Vec<PathBuf> {
        let local = Some(PathBuf::from(".bout.yml"));
        let user = dirs::config_dir().map(|dir| dir.join("bout").join("bout.yml"));
        [local, user].into_iter().flatten().filter(|path| path.exists()).collect()
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Parameters of a single bout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Name of the participant in the red corner
    pub red: String,

    /// Name of the participant in the blue corner
    pub blue: String,

    /// Corner that holds the first turn
    pub first: Corner,

    /// Strike count that wins the match
    pub threshold: u32,

    /// Knockdown behavior
    pub knockdown: KnockdownConfig,

    /// Upper bound of the pause after each strike
    #[serde(rename = "max-pace-ms")]
    pub max_pace_ms: u64,

    /// Seed for both participants' dice; random when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Abandon the match if it has not finished after this long
    #[serde(rename = "deadline-ms", skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            red: "Ali".to_string(),
            blue: "Tyson".to_string(),
            first: Corner::Red,
            threshold: DEFAULT_THRESHOLD,
            knockdown: KnockdownConfig::default(),
            max_pace_ms: DEFAULT_MAX_PACE_MS,
            seed: None,
            deadline_ms: None,
        }
    }
}

impl MatchConfig {
    /// Reject parameters that cannot produce a match
    pub fn validate(&self) -> MatchResult<()> {
        debug!(config = ?self, "MatchConfig::validate: called");
        if self.threshold == 0 {
            return Err(MatchError::InvalidConfig("threshold must be at least 1".to_string()));
        }
        let chance = self.knockdown.chance;
        if !chance.is_finite() || !(0.0..=1.0).contains(&chance) {
            return Err(MatchError::InvalidConfig(format!(
                "knockdown chance must be within [0, 1], got {}",
                chance
            )));
        }
        if self.red.trim().is_empty() || self.blue.trim().is_empty() {
            return Err(MatchError::InvalidConfig("participant names must not be empty".to_string()));
        }
        if self.red == self.blue {
            return Err(MatchError::InvalidConfig(format!(
                "participant names must be unique, both are '{}'",
                self.red
            )));
        }
        Ok(())
    }

    /// Name of the participant in the given corner
    pub fn name(&self, corner: Corner) -> &str {
        match corner {
            Corner::Red => &self.red,
            Corner::Blue => &self.blue,
        }
    }

    /// Upper bound of the pause after each strike as a Duration
    pub fn max_pace(&self) -> Duration {
        Duration::from_millis(self.max_pace_ms)
    }

    /// Match deadline as a Duration
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

/// Knockdown configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockdownConfig {
    /// Probability that a strike knocks the opponent down
    pub chance: f64,

    /// Upper bound of a knockdown
    #[serde(rename = "max-recovery-ms")]
    pub max_recovery_ms: u64,
}

impl Default for KnockdownConfig {
    fn default() -> Self {
        Self {
            chance: DEFAULT_KNOCKDOWN_CHANCE,
            max_recovery_ms: DEFAULT_MAX_RECOVERY_MS,
        }
    }
}

impl KnockdownConfig {
    /// Upper bound of a knockdown as a Duration
    pub fn max_recovery(&self) -> Duration {
        Duration::from_millis(self.max_recovery_ms)
    }
}
