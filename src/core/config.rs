//! Agent configuration with documented constants
//!
//! The difficulty level fixes the attack and build cadence at construction
//! time. Everything else tunes how much work one agent may do per tick.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{AiError, Result};

/// Difficulty level of an autonomous player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiLevel {
    Easy,
    Medium,
    Hard,
}

impl AiLevel {
    /// `(attack_interval, build_interval)` in game frames
    pub fn intervals(self) -> (u32, u32) {
        match self {
            AiLevel::Easy => (2500, 1000),
            AiLevel::Medium => (750, 400),
            AiLevel::Hard => (100, 200),
        }
    }

    pub fn attack_interval(self) -> u32 {
        self.intervals().0
    }

    pub fn build_interval(self) -> u32 {
        self.intervals().1
    }
}

impl TryFrom<u8> for AiLevel {
    type Error = AiError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(AiLevel::Easy),
            1 => Ok(AiLevel::Medium),
            2 => Ok(AiLevel::Hard),
            other => Err(AiError::InvalidLevel(other.to_string())),
        }
    }
}

impl FromStr for AiLevel {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(AiLevel::Easy),
            "medium" => Ok(AiLevel::Medium),
            "hard" => Ok(AiLevel::Hard),
            _ => Err(AiError::InvalidLevel(s.to_string())),
        }
    }
}

impl fmt::Display for AiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AiLevel::Easy => "easy",
            AiLevel::Medium => "medium",
            AiLevel::Hard => "hard",
        };
        f.write_str(name)
    }
}

/// Configuration for one autonomous player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Difficulty level. Selects attack and build cadence.
    pub level: AiLevel,

    /// Seed for the per-agent random generator
    ///
    /// Mixed with the player id so two agents sharing a config still
    /// make different choices.
    pub seed: u64,

    /// Maximum events handled per tick
    ///
    /// Remaining events stay queued for the next tick.
    pub event_quota: usize,

    /// Upper bound on jobs executed per tick
    ///
    /// The effective quota is `min(job_quota_cap, warehouses + military)`,
    /// so a small colony does little work and a big one is still bounded.
    pub job_quota_cap: usize,

    /// Maximum distance between an attacking building and its target
    pub attack_radius: u32,

    /// Ticks after initialisation during which the agent only observes
    ///
    /// The defeat test only runs once this many ticks have passed, which
    /// gives the world time to hand out the starting warehouse.
    pub settle_ticks: u32,

    /// Radius around a random warehouse or military building that is
    /// refreshed before planning new buildings
    pub planning_refresh_radius: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            level: AiLevel::Medium,
            seed: 0x5eed,
            event_quota: 10,
            job_quota_cap: 40,
            attack_radius: 21,
            settle_ticks: 10,
            planning_refresh_radius: 15,
        }
    }
}

impl AiConfig {
    pub fn new(level: AiLevel) -> Self {
        Self { level, ..Self::default() }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.event_quota == 0 {
            return Err("event_quota must be positive".into());
        }
        if self.job_quota_cap == 0 {
            return Err("job_quota_cap must be positive".into());
        }
        // Targets further away than a unit can march are never reachable
        if self.attack_radius == 0 || self.attack_radius > 64 {
            return Err(format!(
                "attack_radius ({}) should be within 1..=64",
                self.attack_radius
            ));
        }
        if self.planning_refresh_radius == 0 {
            return Err("planning_refresh_radius must be positive".into());
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AiConfig = toml::from_str(contents)?;
        config.validate().map_err(AiError::InvalidConfig)?;
        Ok(config)
    }

    /// Load a config file, e.g. `data/ai_config.toml`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_intervals() {
        assert_eq!(AiLevel::Easy.intervals(), (2500, 1000));
        assert_eq!(AiLevel::Medium.intervals(), (750, 400));
        assert_eq!(AiLevel::Hard.intervals(), (100, 200));
    }

    #[test]
    fn test_level_from_u8() {
        assert_eq!(AiLevel::try_from(0).unwrap(), AiLevel::Easy);
        assert_eq!(AiLevel::try_from(2).unwrap(), AiLevel::Hard);
        assert!(matches!(AiLevel::try_from(3), Err(AiError::InvalidLevel(_))));
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("HARD".parse::<AiLevel>().unwrap(), AiLevel::Hard);
        assert!("insane".parse::<AiLevel>().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(AiConfig::default().validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip_fields() {
        let config = AiConfig::from_toml_str("level = \"easy\"\nseed = 7\n").unwrap();
        assert_eq!(config.level, AiLevel::Easy);
        assert_eq!(config.seed, 7);
        assert_eq!(config.event_quota, 10);
    }

    #[test]
    fn test_toml_rejects_unknown_level() {
        assert!(AiConfig::from_toml_str("level = \"brutal\"").is_err());
    }

    #[test]
    fn test_toml_rejects_invalid_values() {
        let err = AiConfig::from_toml_str("event_quota = 0").unwrap_err();
        assert!(matches!(err, AiError::InvalidConfig(_)));
    }
}
