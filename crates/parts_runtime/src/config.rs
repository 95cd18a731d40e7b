//! Sandbox configuration
//!
//! Loaded from, in order of increasing precedence:
//! 1. Built-in defaults
//! 2. A TOML file named by the first command line argument or by
//!    `PARTS_SANDBOX_CONFIG`
//! 3. Environment overrides (`PARTS_SANDBOX_SEED`, `PARTS_SANDBOX_DURATION`)
//!
//! Example file:
//! ```toml
//! [sandbox]
//! duration = 20.0
//! seed = 3
//! levels = ["Arena1", "Arena2"]
//!
//! [player]
//! mode = "Kinematic"
//! max_health = 150.0
//!
//! [weapon]
//! usage = "Auto"
//! fire_rate = 0.15
//! ```

use glam::Vec3;
use parts_combat::{AmmoData, UsageType, WeaponData};
use parts_core::Layer;
use parts_gamestate::PrefsFormat;
use parts_motion::{MotionConfig, MoveMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Env var naming the config file when no argument is given
pub const CONFIG_ENV: &str = "PARTS_SANDBOX_CONFIG";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Run length, clocks and persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSection {
    /// Simulated seconds
    pub duration: f32,
    /// Variable frame time fed to the sandbox
    pub tick: f32,
    /// Physics step
    pub fixed_step: f32,
    pub seed: u64,
    /// Where prefs persist; in memory only when absent
    pub prefs_path: Option<PathBuf>,
    pub prefs_format: PrefsFormat,
    /// Levels played in order after the main menu
    pub levels: Vec<String>,
    /// Enemies placed before the spawner takes over
    pub enemies: u32,
    /// Kills that clear a level
    pub kills_per_level: u32,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            duration: 30.0,
            tick: 1.0 / 60.0,
            fixed_step: 1.0 / 50.0,
            seed: 7,
            prefs_path: None,
            prefs_format: PrefsFormat::Json,
            levels: vec!["Arena1".to_string(), "Arena2".to_string()],
            enemies: 3,
            kills_per_level: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSection {
    pub mode: MoveMode,
    pub speed: f32,
    pub max_health: f32,
    pub spawn_point: Vec3,
    /// Distance the player keeps from its target
    pub engage_distance: f32,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            mode: MoveMode::Kinematic,
            speed: 5.0,
            max_health: 100.0,
            spawn_point: Vec3::new(0.0, 1.0, 0.0),
            engage_distance: 6.0,
        }
    }
}

/// The player's starting weapon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponSection {
    pub usage: UsageType,
    pub fire_rate: f32,
    /// Magazine size (0 = infinite)
    pub rounds: u32,
    pub damage: f32,
    pub range: f32,
}

impl Default for WeaponSection {
    fn default() -> Self {
        Self {
            usage: UsageType::Auto,
            fire_rate: 0.2,
            rounds: 30,
            damage: 25.0,
            range: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSection {
    pub max_emitters: usize,
    /// Overrides the saved master level
    pub master_volume: Option<f32>,
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            max_emitters: 16,
            master_volume: None,
        }
    }
}

/// Everything the sandbox binary reads at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub sandbox: SandboxSection,
    pub player: PlayerSection,
    pub weapon: WeaponSection,
    pub audio: AudioSection,
    /// File the config came from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl SandboxConfig {
    /// Parse a TOML document; missing tables and keys keep their defaults
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&text)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load the startup configuration
    pub fn load() -> Result<Self> {
        let path = std::env::args()
            .skip(1)
            .find(|arg| !arg.starts_with("--"))
            .or_else(|| std::env::var(CONFIG_ENV).ok().filter(|p| !p.is_empty()));

        let mut config = match path {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                log::info!("Loaded sandbox config from {}", path);
                config
            }
            None => Self::default(),
        };

        if let Some(seed) = std::env::var("PARTS_SANDBOX_SEED").ok().and_then(|s| s.parse().ok()) {
            config.sandbox.seed = seed;
            log::info!("Seed from env: {}", seed);
        }
        if let Some(duration) = std::env::var("PARTS_SANDBOX_DURATION")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.sandbox.duration = duration;
            log::info!("Duration from env: {}s", duration);
        }

        Ok(config)
    }

    /// Player motor tuning
    pub fn motion_config(&self) -> MotionConfig {
        MotionConfig {
            speed: self.player.speed,
            ..Default::default()
        }
    }

    /// Player rifle: hitscan rounds against enemies
    pub fn weapon_data(&self) -> WeaponData {
        let w = &self.weapon;
        WeaponData {
            name: "Rifle".to_string(),
            ..Default::default()
        }
        .with_usage(w.usage)
        .with_fire_rate(w.fire_rate)
        .with_rounds(w.rounds)
        .with_spread(Vec3::ZERO)
        .with_ammo(
            AmmoData::hitscan(w.range)
                .with_damage(w.damage)
                .with_mask(Layer::ENEMIES.mask())
                .with_impact_effect("spark"),
        )
    }

    pub fn log_summary(&self) {
        log::info!("Sandbox configuration:");
        if let Some(path) = &self.config_path {
            log::info!("  Config file: {}", path.display());
        }
        log::info!(
            "  Duration: {:.1}s (tick {:.4}s, fixed {:.4}s)",
            self.sandbox.duration,
            self.sandbox.tick,
            self.sandbox.fixed_step
        );
        log::info!("  Seed: {}", self.sandbox.seed);
        log::info!("  Levels: {:?}", self.sandbox.levels);
        log::info!("  Player: {:?}, {} hp", self.player.mode, self.player.max_health);
        log::info!(
            "  Weapon: {:?} every {:.2}s, {} rounds",
            self.weapon.usage,
            self.weapon.fire_rate,
            self.weapon.rounds
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SandboxConfig::default();
        assert_eq!(config.sandbox.duration, 30.0);
        assert_eq!(config.sandbox.levels.len(), 2);
        assert_eq!(config.player.mode, MoveMode::Kinematic);
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SandboxConfig::from_toml(
            r#"
            [sandbox]
            duration = 5.0
            levels = ["Only"]

            [weapon]
            usage = "Single"
            rounds = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.sandbox.duration, 5.0);
        assert_eq!(config.sandbox.levels, vec!["Only".to_string()]);
        assert_eq!(config.sandbox.seed, 7);
        assert_eq!(config.weapon.usage, UsageType::Single);
        assert_eq!(config.weapon.rounds, 0);
        assert_eq!(config.player.max_health, 100.0);
    }

    #[test]
    fn test_invalid_toml() {
        let err = SandboxConfig::from_toml("[sandbox]\nduration = \"long\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = SandboxConfig::load_from_file("/nonexistent/sandbox.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_weapon_data() {
        let data = SandboxConfig::default().weapon_data();
        assert_eq!(data.usage, UsageType::Auto);
        assert_eq!(data.max_rounds, 30);
        assert_eq!(data.ammo.damage, 25.0);
        assert!(data.ammo.hit_mask.contains(Layer::ENEMIES));
        assert!(!data.ammo.hit_mask.contains(Layer::PLAYER));
    }
}
