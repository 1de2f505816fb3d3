//! Tunable game parameters, loaded once before the loop starts and immutable
//! thereafter.

use clap::ValueEnum;
use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

/// Selects the rule preset. `Extra` bulk-overrides several tunables before
/// the loop starts; everything after startup treats settings as constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Standard,
    Extra,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub starting_ship_health: i32,
    pub projectile_velocity: f64,
    pub projectile_damage: i32,
    pub max_projectiles: usize,
    pub engine_strength: f64,
    /// Degrees per rotate command.
    pub turn_rate: f64,
    pub ship_collision_radius: f64,
    pub star_collision_radius: f64,
    /// Side length of the square universe; coordinates span ±size/2.
    pub universe_size: i32,
    pub tick_interval_ms: u64,
    /// A fire attempt only succeeds on ticks divisible by this.
    pub projectile_fire_delay: u64,
    /// Ticks a dead ship waits before respawning.
    pub respawn_delay: u32,
    pub game_mode: GameMode,
}

impl Default for ServerSettings {
    fn default() -> ServerSettings {
        ServerSettings {
            starting_ship_health: 5,
            projectile_velocity: 15.0,
            projectile_damage: 1,
            max_projectiles: 1000,
            engine_strength: 0.08,
            turn_rate: 3.0,
            ship_collision_radius: 20.0,
            star_collision_radius: 35.0,
            universe_size: 750,
            tick_interval_ms: 20,
            projectile_fire_delay: 6,
            respawn_delay: 300,
            game_mode: GameMode::Standard,
        }
    }
}

impl ServerSettings {
    /// Reads settings from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<ServerSettings, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        let settings: ServerSettings = toml::from_str(&text)?;
        Ok(settings)
    }

    /// Applies the game-mode preset. Called once, before the loop starts.
    pub fn apply_game_mode(&mut self) {
        if self.game_mode == GameMode::Extra {
            self.turn_rate = 7.0;
            self.projectile_fire_delay = 3;
            self.star_collision_radius = 80.0;
            self.ship_collision_radius = 20.0;
            self.engine_strength = 0.22;
            self.respawn_delay = 50;
            self.tick_interval_ms = 21;
            self.max_projectiles = 800;
        }
    }

    /// Half the universe size: positions live in `[-bounds, bounds]`.
    pub fn bounds(&self) -> f64 {
        (self.universe_size / 2) as f64
    }
}
