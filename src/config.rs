//! Robot configuration
//!
//! Loaded from a TOML file. Every section and field is optional, missing
//! values take the defaults of the reference build: two 710°-per-square belt
//! axes, a 900° lift and a power driven claw.

use crate::piece::{Color, Height};
use crate::square::Square;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub gantry: GantryConfig,
    pub oracle: OracleConfig,
    pub detector: DetectorConfig,
    pub safety: SafetyConfig,
    pub game: GameConfig,
}

/// Motor tuning of the gantry
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GantryConfig {
    /// Encoder degrees to move one file to the right
    pub file_degrees: i32,
    /// Encoder degrees to move one rank up
    pub rank_degrees: i32,
    /// Power limit of the travel axes
    pub travel_power: i32,
    /// Speed limit of the travel axes, degrees per second
    pub travel_speed: u32,
    /// Travel time for one square, in seconds. Diagonal steps take as long as
    /// straight ones
    pub seconds_per_square: f64,

    /// Lift angle with the claw down at board level. Zero is fully raised
    pub lift_depth: i32,
    pub lift_power: i32,
    pub lift_speed: u32,
    /// Taken off `lift_depth` toward the raised position for knights,
    /// bishops and rooks, so the claw grips them below the head
    pub medium_offset: i32,
    /// Same, for kings and queens
    pub tall_offset: i32,

    /// Power used to open the claw. Closing uses the opposite power
    pub claw_power: i32,
    pub claw_seconds: f64,

    /// Square the gantry rests on between moves, and homes against
    pub home: String,
}

impl Default for GantryConfig {
    fn default() -> Self {
        GantryConfig {
            file_degrees: 710,
            rank_degrees: -710,
            travel_power: 100,
            travel_speed: 500,
            seconds_per_square: 1.2,
            lift_depth: -900,
            lift_power: 100,
            lift_speed: 500,
            medium_offset: 120,
            tall_offset: 240,
            claw_power: 100,
            claw_seconds: 0.17,
            home: String::from("e8"),
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    })
}

impl GantryConfig {
    /// Checks the values motion timing divides by or turns into durations
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |seconds: f64| seconds.is_finite() && seconds > 0.0;
        if Square::parse(&self.home).to_string() != self.home {
            return invalid("gantry.home", "not a square");
        }
        if !positive(self.seconds_per_square) {
            return invalid("gantry.seconds_per_square", "must be positive");
        }
        if !positive(self.claw_seconds) {
            return invalid("gantry.claw_seconds", "must be positive");
        }
        if self.lift_speed == 0 || self.travel_speed == 0 {
            return invalid("gantry.lift_speed", "speeds must be positive");
        }
        if self.tall_offset.abs() >= self.lift_depth.abs() || self.medium_offset.abs() >= self.lift_depth.abs() {
            return invalid("gantry.tall_offset", "offsets must be smaller than the lift depth");
        }
        Ok(())
    }

    pub fn home_square(&self) -> Square {
        Square::parse(&self.home)
    }

    /// Lift angle at which the claw grips a piece of the given height
    pub fn grip_depth(&self, height: Height) -> i32 {
        let offset = match height {
            Height::Short => 0,
            Height::Medium => self.medium_offset,
            Height::Tall => self.tall_offset,
        };
        self.lift_depth - self.lift_depth.signum() * offset
    }

    pub fn square_time(&self) -> Duration {
        Duration::from_secs_f64(self.seconds_per_square)
    }

    pub fn claw_time(&self) -> Duration {
        Duration::from_secs_f64(self.claw_seconds)
    }

    /// Time the lift takes to travel between two angles
    pub fn lift_time(&self, from: i32, to: i32) -> Duration {
        Duration::from_secs_f64((from - to).unsigned_abs() as f64 / self.lift_speed as f64)
    }
}

/// How the move oracle (a UCI engine) is run
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OracleConfig {
    pub engine_path: String,
    /// Engine strength, 0..=20
    pub skill_level: u8,
    pub think_time_ms: u64,
    pub threads: usize,
    pub hash_mb: u32,
    pub own_book: bool,
    /// How much longer than `think_time_ms` the engine may take before it is
    /// considered hung
    pub grace_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            engine_path: String::from("/usr/games/stockfish"),
            skill_level: 3,
            think_time_ms: 1000,
            threads: 1,
            hash_mb: 512,
            own_book: true,
            grace_ms: 5000,
        }
    }
}

impl OracleConfig {
    pub fn think_time(&self) -> Duration {
        Duration::from_millis(self.think_time_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.think_time_ms + self.grace_ms)
    }
}

/// External change detector, called with the before and after pictures
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Program to run. Without one the operator types the squares in
    pub command: Option<String>,
    pub args: Vec<String>,
    pub before_image: String,
    pub after_image: String,
    pub timeout_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            command: None,
            args: vec![],
            before_image: String::from("pic/before.jpg"),
            after_image: String::from("pic/after.jpg"),
            timeout_ms: 10_000,
        }
    }
}

impl DetectorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SafetyConfig {
    /// Below this supply voltage the motors lose steps, the robot refuses to
    /// start
    pub min_supply_volts: f32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        SafetyConfig {
            min_supply_volts: 7.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    pub robot_color: Color,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            robot_color: Color::Black,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Config::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gantry.validate()?;
        if self.oracle.skill_level > 20 {
            return invalid("oracle.skill_level", "must be within 0..=20");
        }
        if self.oracle.threads == 0 {
            return invalid("oracle.threads", "must be at least 1");
        }
        Ok(())
    }
}
