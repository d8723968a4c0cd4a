use crate::wheel::{
    AnimationProfile, DEFAULT_MAX_REPEATS, DEFAULT_SLOT_COUNT, GenerateOptions, Prize, PrizeTable,
    RepeatGranularity, SpinError, WheelLayout, validate_weights,
};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_with::DeserializeFromStr;
use std::path::{Path, PathBuf};
use strum::{Display as StrumDisplay, EnumIter, EnumString};
use thiserror::Error;

/// Named pointer positions, counter-clockwise from the right edge.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    DeserializeFromStr,
    EnumString,
    EnumIter,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum PointerDirection {
    #[strum(serialize = "Right", serialize = "r", serialize = "east", serialize = "0")]
    Right,
    #[strum(serialize = "Top", serialize = "t", serialize = "north", serialize = "90")]
    Top,
    #[strum(serialize = "Left", serialize = "l", serialize = "west", serialize = "180")]
    Left,
    #[strum(serialize = "Bottom", serialize = "b", serialize = "south", serialize = "270")]
    Bottom,
}

impl PointerDirection {
    pub fn degrees(&self) -> f64 {
        *self as usize as f64 * 90.0
    }
}

/// Pointer position: a direction name or plain degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pointer {
    Degrees(f64),
    Direction(PointerDirection),
}

impl Pointer {
    pub fn degrees(&self) -> f64 {
        match self {
            Self::Degrees(d) => *d,
            Self::Direction(dir) => dir.degrees(),
        }
    }
}

impl Default for Pointer {
    fn default() -> Self {
        Self::Direction(PointerDirection::Bottom)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WheelConfig {
    pub slot_count: usize,
    pub pointer: Pointer,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            pointer: Pointer::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SpinConfig {
    pub anti_repeat: bool,
    pub max_repeats: usize,
    pub repeat_granularity: RepeatGranularity,
    pub weights: Option<Vec<f64>>,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            anti_repeat: true,
            max_repeats: DEFAULT_MAX_REPEATS,
            repeat_granularity: RepeatGranularity::Slot,
            weights: None,
        }
    }
}

impl SpinConfig {
    pub fn options(&self) -> GenerateOptions {
        GenerateOptions {
            weights: self.weights.clone(),
            anti_repeat: self.anti_repeat,
            max_repeats: self.max_repeats.max(1),
            repeat_granularity: self.repeat_granularity,
            ..GenerateOptions::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub wheel: WheelConfig,
    #[serde(default)]
    pub spin: SpinConfig,
    #[serde(default)]
    pub animation: AnimationProfile,
    #[serde(default = "default_prizes")]
    pub prizes: Vec<Prize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wheel: WheelConfig::default(),
            spin: SpinConfig::default(),
            animation: AnimationProfile::default(),
            prizes: default_prizes(),
        }
    }
}

impl Config {
    pub fn layout(&self) -> Result<WheelLayout, SpinError> {
        WheelLayout::new(self.wheel.slot_count, self.wheel.pointer.degrees())
    }

    pub fn prize_table(&self) -> Result<PrizeTable, SpinError> {
        PrizeTable::new(self.prizes.clone())
    }

    fn validate(self) -> Result<Self, ConfigError> {
        self.layout()?;
        self.prize_table()?;
        if let Some(weights) = &self.spin.weights {
            validate_weights(weights, self.wheel.slot_count)?;
        }
        self.animation.validate().map_err(ConfigError::Animation)?;
        Ok(self)
    }
}

fn default_prizes() -> Vec<Prize> {
    [
        ("Coins", 10.0, "coin", "#f5c542"),
        ("Gems", 50.0, "gem", "#3fa7d6"),
        ("Nothing", 0.0, "empty", "#7a7a7a"),
        ("Coin Bag", 25.0, "coin-bag", "#e08e45"),
        ("Chest", 100.0, "chest", "#8f5bd7"),
        ("Jackpot", 500.0, "crown", "#d64550"),
    ]
    .into_iter()
    .map(|(label, value, icon, color)| {
        let prize = Prize::new(label, value, icon);
        match color.parse() {
            Ok(color) => prize.with_color(color),
            Err(_) => prize,
        }
    })
    .collect()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid wheel: {0}")]
    Wheel(#[from] SpinError),
    #[error("Invalid animation: {0}")]
    Animation(String),
}

pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("org", "fortuna", "fortuna").ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("FORTUNA")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn load_from(path: &Path, env: config::Environment) -> Result<Config, ConfigError> {
    let s = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(env)
        .build()?;

    s.try_deserialize::<Config>()?.validate()
}

pub fn load_config() -> Result<Config, ConfigError> {
    load_from(&get_config_path()?, environment())
}

pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let s = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    s.try_deserialize::<Config>()?.validate()
}

pub fn load_or_default() -> Config {
    match load_config() {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Falling back to the default wheel: {}", e);
            Config::default()
        }
    }
}

pub fn write_default_config() -> std::io::Result<PathBuf> {
    let path =
        get_config_path().map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    if !path.exists() {
        fs_err::write(&path, DEFAULT_CONFIG)?;
    }
    Ok(path)
}

pub const DEFAULT_CONFIG: &str = include_str!("default_config.toml");
