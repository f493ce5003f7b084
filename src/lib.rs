pub mod capture;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod utils;

use std::path::{Path, PathBuf};

use arc_swap::ArcSwap;
use capture::{Pattern, PixelFormat};
use pipeline::{DelayMapPreset, ResizePolicy};
use serde::{Deserialize, Serialize};

pub use capture::Frame;
pub use error::SlitScanError;
pub use pipeline::{EngineStats, SlitScan};

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// Environment variables prefixed with this override file settings, e.g.
/// `SLITSCAN__EFFECT__CAPACITY=120`.
pub const ENV_PREFIX: &str = "SLITSCAN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub effect: EffectConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    pub width: u32,
    pub height: u32,
    /// Frames of history kept
    pub capacity: usize,
    pub format: PixelFormat,
    pub blending: bool,
    /// Frames skipped at the recent end of history
    pub delay: usize,
    /// Frames spanned by the delay map; the whole capacity when unset
    pub window: Option<usize>,
    pub resize_policy: ResizePolicy,
    pub delay_map_preset: DelayMapPreset,
    /// Image file used instead of the preset
    pub delay_map_path: Option<PathBuf>,
    /// Seed for the noise presets
    pub seed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub pattern: Pattern,
    pub fps: u32,
    /// Frames to produce before stopping; 0 runs until interrupted
    pub frames: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// Write every Nth output frame
    pub every: u64,
    /// Also write the delay map visualization
    pub delay_map: bool,
    /// Frames in the final history filmstrip; 0 disables it
    pub filmstrip: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames buffered between source and engine
    pub channel_capacity: usize,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            capacity: 60,
            format: PixelFormat::Rgb,
            blending: true,
            delay: 0,
            window: None,
            resize_policy: ResizePolicy::PreserveHistory,
            delay_map_preset: DelayMapPreset::LeftToRight,
            delay_map_path: None,
            seed: 1,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            pattern: Pattern::SweepBar,
            fps: 30,
            frames: 240,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("slitscan-out"),
            every: 30,
            delay_map: true,
            filmstrip: 8,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 8,
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then `SLITSCAN__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let effect = &self.effect;
        if effect.width == 0 || effect.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "frame size must be non-zero, got {}x{}",
                effect.width, effect.height
            )));
        }
        if effect.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".into()));
        }
        if self.source.fps == 0 {
            return Err(ConfigError::Invalid("fps must be at least 1".into()));
        }
        if self.output.every == 0 {
            return Err(ConfigError::Invalid("output.every must be at least 1".into()));
        }
        if self.pipeline.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.channel_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slitscan.toml");
        std::fs::write(
            &path,
            r#"
[effect]
capacity = 120
format = "gray"
delay_map_preset = "soft_noise"
resize_policy = "slot_order"
window = 40

[source]
pattern = "checker"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.effect.capacity, 120);
        assert_eq!(config.effect.format, PixelFormat::Gray);
        assert_eq!(config.effect.delay_map_preset, DelayMapPreset::SoftNoise);
        assert_eq!(config.effect.resize_policy, ResizePolicy::SlotOrder);
        assert_eq!(config.effect.window, Some(40));
        assert_eq!(config.source.pattern, Pattern::Checker);
        assert_eq!(config.effect.width, 320);
    }

    #[test]
    fn format_accepts_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slitscan.toml");
        std::fs::write(&path, "[effect]\nformat = \"Grayscale\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.effect.format, PixelFormat::Gray);

        std::fs::write(&path, "[effect]\nformat = \"yuyv\"\n").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Load(_))));
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let mut config = Config::default();
        config.effect.capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
