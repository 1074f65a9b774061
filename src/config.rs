use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Detection tuning knobs.
///
/// The defaults are the values the original detector was tuned to against a
/// corpus of recorded test videos. They are configuration, not physical
/// constants: expect to re-validate them for a new camera or lighting setup.
/// The detection core only ever reads this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of recent frames in the per-pixel background history window
    pub history_frames: usize,

    /// Frames consumed at startup to calibrate lighting before modeling begins
    pub calibration_frames: usize,

    /// Accumulator value a cell must exceed to trigger a shot candidate
    pub accumulator_threshold: f32,

    /// A color is only recognized when the dominant channel exceeds the
    /// others by this ratio (1.05 = 5% brighter)
    pub color_diff_threshold: f64,

    /// Radius in pixels of the arms averaged for color classification
    pub color_detection_radius: u32,

    /// Consecutive background pixels that mark a shot edge during centering
    pub center_border_width: u32,

    /// Candidates with width and height both below this are noise
    pub min_shot_dimension: u32,

    /// Minimum interval between scan/report passes; faster frames still
    /// update the background model
    pub min_cycle_interval_ms: u64,

    /// Feed FPS below this triggers a one-time low-frame-rate warning
    pub min_detection_fps: f64,

    /// Average luminance above this is BRIGHT
    pub bright_threshold: f32,

    /// Average luminance above this is VERY_BRIGHT (warned during calibration)
    pub very_bright_threshold: f32,

    /// Sector grid rows
    pub sector_rows: u32,

    /// Sector grid columns
    pub sector_cols: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_frames: 30,
            calibration_frames: 5,
            accumulator_threshold: 6.0,
            color_diff_threshold: 1.05, // noise tends to have near-equal channels
            color_detection_radius: 5,
            center_border_width: 3,
            min_shot_dimension: 6,
            min_cycle_interval_ms: 100,
            min_detection_fps: 5.0,
            bright_threshold: 90.0,
            very_bright_threshold: 130.0,
            sector_rows: 3,
            sector_cols: 3,
        }
    }
}

impl Config {
    /// Load configuration from the config directory next to the executable.
    /// Creates a default config file if none exists.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::LoadFailed {
                path: config_path.display().to_string(),
                source: Box::new(e),
            })?;
            let config: Config =
                serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: config_path.display().to_string(),
                    source: Box::new(e),
                })?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            tracing::info!("created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed {
                path: config_path.display().to_string(),
                source: Box::new(e),
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: config_path.display().to_string(),
            source: Box::new(e),
        })?;
        fs::write(&config_path, json).map_err(|e| ConfigError::SaveFailed {
            path: config_path.display().to_string(),
            source: Box::new(e),
        })?;

        Ok(())
    }

    /// Reject knob combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_frames == 0 {
            return Err(ConfigError::Invalid(
                "history_frames must be at least 1".to_string(),
            ));
        }
        if self.sector_rows == 0 || self.sector_cols == 0 {
            return Err(ConfigError::Invalid(
                "sector grid must have at least one row and column".to_string(),
            ));
        }
        if self.center_border_width == 0 {
            return Err(ConfigError::Invalid(
                "center_border_width must be at least 1".to_string(),
            ));
        }
        if self.color_diff_threshold <= 0.0 {
            return Err(ConfigError::Invalid(
                "color_diff_threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the config file path (in the app's base directory)
    fn config_path() -> Result<PathBuf, ConfigError> {
        let exe_path = env::current_exe().map_err(|e| ConfigError::LoadFailed {
            path: "<exe>".to_string(),
            source: Box::new(e),
        })?;
        let exe_dir = exe_path.parent().ok_or_else(|| {
            ConfigError::Invalid("could not determine executable directory".to_string())
        })?;

        Ok(exe_dir.join("config").join("config.json"))
    }
}
