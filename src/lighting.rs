use crate::config::Config;
use crate::frame::Frame;

/// Ambient lighting classification for a frame.
///
/// Shot detection works in all three conditions, but VERY_BRIGHT feeds raise
/// the odds of false positives, so the pipeline warns once when calibration
/// sees one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightingCondition {
    Dark,
    Bright,
    VeryBright,
}

/// Per-frame average luminance and red channel over the analyzed region.
#[derive(Debug, Clone, Copy)]
pub struct LightingSample {
    pub average_luminance: f32,
    pub average_red: f32,
}

impl LightingSample {
    pub fn condition(&self, config: &Config) -> LightingCondition {
        if self.average_luminance > config.very_bright_threshold {
            LightingCondition::VeryBright
        } else if self.average_luminance > config.bright_threshold {
            LightingCondition::Bright
        } else {
            LightingCondition::Dark
        }
    }
}

/// Average luminance and red component of a frame.
///
/// Luminance uses the integer approximation (3R + 4G + B) >> 3, weighting
/// green heaviest the way the original tuning did.
pub fn analyze(frame: &Frame) -> LightingSample {
    let mut total_lum: u64 = 0;
    let mut total_red: u64 = 0;

    for pixel in frame.pixels() {
        let [r, g, b] = pixel.0;
        total_lum += ((3 * r as u64) + (4 * g as u64) + b as u64) >> 3;
        total_red += r as u64;
    }

    let total_pixels = (frame.width() * frame.height()).max(1) as f32;

    LightingSample {
        average_luminance: total_lum as f32 / total_pixels,
        average_red: total_red as f32 / total_pixels,
    }
}
