//! Per-pixel, per-channel sliding-window background statistics.
//!
//! For every pixel and each of R, G, B the model keeps the last
//! `history_len` samples in an arena-backed circular buffer together with a
//! running sum and a running sum of squared deviations, so each frame's
//! update is O(1) per pixel: evict the oldest sample, insert the new one,
//! recompute mean and variance from the sums.
//!
//! The comparison baseline for a pixel is the highest background mean in its
//! 3x3 neighborhood rather than its own mean, which keeps slow local scene
//! drift from reading as elevation.

use crate::frame::Frame;
use crate::transform::ShotTransform;

/// Lower clamp on the normalized amplitude.
pub const AMPLITUDE_MIN: f32 = -1.0;
/// Upper clamp on the normalized amplitude.
pub const AMPLITUDE_MAX: f32 = 3.0;
/// Pixels this close to the frame edge are skipped so neighborhood lookups
/// stay in bounds.
pub const EDGE_MARGIN: u32 = 2;

/// Flat buffers for one color channel. Grids are indexed by `y*W + x`;
/// history arenas by `(y*W + x) * history_len + history_index`.
struct ChannelStats {
    history: Vec<u8>,
    var_history: Vec<f32>,
    sum: Vec<i32>,
    var_sum: Vec<f32>,
    mean: Vec<f32>,
}

impl ChannelStats {
    fn new(pixels: usize, history_len: usize) -> Self {
        Self {
            history: vec![0; pixels * history_len],
            var_history: vec![0.0; pixels * history_len],
            sum: vec![0; pixels],
            var_sum: vec![0.0; pixels],
            mean: vec![0.0; pixels],
        }
    }
}

pub struct BackgroundModel {
    width: u32,
    height: u32,
    history_len: usize,
    history_index: usize,
    frames_observed: usize,
    ready: bool,
    channels: [ChannelStats; 3],
}

impl BackgroundModel {
    pub fn new(width: u32, height: u32, history_len: usize) -> Self {
        let pixels = (width * height) as usize;
        Self {
            width,
            height,
            history_len,
            history_index: 0,
            frames_observed: 0,
            ready: false,
            channels: [
                ChannelStats::new(pixels, history_len),
                ChannelStats::new(pixels, history_len),
                ChannelStats::new(pixels, history_len),
            ],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// True once the history window has filled at least once. Detection is
    /// suppressed until then.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn frames_observed(&self) -> usize {
        self.frames_observed
    }

    /// Background mean for a channel (0 = R, 1 = G, 2 = B) at a pixel.
    pub fn mean(&self, channel: usize, x: u32, y: u32) -> f32 {
        self.channels[channel].mean[(y * self.width + x) as usize]
    }

    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    /// First pass of a cycle: slide each pixel's history window forward by
    /// one sample and refresh the means. Must complete for the whole frame
    /// before `accumulate` runs, because amplitudes compare against the
    /// neighborhood's refreshed means.
    pub fn update_means(&mut self, frame: &Frame) {
        self.frames_observed += 1;
        let filled = self.frames_observed.min(self.history_len);

        for y in EDGE_MARGIN..self.height - EDGE_MARGIN {
            for x in EDGE_MARGIN..self.width - EDGE_MARGIN {
                let idx = (y * self.width + x) as usize;
                let slot = idx * self.history_len + self.history_index;
                let samples = frame.get_pixel(x, y).0;

                for (c, &sample) in samples.iter().enumerate() {
                    let ch = &mut self.channels[c];
                    ch.sum[idx] -= ch.history[slot] as i32;
                    ch.sum[idx] += sample as i32;
                    ch.history[slot] = sample;
                    ch.mean[idx] = ch.sum[idx] as f32 / filled as f32;
                }
            }
        }
    }

    /// Second pass of a cycle: per pixel and channel, roll the variance
    /// window forward using the squared deviation from the neighborhood-max
    /// baseline, derive the normalized amplitude, and cast positive
    /// amplitudes as votes into the accumulator. Advances the history index
    /// when done.
    pub fn accumulate(&mut self, frame: &Frame, transform: &mut ShotTransform) {
        let history_len = self.history_len as f32;

        for y in EDGE_MARGIN..self.height - EDGE_MARGIN {
            for x in EDGE_MARGIN..self.width - EDGE_MARGIN {
                let idx = self.pixel_index(x, y);
                let slot = idx * self.history_len + self.history_index;
                let samples = frame.get_pixel(x, y).0;

                for (c, &sample) in samples.iter().enumerate() {
                    let ch = &mut self.channels[c];
                    let baseline = neighborhood_max(&ch.mean, self.width, x, y);

                    let deviation = baseline - sample as f32;
                    let squared = deviation * deviation;
                    ch.var_sum[idx] -= ch.var_history[slot];
                    ch.var_history[slot] = squared;
                    ch.var_sum[idx] += squared;

                    // +1 keeps near-zero-variance regions (a pure black
                    // backdrop) from blowing the division up
                    let sigma = (ch.var_sum[idx] / history_len).sqrt() + 1.0;
                    let amplitude =
                        ((sample as f32 - baseline) / sigma).clamp(AMPLITUDE_MIN, AMPLITUDE_MAX);

                    if amplitude > 0.0 {
                        transform.add_votes(x, y, amplitude);
                    }
                }
            }
        }

        self.history_index = (self.history_index + 1) % self.history_len;
        if self.history_index == 0 {
            self.ready = true;
        }
    }
}

/// Highest mean in the 3x3 neighborhood of (x, y). Caller guarantees the
/// pixel is at least one cell away from every edge.
#[inline]
fn neighborhood_max(mean: &[f32], width: u32, x: u32, y: u32) -> f32 {
    let mut max = f32::MIN;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            let idx = ((y as i64 + dy) * width as i64 + (x as i64 + dx)) as usize;
            if mean[idx] > max {
                max = mean[idx];
            }
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn uniform_frame(value: u8) -> Frame {
        Frame::from_pixel(16, 16, Rgb([value, value, value]))
    }

    fn run_cycle(model: &mut BackgroundModel, frame: &Frame) -> ShotTransform {
        let mut transform = ShotTransform::new(model.width(), model.height());
        model.update_means(frame);
        model.accumulate(frame, &mut transform);
        transform
    }

    #[test]
    fn test_mean_matches_arithmetic_mean_of_window() {
        let mut model = BackgroundModel::new(16, 16, 3);

        for value in [10u8, 20, 30, 40] {
            run_cycle(&mut model, &uniform_frame(value));
        }

        // Window now holds [20, 30, 40]
        assert_eq!(model.mean(0, 8, 8), 30.0);
        assert_eq!(model.mean(1, 8, 8), 30.0);
        assert_eq!(model.mean(2, 8, 8), 30.0);
    }

    #[test]
    fn test_mean_before_warmup_uses_observed_samples() {
        let mut model = BackgroundModel::new(16, 16, 10);

        run_cycle(&mut model, &uniform_frame(10));
        run_cycle(&mut model, &uniform_frame(20));

        // Only two samples observed: mean of 10 and 20
        assert_eq!(model.mean(0, 8, 8), 15.0);
    }

    #[test]
    fn test_not_ready_until_history_fills() {
        let mut model = BackgroundModel::new(16, 16, 4);

        for i in 0..3 {
            run_cycle(&mut model, &uniform_frame(0));
            assert!(!model.is_ready(), "ready too early after {} frames", i + 1);
        }

        run_cycle(&mut model, &uniform_frame(0));
        assert!(model.is_ready());
    }

    #[test]
    fn test_static_scene_casts_no_votes() {
        let mut model = BackgroundModel::new(16, 16, 4);

        for _ in 0..6 {
            let transform = run_cycle(&mut model, &uniform_frame(50));
            for y in 0..16 {
                for x in 0..16 {
                    assert_eq!(transform.value(x, y), 0.0);
                }
            }
        }
    }

    #[test]
    fn test_bright_anomaly_casts_votes() {
        let mut model = BackgroundModel::new(16, 16, 4);
        for _ in 0..4 {
            run_cycle(&mut model, &uniform_frame(0));
        }

        let mut frame = uniform_frame(0);
        frame.put_pixel(8, 8, Rgb([250, 10, 10]));
        let transform = run_cycle(&mut model, &frame);

        assert!(transform.value(8, 8) > 0.0);
        // Kernel spread reaches the row/column arms
        assert!(transform.value(6, 8) > 0.0);
        assert!(transform.value(8, 10) > 0.0);
    }

    #[test]
    fn test_amplitude_clamped_per_channel() {
        let mut model = BackgroundModel::new(16, 16, 4);
        for _ in 0..4 {
            run_cycle(&mut model, &uniform_frame(0));
        }

        let mut frame = uniform_frame(0);
        frame.put_pixel(8, 8, Rgb([255, 255, 255]));
        let transform = run_cycle(&mut model, &frame);

        // Three channels, each clamped at AMPLITUDE_MAX, all voting on the
        // same cell
        assert!(transform.value(8, 8) <= 3.0 * AMPLITUDE_MAX + f32::EPSILON);
    }

    #[test]
    fn test_window_eviction_after_wrap() {
        let mut model = BackgroundModel::new(16, 16, 3);

        for _ in 0..3 {
            run_cycle(&mut model, &uniform_frame(0));
        }
        for _ in 0..3 {
            run_cycle(&mut model, &uniform_frame(90));
        }

        // Every black sample has been evicted
        assert_eq!(model.mean(0, 8, 8), 90.0);
    }

    #[test]
    fn test_edge_margin_untouched() {
        let mut model = BackgroundModel::new(16, 16, 3);
        for _ in 0..4 {
            run_cycle(&mut model, &uniform_frame(200));
        }

        // Border pixels are never processed, so their means stay zero
        assert_eq!(model.mean(0, 0, 0), 0.0);
        assert_eq!(model.mean(0, 1, 8), 0.0);
        assert_eq!(model.mean(0, 8, 15), 0.0);
        // Interior pixels track the scene
        assert_eq!(model.mean(0, 8, 8), 200.0);
    }
}
