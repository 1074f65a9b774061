//! Accumulator grid for the shot transform.
//!
//! Per-pixel amplitudes are spread into a small plus-shaped neighborhood of
//! cells. A real shot lights up a cluster of pixels whose votes reinforce
//! each other; an isolated noisy pixel spreads its single vote thin and never
//! reaches the detection threshold.

/// Half-extent of the vote kernel and of the scan margin kept clear of the
/// frame border.
pub const VOTE_SPAN: u32 = 2;

/// Window half-size used to refine a threshold trigger to the local maximum.
/// The trigger tends to fire on the rising edge of a shot, not its peak.
pub const LOCAL_MAX_RADIUS: u32 = 10;

pub struct ShotTransform {
    width: u32,
    height: u32,
    cells: Vec<f32>,
}

impl ShotTransform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![0.0; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Zero every cell. Called at the start of each detection cycle so no
    /// votes bleed between cycles.
    pub fn reset(&mut self) {
        self.cells.fill(0.0);
    }

    #[inline]
    pub fn value(&self, x: u32, y: u32) -> f32 {
        self.cells[(y * self.width + x) as usize]
    }

    #[inline]
    fn add(&mut self, x: i64, y: i64, amplitude: f32) {
        if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
            self.cells[(y as u32 * self.width + x as u32) as usize] += amplitude;
        }
    }

    /// Spread one pixel's amplitude into the plus-shaped kernel: the pixel's
    /// row at x offsets -2..=2 and its column at y offsets {-2, -1, 1, 2},
    /// counting the center once.
    pub fn add_votes(&mut self, x: u32, y: u32, amplitude: f32) {
        let (x, y) = (x as i64, y as i64);
        let span = VOTE_SPAN as i64;

        for dx in -span..=span {
            self.add(x + dx, y, amplitude);
        }
        for dy in -span..=span {
            if dy != 0 {
                self.add(x, y + dy, amplitude);
            }
        }
    }

    /// Find the cell with the highest accumulator value within
    /// `LOCAL_MAX_RADIUS` of the trigger point, clamped to the grid.
    pub fn local_max(&self, x: u32, y: u32) -> (u32, u32) {
        let r = LOCAL_MAX_RADIUS;
        let min_x = x.saturating_sub(r);
        let min_y = y.saturating_sub(r);
        let max_x = (x + r).min(self.width - 1);
        let max_y = (y + r).min(self.height - 1);

        let mut best = (x, y);
        let mut best_value = self.value(x, y);

        for yy in min_y..=max_y {
            for xx in min_x..=max_x {
                let v = self.value(xx, yy);
                if v > best_value {
                    best_value = v;
                    best = (xx, yy);
                }
            }
        }

        best
    }
}
