use std::time::Instant;

/// Laser color recognized by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotColor {
    Red,
    Green,
}

/// A detected shot, reported in the coordinate space implied by the active
/// projection bounds (origin added back when bounds are set).
#[derive(Debug, Clone, Copy)]
pub struct Shot {
    pub x: f64,
    pub y: f64,
    pub color: ShotColor,
    pub timestamp: Instant,
}

impl Shot {
    pub fn new(x: f64, y: f64, color: ShotColor) -> Self {
        Self {
            x,
            y,
            color,
            timestamp: Instant::now(),
        }
    }

    /// Translate the shot by a projection-bounds origin.
    pub fn offset(mut self, dx: f64, dy: f64) -> Self {
        self.x += dx;
        self.y += dy;
        self
    }
}
