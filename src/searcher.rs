//! Scans the completed accumulator for shots, one sector at a time.
//!
//! Sectors are disjoint and the accumulator is read-only during the scan, so
//! enabled sectors run in parallel on the rayon pool. Each sector reports at
//! most one shot per cycle: the first candidate that survives color
//! classification and the minimum-dimension check.

use rayon::prelude::*;

use crate::config::Config;
use crate::frame::Frame;
use crate::sector::{partition, SectorBounds, SectorStatuses};
use crate::shot::{Shot, ShotColor};
use crate::transform::{ShotTransform, VOTE_SPAN};

/// Result of scanning one sector. Rejections are part of normal noise
/// filtering and are never surfaced beyond debug logging.
#[derive(Debug, Clone, Copy)]
pub enum CandidateOutcome {
    Accepted(Shot),
    RejectedColor { x: u32, y: u32 },
    RejectedTooSmall { x: u32, y: u32, width: f64, height: f64 },
    NoTrigger,
}

impl CandidateOutcome {
    pub fn shot(&self) -> Option<Shot> {
        match self {
            CandidateOutcome::Accepted(shot) => Some(*shot),
            _ => None,
        }
    }
}

enum CenterOutcome {
    Center(f64, f64),
    TooSmall { width: f64, height: f64 },
}

pub struct ShotSearcher<'a> {
    config: &'a Config,
    transform: &'a ShotTransform,
    frame: &'a Frame,
}

impl<'a> ShotSearcher<'a> {
    pub fn new(config: &'a Config, transform: &'a ShotTransform, frame: &'a Frame) -> Self {
        Self {
            config,
            transform,
            frame,
        }
    }

    /// Scan every enabled sector, in parallel. Returns one outcome per
    /// enabled sector, in no particular order.
    pub fn scan(&self, statuses: &SectorStatuses) -> Vec<CandidateOutcome> {
        let sectors = partition(
            self.transform.width(),
            self.transform.height(),
            statuses.rows(),
            statuses.cols(),
        );

        sectors
            .into_par_iter()
            .filter(|s| statuses.is_enabled(s.row, s.col))
            .map(|s| self.scan_sector(s))
            .collect()
    }

    /// Row-major scan of one sector for the first accumulator cell over the
    /// detection threshold. The trigger point is refined to the local
    /// maximum before evaluation; rejected candidates let the scan continue.
    pub fn scan_sector(&self, bounds: SectorBounds) -> CandidateOutcome {
        // Keep a margin so the refinement window and centering walks start
        // inside the populated part of the grid
        let margin = VOTE_SPAN;
        let start_x = bounds.start_x.max(margin);
        let start_y = bounds.start_y.max(margin);
        let end_x = bounds.end_x.min(self.transform.width().saturating_sub(margin));
        let end_y = bounds.end_y.min(self.transform.height().saturating_sub(margin));

        let mut last = CandidateOutcome::NoTrigger;

        for y in start_y..end_y {
            for x in start_x..end_x {
                if self.transform.value(x, y) <= self.config.accumulator_threshold {
                    continue;
                }

                let (peak_x, peak_y) = self.transform.local_max(x, y);
                match self.evaluate(peak_x, peak_y) {
                    CandidateOutcome::Accepted(shot) => {
                        tracing::debug!(
                            "shot accepted: trigger ({}, {}), center ({:.1}, {:.1}), {:?}",
                            x,
                            y,
                            shot.x,
                            shot.y,
                            shot.color
                        );
                        return CandidateOutcome::Accepted(shot);
                    }
                    outcome => last = outcome,
                }
            }
        }

        last
    }

    fn evaluate(&self, x: u32, y: u32) -> CandidateOutcome {
        let color = match self.classify_color(x, y) {
            Some(color) => color,
            None => {
                tracing::debug!("candidate rejected at ({}, {}): ambiguous color", x, y);
                return CandidateOutcome::RejectedColor { x, y };
            }
        };

        match self.approximate_center(x, y) {
            CenterOutcome::Center(cx, cy) => {
                CandidateOutcome::Accepted(Shot::new(cx, cy, color))
            }
            CenterOutcome::TooSmall { width, height } => {
                tracing::debug!(
                    "candidate rejected at ({}, {}): dimensions too small ({:.1}x{:.1}, min {})",
                    x,
                    y,
                    width,
                    height,
                    self.config.min_shot_dimension
                );
                CandidateOutcome::RejectedTooSmall {
                    x,
                    y,
                    width,
                    height,
                }
            }
        }
    }

    /// Classify the candidate's color by averaging each channel over four
    /// arms radiating from the point. Noise tends to have near-equal
    /// channels, so a color is only recognized when the dominant channel
    /// beats both others by the configured ratio. Zero denominators reject.
    fn classify_color(&self, x: u32, y: u32) -> Option<ShotColor> {
        let radius = self.config.color_detection_radius;
        let (w, h) = (self.frame.width(), self.frame.height());

        let mut r_sum = 0f64;
        let mut g_sum = 0f64;
        let mut b_sum = 0f64;
        let mut seen = 0u32;
        {
            let mut add = |xx: u32, yy: u32| {
                let [pr, pg, pb] = self.frame.get_pixel(xx, yy).0;
                r_sum += pr as f64;
                g_sum += pg as f64;
                b_sum += pb as f64;
                seen += 1;
            };

            add(x, y);
            for d in 1..=radius {
                if x >= d {
                    add(x - d, y);
                }
                if x + d < w {
                    add(x + d, y);
                }
                if y >= d {
                    add(x, y - d);
                }
                if y + d < h {
                    add(x, y + d);
                }
            }
        }

        let r = r_sum / seen as f64;
        let g = g_sum / seen as f64;
        let b = b_sum / seen as f64;
        let threshold = self.config.color_diff_threshold;

        if g == 0.0 || b == 0.0 {
            return None;
        }
        if r / g > threshold && r / b > threshold {
            return Some(ShotColor::Red);
        }
        if r == 0.0 {
            return None;
        }
        if g / r > threshold && g / b > threshold {
            return Some(ShotColor::Green);
        }

        None
    }

    /// Approximate the shot's geometric center. Shots do not have sharp
    /// borders, so an edge is only declared after `center_border_width`
    /// consecutive background cells: walk down and up from the candidate to
    /// get the vertical extent, then left and right along the found vertical
    /// center for the horizontal extent.
    fn approximate_center(&self, x: u32, y: u32) -> CenterOutcome {
        let lower = self.walk_down(x, y);
        let upper = self.walk_up(x, y);
        let height = lower.saturating_sub(upper) as f64;
        let center_y = upper as f64 + height / 2.0;

        let row = (center_y.round() as u32).min(self.transform.height() - 1);
        let right = self.walk_right(row, x);
        let left = self.walk_left(row, x);
        let width = right.saturating_sub(left) as f64;
        let center_x = left as f64 + width / 2.0;

        let min_dim = self.config.min_shot_dimension as f64;
        if width < min_dim && height < min_dim {
            CenterOutcome::TooSmall { width, height }
        } else {
            CenterOutcome::Center(center_x, center_y)
        }
    }

    #[inline]
    fn is_background(&self, x: u32, y: u32) -> bool {
        self.transform.value(x, y) < self.config.accumulator_threshold
    }

    fn walk_down(&self, x: u32, start: u32) -> u32 {
        let border = self.config.center_border_width;
        let mut run = 0;
        let mut yy = start;
        while yy + 1 < self.transform.height() {
            yy += 1;
            if self.is_background(x, yy) {
                run += 1;
                if run == border {
                    return yy - border;
                }
            } else {
                run = 0;
            }
        }
        yy
    }

    fn walk_up(&self, x: u32, start: u32) -> u32 {
        let border = self.config.center_border_width;
        let mut run = 0;
        let mut yy = start;
        while yy > 0 {
            yy -= 1;
            if self.is_background(x, yy) {
                run += 1;
                if run == border {
                    return yy + border;
                }
            } else {
                run = 0;
            }
        }
        yy
    }

    fn walk_right(&self, y: u32, start: u32) -> u32 {
        let border = self.config.center_border_width;
        let mut run = 0;
        let mut xx = start;
        while xx + 1 < self.transform.width() {
            xx += 1;
            if self.is_background(xx, y) {
                run += 1;
                if run == border {
                    return xx - border;
                }
            } else {
                run = 0;
            }
        }
        xx
    }

    fn walk_left(&self, y: u32, start: u32) -> u32 {
        let border = self.config.center_border_width;
        let mut run = 0;
        let mut xx = start;
        while xx > 0 {
            xx -= 1;
            if self.is_background(xx, y) {
                run += 1;
                if run == border {
                    return xx + border;
                }
            } else {
                run = 0;
            }
        }
        xx
    }
}
