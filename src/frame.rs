use image::RgbImage;

use crate::error::SourceError;

/// One video frame. The pipeline treats it as immutable for the duration of
/// a detection cycle.
pub type Frame = RgbImage;

/// Supplies frames to the detection pipeline, either from a live device or a
/// recorded file. Implementations may block in `next_frame` while waiting for
/// the next frame.
///
/// Returning `Ok(None)` signals end-of-stream (a recorded feed is exhausted);
/// `Err(SourceError::DeviceLost)` signals a camera that disappeared
/// mid-stream. The pipeline does not retry either case.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// Sub-rectangle of the frame representing the active projected area.
///
/// When set, analysis is restricted to this region and emitted shot
/// coordinates are translated back into full-frame space by adding the
/// origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ProjectionBounds {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Crop a frame to these bounds. Bounds extending past the frame edge are
    /// clipped by the crop.
    pub fn crop(&self, frame: &Frame) -> Frame {
        image::imageops::crop_imm(frame, self.x, self.y, self.width, self.height).to_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_bounds_creation() {
        let bounds = ProjectionBounds::new(100, 100, 400, 300);
        assert_eq!(bounds.x, 100);
        assert_eq!(bounds.y, 100);
        assert_eq!(bounds.width, 400);
        assert_eq!(bounds.height, 300);
    }

    #[test]
    fn test_crop_extracts_region() {
        let mut frame = Frame::from_pixel(64, 48, Rgb([0, 0, 0]));
        frame.put_pixel(20, 15, Rgb([250, 10, 10]));

        let bounds = ProjectionBounds::new(10, 10, 32, 24);
        let cropped = bounds.crop(&frame);

        assert_eq!(cropped.width(), 32);
        assert_eq!(cropped.height(), 24);
        assert_eq!(cropped.get_pixel(10, 5), &Rgb([250, 10, 10]));
    }
}
