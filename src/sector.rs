//! Sector partitioning of the frame.
//!
//! The frame is split into an R×C grid of rectangles that are scanned
//! independently, so one noisy region cannot mask shots elsewhere and
//! individual regions can be turned off (e.g. a sector with a bright
//! reflection). The last row and column absorb any division remainder.

/// Enable/disable flags for each sector in the grid. All sectors start
/// enabled.
#[derive(Debug, Clone)]
pub struct SectorStatuses {
    rows: u32,
    cols: u32,
    enabled: Vec<bool>,
}

impl SectorStatuses {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            enabled: vec![true; (rows * cols) as usize],
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn is_enabled(&self, row: u32, col: u32) -> bool {
        self.enabled[(row * self.cols + col) as usize]
    }

    pub fn set_enabled(&mut self, row: u32, col: u32, enabled: bool) {
        self.enabled[(row * self.cols + col) as usize] = enabled;
    }

    pub fn set_all(&mut self, enabled: bool) {
        self.enabled.fill(enabled);
    }
}

/// Pixel rectangle of one sector, end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorBounds {
    pub row: u32,
    pub col: u32,
    pub start_x: u32,
    pub end_x: u32,
    pub start_y: u32,
    pub end_y: u32,
}

impl SectorBounds {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.start_x && x < self.end_x && y >= self.start_y && y < self.end_y
    }
}

/// Partition a width×height frame into the sector grid, row-major.
pub fn partition(width: u32, height: u32, rows: u32, cols: u32) -> Vec<SectorBounds> {
    let sub_width = width / cols;
    let sub_height = height / rows;

    let mut sectors = Vec::with_capacity((rows * cols) as usize);
    for row in 0..rows {
        for col in 0..cols {
            let start_x = col * sub_width;
            let start_y = row * sub_height;
            let end_x = if col == cols - 1 { width } else { start_x + sub_width };
            let end_y = if row == rows - 1 { height } else { start_y + sub_height };
            sectors.push(SectorBounds {
                row,
                col,
                start_x,
                end_x,
                start_y,
                end_y,
            });
        }
    }
    sectors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_default_enabled() {
        let statuses = SectorStatuses::new(3, 3);
        for row in 0..3 {
            for col in 0..3 {
                assert!(statuses.is_enabled(row, col));
            }
        }
    }

    #[test]
    fn test_statuses_toggle() {
        let mut statuses = SectorStatuses::new(3, 3);
        statuses.set_enabled(1, 2, false);
        assert!(!statuses.is_enabled(1, 2));
        assert!(statuses.is_enabled(2, 1));

        statuses.set_enabled(1, 2, true);
        assert!(statuses.is_enabled(1, 2));
    }

    #[test]
    fn test_statuses_set_all() {
        let mut statuses = SectorStatuses::new(2, 2);
        statuses.set_all(false);
        assert!(!statuses.is_enabled(0, 0));
        assert!(!statuses.is_enabled(1, 1));
    }

    #[test]
    fn test_partition_covers_frame_exactly() {
        let sectors = partition(640, 480, 3, 3);
        assert_eq!(sectors.len(), 9);

        // Every pixel belongs to exactly one sector
        for &(x, y) in &[(0, 0), (212, 159), (213, 160), (639, 479), (320, 240)] {
            let count = sectors.iter().filter(|s| s.contains(x, y)).count();
            assert_eq!(count, 1, "pixel ({}, {}) in {} sectors", x, y, count);
        }
    }

    #[test]
    fn test_partition_last_row_col_absorb_remainder() {
        let sectors = partition(640, 480, 3, 3);

        // 640 / 3 == 213 rem 1, 480 / 3 == 160 rem 0
        let last = sectors.last().unwrap();
        assert_eq!(last.end_x, 640);
        assert_eq!(last.end_y, 480);
        assert_eq!(last.start_x, 426);
        assert_eq!(last.start_y, 320);
    }

    #[test]
    fn test_partition_row_major_order() {
        let sectors = partition(90, 90, 3, 3);
        assert_eq!((sectors[0].row, sectors[0].col), (0, 0));
        assert_eq!((sectors[1].row, sectors[1].col), (0, 1));
        assert_eq!((sectors[3].row, sectors[3].col), (1, 0));
    }
}
