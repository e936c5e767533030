use regroute_common::db::indices::RegionId;
use regroute_common::geom::coord::{Axis, GridCoord};

/// Inclusive cell range owned by one region, with its position in the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub id: RegionId,
    pub col: usize,
    pub row: usize,
    pub low_x: u32,
    pub high_x: u32,
    pub low_y: u32,
    pub high_y: u32,
}

impl Region {
    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.low_x && x <= self.high_x && y >= self.low_y && y <= self.high_y
    }

    #[inline]
    pub fn contains_coord(&self, c: GridCoord) -> bool {
        self.contains(c.x, c.y)
    }

    pub fn width(&self) -> u32 {
        self.high_x - self.low_x + 1
    }

    pub fn height(&self) -> u32 {
        self.high_y - self.low_y + 1
    }

    pub fn low(&self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.low_x,
            Axis::Y => self.low_y,
        }
    }

    pub fn high(&self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.high_x,
            Axis::Y => self.high_y,
        }
    }

    /// Layout index along `axis` (column for X, row for Y).
    pub fn slot(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.col,
            Axis::Y => self.row,
        }
    }

    /// Doubled midpoint along `axis`, exact in integers.
    pub fn mid2(&self, axis: Axis) -> u64 {
        self.low(axis) as u64 + self.high(axis) as u64
    }
}
