/// Upper bound on the number of routing layers a grid may carry.
pub const MAX_LAYERS: u8 = 16;

/// Routing axis of a layer or of a boundary crossing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Preferred wire direction of `layer`: even layers run along X, odd layers along Y.
    #[inline]
    pub fn native(layer: u8) -> Self {
        if layer % 2 == 0 { Axis::X } else { Axis::Y }
    }

    #[inline]
    pub fn other(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl GridCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Same x/y, layer ignored.
    #[inline]
    pub fn same_position(&self, other: &GridCoord) -> bool {
        self.x == other.x && self.y == other.y
    }

    #[inline]
    pub fn along(&self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    /// Neighbour one step along `axis`, `None` when it would leave the non-negative quadrant.
    pub fn step(&self, axis: Axis, forward: bool) -> Option<Self> {
        let v = self.along(axis);
        let moved = if forward { v.checked_add(1)? } else { v.checked_sub(1)? };
        Some(match axis {
            Axis::X => Self::new(moved, self.y, self.z),
            Axis::Y => Self::new(self.x, moved, self.z),
        })
    }

    /// In-plane offset, `None` if either coordinate would go negative.
    pub fn offset(&self, dx: i64, dy: i64) -> Option<Self> {
        let x = self.x as i64 + dx;
        let y = self.y as i64 + dy;
        if x < 0 || y < 0 || x > u32::MAX as i64 || y > u32::MAX as i64 {
            return None;
        }
        Some(Self::new(x as u32, y as u32, self.z))
    }

    pub fn manhattan(&self, other: &GridCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, M{})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_axis_alternates() {
        assert_eq!(Axis::native(0), Axis::X);
        assert_eq!(Axis::native(1), Axis::Y);
        assert_eq!(Axis::native(4), Axis::X);
        assert_eq!(Axis::X.other(), Axis::Y);
    }

    #[test]
    fn step_stops_at_origin() {
        let c = GridCoord::new(0, 3, 1);
        assert_eq!(c.step(Axis::X, false), None);
        assert_eq!(c.step(Axis::X, true), Some(GridCoord::new(1, 3, 1)));
        assert_eq!(c.step(Axis::Y, false), Some(GridCoord::new(0, 2, 1)));
    }

    #[test]
    fn same_position_ignores_layer() {
        let a = GridCoord::new(4, 5, 0);
        assert!(a.same_position(&GridCoord::new(4, 5, 3)));
        assert!(!a.same_position(&GridCoord::new(5, 4, 0)));
    }
}
