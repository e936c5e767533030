use regroute_common::db::indices::{NetId, SegmentId};
use regroute_common::geom::coord::{Axis, GridCoord};

/// Which end of the input segment a pin anchor refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinEnd {
    Start,
    End,
}

/// Output-side handle of one task end: either an original terminal of the
/// input segment, or a boundary hand-off cell created by a split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Pin { segment: SegmentId, end: PinEnd },
    Handoff(GridCoord),
}

/// Raw input item, already converted to grid space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawTask {
    pub net: NetId,
    pub segment: SegmentId,
    pub start: GridCoord,
    pub end: GridCoord,
}

/// One point-to-point connection request. Never mutated; splitting builds new tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Task {
    pub net: NetId,
    pub segment: SegmentId,
    pub start: GridCoord,
    pub end: GridCoord,
    pub start_anchor: Anchor,
    pub end_anchor: Anchor,
}

impl Task {
    pub fn from_raw(raw: &RawTask) -> Self {
        Self {
            net: raw.net,
            segment: raw.segment,
            start: raw.start,
            end: raw.end,
            start_anchor: Anchor::Pin {
                segment: raw.segment,
                end: PinEnd::Start,
            },
            end_anchor: Anchor::Pin {
                segment: raw.segment,
                end: PinEnd::End,
            },
        }
    }

    /// Both ends at the same x/y; solved without the pathfinder.
    #[inline]
    pub fn is_trivial(&self) -> bool {
        self.start.same_position(&self.end)
    }

    /// `{start, mid}` and `{mid, end}`; the new inner ends are hand-off anchors.
    pub fn split_at(&self, mid: GridCoord) -> (Task, Task) {
        let prefix = Task {
            end: mid,
            end_anchor: Anchor::Handoff(mid),
            ..*self
        };
        let suffix = Task {
            start: mid,
            start_anchor: Anchor::Handoff(mid),
            ..*self
        };
        (prefix, suffix)
    }

    /// Splits across a claimed boundary pair: the prefix ends on the inner
    /// cell, the suffix starts on the outer one.
    pub fn split_across(&self, pair: &ConnectionPoints) -> (Task, Task) {
        let (prefix, _) = self.split_at(pair.inner);
        let (_, suffix) = self.split_at(pair.outer);
        (prefix, suffix)
    }
}

/// Two grid-adjacent cells on one layer straddling a region edge.
/// `inner` belongs to the region being left, `outer` to its neighbour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionPoints {
    pub inner: GridCoord,
    pub outer: GridCoord,
}

impl ConnectionPoints {
    /// `None` unless the two cells share a layer and differ by exactly one step.
    pub fn new(inner: GridCoord, outer: GridCoord) -> Option<Self> {
        if inner.z != outer.z || inner.manhattan(&outer) != 1 {
            return None;
        }
        Some(Self { inner, outer })
    }

    pub fn axis(&self) -> Axis {
        if self.inner.x != self.outer.x {
            Axis::X
        } else {
            Axis::Y
        }
    }

    pub fn layer(&self) -> u8 {
        self.inner.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(start: GridCoord, end: GridCoord) -> Task {
        Task::from_raw(&RawTask {
            net: NetId::new(3),
            segment: SegmentId::new(7),
            start,
            end,
        })
    }

    #[test]
    fn split_reconstructs_endpoints() {
        let a = GridCoord::new(1, 1, 0);
        let b = GridCoord::new(8, 8, 0);
        let m = GridCoord::new(4, 1, 0);
        let (prefix, suffix) = task(a, b).split_at(m);
        assert_eq!(prefix.start, a);
        assert_eq!(prefix.end, suffix.start);
        assert_eq!(suffix.end, b);
        assert_eq!(prefix.net, suffix.net);
        assert_eq!(prefix.end_anchor, Anchor::Handoff(m));
        assert_eq!(suffix.start_anchor, Anchor::Handoff(m));
        assert_eq!(
            suffix.end_anchor,
            Anchor::Pin {
                segment: SegmentId::new(7),
                end: PinEnd::End
            }
        );
    }

    #[test]
    fn split_across_uses_both_cells() {
        let t = task(GridCoord::new(1, 1, 0), GridCoord::new(8, 1, 0));
        let pair = ConnectionPoints::new(GridCoord::new(4, 1, 0), GridCoord::new(5, 1, 0)).unwrap();
        let (prefix, suffix) = t.split_across(&pair);
        assert_eq!(prefix.end, pair.inner);
        assert_eq!(suffix.start, pair.outer);
        assert_eq!(pair.axis(), Axis::X);
    }

    #[test]
    fn pair_must_be_adjacent_on_one_layer() {
        let a = GridCoord::new(4, 4, 1);
        assert!(ConnectionPoints::new(a, GridCoord::new(4, 5, 1)).is_some());
        assert!(ConnectionPoints::new(a, GridCoord::new(4, 6, 1)).is_none());
        assert!(ConnectionPoints::new(a, GridCoord::new(5, 5, 1)).is_none());
        assert!(ConnectionPoints::new(a, GridCoord::new(4, 5, 2)).is_none());
    }

    #[test]
    fn same_position_on_other_layer_is_trivial() {
        assert!(task(GridCoord::new(2, 2, 0), GridCoord::new(2, 2, 3)).is_trivial());
        assert!(!task(GridCoord::new(2, 2, 0), GridCoord::new(2, 3, 0)).is_trivial());
    }
}
