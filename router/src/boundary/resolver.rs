use crate::boundary::locks::BoundaryLocks;
use crate::partition::pool::WorkPool;
use crate::partition::region::Region;
use crate::task::{ConnectionPoints, Task};
use rand::Rng;
use regroute_common::db::indices::RegionId;
use regroute_common::geom::coord::{Axis, GridCoord};

/// Hand-off search strategies, tried in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Straight projection of the start cell onto the region edge along its
    /// layer's native axis.
    Projection,
    /// Random positions along the edge; only used when probes are configured.
    RandomProbe,
    /// Alternating +1, -1, +2, -2, ... walk around the projection on every layer.
    HopSearch,
    /// Every interior edge cell on the axis separating the region midpoints most.
    BoundaryScan,
    /// Same scan on the other axis.
    OppositeScan,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Projection,
        Strategy::RandomProbe,
        Strategy::HopSearch,
        Strategy::BoundaryScan,
        Strategy::OppositeScan,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Projection => "projection",
            Strategy::RandomProbe => "random",
            Strategy::HopSearch => "hop",
            Strategy::BoundaryScan => "scan",
            Strategy::OppositeScan => "opposite-scan",
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub hits: [usize; 5],
    pub failures: usize,
}

impl ResolverStats {
    pub fn hits_for(&self, strategy: Strategy) -> usize {
        self.hits[strategy.slot()]
    }

    pub fn merge(&mut self, other: &ResolverStats) {
        for (a, b) in self.hits.iter_mut().zip(other.hits.iter()) {
            *a += b;
        }
        self.failures += other.failures;
    }
}

/// Edge crossing from an owner region toward the target region along one axis.
#[derive(Clone, Copy, Debug)]
struct Crossing {
    axis: Axis,
    edge: u32,
    forward: bool,
    /// Exclusive bounds of usable positions on the other axis.
    low: u32,
    high: u32,
}

impl Crossing {
    fn between(owner: &Region, target: &Region, axis: Axis) -> Option<Self> {
        let (from, to) = (owner.slot(axis), target.slot(axis));
        if from == to {
            return None;
        }
        let forward = to > from;
        let other = axis.other();
        Some(Self {
            axis,
            edge: if forward { owner.high(axis) } else { owner.low(axis) },
            forward,
            low: owner.low(other),
            high: owner.high(other),
        })
    }

    #[inline]
    fn usable(&self, pos: i64) -> bool {
        pos > self.low as i64 && pos < self.high as i64
    }

    fn pair_at(&self, pos: u32, layer: u8) -> Option<ConnectionPoints> {
        let inner = match self.axis {
            Axis::X => GridCoord::new(self.edge, pos, layer),
            Axis::Y => GridCoord::new(pos, self.edge, layer),
        };
        let outer = inner.step(self.axis, self.forward)?;
        ConnectionPoints::new(inner, outer)
    }
}

/// Searches hand-off pairs on the boundary of a task's owner region.
/// Reads the lock state only; claiming is left to the caller.
pub struct BoundaryResolver<'a> {
    pool: &'a WorkPool,
    locks: &'a BoundaryLocks,
    random_probes: usize,
    stats: ResolverStats,
}

impl<'a> BoundaryResolver<'a> {
    pub fn new(pool: &'a WorkPool, locks: &'a BoundaryLocks, random_probes: usize) -> Self {
        Self {
            pool,
            locks,
            random_probes,
            stats: ResolverStats::default(),
        }
    }

    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    /// First free pair found by the strategies in order, or `None` when the
    /// boundary offers no usable pair at all.
    pub fn find_handoff(&mut self, task: &Task, owner: RegionId) -> Option<ConnectionPoints> {
        for strategy in Strategy::ALL {
            if let Some(pair) = self.try_strategy(strategy, task, owner) {
                self.stats.hits[strategy.slot()] += 1;
                if strategy != Strategy::Projection {
                    log::debug!(
                        "net {:?}: hand-off {} -> {} via {} search",
                        task.net,
                        pair.inner,
                        pair.outer,
                        strategy.label()
                    );
                }
                return Some(pair);
            }
        }
        self.stats.failures += 1;
        None
    }

    pub fn try_strategy(
        &mut self,
        strategy: Strategy,
        task: &Task,
        owner: RegionId,
    ) -> Option<ConnectionPoints> {
        let owner = self.pool.region(owner);
        let target = self.pool.region(self.pool.region_of(task.end));
        match strategy {
            Strategy::Projection => self.projection(task, owner, target),
            Strategy::RandomProbe => self.random_probe(task, owner, target),
            Strategy::HopSearch => self.hop_search(task, owner, target),
            Strategy::BoundaryScan => {
                let axis = primary_axis(owner, target);
                self.scan(owner, target, axis)
            }
            Strategy::OppositeScan => {
                let axis = primary_axis(owner, target).other();
                self.scan(owner, target, axis)
            }
        }
    }

    fn available(&self, pair: Option<ConnectionPoints>) -> Option<ConnectionPoints> {
        pair.filter(|p| self.locks.pair_available(p))
    }

    fn projection(&self, task: &Task, owner: &Region, target: &Region) -> Option<ConnectionPoints> {
        let layer = task.start.z;
        let axis = Axis::native(layer);
        let crossing = Crossing::between(owner, target, axis)?;
        let pos = task.start.along(axis.other());
        if !crossing.usable(pos as i64) {
            return None;
        }
        self.available(crossing.pair_at(pos, layer))
    }

    fn random_probe(
        &self,
        task: &Task,
        owner: &Region,
        target: &Region,
    ) -> Option<ConnectionPoints> {
        if self.random_probes == 0 {
            return None;
        }
        let mut rng = rand::thread_rng();
        for layer in self.layer_order(task.start.z) {
            let axis = Axis::native(layer);
            let Some(crossing) = Crossing::between(owner, target, axis) else {
                continue;
            };
            if crossing.low + 1 >= crossing.high {
                continue;
            }
            for _ in 0..self.random_probes {
                let pos = rng.gen_range(crossing.low + 1..crossing.high);
                if let Some(pair) = self.available(crossing.pair_at(pos, layer)) {
                    return Some(pair);
                }
            }
        }
        None
    }

    fn hop_search(&self, task: &Task, owner: &Region, target: &Region) -> Option<ConnectionPoints> {
        for layer in self.layer_order(task.start.z) {
            let axis = Axis::native(layer);
            let Some(crossing) = Crossing::between(owner, target, axis) else {
                continue;
            };
            let origin = task.start.along(axis.other()) as i64;
            let reach = (origin - crossing.low as i64).max(crossing.high as i64 - origin);
            for hop in hop_sequence(reach) {
                let pos = origin + hop;
                if !crossing.usable(pos) {
                    continue;
                }
                if let Some(pair) = self.available(crossing.pair_at(pos as u32, layer)) {
                    return Some(pair);
                }
            }
        }
        None
    }

    fn scan(&self, owner: &Region, target: &Region, axis: Axis) -> Option<ConnectionPoints> {
        let crossing = Crossing::between(owner, target, axis)?;
        for layer in (0..self.locks.layers()).filter(|&l| Axis::native(l) == axis) {
            for pos in crossing.low + 1..crossing.high {
                if let Some(pair) = self.available(crossing.pair_at(pos, layer)) {
                    return Some(pair);
                }
            }
        }
        None
    }

    /// Start layer, then the layers above it, then the layers below it.
    fn layer_order(&self, start: u8) -> impl Iterator<Item = u8> {
        let top = self.locks.layers();
        let start = start.min(top.saturating_sub(1));
        (start..top).chain((0..start).rev())
    }
}

/// 0, +1, -1, +2, -2, ... up to +-reach.
fn hop_sequence(reach: i64) -> impl Iterator<Item = i64> {
    std::iter::once(0).chain((1..=reach.max(0)).flat_map(|d| [d, -d]))
}

/// Axis along which the region midpoints are farther apart; X on a tie.
fn primary_axis(owner: &Region, target: &Region) -> Axis {
    let dx = owner.mid2(Axis::X).abs_diff(target.mid2(Axis::X));
    let dy = owner.mid2(Axis::Y).abs_diff(target.mid2(Axis::Y));
    if dx >= dy { Axis::X } else { Axis::Y }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::layout::Layout;
    use crate::task::RawTask;
    use regroute_common::db::indices::{NetId, SegmentId};

    fn setup(layers: u8) -> (WorkPool, BoundaryLocks) {
        let pool = WorkPool::new(10, 10, Layout { cols: 2, rows: 2 }, Vec::new());
        let locks = BoundaryLocks::new(10, 10, layers);
        (pool, locks)
    }

    fn task(start: GridCoord, end: GridCoord) -> Task {
        Task::from_raw(&RawTask {
            net: NetId::new(0),
            segment: SegmentId::new(0),
            start,
            end,
        })
    }

    fn c(x: u32, y: u32, z: u8) -> GridCoord {
        GridCoord::new(x, y, z)
    }

    #[test]
    fn hop_sequence_alternates() {
        let hops: Vec<i64> = hop_sequence(2).collect();
        assert_eq!(hops, vec![0, 1, -1, 2, -2]);
    }

    #[test]
    fn projection_lands_on_the_native_edge() {
        let (pool, locks) = setup(2);
        let mut resolver = BoundaryResolver::new(&pool, &locks, 0);
        let t = task(c(1, 1, 0), c(8, 8, 0));
        let pair = resolver.find_handoff(&t, RegionId::new(0)).unwrap();
        assert_eq!(pair.inner, c(4, 1, 0));
        assert_eq!(pair.outer, c(5, 1, 0));
        assert_eq!(resolver.stats().hits_for(Strategy::Projection), 1);
    }

    #[test]
    fn leftward_crossing_uses_the_low_edge() {
        let (pool, locks) = setup(2);
        let mut resolver = BoundaryResolver::new(&pool, &locks, 0);
        let t = task(c(7, 2, 0), c(1, 2, 0));
        let pair = resolver.find_handoff(&t, RegionId::new(1)).unwrap();
        assert_eq!(pair.inner, c(5, 2, 0));
        assert_eq!(pair.outer, c(4, 2, 0));
    }

    #[test]
    fn hop_search_walks_around_a_blocked_projection() {
        let (pool, locks) = setup(2);
        locks.block(c(4, 1, 0));
        let mut resolver = BoundaryResolver::new(&pool, &locks, 0);
        let t = task(c(1, 1, 0), c(8, 8, 0));
        let pair = resolver.find_handoff(&t, RegionId::new(0)).unwrap();
        assert_eq!(pair.inner, c(4, 2, 0));
        assert_eq!(resolver.stats().hits_for(Strategy::HopSearch), 1);
    }

    #[test]
    fn hop_search_moves_to_a_layer_with_the_other_axis() {
        let (pool, locks) = setup(2);
        for y in 0..10 {
            locks.block(c(4, y, 0));
        }
        let mut resolver = BoundaryResolver::new(&pool, &locks, 0);
        let t = task(c(1, 1, 0), c(8, 8, 0));
        let pair = resolver.find_handoff(&t, RegionId::new(0)).unwrap();
        assert_eq!(pair.inner, c(1, 4, 1));
        assert_eq!(pair.outer, c(1, 5, 1));
    }

    #[test]
    fn axes_without_a_region_change_are_skipped() {
        let (pool, locks) = setup(2);
        let mut resolver = BoundaryResolver::new(&pool, &locks, 0);
        // start layer routes along X but the target is straight above
        let t = task(c(2, 2, 0), c(2, 8, 0));
        assert!(
            resolver
                .try_strategy(Strategy::Projection, &t, RegionId::new(0))
                .is_none()
        );
        let pair = resolver.find_handoff(&t, RegionId::new(0)).unwrap();
        assert_eq!(pair.axis(), Axis::Y);
        assert_eq!(pair.inner, c(2, 4, 1));
    }

    #[test]
    fn scans_take_the_first_interior_cell() {
        let (pool, locks) = setup(3);
        let mut resolver = BoundaryResolver::new(&pool, &locks, 0);
        let t = task(c(3, 3, 1), c(8, 3, 1));
        let pair = resolver
            .try_strategy(Strategy::BoundaryScan, &t, RegionId::new(0))
            .unwrap();
        assert_eq!(pair.inner, c(4, 1, 0));
        assert!(
            resolver
                .try_strategy(Strategy::OppositeScan, &t, RegionId::new(0))
                .is_none()
        );
    }

    #[test]
    fn random_probes_stay_on_the_edge() {
        let (pool, locks) = setup(2);
        let mut resolver = BoundaryResolver::new(&pool, &locks, 4);
        let t = task(c(1, 1, 0), c(8, 1, 0));
        let pair = resolver
            .try_strategy(Strategy::RandomProbe, &t, RegionId::new(0))
            .unwrap();
        assert_eq!(pair.inner.x, 4);
        assert!(pair.inner.y > 0 && pair.inner.y < 4);
    }

    #[test]
    fn fully_blocked_boundary_yields_nothing() {
        let (pool, locks) = setup(2);
        for z in 0..2 {
            for i in 0..10 {
                locks.block(c(4, i, z));
                locks.block(c(i, 4, z));
            }
        }
        let mut resolver = BoundaryResolver::new(&pool, &locks, 2);
        let t = task(c(1, 1, 0), c(8, 8, 0));
        assert!(resolver.find_handoff(&t, RegionId::new(0)).is_none());
        assert_eq!(resolver.stats().failures, 1);
    }
}
