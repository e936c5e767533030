use crate::task::ConnectionPoints;
use parking_lot::Mutex;
use regroute_common::geom::coord::GridCoord;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Per-cell "may still serve as a hand-off cell" flags.
///
/// Cells start free, are blocked before the workers start (task endpoints,
/// obstacles) and flip to taken exactly once when claimed as part of a pair.
/// Reads are lock-free; claiming a pair is one critical section.
pub struct BoundaryLocks {
    width: u32,
    height: u32,
    layers: u8,
    free: Vec<AtomicBool>,
    claim: Mutex<()>,
    claimed_pairs: AtomicUsize,
}

impl BoundaryLocks {
    pub fn new(width: u32, height: u32, layers: u8) -> Self {
        let size = width as usize * height as usize * layers as usize;
        Self {
            width,
            height,
            layers,
            free: (0..size).map(|_| AtomicBool::new(true)).collect(),
            claim: Mutex::new(()),
            claimed_pairs: AtomicUsize::new(0),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layers(&self) -> u8 {
        self.layers
    }

    #[inline(always)]
    fn index(&self, c: GridCoord) -> Option<usize> {
        if c.x >= self.width || c.y >= self.height || c.z >= self.layers {
            return None;
        }
        Some(
            (c.z as usize) * (self.width as usize) * (self.height as usize)
                + (c.y as usize) * (self.width as usize)
                + (c.x as usize),
        )
    }

    /// Not on the outer ring of the grid and within the layer stack.
    #[inline]
    pub fn is_interior(&self, c: GridCoord) -> bool {
        c.x > 0
            && c.y > 0
            && c.x + 1 < self.width
            && c.y + 1 < self.height
            && c.z < self.layers
    }

    pub fn is_free(&self, c: GridCoord) -> bool {
        self.index(c)
            .is_some_and(|i| self.free[i].load(Ordering::Acquire))
    }

    /// A pair can be handed out when both cells are interior and free.
    pub fn pair_available(&self, pair: &ConnectionPoints) -> bool {
        self.is_interior(pair.inner)
            && self.is_interior(pair.outer)
            && self.is_free(pair.inner)
            && self.is_free(pair.outer)
    }

    /// Marks a cell unusable for hand-offs. Out-of-grid cells are ignored.
    pub fn block(&self, c: GridCoord) {
        if let Some(i) = self.index(c) {
            self.free[i].store(false, Ordering::Release);
        }
    }

    /// Blocks `c` and its eight in-plane neighbours on the same layer.
    pub fn block_neighbourhood(&self, c: GridCoord) {
        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(n) = c.offset(dx, dy) {
                    self.block(n);
                }
            }
        }
    }

    /// Claims both cells or neither.
    pub fn try_claim_pair(&self, pair: &ConnectionPoints) -> bool {
        let _guard = self.claim.lock();
        if !self.pair_available(pair) {
            return false;
        }
        for c in [pair.inner, pair.outer] {
            let Some(i) = self.index(c) else {
                return false;
            };
            if !self.free[i].swap(false, Ordering::AcqRel) {
                panic!("hand-off cell {} was claimed twice", c);
            }
        }
        self.claimed_pairs.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn claimed_pairs(&self) -> usize {
        self.claimed_pairs.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pair(x: u32, y: u32) -> ConnectionPoints {
        ConnectionPoints::new(GridCoord::new(x, y, 0), GridCoord::new(x + 1, y, 0)).unwrap()
    }

    #[test]
    fn claim_flips_both_cells_once() {
        let locks = BoundaryLocks::new(10, 10, 1);
        let p = pair(4, 3);
        assert!(locks.try_claim_pair(&p));
        assert!(!locks.is_free(p.inner));
        assert!(!locks.is_free(p.outer));
        assert!(!locks.try_claim_pair(&p));
        assert_eq!(locks.claimed_pairs(), 1);
    }

    #[test]
    fn overlapping_pair_fails_without_side_effects() {
        let locks = BoundaryLocks::new(10, 10, 1);
        assert!(locks.try_claim_pair(&pair(4, 3)));
        let overlapping = pair(5, 3);
        assert!(!locks.try_claim_pair(&overlapping));
        assert!(locks.is_free(overlapping.outer));
    }

    #[test]
    fn outer_ring_is_never_available() {
        let locks = BoundaryLocks::new(10, 10, 1);
        assert!(!locks.pair_available(&pair(0, 4)));
        assert!(!locks.pair_available(&pair(8, 4)));
        assert!(!locks.pair_available(&pair(4, 0)));
        assert!(locks.pair_available(&pair(4, 4)));
    }

    #[test]
    fn neighbourhood_blocking_covers_nine_cells() {
        let locks = BoundaryLocks::new(10, 10, 2);
        locks.block_neighbourhood(GridCoord::new(0, 5, 1));
        assert!(!locks.is_free(GridCoord::new(0, 4, 1)));
        assert!(!locks.is_free(GridCoord::new(1, 6, 1)));
        assert!(locks.is_free(GridCoord::new(2, 5, 1)));
        assert!(locks.is_free(GridCoord::new(0, 5, 0)));
    }

    #[test]
    fn racing_threads_never_share_a_cell() {
        let locks = Arc::new(BoundaryLocks::new(32, 4, 1));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                std::thread::spawn(move || {
                    let mut won = Vec::new();
                    for x in 1..30 {
                        let p = pair(x, 2);
                        if locks.try_claim_pair(&p) {
                            won.push(p);
                        }
                    }
                    won
                })
            })
            .collect();

        let mut cells = std::collections::HashSet::new();
        for h in handles {
            for p in h.join().unwrap() {
                assert!(cells.insert(p.inner));
                assert!(cells.insert(p.outer));
            }
        }
        assert_eq!(cells.len(), locks.claimed_pairs() * 2);
    }
}
