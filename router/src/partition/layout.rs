use regroute_common::util::config::LayoutPolicy;

/// Smallest region edge the partitioner will accept, whatever is configured.
pub const MIN_REGION_EDGE_FLOOR: u32 = 2;

/// Region grid of `cols` x `rows`; region ids are row-major.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub cols: usize,
    pub rows: usize,
}

impl Layout {
    pub fn single() -> Self {
        Self { cols: 1, rows: 1 }
    }

    pub fn regions(&self) -> usize {
        self.cols * self.rows
    }

    /// Picks a layout for `requested` regions over a `width` x `height` grid,
    /// then lowers the region count until every region edge is at least
    /// `min_edge` cells long. The count starts at the most regions of that
    /// edge the grid can hold. Falls back to a single region.
    pub fn resolve(
        policy: LayoutPolicy,
        requested: usize,
        width: u32,
        height: u32,
        min_edge: u32,
    ) -> Self {
        let min_edge = min_edge.max(MIN_REGION_EDGE_FLOOR);
        // No layout with more regions than this can meet the edge check.
        let fit = (width / min_edge) as usize * (height / min_edge) as usize;
        let mut n = requested.min(fit).max(1);
        while n > 1 {
            let candidate = factorize(policy, n, width, height);
            if shortest_range(width, candidate.cols) >= min_edge
                && shortest_range(height, candidate.rows) >= min_edge
            {
                return candidate;
            }
            n -= 1;
        }
        Self::single()
    }
}

/// Column/row counts for exactly `n` regions under `policy`.
pub fn factorize(policy: LayoutPolicy, n: usize, width: u32, height: u32) -> Layout {
    let n = n.max(1);
    let wide = width >= height;
    match policy {
        LayoutPolicy::Balanced => {
            let small = (1..=n)
                .take_while(|a| a * a <= n)
                .filter(|a| n % a == 0)
                .last()
                .unwrap_or(1);
            let large = n / small;
            if wide {
                Layout {
                    cols: large,
                    rows: small,
                }
            } else {
                Layout {
                    cols: small,
                    rows: large,
                }
            }
        }
        LayoutPolicy::Stripes => {
            if wide {
                Layout { cols: n, rows: 1 }
            } else {
                Layout { cols: 1, rows: n }
            }
        }
        LayoutPolicy::Aspect => {
            let target = width.max(1) as f64 / height.max(1) as f64;
            let mut best = Layout { cols: n, rows: 1 };
            let mut best_err = f64::MAX;
            for cols in (1..=n).filter(|c| n % c == 0) {
                let rows = n / cols;
                let err = (cols as f64 / rows as f64 - target).abs();
                if err < best_err {
                    best_err = err;
                    best = Layout { cols, rows };
                }
            }
            best
        }
    }
}

/// Half-open slice `[lo, hi)` of `n` cells owned by owner `i` of `k`,
/// bounded by `round(i*n/k)` and `round((i+1)*n/k)`.
pub fn split_range(n: u32, k: usize, i: usize) -> (u32, u32) {
    let k = k.max(1) as u64;
    let n = n as u64;
    let bound = |j: u64| ((2 * j * n + k) / (2 * k)) as u32;
    (bound(i as u64), bound(i as u64 + 1))
}

fn shortest_range(n: u32, k: usize) -> u32 {
    (0..k)
        .map(|i| {
            let (lo, hi) = split_range(n, k, i);
            hi - lo
        })
        .min()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_cover_without_gaps() {
        for n in [1u32, 5, 10, 17, 100] {
            for k in 1..=12usize {
                let mut next = 0;
                for i in 0..k {
                    let (lo, hi) = split_range(n, k, i);
                    assert_eq!(lo, next);
                    assert!(hi >= lo);
                    next = hi;
                }
                assert_eq!(next, n);
            }
        }
    }

    #[test]
    fn ten_by_ten_four_regions_is_two_by_two() {
        let layout = Layout::resolve(LayoutPolicy::Balanced, 4, 10, 10, 2);
        assert_eq!(layout, Layout { cols: 2, rows: 2 });
        assert_eq!(split_range(10, 2, 0), (0, 5));
        assert_eq!(split_range(10, 2, 1), (5, 10));
    }

    #[test]
    fn policies_follow_the_longer_axis() {
        assert_eq!(
            factorize(LayoutPolicy::Balanced, 26, 400, 100),
            Layout { cols: 13, rows: 2 }
        );
        assert_eq!(
            factorize(LayoutPolicy::Stripes, 6, 50, 300),
            Layout { cols: 1, rows: 6 }
        );
        assert_eq!(
            factorize(LayoutPolicy::Aspect, 8, 200, 100),
            Layout { cols: 4, rows: 2 }
        );
    }

    #[test]
    fn region_count_shrinks_to_fit_minimum_edge() {
        let layout = Layout::resolve(LayoutPolicy::Balanced, 26, 60, 60, 20);
        assert!(layout.regions() <= 26);
        assert!(shortest_range(60, layout.cols) >= 20);
        assert!(shortest_range(60, layout.rows) >= 20);
        assert_eq!(layout, Layout { cols: 3, rows: 3 });
    }

    #[test]
    fn tiny_grid_falls_back_to_one_region() {
        assert_eq!(
            Layout::resolve(LayoutPolicy::Balanced, 50, 3, 3, 20),
            Layout::single()
        );
        // configured minimum below the floor is raised to it
        assert_eq!(
            Layout::resolve(LayoutPolicy::Stripes, 8, 3, 3, 0),
            Layout::single()
        );
    }

    #[test]
    fn huge_request_is_capped_by_grid_size() {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(Layout::resolve(LayoutPolicy::Balanced, 200_000, 100, 100, 20));
        });
        let layout = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("resolve should return promptly");
        assert_eq!(layout, Layout { cols: 5, rows: 5 });

        let layout = Layout::resolve(LayoutPolicy::Aspect, usize::MAX, 100, 100, 20);
        assert!(layout.regions() <= 25);
    }

    #[test]
    fn resolve_is_deterministic() {
        let a = Layout::resolve(LayoutPolicy::Aspect, 26, 731, 402, 20);
        let b = Layout::resolve(LayoutPolicy::Aspect, 26, 731, 402, 20);
        assert_eq!(a, b);
    }
}
