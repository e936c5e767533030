use regroute_common::db::indices::NetId;
use regroute_common::geom::coord::GridCoord;

/// A compressed piece of a path: a straight run on one layer, or a layer
/// change at one position spanning `low..=high`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteStep {
    Wire { from: GridCoord, to: GridCoord },
    Via { x: u32, y: u32, low: u8, high: u8 },
}

/// Ordered cell path produced by a pathfinder. Consecutive cells differ by one
/// in-plane step or by a layer change at the same position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub net: NetId,
    pub path: Vec<GridCoord>,
}

impl Route {
    pub fn new(net: NetId, path: Vec<GridCoord>) -> Self {
        Self { net, path }
    }

    /// Path for a task whose ends share a position: the cell itself, or a via stack.
    pub fn trivial(net: NetId, start: GridCoord, end: GridCoord) -> Self {
        if start == end {
            Self::new(net, vec![start])
        } else {
            Self::new(net, vec![start, end])
        }
    }

    pub fn start(&self) -> Option<GridCoord> {
        self.path.first().copied()
    }

    pub fn end(&self) -> Option<GridCoord> {
        self.path.last().copied()
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Merges collinear runs and stacked layer changes.
    pub fn steps(&self) -> Vec<RouteStep> {
        let mut steps = Vec::new();
        if self.path.len() < 2 {
            return steps;
        }

        let mut run_start = self.path[0];
        let mut prev = self.path[0];
        for &curr in &self.path[1..] {
            if curr.z != prev.z {
                if !run_start.same_position(&prev) {
                    steps.push(RouteStep::Wire {
                        from: run_start,
                        to: prev,
                    });
                }
                let (low, high) = (prev.z.min(curr.z), prev.z.max(curr.z));
                match steps.last_mut() {
                    Some(RouteStep::Via {
                        x,
                        y,
                        low: l,
                        high: h,
                    }) if *x == curr.x && *y == curr.y => {
                        *l = (*l).min(low);
                        *h = (*h).max(high);
                    }
                    _ => steps.push(RouteStep::Via {
                        x: curr.x,
                        y: curr.y,
                        low,
                        high,
                    }),
                }
                run_start = curr;
            } else if !collinear(run_start, prev, curr) {
                steps.push(RouteStep::Wire {
                    from: run_start,
                    to: prev,
                });
                run_start = prev;
            }
            prev = curr;
        }
        if !run_start.same_position(&prev) {
            steps.push(RouteStep::Wire {
                from: run_start,
                to: prev,
            });
        }
        steps
    }
}

fn collinear(a: GridCoord, b: GridCoord, c: GridCoord) -> bool {
    (a.x == b.x && b.x == c.x) || (a.y == b.y && b.y == c.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: u32, y: u32, z: u8) -> GridCoord {
        GridCoord::new(x, y, z)
    }

    #[test]
    fn straight_runs_are_merged() {
        let route = Route::new(
            NetId::new(0),
            vec![c(0, 0, 0), c(1, 0, 0), c(2, 0, 0), c(2, 1, 0), c(2, 2, 0)],
        );
        assert_eq!(
            route.steps(),
            vec![
                RouteStep::Wire {
                    from: c(0, 0, 0),
                    to: c(2, 0, 0)
                },
                RouteStep::Wire {
                    from: c(2, 0, 0),
                    to: c(2, 2, 0)
                },
            ]
        );
    }

    #[test]
    fn stacked_layer_changes_become_one_via() {
        let route = Route::new(
            NetId::new(0),
            vec![c(0, 0, 0), c(1, 0, 0), c(1, 0, 1), c(1, 0, 2), c(1, 1, 2)],
        );
        assert_eq!(
            route.steps(),
            vec![
                RouteStep::Wire {
                    from: c(0, 0, 0),
                    to: c(1, 0, 0)
                },
                RouteStep::Via {
                    x: 1,
                    y: 0,
                    low: 0,
                    high: 2
                },
                RouteStep::Wire {
                    from: c(1, 0, 2),
                    to: c(1, 1, 2)
                },
            ]
        );
    }

    #[test]
    fn trivial_route_is_a_via_stack_or_a_point() {
        let net = NetId::new(1);
        assert!(Route::trivial(net, c(3, 3, 1), c(3, 3, 1)).steps().is_empty());
        assert_eq!(
            Route::trivial(net, c(3, 3, 2), c(3, 3, 0)).steps(),
            vec![RouteStep::Via {
                x: 3,
                y: 3,
                low: 0,
                high: 2
            }]
        );
    }
}
