use crate::algo::Pathfinder;
use crate::algo::astar::{AStar, SearchParams};
use crate::grid::RoutingGrid;
use crate::partition::region::Region;
use crate::route::Route;
use crate::task::ConnectionPoints;
use regroute_common::db::indices::NetId;
use regroute_common::geom::coord::GridCoord;

/// Default pathfinder: region-bounded A* over a shared occupancy grid. Found
/// paths are written back so later searches route around them.
pub struct MazeRouter<'g, G: RoutingGrid + ?Sized> {
    grid: &'g G,
    astar: AStar,
    params: SearchParams,
    searches: usize,
    expansions: u64,
}

impl<'g, G: RoutingGrid + ?Sized> MazeRouter<'g, G> {
    pub fn new(grid: &'g G, params: SearchParams) -> Self {
        Self {
            grid,
            astar: AStar::new(),
            params,
            searches: 0,
            expansions: 0,
        }
    }

    pub fn searches(&self) -> usize {
        self.searches
    }

    pub fn expansions(&self) -> u64 {
        self.expansions
    }
}

impl<G: RoutingGrid + ?Sized> Pathfinder for MazeRouter<'_, G> {
    fn route(
        &mut self,
        start: GridCoord,
        end: GridCoord,
        bounds: &Region,
        net: NetId,
    ) -> Option<Route> {
        self.searches += 1;
        let found = self
            .astar
            .find_path(self.grid, bounds, start, end, net, &self.params);
        self.expansions += self.astar.last_expansions() as u64;

        let path = found?;
        for &c in &path {
            // end cells may be hard-blocked by a reservation conflict
            let _ = self.grid.occupy(c, net);
        }
        Some(Route::new(net, path))
    }

    fn reserve_handoff(&mut self, pair: &ConnectionPoints, net: NetId) {
        for c in [pair.inner, pair.outer] {
            if !self.grid.occupy(c, net) {
                log::debug!("hand-off cell {} already taken in the routing grid", c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellState, DenseGrid};
    use regroute_common::db::indices::RegionId;

    #[test]
    fn routed_cells_are_owned_by_the_net() {
        let grid = DenseGrid::new(6, 6, 2);
        let mut router = MazeRouter::new(&grid, SearchParams::default());
        let bounds = Region {
            id: RegionId::new(0),
            col: 0,
            row: 0,
            low_x: 0,
            high_x: 5,
            low_y: 0,
            high_y: 5,
        };
        let net = NetId::new(4);
        let route = router
            .route(GridCoord::new(0, 2, 0), GridCoord::new(5, 2, 0), &bounds, net)
            .unwrap();
        assert_eq!(route.net, net);
        for c in &route.path {
            assert_eq!(grid.state(*c), CellState::Owned(net));
        }
        assert_eq!(router.searches(), 1);
    }

    #[test]
    fn handoff_cells_are_reserved() {
        let grid = DenseGrid::new(6, 6, 1);
        let mut router = MazeRouter::new(&grid, SearchParams::default());
        let pair =
            ConnectionPoints::new(GridCoord::new(2, 3, 0), GridCoord::new(3, 3, 0)).unwrap();
        router.reserve_handoff(&pair, NetId::new(1));
        assert!(!grid.is_passable(pair.inner, NetId::new(0)));
        assert!(grid.is_passable(pair.outer, NetId::new(1)));
    }
}
