pub mod astar;
pub mod maze;

pub use astar::{AStar, SearchParams};
pub use maze::MazeRouter;

use crate::partition::region::Region;
use crate::route::Route;
use crate::task::ConnectionPoints;
use regroute_common::db::indices::NetId;
use regroute_common::geom::coord::GridCoord;

/// Point-to-point path search used by the solve phase. Each worker owns one
/// instance; a search must stay inside `bounds`.
pub trait Pathfinder {
    fn route(
        &mut self,
        start: GridCoord,
        end: GridCoord,
        bounds: &Region,
        net: NetId,
    ) -> Option<Route>;

    /// Called once per claimed hand-off pair during assignment.
    fn reserve_handoff(&mut self, _pair: &ConnectionPoints, _net: NetId) {}
}
