pub mod dense;

pub use dense::{CellState, DenseGrid};

use regroute_common::db::indices::NetId;
use regroute_common::geom::coord::GridCoord;

/// Shared occupancy grid read and written by the pathfinders of all workers.
/// Every method takes `&self`; implementations synchronise per cell.
pub trait RoutingGrid: Sync + Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn layers(&self) -> u8;

    fn set_obstacle(&self, coord: GridCoord);
    fn is_obstacle(&self, coord: GridCoord) -> bool;

    /// Free, or already owned by `net`.
    fn is_passable(&self, coord: GridCoord, net: NetId) -> bool;

    /// Takes a free cell for `net`. Returns false if another owner holds it.
    fn occupy(&self, coord: GridCoord, net: NetId) -> bool;

    /// Extra cost of stepping onto `coord`, in base-move units.
    fn get_cost(&self, coord: GridCoord) -> f64;
}
