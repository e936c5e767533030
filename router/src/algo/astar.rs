use crate::grid::RoutingGrid;
use crate::partition::region::Region;
use regroute_common::db::indices::NetId;
use regroute_common::geom::coord::{Axis, GridCoord};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Copy, Clone, Eq, PartialEq)]
struct State {
    f_score: i64,
    g_score: i64,
    index: u32,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Debug)]
pub struct SearchParams {
    pub max_expansions: u32,
    pub heuristic_weight: f64,
    pub via_cost: f64,
    pub wrong_way_cost: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            max_expansions: 2_000_000,
            heuristic_weight: 1.0,
            via_cost: 10.0,
            wrong_way_cost: 25.0,
        }
    }
}

#[derive(Clone, Copy)]
struct RoutingWindow {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
    width: u32,
    height: u32,
    layers: u8,
}

impl RoutingWindow {
    fn from_region(bounds: &Region, layers: u8) -> Self {
        Self {
            min_x: bounds.low_x,
            max_x: bounds.high_x,
            min_y: bounds.low_y,
            max_y: bounds.high_y,
            width: bounds.width(),
            height: bounds.height(),
            layers,
        }
    }
    #[inline(always)]
    fn contains(&self, c: GridCoord) -> bool {
        c.x >= self.min_x
            && c.x <= self.max_x
            && c.y >= self.min_y
            && c.y <= self.max_y
            && c.z < self.layers
    }
    #[inline(always)]
    fn get_local_idx(&self, c: GridCoord) -> usize {
        let lx = (c.x - self.min_x) as usize;
        let ly = (c.y - self.min_y) as usize;
        let lz = c.z as usize;
        lz * self.width as usize * self.height as usize + ly * self.width as usize + lx
    }
    #[inline(always)]
    fn get_coord(&self, idx: u32) -> GridCoord {
        let plane_size = self.width * self.height;
        let z = (idx / plane_size) as u8;
        let rem = idx % plane_size;
        let y = rem / self.width + self.min_y;
        let x = rem % self.width + self.min_x;
        GridCoord::new(x, y, z)
    }
    fn size(&self) -> usize {
        self.width as usize * self.height as usize * self.layers as usize
    }
}

/// Reusable A* state. Buffers grow to the largest window seen and are
/// invalidated between searches with a generation tag.
#[derive(Clone)]
pub struct AStar {
    parents: Vec<u32>,
    g_score: Vec<i64>,
    visited_tag: Vec<u32>,
    current_tag: u32,
    capacity: usize,
    last_expansions: u32,
}

impl Default for AStar {
    fn default() -> Self {
        Self::new()
    }
}

impl AStar {
    pub fn new() -> Self {
        let cap = 100_000;
        Self {
            parents: vec![u32::MAX; cap],
            g_score: vec![i64::MAX; cap],
            visited_tag: vec![0; cap],
            current_tag: 1,
            capacity: cap,
            last_expansions: 0,
        }
    }
    fn ensure_capacity(&mut self, size: usize) {
        if size > self.capacity {
            self.capacity = size.max(self.capacity * 2);
            self.parents.resize(self.capacity, u32::MAX);
            self.g_score.resize(self.capacity, i64::MAX);
            self.visited_tag.resize(self.capacity, 0);
        }
    }
    fn reset_window(&mut self) {
        self.current_tag = self.current_tag.wrapping_add(1);
        if self.current_tag == 0 {
            self.visited_tag.fill(0);
            self.current_tag = 1;
        }
    }

    /// Nodes expanded by the most recent search.
    pub fn last_expansions(&self) -> u32 {
        self.last_expansions
    }

    /// Cheapest path from `start` to `end` through cells passable for `net`,
    /// never leaving `bounds`. The two end cells are always enterable.
    pub fn find_path<G: RoutingGrid + ?Sized>(
        &mut self,
        grid: &G,
        bounds: &Region,
        start: GridCoord,
        end: GridCoord,
        net: NetId,
        params: &SearchParams,
    ) -> Option<Vec<GridCoord>> {
        let window = RoutingWindow::from_region(bounds, grid.layers());
        if !window.contains(start) || !window.contains(end) {
            return None;
        }
        self.ensure_capacity(window.size());
        self.reset_window();
        self.last_expansions = 0;

        let mut heap = BinaryHeap::new();
        let end_x = end.x as i32;
        let end_y = end.y as i32;
        let end_z = end.z as i32;
        let scale = 100.0;
        let weight = params.heuristic_weight;

        let start_local = window.get_local_idx(start);
        self.g_score[start_local] = 0;
        self.visited_tag[start_local] = self.current_tag;
        self.parents[start_local] = u32::MAX;
        let h = self.heuristic(start, end_x, end_y, end_z, weight);
        heap.push(State {
            f_score: (h * scale) as i64,
            g_score: 0,
            index: start_local as u32,
        });

        let layer_change_cost = params.via_cost * scale;
        let wrong_dir_cost = params.wrong_way_cost * scale;
        let base_move_cost = 1.0 * scale;
        let mut expansions = 0;

        while let Some(State { g_score, index, .. }) = heap.pop() {
            let curr_local = index as usize;
            if g_score > self.g_score[curr_local] {
                continue;
            }
            let position = window.get_coord(index);
            if position == end {
                self.last_expansions = expansions;
                return Some(self.reconstruct_path(end, &window));
            }

            expansions += 1;
            if expansions > params.max_expansions {
                self.last_expansions = expansions;
                return None;
            }

            let current_g = self.g_score[curr_local];
            let mut neighbors = [GridCoord::new(0, 0, 0); 6];
            let mut n_count = 0;
            if position.x > window.min_x {
                neighbors[n_count] = GridCoord::new(position.x - 1, position.y, position.z);
                n_count += 1;
            }
            if position.x < window.max_x {
                neighbors[n_count] = GridCoord::new(position.x + 1, position.y, position.z);
                n_count += 1;
            }
            if position.y > window.min_y {
                neighbors[n_count] = GridCoord::new(position.x, position.y - 1, position.z);
                n_count += 1;
            }
            if position.y < window.max_y {
                neighbors[n_count] = GridCoord::new(position.x, position.y + 1, position.z);
                n_count += 1;
            }
            if position.z > 0 {
                neighbors[n_count] = GridCoord::new(position.x, position.y, position.z - 1);
                n_count += 1;
            }
            if position.z + 1 < window.layers {
                neighbors[n_count] = GridCoord::new(position.x, position.y, position.z + 1);
                n_count += 1;
            }

            for &neighbor in &neighbors[..n_count] {
                if neighbor != end && !grid.is_passable(neighbor, net) {
                    continue;
                }

                // Wrong-way moves are cheap right next to the target pin.
                let dist_to_end =
                    (neighbor.x as i32 - end_x).abs() + (neighbor.y as i32 - end_y).abs();
                let is_near_pin = dist_to_end < 2;

                let step_move_cost = if position.z != neighbor.z {
                    layer_change_cost
                } else {
                    let moved = if position.x != neighbor.x {
                        Axis::X
                    } else {
                        Axis::Y
                    };
                    if moved == Axis::native(position.z) {
                        base_move_cost
                    } else if is_near_pin {
                        base_move_cost * 2.0
                    } else {
                        wrong_dir_cost
                    }
                };

                let node_cost = if neighbor == end {
                    0.0
                } else {
                    grid.get_cost(neighbor) * scale
                };
                let tentative_g = current_g + (step_move_cost + node_cost) as i64;
                let neighbor_local = window.get_local_idx(neighbor);

                if self.visited_tag[neighbor_local] != self.current_tag
                    || tentative_g < self.g_score[neighbor_local]
                {
                    self.parents[neighbor_local] = curr_local as u32;
                    self.g_score[neighbor_local] = tentative_g;
                    self.visited_tag[neighbor_local] = self.current_tag;
                    let h = self.heuristic(neighbor, end_x, end_y, end_z, weight);
                    heap.push(State {
                        f_score: tentative_g + (h * scale) as i64,
                        g_score: tentative_g,
                        index: neighbor_local as u32,
                    });
                }
            }
        }
        self.last_expansions = expansions;
        None
    }

    #[inline(always)]
    fn heuristic(&self, a: GridCoord, ex: i32, ey: i32, ez: i32, weight: f64) -> f64 {
        ((a.x as i32 - ex).abs() as f64
            + (a.y as i32 - ey).abs() as f64
            + (a.z as i32 - ez).abs() as f64 * 5.0)
            * weight
    }
    fn reconstruct_path(&self, end: GridCoord, window: &RoutingWindow) -> Vec<GridCoord> {
        let mut path = Vec::new();
        let mut curr_local = window.get_local_idx(end);
        loop {
            path.push(window.get_coord(curr_local as u32));
            let parent = self.parents[curr_local];
            if parent == u32::MAX {
                break;
            }
            curr_local = parent as usize;
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::DenseGrid;
    use regroute_common::db::indices::RegionId;

    fn region(low_x: u32, high_x: u32, low_y: u32, high_y: u32) -> Region {
        Region {
            id: RegionId::new(0),
            col: 0,
            row: 0,
            low_x,
            high_x,
            low_y,
            high_y,
        }
    }

    fn adjacent(a: GridCoord, b: GridCoord) -> bool {
        (a.same_position(&b) && a.z.abs_diff(b.z) == 1) || (a.z == b.z && a.manhattan(&b) == 1)
    }

    #[test]
    fn finds_a_connected_path() {
        let grid = DenseGrid::new(8, 8, 2);
        let mut astar = AStar::new();
        let start = GridCoord::new(1, 1, 0);
        let end = GridCoord::new(6, 5, 0);
        let path = astar
            .find_path(
                &grid,
                &region(0, 7, 0, 7),
                start,
                end,
                NetId::new(0),
                &SearchParams::default(),
            )
            .unwrap();
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&end));
        assert!(path.windows(2).all(|w| adjacent(w[0], w[1])));
    }

    #[test]
    fn stays_inside_the_region() {
        let grid = DenseGrid::new(10, 10, 1);
        // wall with a gap outside the allowed window
        for y in 0..9 {
            grid.set_obstacle(GridCoord::new(4, y, 0));
        }
        let mut astar = AStar::new();
        let params = SearchParams::default();
        let net = NetId::new(0);
        let start = GridCoord::new(1, 1, 0);
        let end = GridCoord::new(7, 1, 0);
        assert!(
            astar
                .find_path(&grid, &region(0, 9, 0, 5), start, end, net, &params)
                .is_none()
        );
        let path = astar
            .find_path(&grid, &region(0, 9, 0, 9), start, end, net, &params)
            .unwrap();
        assert!(path.iter().any(|c| c.y == 9));
    }

    #[test]
    fn other_nets_are_avoided() {
        let grid = DenseGrid::new(5, 3, 1);
        for y in 0..3 {
            grid.occupy(GridCoord::new(2, y, 0), NetId::new(1));
        }
        let mut astar = AStar::new();
        let bounds = region(0, 4, 0, 2);
        let params = SearchParams::default();
        let (start, end) = (GridCoord::new(0, 1, 0), GridCoord::new(4, 1, 0));
        assert!(
            astar
                .find_path(&grid, &bounds, start, end, NetId::new(0), &params)
                .is_none()
        );
        assert!(
            astar
                .find_path(&grid, &bounds, start, end, NetId::new(1), &params)
                .is_some()
        );
    }

    #[test]
    fn expansion_budget_is_enforced() {
        let grid = DenseGrid::new(30, 30, 1);
        let mut astar = AStar::new();
        let params = SearchParams {
            max_expansions: 3,
            ..SearchParams::default()
        };
        let found = astar.find_path(
            &grid,
            &region(0, 29, 0, 29),
            GridCoord::new(0, 0, 0),
            GridCoord::new(29, 29, 0),
            NetId::new(0),
            &params,
        );
        assert!(found.is_none());
        assert_eq!(astar.last_expansions(), 4);
    }
}
