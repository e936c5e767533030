use super::RoutingGrid;
use regroute_common::db::indices::NetId;
use regroute_common::geom::coord::GridCoord;
use std::sync::atomic::{AtomicU32, Ordering};

const FREE: u32 = 0;
const BLOCKED: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Free,
    Blocked,
    Owned(NetId),
}

/// Flat `layers * height * width` array of cell owners. A cell holds 0 when
/// free, `u32::MAX` when blocked, and `net + 1` when reserved or wired.
pub struct DenseGrid {
    width: u32,
    height: u32,
    layers: u8,
    cells: Vec<AtomicU32>,
}

impl DenseGrid {
    pub fn new(width: u32, height: u32, layers: u8) -> Self {
        let size = (width as usize) * (height as usize) * (layers as usize);

        if size > 2_000_000_000 {
            log::warn!(
                "Allocating large DenseGrid: {} elements. Ensure sufficient RAM.",
                size
            );
        }

        Self {
            width,
            height,
            layers,
            cells: (0..size).map(|_| AtomicU32::new(FREE)).collect(),
        }
    }

    #[inline(always)]
    fn index(&self, coord: GridCoord) -> Option<usize> {
        if coord.x >= self.width || coord.y >= self.height || coord.z >= self.layers {
            return None;
        }
        Some(
            (coord.z as usize) * (self.width as usize) * (self.height as usize)
                + (coord.y as usize) * (self.width as usize)
                + (coord.x as usize),
        )
    }

    #[inline(always)]
    fn tag(net: NetId) -> u32 {
        net.0.saturating_add(1).min(BLOCKED - 1)
    }

    pub fn state(&self, coord: GridCoord) -> CellState {
        let Some(i) = self.index(coord) else {
            return CellState::Blocked;
        };
        match self.cells[i].load(Ordering::Acquire) {
            FREE => CellState::Free,
            BLOCKED => CellState::Blocked,
            tag => CellState::Owned(NetId(tag - 1)),
        }
    }

    /// Reserves a cell for `net` ahead of routing. A cell reserved by two
    /// different nets becomes a hard blockage for both.
    pub fn reserve(&self, coord: GridCoord, net: NetId) {
        let Some(i) = self.index(coord) else {
            return;
        };
        let tag = Self::tag(net);
        match self.cells[i].compare_exchange(FREE, tag, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => {}
            Err(current) if current == tag || current == BLOCKED => {}
            Err(_) => self.cells[i].store(BLOCKED, Ordering::Release),
        }
    }

    /// Reserves `coord` and its eight in-plane neighbours.
    pub fn reserve_neighbourhood(&self, coord: GridCoord, net: NetId) {
        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(n) = coord.offset(dx, dy) {
                    self.reserve(n, net);
                }
            }
        }
    }

    pub fn blocked_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.load(Ordering::Relaxed) == BLOCKED)
            .count()
    }
}

impl RoutingGrid for DenseGrid {
    fn width(&self) -> u32 {
        self.width
    }
    fn height(&self) -> u32 {
        self.height
    }
    fn layers(&self) -> u8 {
        self.layers
    }

    fn set_obstacle(&self, coord: GridCoord) {
        if let Some(i) = self.index(coord) {
            self.cells[i].store(BLOCKED, Ordering::Release);
        }
    }

    fn is_obstacle(&self, coord: GridCoord) -> bool {
        self.state(coord) == CellState::Blocked
    }

    #[inline]
    fn is_passable(&self, coord: GridCoord, net: NetId) -> bool {
        match self.state(coord) {
            CellState::Free => true,
            CellState::Owned(owner) => owner == net,
            CellState::Blocked => false,
        }
    }

    fn occupy(&self, coord: GridCoord, net: NetId) -> bool {
        let Some(i) = self.index(coord) else {
            return false;
        };
        let tag = Self::tag(net);
        match self.cells[i].compare_exchange(FREE, tag, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => true,
            Err(current) => current == tag,
        }
    }

    #[inline]
    fn get_cost(&self, coord: GridCoord) -> f64 {
        // bottom layer is kept for pin access
        if coord.z == 0 { 2.0 } else { 0.0 }
    }
}
