use regroute_common::db::indices::SegmentId;
use regroute_common::geom::coord::GridCoord;
use thiserror::Error;

/// Setup failures detected before any worker starts.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("at least one worker thread is required")]
    NoThreads,
    #[error("routing grid {width}x{height} has no cells")]
    EmptyGrid { width: u32, height: u32 },
    #[error("layer count {layers} is outside 1..={max}")]
    LayerCount { layers: u8, max: u8 },
    #[error("{segment:?}: endpoint {coord} lies outside the {width}x{height}x{layers} grid")]
    EndpointOutsideGrid {
        segment: SegmentId,
        coord: GridCoord,
        width: u32,
        height: u32,
        layers: u8,
    },
}
