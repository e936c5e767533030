pub mod algo;
pub mod boundary;
pub mod engine;
pub mod error;
pub mod grid;
pub mod output;
pub mod partition;
pub mod route;
pub mod task;
pub mod utils;

pub use engine::{EngineSettings, FailureKind, RoutingEngine, RoutingReport};
pub use error::EngineError;

use algo::{MazeRouter, SearchParams};
use grid::{DenseGrid, RoutingGrid};
use output::DesignSink;
use partition::{Layout, WorkPool};
use rayon::prelude::*;
use regroute_common::db::core::{DesignDB, NetStatus};
use regroute_common::geom::coord::{GridCoord, MAX_LAYERS};
use regroute_common::geom::point::Point;
use regroute_common::geom::rect::Rect;
use regroute_common::util::config::RoutingConfig;
use regroute_common::util::profiler::ScopedTimer;
use task::RawTask;
use utils::conversion::GridConverter;

const MAX_GRID_POINTS: u64 = 50_000_000;

/// Number of routing layers used for this design.
pub fn routing_layers(db: &DesignDB, config: &RoutingConfig) -> u8 {
    let available = db.layers.len().min(MAX_LAYERS as usize) as u8;
    available.min(config.max_layers).max(1)
}

/// Grid covering the die plus margin. The pitch is coarsened when the array
/// would exceed the cell budget.
pub fn grid_converter(db: &DesignDB, config: &RoutingConfig) -> GridConverter {
    let layers = routing_layers(db, config) as u64;
    let mut pitch = if config.wire_pitch > 0.0 {
        config.wire_pitch
    } else {
        1.0
    };
    let converter = GridConverter::for_die(&db.die_area, pitch, config.grid_margin);
    let total_points = converter.width() as u64 * converter.height() as u64 * layers;
    if total_points <= MAX_GRID_POINTS {
        return converter;
    }

    let scale_factor = (total_points as f64 / MAX_GRID_POINTS as f64).sqrt().ceil();
    log::warn!(
        "Grid too large ({:.1}M points). Scaling pitch by {:.0}x.",
        total_points as f64 / 1e6,
        scale_factor
    );
    pitch *= scale_factor;
    GridConverter::for_die(&db.die_area, pitch, config.grid_margin)
}

/// Region layout the engine would use for this design, without routing.
pub fn plan_regions(
    db: &DesignDB,
    config: &RoutingConfig,
) -> (GridConverter, Vec<partition::Region>) {
    let converter = grid_converter(db, config);
    let layout = Layout::resolve(
        config.layout,
        config.regions,
        converter.width(),
        converter.height(),
        config.min_region_edge,
    );
    let pool = WorkPool::new(converter.width(), converter.height(), layout, Vec::new());
    let regions = pool.regions().to_vec();
    (converter, regions)
}

/// Host-unit outlines of the planned regions, for drawing.
pub fn region_outlines(db: &DesignDB, config: &RoutingConfig) -> Vec<Rect> {
    let (converter, regions) = plan_regions(db, config);
    regions
        .iter()
        .map(|r| {
            let lo = converter.to_world(GridCoord::new(r.low_x, r.low_y, 0));
            let hi = converter.to_world(GridCoord::new(r.high_x, r.high_y, 0));
            Rect::new(Point::new(lo.x, lo.y), Point::new(hi.x, hi.y))
        })
        .collect()
}

fn mark_blockages(
    db: &DesignDB,
    converter: &GridConverter,
    layers: u8,
    grid: &DenseGrid,
    engine: &RoutingEngine,
) {
    let bounds = converter.world_bounds();
    let mut cells = 0usize;
    for b in db
        .blockages
        .iter()
        .filter(|b| b.layer < layers && b.rect.overlaps(&bounds))
    {
        let lo = converter.to_grid(b.rect.min, b.layer);
        let hi = converter.to_grid(b.rect.max, b.layer);
        for y in lo.y..=hi.y {
            for x in lo.x..=hi.x {
                let c = GridCoord::new(x, y, b.layer);
                grid.set_obstacle(c);
                engine.locks().block(c);
                cells += 1;
            }
        }
    }
    log::debug!(
        "Blocked {} cells from {} blockages ({} hard-blocked grid cells)",
        cells,
        db.blockages.len(),
        grid.blocked_cells()
    );
}

/// Routes every segment of the design and writes wires into `db`.
///
/// Nets with a failed piece end up `Unroutable` (or `NotReached` when the
/// deadline cut them off) and carry no wiring.
pub fn route(db: &mut DesignDB, config: &RoutingConfig) -> Result<RoutingReport, EngineError> {
    let _timer = ScopedTimer::new("Routing");

    let converter = grid_converter(db, config);
    let layers = routing_layers(db, config);
    let (width, height) = (converter.width(), converter.height());
    log::info!(
        "Routing grid: {}x{}x{} over {} nets / {} segments",
        width,
        height,
        layers,
        db.num_nets(),
        db.num_segments()
    );

    let top = layers - 1;
    let tasks: Vec<RawTask> = db
        .segments
        .par_iter()
        .map(|s| RawTask {
            net: s.net,
            segment: s.id,
            start: converter.to_grid(s.start, s.start_layer.min(top)),
            end: converter.to_grid(s.end, s.end_layer.min(top)),
        })
        .collect();

    let grid = DenseGrid::new(width, height, layers);
    tasks.par_iter().for_each(|t| {
        grid.reserve_neighbourhood(t.start, t.net);
        grid.reserve_neighbourhood(t.end, t.net);
    });

    let engine = RoutingEngine::new(
        EngineSettings::from_config(config),
        width,
        height,
        layers,
        tasks,
    )?;
    mark_blockages(db, &converter, layers, &grid, &engine);

    let params = SearchParams {
        max_expansions: config.max_expansions,
        ..SearchParams::default()
    };
    let sink = DesignSink::new(db, &converter);
    let (report, _) = engine.run(|_| MazeRouter::new(&grid, params.clone()), sink);

    for net in db.nets.iter_mut() {
        if net.status == NetStatus::Pending {
            net.status = NetStatus::Routed;
        }
    }
    report.log_summary();
    Ok(report)
}
