pub mod barrier;
pub mod job;
pub mod progress;
pub mod report;
pub mod status;
pub mod worker;

pub use barrier::PhaseBarrier;
pub use job::{Job, OutputSink};
pub use progress::{Deadline, Progress};
pub use report::RoutingReport;
pub use status::{FailureKind, UnroutableNets};

use crate::algo::Pathfinder;
use crate::boundary::locks::BoundaryLocks;
use crate::error::EngineError;
use crate::partition::layout::Layout;
use crate::partition::pool::WorkPool;
use crate::task::RawTask;
use parking_lot::Mutex;
use regroute_common::geom::coord::{GridCoord, MAX_LAYERS};
use regroute_common::util::config::{LayoutPolicy, RoutingConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use worker::Worker;

#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub threads: usize,
    pub regions: usize,
    pub layout: LayoutPolicy,
    pub min_region_edge: u32,
    pub max_runtime_secs: f64,
    pub random_probes: usize,
    pub show_progress: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self {
            threads: config.threads,
            regions: config.regions,
            layout: config.layout,
            min_region_edge: config.min_region_edge,
            max_runtime_secs: config.max_runtime_secs,
            random_probes: config.random_probes,
            show_progress: config.show_progress,
        }
    }
}

/// State shared by the workers of one run.
pub(crate) struct Shared<S> {
    pub(crate) pool: WorkPool,
    pub(crate) locks: BoundaryLocks,
    pub(crate) unroutable: UnroutableNets,
    pub(crate) progress: Progress,
    pub(crate) deadline: Deadline,
    pub(crate) assign_barrier: PhaseBarrier,
    pub(crate) solve_barrier: PhaseBarrier,
    pub(crate) abort: AtomicBool,
    pub(crate) sink: Mutex<S>,
    pub(crate) not_reached: AtomicUsize,
    pub(crate) workers: usize,
    pub(crate) random_probes: usize,
}

impl<S> Shared<S> {
    /// Release action of the second barrier: every task still queued was not
    /// reached before the deadline, and its net must not be applied.
    pub(crate) fn mark_unsolved(&self) {
        let left = self.pool.drain_unsolved();
        log::info!(
            "Solve phase finished after {:.2}s",
            self.deadline.elapsed().as_secs_f32()
        );
        if left.is_empty() {
            return;
        }
        // Nets that already failed keep their kind; their pieces are not
        // counted as cut off.
        let cut_off = left
            .iter()
            .filter(|t| {
                self.unroutable.mark(t.net, FailureKind::NotReached)
                    || self.unroutable.kind(t.net) == Some(FailureKind::NotReached)
            })
            .count();
        log::warn!(
            "Deadline reached: {} tasks were not solved in time ({} of failed nets).",
            cut_off,
            left.len() - cut_off
        );
        self.not_reached.store(cut_off, Ordering::Release);
    }
}

/// Work-distribution engine: partitions the grid, assigns tasks to regions
/// and runs the worker pipeline.
pub struct RoutingEngine {
    settings: EngineSettings,
    pool: WorkPool,
    locks: BoundaryLocks,
}

impl RoutingEngine {
    /// Validates the input, resolves the region layout and pre-blocks the
    /// neighbourhood of every task endpoint against hand-off use.
    pub fn new(
        settings: EngineSettings,
        width: u32,
        height: u32,
        layers: u8,
        tasks: Vec<RawTask>,
    ) -> Result<Self, EngineError> {
        if settings.threads == 0 {
            return Err(EngineError::NoThreads);
        }
        if width == 0 || height == 0 {
            return Err(EngineError::EmptyGrid { width, height });
        }
        if layers == 0 || layers > MAX_LAYERS {
            return Err(EngineError::LayerCount {
                layers,
                max: MAX_LAYERS,
            });
        }
        let inside = |c: GridCoord| c.x < width && c.y < height && c.z < layers;
        for t in &tasks {
            for coord in [t.start, t.end] {
                if !inside(coord) {
                    return Err(EngineError::EndpointOutsideGrid {
                        segment: t.segment,
                        coord,
                        width,
                        height,
                        layers,
                    });
                }
            }
        }

        let layout = Layout::resolve(
            settings.layout,
            settings.regions,
            width,
            height,
            settings.min_region_edge,
        );
        log::info!(
            "Partition: {}x{} = {} regions ({} requested) over {}x{}x{}",
            layout.cols,
            layout.rows,
            layout.regions(),
            settings.regions,
            width,
            height,
            layers
        );

        let locks = BoundaryLocks::new(width, height, layers);
        for t in &tasks {
            locks.block_neighbourhood(t.start);
            locks.block_neighbourhood(t.end);
        }

        Ok(Self {
            pool: WorkPool::new(width, height, layout, tasks),
            locks,
            settings,
        })
    }

    pub fn pool(&self) -> &WorkPool {
        &self.pool
    }

    pub fn locks(&self) -> &BoundaryLocks {
        &self.locks
    }

    pub fn layout(&self) -> Layout {
        self.pool.layout()
    }

    /// Runs all phases on `settings.threads` workers. `make_pathfinder` is
    /// called once inside each worker. Returns the report and the sink.
    ///
    /// Panics raised by a worker are re-raised here after every sibling has
    /// stopped.
    pub fn run<P, F, S>(self, make_pathfinder: F, sink: S) -> (RoutingReport, S)
    where
        P: Pathfinder,
        F: Fn(usize) -> P + Sync,
        S: OutputSink,
    {
        let workers = self.settings.threads;
        let tasks = self.pool.initial_count();
        let layout = self.pool.layout();
        log::info!("Routing {} tasks on {} threads...", tasks, workers);

        let shared = Shared {
            progress: Progress::new(tasks, self.settings.show_progress),
            deadline: Deadline::after_secs(self.settings.max_runtime_secs),
            pool: self.pool,
            locks: self.locks,
            unroutable: UnroutableNets::new(),
            assign_barrier: PhaseBarrier::new(workers),
            solve_barrier: PhaseBarrier::new(workers),
            abort: AtomicBool::new(false),
            sink: Mutex::new(sink),
            not_reached: AtomicUsize::new(0),
            workers,
            random_probes: self.settings.random_probes,
        };

        let mut stats = Vec::with_capacity(workers);
        let mut panic = None;
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|id| {
                    let shared = &shared;
                    let make = &make_pathfinder;
                    s.spawn(move || Worker::new(id, shared, make(id)).run())
                })
                .collect();
            for h in handles {
                match h.join() {
                    Ok(st) => stats.push(st),
                    Err(payload) => {
                        panic.get_or_insert(payload);
                    }
                }
            }
        });
        shared.progress.finish();
        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }

        let mut report = RoutingReport {
            threads: workers,
            layout: Some(layout),
            tasks,
            splits: shared.pool.splits(),
            not_reached: shared.not_reached.load(Ordering::Acquire),
            claimed_pairs: shared.locks.claimed_pairs(),
            workers_at_prepare: shared.pool.workers_at_prepare(),
            progress: shared.progress.snapshot(),
            unroutable: shared.unroutable.snapshot(),
            elapsed: shared.deadline.elapsed(),
            ..RoutingReport::default()
        };
        for st in &stats {
            report.absorb(st);
        }

        let mut sink = shared.sink.into_inner();
        for &(net, kind) in &report.unroutable {
            sink.net_failed(net, kind);
        }
        (report, sink)
    }
}
