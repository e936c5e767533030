use crate::algo::Pathfinder;
use crate::boundary::resolver::{BoundaryResolver, ResolverStats};
use crate::engine::Shared;
use crate::engine::job::{Job, OutputSink};
use crate::engine::status::FailureKind;
use crate::partition::region::Region;
use crate::route::Route;
use crate::task::Task;
use std::sync::atomic::Ordering;

/// Counters of one worker, merged into the run report.
#[derive(Clone, Debug, Default)]
pub struct WorkerStats {
    pub ingested: usize,
    pub assigned: usize,
    pub splits: usize,
    pub claim_retries: usize,
    pub no_handoff: usize,
    pub solved: usize,
    pub trivial: usize,
    pub no_path: usize,
    pub skipped: usize,
    pub deadline_hit: bool,
    pub jobs_applied: usize,
    pub jobs_skipped: usize,
    pub resolver: ResolverStats,
    pub aborted: bool,
}

/// Raises the abort flag and poisons both barriers if the worker unwinds,
/// so its siblings leave their loops and waits.
struct AbortOnPanic<'s, S> {
    shared: &'s Shared<S>,
}

impl<S> Drop for AbortOnPanic<'_, S> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.shared.abort.store(true, Ordering::SeqCst);
            self.shared.assign_barrier.poison();
            self.shared.solve_barrier.poison();
        }
    }
}

pub(crate) struct Worker<'s, P, S> {
    id: usize,
    shared: &'s Shared<S>,
    pathfinder: P,
    resolver: BoundaryResolver<'s>,
    jobs: Vec<Job>,
    stats: WorkerStats,
}

impl<'s, P: Pathfinder, S: OutputSink> Worker<'s, P, S> {
    pub(crate) fn new(id: usize, shared: &'s Shared<S>, pathfinder: P) -> Self {
        Self {
            id,
            shared,
            pathfinder,
            resolver: BoundaryResolver::new(&shared.pool, &shared.locks, shared.random_probes),
            jobs: Vec::new(),
            stats: WorkerStats::default(),
        }
    }

    /// Ingest, assign, solve and apply, separated by the two barriers.
    pub(crate) fn run(mut self) -> WorkerStats {
        let shared = self.shared;
        let _guard = AbortOnPanic { shared };

        self.ingest();
        self.assign();
        shared.pool.finish_assign();

        let prepared = shared.assign_barrier.wait_with(|| {
            shared.pool.prepare(shared.workers);
            log::info!(
                "Assignment finished after {:.2}s: {} pieces, {} splits",
                shared.deadline.elapsed().as_secs_f32(),
                shared.pool.assigned(),
                shared.pool.splits()
            );
        });
        if prepared.is_err() {
            return self.aborted();
        }

        self.solve();

        let drained = shared.solve_barrier.wait_with(|| shared.mark_unsolved());
        if drained.is_err() {
            return self.aborted();
        }

        self.apply();
        self.stats.resolver = self.resolver.stats().clone();
        self.stats
    }

    fn aborted(mut self) -> WorkerStats {
        log::debug!("worker {} stopping: run aborted", self.id);
        self.stats.aborted = true;
        self.stats
    }

    fn ingest(&mut self) {
        let shared = self.shared;
        let pool = &shared.pool;
        while let Some(raw) = pool.pop_raw() {
            pool.push_pending(Task::from_raw(&raw));
            self.stats.ingested += 1;
        }
    }

    /// Runs until every task lineage reached a region queue or failed.
    fn assign(&mut self) {
        let shared = self.shared;
        let pool = &shared.pool;
        while pool.outstanding() > 0 {
            if shared.abort.load(Ordering::Relaxed) {
                return;
            }
            match pool.pop_pending() {
                Some(task) => self.assign_task(task),
                None => std::thread::yield_now(),
            }
        }
    }

    fn assign_task(&mut self, task: Task) {
        let shared = self.shared;
        let pool = &shared.pool;
        let owner = pool.region_of(task.start);
        let target = pool.region_of(task.end);

        if owner == target {
            pool.assign(owner, task);
            pool.complete_one();
            self.stats.assigned += 1;
            return;
        }

        loop {
            let Some(pair) = self.resolver.find_handoff(&task, owner) else {
                if shared.unroutable.mark(task.net, FailureKind::NoHandoff) {
                    log::warn!(
                        "net {:?}: no free hand-off from {} toward {} on the boundary of {:?}",
                        task.net,
                        task.start,
                        task.end,
                        owner
                    );
                }
                self.stats.no_handoff += 1;
                shared.progress.advance();
                pool.complete_one();
                return;
            };

            if !shared.locks.try_claim_pair(&pair) {
                self.stats.claim_retries += 1;
                continue;
            }

            self.pathfinder.reserve_handoff(&pair, task.net);
            let (prefix, suffix) = task.split_across(&pair);
            pool.assign(owner, prefix);
            self.jobs.push(Job::Bridge {
                net: task.net,
                pair,
            });
            pool.record_split();
            shared.progress.add_work(1);
            self.stats.assigned += 1;
            self.stats.splits += 1;
            pool.push_pending(suffix);
            return;
        }
    }

    fn solve(&mut self) {
        let shared = self.shared;
        while let Some(claimed) = shared.pool.claim_region() {
            loop {
                if shared.abort.load(Ordering::Relaxed) {
                    return;
                }
                if shared.deadline.expired() {
                    self.stats.deadline_hit = true;
                    return;
                }
                let Some(task) = claimed.next_task() else {
                    break;
                };
                self.solve_task(&task, claimed.region);
                shared.progress.advance();
            }
        }
    }

    fn solve_task(&mut self, task: &Task, region: &Region) {
        let shared = self.shared;
        if shared.unroutable.contains(task.net) {
            self.stats.skipped += 1;
            return;
        }

        if task.is_trivial() {
            self.stats.trivial += 1;
            self.jobs.push(Job::Route {
                task: *task,
                route: Route::trivial(task.net, task.start, task.end),
            });
            return;
        }

        match self
            .pathfinder
            .route(task.start, task.end, region, task.net)
        {
            Some(route) => {
                self.stats.solved += 1;
                self.jobs.push(Job::Route { task: *task, route });
            }
            None => {
                self.stats.no_path += 1;
                if shared.unroutable.mark(task.net, FailureKind::NoPath) {
                    log::warn!(
                        "net {:?}: no path from {} to {} inside {:?}",
                        task.net,
                        task.start,
                        task.end,
                        region.id
                    );
                }
            }
        }
    }

    /// Materializes this worker's jobs, skipping nets with a tombstone.
    fn apply(&mut self) {
        let shared = self.shared;
        let mut sink = shared.sink.lock();
        for job in self.jobs.drain(..) {
            if shared.unroutable.contains(job.net()) {
                self.stats.jobs_skipped += 1;
                continue;
            }
            sink.materialize(&job);
            self.stats.jobs_applied += 1;
        }
    }
}
