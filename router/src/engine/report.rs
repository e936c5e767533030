use crate::boundary::resolver::{ResolverStats, Strategy};
use crate::engine::status::FailureKind;
use crate::engine::worker::WorkerStats;
use crate::partition::layout::Layout;
use regroute_common::db::indices::NetId;
use std::time::Duration;

/// Summary of one engine run.
#[derive(Clone, Debug, Default)]
pub struct RoutingReport {
    pub threads: usize,
    pub layout: Option<Layout>,
    /// Raw tasks handed to the engine.
    pub tasks: usize,
    pub splits: usize,
    /// Sub-tasks queued on regions (one more than the splits per routed lineage).
    pub pieces: usize,
    pub solved: usize,
    pub trivial: usize,
    pub no_path: usize,
    pub no_handoff: usize,
    /// Tasks dropped in the solve phase because their net had already failed.
    pub skipped: usize,
    pub not_reached: usize,
    pub jobs_applied: usize,
    pub jobs_skipped: usize,
    pub claim_retries: usize,
    pub claimed_pairs: usize,
    pub resolver: ResolverStats,
    pub deadline_hit: bool,
    pub workers_at_prepare: usize,
    /// `(done, total)` progress at the end of the run.
    pub progress: (usize, usize),
    /// Failed nets ordered by id.
    pub unroutable: Vec<(NetId, FailureKind)>,
    pub elapsed: Duration,
}

impl RoutingReport {
    pub(crate) fn absorb(&mut self, stats: &WorkerStats) {
        self.pieces += stats.assigned;
        self.solved += stats.solved;
        self.trivial += stats.trivial;
        self.no_path += stats.no_path;
        self.no_handoff += stats.no_handoff;
        self.skipped += stats.skipped;
        self.jobs_applied += stats.jobs_applied;
        self.jobs_skipped += stats.jobs_skipped;
        self.claim_retries += stats.claim_retries;
        self.deadline_hit |= stats.deadline_hit;
        self.resolver.merge(&stats.resolver);
    }

    pub fn failure_of(&self, net: NetId) -> Option<FailureKind> {
        self.unroutable
            .binary_search_by_key(&net, |(n, _)| *n)
            .ok()
            .map(|i| self.unroutable[i].1)
    }

    pub fn failed_nets(&self, kind: FailureKind) -> usize {
        self.unroutable.iter().filter(|(_, k)| *k == kind).count()
    }

    pub fn log_summary(&self) {
        if let Some(layout) = self.layout {
            log::info!(
                "Engine: {} threads, {}x{} regions, {:.2}s",
                self.threads,
                layout.cols,
                layout.rows,
                self.elapsed.as_secs_f32()
            );
        }
        log::info!(
            "Tasks: {} in, {} splits, {} pieces, {} solved, {} trivial",
            self.tasks,
            self.splits,
            self.pieces,
            self.solved,
            self.trivial
        );
        let hits: Vec<String> = Strategy::ALL
            .iter()
            .map(|s| format!("{}={}", s.label(), self.resolver.hits_for(*s)))
            .collect();
        log::info!(
            "Hand-offs: {} claimed, {} retries, {} [{}]",
            self.claimed_pairs,
            self.claim_retries,
            self.resolver.failures,
            hits.join(" ")
        );
        log::info!(
            "Jobs: {} applied, {} skipped",
            self.jobs_applied,
            self.jobs_skipped
        );
        if !self.unroutable.is_empty() {
            log::warn!(
                "Unroutable nets: {} (no hand-off {}, no path {}, not reached {})",
                self.unroutable.len(),
                self.failed_nets(FailureKind::NoHandoff),
                self.failed_nets(FailureKind::NoPath),
                self.failed_nets(FailureKind::NotReached)
            );
        }
    }
}
