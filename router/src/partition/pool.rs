use crate::partition::layout::{Layout, split_range};
use crate::partition::region::Region;
use crate::task::{RawTask, Task};
use crossbeam_queue::{ArrayQueue, SegQueue};
use regroute_common::db::indices::RegionId;
use regroute_common::geom::coord::GridCoord;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

const OUTSTANDING_MASK: u64 = 0xffff_ffff;
const TERMINAL_UNIT: u64 = 1 << 32;

/// Spatial partitioner and the shared queues of one routing run.
///
/// Holds the raw input queue, the pending queue of tasks whose owner region
/// still has to be decided, one work queue per region, and the counters that
/// drive the assignment loop. The outstanding and terminal counts live in a
/// single atomic word so their sum is observed consistently.
pub struct WorkPool {
    width: u32,
    height: u32,
    layout: Layout,
    regions: Vec<Region>,
    col_of_x: Vec<u32>,
    row_of_y: Vec<u32>,

    raw: SegQueue<RawTask>,
    pending: ArrayQueue<Task>,
    queues: Vec<SegQueue<Task>>,
    ready: ArrayQueue<RegionId>,

    initial: usize,
    counters: AtomicU64,
    splits: AtomicUsize,
    assigned: AtomicUsize,

    assign_done: AtomicUsize,
    prepared: AtomicBool,
    workers_at_prepare: AtomicUsize,
}

/// A region handed to exactly one solver; tasks are pulled one at a time.
pub struct ClaimedRegion<'a> {
    pub region: &'a Region,
    queue: &'a SegQueue<Task>,
}

impl ClaimedRegion<'_> {
    pub fn next_task(&self) -> Option<Task> {
        self.queue.pop()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl WorkPool {
    pub fn new(width: u32, height: u32, layout: Layout, tasks: Vec<RawTask>) -> Self {
        assert!(width > 0 && height > 0, "work pool over an empty grid");

        let col_of_x = build_lookup(width, layout.cols);
        let row_of_y = build_lookup(height, layout.rows);

        let mut regions = Vec::with_capacity(layout.regions());
        for row in 0..layout.rows {
            let (low_y, end_y) = split_range(height, layout.rows, row);
            for col in 0..layout.cols {
                let (low_x, end_x) = split_range(width, layout.cols, col);
                regions.push(Region {
                    id: RegionId::new(row * layout.cols + col),
                    col,
                    row,
                    low_x,
                    high_x: end_x - 1,
                    low_y,
                    high_y: end_y - 1,
                });
            }
        }

        let initial = tasks.len();
        assert!(
            (initial as u64) < OUTSTANDING_MASK,
            "too many tasks for one run: {}",
            initial
        );
        let raw = SegQueue::new();
        for t in tasks {
            raw.push(t);
        }

        Self {
            width,
            height,
            layout,
            queues: (0..regions.len()).map(|_| SegQueue::new()).collect(),
            ready: ArrayQueue::new(regions.len()),
            regions,
            col_of_x,
            row_of_y,
            raw,
            pending: ArrayQueue::new(initial.max(1)),
            initial,
            counters: AtomicU64::new(initial as u64),
            splits: AtomicUsize::new(0),
            assigned: AtomicUsize::new(0),
            assign_done: AtomicUsize::new(0),
            prepared: AtomicBool::new(false),
            workers_at_prepare: AtomicUsize::new(0),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.index()]
    }

    /// O(1) owner lookup through the per-axis tables.
    #[inline]
    pub fn region_for(&self, x: u32, y: u32) -> RegionId {
        let col = self.col_of_x[x as usize] as usize;
        let row = self.row_of_y[y as usize] as usize;
        RegionId::new(row * self.layout.cols + col)
    }

    #[inline]
    pub fn region_of(&self, c: GridCoord) -> RegionId {
        self.region_for(c.x, c.y)
    }

    pub fn low_x(&self, id: RegionId) -> u32 {
        self.region(id).low_x
    }
    pub fn high_x(&self, id: RegionId) -> u32 {
        self.region(id).high_x
    }
    pub fn low_y(&self, id: RegionId) -> u32 {
        self.region(id).low_y
    }
    pub fn high_y(&self, id: RegionId) -> u32 {
        self.region(id).high_y
    }

    pub fn pop_raw(&self) -> Option<RawTask> {
        self.raw.pop()
    }

    /// Panics if the queue is full: pending items never exceed outstanding tasks.
    pub fn push_pending(&self, task: Task) {
        if self.pending.push(task).is_err() {
            panic!(
                "pending queue overflow (capacity {}, outstanding {})",
                self.pending.capacity(),
                self.outstanding()
            );
        }
    }

    pub fn pop_pending(&self) -> Option<Task> {
        self.pending.pop()
    }

    /// Queues a task on its owner region. Does not touch the outstanding count.
    pub fn assign(&self, region: RegionId, task: Task) {
        debug_assert!(self.region(region).contains_coord(task.start));
        debug_assert!(self.region(region).contains_coord(task.end));
        self.queues[region.index()].push(task);
        self.assigned.fetch_add(1, Ordering::Relaxed);
    }

    /// One task lineage reached a terminal state.
    pub fn complete_one(&self) {
        let res = self
            .counters
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                if v & OUTSTANDING_MASK == 0 {
                    None
                } else {
                    Some(v - 1 + TERMINAL_UNIT)
                }
            });
        if res.is_err() {
            panic!("outstanding task counter underflow");
        }
    }

    pub fn record_split(&self) {
        self.splits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn outstanding(&self) -> usize {
        (self.counters.load(Ordering::Acquire) & OUTSTANDING_MASK) as usize
    }

    pub fn terminal(&self) -> usize {
        (self.counters.load(Ordering::Acquire) >> 32) as usize
    }

    /// `(outstanding, terminal)` read from one snapshot.
    pub fn counters(&self) -> (usize, usize) {
        let v = self.counters.load(Ordering::Acquire);
        ((v & OUTSTANDING_MASK) as usize, (v >> 32) as usize)
    }

    pub fn initial_count(&self) -> usize {
        self.initial
    }

    pub fn splits(&self) -> usize {
        self.splits.load(Ordering::Relaxed)
    }

    pub fn assigned(&self) -> usize {
        self.assigned.load(Ordering::Relaxed)
    }

    pub fn queued_in(&self, id: RegionId) -> usize {
        self.queues[id.index()].len()
    }

    /// Called by each worker as it leaves the assignment loop.
    pub fn finish_assign(&self) {
        self.assign_done.fetch_add(1, Ordering::AcqRel);
    }

    pub fn workers_at_prepare(&self) -> usize {
        self.workers_at_prepare.load(Ordering::Acquire)
    }

    /// Freezes the region queues into the ready queue, busiest region first.
    /// Runs once, after all `expected_workers` finished assignment.
    pub fn prepare(&self, expected_workers: usize) {
        if self.prepared.swap(true, Ordering::AcqRel) {
            panic!("WorkPool::prepare ran twice");
        }
        let arrived = self.assign_done.load(Ordering::Acquire);
        self.workers_at_prepare.store(arrived, Ordering::Release);
        assert_eq!(
            arrived, expected_workers,
            "prepare ran before every worker finished assignment"
        );
        assert_eq!(self.outstanding(), 0, "prepare ran with outstanding tasks");
        assert!(self.pending.is_empty(), "prepare ran with pending tasks");

        let mut order: Vec<usize> = (0..self.regions.len())
            .filter(|&i| !self.queues[i].is_empty())
            .collect();
        order.sort_by_key(|&i| Reverse(self.queues[i].len()));

        for i in order {
            if self.ready.push(RegionId::new(i)).is_err() {
                panic!("ready queue overflow");
            }
        }
        log::debug!("{} regions ready to solve", self.ready.len());
    }

    /// Hands out each non-empty region exactly once.
    pub fn claim_region(&self) -> Option<ClaimedRegion<'_>> {
        let id = self.ready.pop()?;
        Some(ClaimedRegion {
            region: &self.regions[id.index()],
            queue: &self.queues[id.index()],
        })
    }

    /// Removes every task still queued in any region.
    pub fn drain_unsolved(&self) -> Vec<Task> {
        let mut left = Vec::new();
        for q in &self.queues {
            while let Some(t) = q.pop() {
                left.push(t);
            }
        }
        left
    }
}

fn build_lookup(n: u32, k: usize) -> Vec<u32> {
    let mut table = vec![u32::MAX; n as usize];
    for owner in 0..k {
        let (lo, hi) = split_range(n, k, owner);
        assert!(hi > lo, "region {} of {} has an empty range over {} cells", owner, k, n);
        for v in lo..hi {
            table[v as usize] = owner as u32;
        }
    }
    assert!(
        table.iter().all(|&o| o != u32::MAX),
        "region layout leaves a coverage gap"
    );
    table
}
