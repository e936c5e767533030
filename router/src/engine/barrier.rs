use parking_lot::{Condvar, Mutex};

/// Returned by a wait on a barrier whose party panicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poisoned;

struct BarrierState {
    arrived: usize,
    generation: u64,
    poisoned: bool,
}

/// Reusable barrier whose last arriving thread runs a release action before
/// anyone proceeds. Can be poisoned so waiters return instead of hanging.
pub struct PhaseBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl PhaseBarrier {
    pub fn new(parties: usize) -> Self {
        Self {
            parties: parties.max(1),
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                poisoned: false,
            }),
            cvar: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Blocks until all parties arrived. The last one runs `action` and gets
    /// `Ok(true)`; the others get `Ok(false)` once it returned.
    pub fn wait_with<F: FnOnce()>(&self, action: F) -> Result<bool, Poisoned> {
        let mut state = self.state.lock();
        if state.poisoned {
            return Err(Poisoned);
        }
        state.arrived += 1;
        if state.arrived == self.parties {
            action();
            state.arrived = 0;
            state.generation += 1;
            self.cvar.notify_all();
            return Ok(true);
        }

        let generation = state.generation;
        while state.generation == generation && !state.poisoned {
            self.cvar.wait(&mut state);
        }
        if state.generation == generation {
            return Err(Poisoned);
        }
        Ok(false)
    }

    pub fn wait(&self) -> Result<bool, Poisoned> {
        self.wait_with(|| {})
    }

    pub fn poison(&self) {
        let mut state = self.state.lock();
        state.poisoned = true;
        self.cvar.notify_all();
    }

    pub fn is_poisoned(&self) -> bool {
        self.state.lock().poisoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn action_runs_once_after_everyone_arrived() {
        let barrier = PhaseBarrier::new(4);
        let arrived = AtomicUsize::new(0);
        let seen_by_action = AtomicUsize::new(0);
        let actions = AtomicUsize::new(0);
        let leaders = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    arrived.fetch_add(1, Ordering::SeqCst);
                    let leader = barrier
                        .wait_with(|| {
                            seen_by_action.store(arrived.load(Ordering::SeqCst), Ordering::SeqCst);
                            actions.fetch_add(1, Ordering::SeqCst);
                        })
                        .unwrap();
                    if leader {
                        leaders.fetch_add(1, Ordering::SeqCst);
                    }
                    // action finished before anyone is released
                    assert_eq!(actions.load(Ordering::SeqCst), 1);
                });
            }
        });

        assert_eq!(seen_by_action.load(Ordering::SeqCst), 4);
        assert_eq!(leaders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn barrier_is_reusable() {
        let barrier = PhaseBarrier::new(2);
        std::thread::scope(|s| {
            for _ in 0..2 {
                s.spawn(|| {
                    for _ in 0..3 {
                        barrier.wait().unwrap();
                    }
                });
            }
        });
        assert!(!barrier.is_poisoned());
    }

    #[test]
    fn poison_releases_waiters() {
        let barrier = PhaseBarrier::new(3);
        std::thread::scope(|s| {
            let waiter = s.spawn(|| barrier.wait());
            std::thread::sleep(std::time::Duration::from_millis(20));
            barrier.poison();
            assert_eq!(waiter.join().unwrap(), Err(Poisoned));
        });
        assert_eq!(barrier.wait(), Err(Poisoned));
    }
}
