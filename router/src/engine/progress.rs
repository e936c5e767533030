use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Monotone `done / total` pair. `total` grows by one for every split.
pub struct Progress {
    done: AtomicUsize,
    total: AtomicUsize,
    show: bool,
}

impl Progress {
    pub fn new(total: usize, show: bool) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total: AtomicUsize::new(total),
            show,
        }
    }

    pub fn add_work(&self, n: usize) {
        self.total.fetch_add(n, Ordering::Relaxed);
    }

    pub fn advance(&self) -> usize {
        let p = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if self.show {
            let total = self.total.load(Ordering::Relaxed);
            if p % 100 == 0 || p == total {
                eprint!("\r\x1b[36m[Solve] {}/{}\x1b[0m\x1b[K", p, total);
                let _ = std::io::stderr().flush();
            }
        }
        p
    }

    pub fn snapshot(&self) -> (usize, usize) {
        (
            self.done.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
        )
    }

    /// Clears the status line.
    pub fn finish(&self) {
        if self.show {
            eprint!("\r\x1b[K");
            let _ = std::io::stderr().flush();
        }
    }
}

/// Wall-clock budget measured from construction.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    start: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    /// Zero, negative and NaN budgets expire immediately; infinite ones never do.
    pub fn after_secs(secs: f64) -> Self {
        let budget = if secs.is_nan() || secs <= 0.0 {
            Some(Duration::ZERO)
        } else if secs.is_finite() && secs < 1e12 {
            Some(Duration::from_secs_f64(secs))
        } else {
            None
        };
        Self {
            start: Instant::now(),
            budget,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            start: Instant::now(),
            budget: None,
        }
    }

    pub fn expired(&self) -> bool {
        self.budget.is_some_and(|b| self.start.elapsed() >= b)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_grows_with_splits() {
        let progress = Progress::new(2, false);
        progress.add_work(1);
        progress.advance();
        assert_eq!(progress.snapshot(), (1, 3));
    }

    #[test]
    fn deadline_edges() {
        assert!(Deadline::after_secs(0.0).expired());
        assert!(Deadline::after_secs(-3.0).expired());
        assert!(Deadline::after_secs(f64::NAN).expired());
        assert!(!Deadline::after_secs(f64::INFINITY).expired());
        assert!(!Deadline::after_secs(3600.0).expired());
        assert!(!Deadline::unlimited().expired());
    }
}
