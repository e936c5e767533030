use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use regroute_common::db::indices::NetId;

/// Why a net could not be wired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No free boundary pair on the way to the other region.
    NoHandoff,
    /// The pathfinder found no path inside the region.
    NoPath,
    /// The deadline expired before the task was solved.
    NotReached,
}

impl FailureKind {
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::NoHandoff => "no hand-off",
            FailureKind::NoPath => "no path",
            FailureKind::NotReached => "not reached",
        }
    }
}

/// Tombstones of nets whose output must not be applied. The first mark wins.
#[derive(Default)]
pub struct UnroutableNets {
    map: DashMap<NetId, FailureKind>,
}

impl UnroutableNets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this call created the tombstone.
    pub fn mark(&self, net: NetId, kind: FailureKind) -> bool {
        match self.map.entry(net) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(kind);
                true
            }
        }
    }

    pub fn contains(&self, net: NetId) -> bool {
        self.map.contains_key(&net)
    }

    pub fn kind(&self, net: NetId) -> Option<FailureKind> {
        self.map.get(&net).map(|e| *e.value())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// All tombstones ordered by net.
    pub fn snapshot(&self) -> Vec<(NetId, FailureKind)> {
        let mut all: Vec<_> = self.map.iter().map(|e| (*e.key(), *e.value())).collect();
        all.sort_by_key(|(net, _)| *net);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_mark_wins() {
        let nets = UnroutableNets::new();
        assert!(nets.mark(NetId::new(3), FailureKind::NoHandoff));
        assert!(!nets.mark(NetId::new(3), FailureKind::NotReached));
        assert_eq!(nets.kind(NetId::new(3)), Some(FailureKind::NoHandoff));
        assert!(!nets.contains(NetId::new(4)));
        assert_eq!(nets.len(), 1);
    }

    #[test]
    fn concurrent_marks_create_one_tombstone() {
        let nets = UnroutableNets::new();
        let created: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| nets.mark(NetId::new(1), FailureKind::NoPath) as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(created, 1);
        assert_eq!(nets.snapshot(), vec![(NetId::new(1), FailureKind::NoPath)]);
    }
}
