use crate::engine::status::FailureKind;
use crate::route::Route;
use crate::task::{ConnectionPoints, Task};
use regroute_common::db::indices::NetId;

/// Output action recorded by a worker and applied after all solving ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Job {
    /// A solved task and its path.
    Route { task: Task, route: Route },
    /// The one-step wire across a claimed hand-off pair.
    Bridge { net: NetId, pair: ConnectionPoints },
}

impl Job {
    pub fn net(&self) -> NetId {
        match self {
            Job::Route { task, .. } => task.net,
            Job::Bridge { net, .. } => *net,
        }
    }
}

/// Host-side collaborator receiving the results of a run. Calls are
/// serialised by the engine; `net_failed` comes after every `materialize`.
pub trait OutputSink: Send {
    fn materialize(&mut self, job: &Job);

    fn net_failed(&mut self, _net: NetId, _kind: FailureKind) {}
}
