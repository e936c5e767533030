use crate::db::core::{DesignDB, NetStatus};
use crate::db::indices::NetId;
use crate::geom::point::Point;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

const CHECK_TOLERANCE: f64 = 0.005;
const BIN_SIZE: f64 = 10.0;

/// Verifies the materialized wiring: no wire of one net touches a wire of
/// another net on the same layer, and both terminals of every segment of a
/// routed net are connected through that net's wires.
pub fn run(db: &DesignDB) -> Result<(), String> {
    log::info!("Starting Route Verification...");

    let (shorts_result, opens_result) = rayon::join(|| check_shorts(db), || check_opens(db));

    let mut msgs = Vec::new();
    match shorts_result {
        Err(e) => {
            log::error!("\x1b[31mFAIL\x1b[0m: Short Circuits Detected");
            log::error!("{}", e);
            msgs.push(e);
        }
        Ok(_) => log::info!("\x1b[32mPASS\x1b[0m: No shorts between nets."),
    }
    match opens_result {
        Err(e) => {
            log::error!("\x1b[31mFAIL\x1b[0m: Open Connection Detected");
            log::error!("{}", e);
            msgs.push(e);
        }
        Ok(_) => log::info!("\x1b[32mPASS\x1b[0m: All routed segments are connected."),
    }

    if msgs.is_empty() {
        Ok(())
    } else {
        Err(msgs.join("; "))
    }
}

/// Keeps the first failure reported by any rayon task.
#[derive(Default)]
struct FirstError {
    found: AtomicBool,
    msg: Mutex<String>,
}

impl FirstError {
    fn is_set(&self) -> bool {
        self.found.load(Ordering::Relaxed)
    }

    fn set(&self, msg: String) {
        if !self.found.swap(true, Ordering::Relaxed) {
            *self.msg.lock().unwrap_or_else(|e| e.into_inner()) = msg;
        }
    }

    fn into_result(self) -> Result<(), String> {
        if self.found.into_inner() {
            Err(self.msg.into_inner().unwrap_or_else(|e| e.into_inner()))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Segment {
    p1: Point<f64>,
    p2: Point<f64>,
    layer: u8,
    net_id: NetId,
}

impl Segment {
    fn is_via(&self) -> bool {
        (self.p1.x - self.p2.x).abs() < 1e-9 && (self.p1.y - self.p2.y).abs() < 1e-9
    }

    fn intersects(&self, other: &Segment) -> bool {
        if self.layer != other.layer {
            return false;
        }
        self.intersects_2d(other)
    }

    fn intersects_2d(&self, other: &Segment) -> bool {
        let min_x1 = self.p1.x.min(self.p2.x) - CHECK_TOLERANCE;
        let max_x1 = self.p1.x.max(self.p2.x) + CHECK_TOLERANCE;
        let min_y1 = self.p1.y.min(self.p2.y) - CHECK_TOLERANCE;
        let max_y1 = self.p1.y.max(self.p2.y) + CHECK_TOLERANCE;

        let min_x2 = other.p1.x.min(other.p2.x) - CHECK_TOLERANCE;
        let max_x2 = other.p1.x.max(other.p2.x) + CHECK_TOLERANCE;
        let min_y2 = other.p1.y.min(other.p2.y) - CHECK_TOLERANCE;
        let max_y2 = other.p1.y.max(other.p2.y) + CHECK_TOLERANCE;

        if max_x1 < min_x2 || min_x1 > max_x2 || max_y1 < min_y2 || min_y1 > max_y2 {
            return false;
        }

        let o1 = orientation(self.p1, self.p2, other.p1);
        let o2 = orientation(self.p1, self.p2, other.p2);
        let o3 = orientation(other.p1, other.p2, self.p1);
        let o4 = orientation(other.p1, other.p2, self.p2);

        if o1 != o2 && o3 != o4 {
            return true;
        }

        (o1 == 0 && on_segment(other.p1, self.p1, self.p2))
            || (o2 == 0 && on_segment(other.p2, self.p1, self.p2))
            || (o3 == 0 && on_segment(self.p1, other.p1, other.p2))
            || (o4 == 0 && on_segment(self.p2, other.p1, other.p2))
    }

    /// Same-layer contact, or a via landing on a wire of the layer below or above it.
    fn connects(&self, other: &Segment) -> bool {
        if self.layer == other.layer {
            return self.intersects(other);
        }
        let via_hits = |via: &Segment, wire: &Segment| {
            via.is_via() && (wire.layer == via.layer || wire.layer == via.layer + 1)
        };
        (via_hits(self, other) || via_hits(other, self)) && self.intersects_2d(other)
    }
}

fn on_segment(p: Point<f64>, a: Point<f64>, b: Point<f64>) -> bool {
    p.x >= a.x.min(b.x) - CHECK_TOLERANCE
        && p.x <= a.x.max(b.x) + CHECK_TOLERANCE
        && p.y >= a.y.min(b.y) - CHECK_TOLERANCE
        && p.y <= a.y.max(b.y) + CHECK_TOLERANCE
}

fn orientation(p: Point<f64>, q: Point<f64>, r: Point<f64>) -> i32 {
    let val = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);
    if val.abs() < CHECK_TOLERANCE {
        return 0;
    }
    if val > 0.0 { 1 } else { 2 }
}

#[derive(Hash, Eq, PartialEq, PartialOrd, Ord, Clone, Copy, Debug)]
struct BinKey {
    layer: u8,
    bx: i32,
    by: i32,
}

fn check_shorts(db: &DesignDB) -> Result<(), String> {
    let mut all_bin_entries: Vec<(BinKey, Segment)> = db
        .nets
        .par_iter()
        .enumerate()
        .flat_map(|(net_idx, net)| {
            let net_id = NetId::new(net_idx);
            let mut entries = Vec::new();
            for seg in &net.route_segments {
                let s = Segment {
                    p1: seg.p1,
                    p2: seg.p2,
                    layer: seg.layer,
                    net_id,
                };
                let start_bx = (s.p1.x.min(s.p2.x) / BIN_SIZE).floor() as i32;
                let end_bx = (s.p1.x.max(s.p2.x) / BIN_SIZE).floor() as i32;
                let start_by = (s.p1.y.min(s.p2.y) / BIN_SIZE).floor() as i32;
                let end_by = (s.p1.y.max(s.p2.y) / BIN_SIZE).floor() as i32;
                for bx in start_bx..=end_bx {
                    for by in start_by..=end_by {
                        entries.push((
                            BinKey {
                                layer: s.layer,
                                bx,
                                by,
                            },
                            s,
                        ));
                    }
                }
            }
            entries
        })
        .collect();

    all_bin_entries.par_sort_unstable_by(|a, b| a.0.cmp(&b.0));

    let mut chunks = Vec::new();
    if !all_bin_entries.is_empty() {
        let mut start = 0;
        for i in 1..all_bin_entries.len() {
            if all_bin_entries[i].0 != all_bin_entries[i - 1].0 {
                chunks.push((start, i));
                start = i;
            }
        }
        chunks.push((start, all_bin_entries.len()));
    }

    let first_error = FirstError::default();
    chunks.par_iter().for_each(|&(start, end)| {
        if first_error.is_set() {
            return;
        }
        let slice = &all_bin_entries[start..end];
        for i in 0..slice.len() {
            for j in (i + 1)..slice.len() {
                let s1 = &slice[i].1;
                let s2 = &slice[j].1;
                if s1.net_id != s2.net_id && s1.intersects(s2) {
                    let n1 = &db.nets[s1.net_id.index()].name;
                    let n2 = &db.nets[s2.net_id.index()].name;
                    first_error.set(format!(
                        "SHORT: '{}' vs '{}' on Layer {} near ({:.3},{:.3})",
                        n1, n2, s1.layer, s1.p1.x, s1.p1.y
                    ));
                    return;
                }
            }
        }
    });

    first_error.into_result()
}

fn check_opens(db: &DesignDB) -> Result<(), String> {
    let first_error = FirstError::default();

    db.nets.par_iter().enumerate().for_each(|(net_idx, net)| {
        if first_error.is_set() || net.status != NetStatus::Routed {
            return;
        }

        let segments: Vec<Segment> = net
            .route_segments
            .iter()
            .map(|s| Segment {
                p1: s.p1,
                p2: s.p2,
                layer: s.layer,
                net_id: NetId::new(net_idx),
            })
            .collect();

        let n = segments.len();
        let mut adj = vec![Vec::new(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                if segments[i].connects(&segments[j]) {
                    adj[i].push(j);
                    adj[j].push(i);
                }
            }
        }

        let touching = |p: Point<f64>, layer: u8| -> Option<usize> {
            segments.iter().position(|s| {
                let on_layer = s.layer == layer || (s.is_via() && s.layer + 1 == layer);
                on_layer && point_to_segment_dist(p, s.p1, s.p2) < CHECK_TOLERANCE
            })
        };

        for &seg_id in &net.segments {
            let raw = &db.segments[seg_id.index()];
            if raw.start == raw.end && raw.start_layer == raw.end_layer {
                continue;
            }
            let Some(a) = touching(raw.start, raw.start_layer) else {
                first_error.set(format!(
                    "Net '{}': terminal at ({:.3},{:.3}) not connected to any wire.",
                    net.name, raw.start.x, raw.start.y
                ));
                return;
            };
            let Some(b) = touching(raw.end, raw.end_layer) else {
                first_error.set(format!(
                    "Net '{}': terminal at ({:.3},{:.3}) not connected to any wire.",
                    net.name, raw.end.x, raw.end.y
                ));
                return;
            };
            if !reachable(&adj, a, b) {
                first_error.set(format!(
                    "Net '{}': Broken connectivity between ({:.3},{:.3}) and ({:.3},{:.3}).",
                    net.name, raw.start.x, raw.start.y, raw.end.x, raw.end.y
                ));
                return;
            }
        }
    });

    first_error.into_result()
}

fn reachable(adj: &[Vec<usize>], from: usize, to: usize) -> bool {
    let mut visited = vec![false; adj.len()];
    let mut queue = VecDeque::new();
    visited[from] = true;
    queue.push_back(from);
    while let Some(u) = queue.pop_front() {
        if u == to {
            return true;
        }
        for &v in &adj[u] {
            if !visited[v] {
                visited[v] = true;
                queue.push_back(v);
            }
        }
    }
    false
}

fn point_to_segment_dist(p: Point<f64>, a: Point<f64>, b: Point<f64>) -> f64 {
    let l2 = (a.x - b.x).powi(2) + (a.y - b.y).powi(2);
    if l2 == 0.0 {
        return ((p.x - a.x).powi(2) + (p.y - a.y).powi(2)).sqrt();
    }

    let t = ((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / l2;
    let t = t.clamp(0.0, 1.0);

    let proj_x = a.x + t * (b.x - a.x);
    let proj_y = a.y + t * (b.y - a.y);

    ((p.x - proj_x).powi(2) + (p.y - proj_y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::core::RouteSegment;

    fn wire(layer: u8, x1: f64, y1: f64, x2: f64, y2: f64) -> RouteSegment {
        RouteSegment {
            layer,
            p1: Point::new(x1, y1),
            p2: Point::new(x2, y2),
        }
    }

    fn two_net_design() -> DesignDB {
        let mut db = DesignDB::new();
        db.add_layer("M1".to_string());
        db.add_layer("M2".to_string());
        let a = db.add_net("a".to_string());
        let b = db.add_net("b".to_string());
        db.add_segment(a, Point::new(0.0, 0.0), 0, Point::new(30.0, 30.0), 1);
        db.add_segment(b, Point::new(0.0, 50.0), 0, Point::new(30.0, 50.0), 0);
        db
    }

    #[test]
    fn connected_wiring_passes() {
        let mut db = two_net_design();
        db.nets[0].status = NetStatus::Routed;
        db.nets[0].route_segments = vec![
            wire(0, 0.0, 0.0, 30.0, 0.0),
            wire(0, 30.0, 0.0, 30.0, 0.0),
            wire(1, 30.0, 0.0, 30.0, 30.0),
        ];
        db.nets[1].status = NetStatus::Routed;
        db.nets[1].route_segments = vec![wire(0, 0.0, 50.0, 30.0, 50.0)];
        assert!(run(&db).is_ok());
    }

    #[test]
    fn missing_via_is_an_open() {
        let mut db = two_net_design();
        db.nets[0].status = NetStatus::Routed;
        db.nets[0].route_segments = vec![
            wire(0, 0.0, 0.0, 30.0, 0.0),
            wire(1, 30.0, 0.0, 30.0, 30.0),
        ];
        let err = check_opens(&db).unwrap_err();
        assert!(err.contains("Broken connectivity"));
    }

    #[test]
    fn crossing_nets_are_a_short() {
        let mut db = two_net_design();
        db.nets[0].route_segments = vec![wire(0, 10.0, 40.0, 10.0, 60.0)];
        db.nets[1].route_segments = vec![wire(0, 0.0, 50.0, 30.0, 50.0)];
        let err = check_shorts(&db).unwrap_err();
        assert!(err.contains("SHORT"));
    }

    #[test]
    fn unrouted_nets_are_not_checked_for_opens() {
        let db = two_net_design();
        assert!(check_opens(&db).is_ok());
    }
}
