use crate::engine::job::{Job, OutputSink};
use crate::engine::status::FailureKind;
use crate::route::RouteStep;
use crate::task::{Anchor, PinEnd};
use crate::utils::conversion::GridConverter;
use regroute_common::db::core::{DesignDB, NetStatus, RouteSegment};
use regroute_common::db::indices::NetId;
use regroute_common::geom::coord::GridCoord;
use regroute_common::geom::point::Point;

/// Writes applied jobs into the design as host-unit wires and vias.
/// Pin anchors get a short stub from the exact terminal to its grid cell.
pub struct DesignSink<'a> {
    db: &'a mut DesignDB,
    converter: &'a GridConverter,
}

impl<'a> DesignSink<'a> {
    pub fn new(db: &'a mut DesignDB, converter: &'a GridConverter) -> Self {
        Self { db, converter }
    }

    fn wire(layer: u8, p1: Point<f64>, p2: Point<f64>, out: &mut Vec<RouteSegment>) {
        if p1 != p2 {
            out.push(RouteSegment { layer, p1, p2 });
        }
    }

    fn via_stack(low: u8, high: u8, at: Point<f64>, out: &mut Vec<RouteSegment>) {
        for layer in low..high {
            out.push(RouteSegment {
                layer,
                p1: at,
                p2: at,
            });
        }
    }

    fn pin_stub(&self, anchor: Anchor, cell: GridCoord, out: &mut Vec<RouteSegment>) {
        let Anchor::Pin { segment, end } = anchor else {
            return;
        };
        let raw = &self.db.segments[segment.index()];
        let (pin, pin_layer) = match end {
            PinEnd::Start => (raw.start, raw.start_layer),
            PinEnd::End => (raw.end, raw.end_layer),
        };
        let snapped = self.converter.to_world(cell);
        let corner = Point::new(snapped.x, pin.y);
        Self::wire(cell.z, pin, corner, out);
        Self::wire(cell.z, corner, snapped, out);
        if pin_layer != cell.z {
            Self::via_stack(pin_layer.min(cell.z), pin_layer.max(cell.z), pin, out);
        }
    }

    fn segments_for(&self, job: &Job) -> (NetId, Vec<RouteSegment>) {
        let mut out = Vec::new();
        match job {
            Job::Route { task, route } => {
                self.pin_stub(task.start_anchor, task.start, &mut out);
                for step in route.steps() {
                    match step {
                        RouteStep::Wire { from, to } => Self::wire(
                            from.z,
                            self.converter.to_world(from),
                            self.converter.to_world(to),
                            &mut out,
                        ),
                        RouteStep::Via { x, y, low, high } => Self::via_stack(
                            low,
                            high,
                            self.converter.to_world(GridCoord::new(x, y, low)),
                            &mut out,
                        ),
                    }
                }
                self.pin_stub(task.end_anchor, task.end, &mut out);
                (task.net, out)
            }
            Job::Bridge { net, pair } => {
                Self::wire(
                    pair.layer(),
                    self.converter.to_world(pair.inner),
                    self.converter.to_world(pair.outer),
                    &mut out,
                );
                (*net, out)
            }
        }
    }
}

impl OutputSink for DesignSink<'_> {
    fn materialize(&mut self, job: &Job) {
        let (net, segments) = self.segments_for(job);
        self.db.nets[net.index()].route_segments.extend(segments);
    }

    fn net_failed(&mut self, net: NetId, kind: FailureKind) {
        let data = &mut self.db.nets[net.index()];
        data.status = match kind {
            FailureKind::NotReached => NetStatus::NotReached,
            FailureKind::NoHandoff | FailureKind::NoPath => NetStatus::Unroutable,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Route;
    use crate::task::{ConnectionPoints, RawTask, Task};
    use regroute_common::geom::rect::Rect;

    fn design() -> (DesignDB, GridConverter) {
        let mut db = DesignDB::new();
        db.die_area = Rect::new(Point::new(0.0, 0.0), Point::new(30.0, 30.0));
        db.add_layer("M1".to_string());
        db.add_layer("M2".to_string());
        let net = db.add_net("a".to_string());
        db.add_segment(net, Point::new(1.0, 0.0), 1, Point::new(9.0, 0.0), 0);
        let conv = GridConverter::for_die(&db.die_area, 3.0, 0.0);
        (db, conv)
    }

    #[test]
    fn route_job_gets_pin_stubs_and_vias() {
        let (mut db, conv) = design();
        let seg = db.segments[0].clone();
        let task = Task::from_raw(&RawTask {
            net: seg.net,
            segment: seg.id,
            start: conv.to_grid(seg.start, 0),
            end: conv.to_grid(seg.end, 0),
        });
        let route = Route::new(
            seg.net,
            vec![
                GridCoord::new(0, 0, 0),
                GridCoord::new(1, 0, 0),
                GridCoord::new(2, 0, 0),
                GridCoord::new(3, 0, 0),
            ],
        );
        let mut sink = DesignSink::new(&mut db, &conv);
        sink.materialize(&Job::Route { task, route });

        let segs = &db.nets[0].route_segments;
        // stub (1,0)->(0,0) on M1, via at the pin up to M2, trunk to (9,0)
        assert!(segs.contains(&RouteSegment {
            layer: 0,
            p1: Point::new(1.0, 0.0),
            p2: Point::new(0.0, 0.0)
        }));
        assert!(segs.contains(&RouteSegment {
            layer: 0,
            p1: Point::new(1.0, 0.0),
            p2: Point::new(1.0, 0.0)
        }));
        assert!(segs.contains(&RouteSegment {
            layer: 0,
            p1: Point::new(0.0, 0.0),
            p2: Point::new(9.0, 0.0)
        }));
        assert_eq!(segs.len(), 3);
    }

    #[test]
    fn bridge_and_failure() {
        let (mut db, conv) = design();
        let pair = ConnectionPoints::new(GridCoord::new(1, 1, 1), GridCoord::new(1, 2, 1)).unwrap();
        let mut sink = DesignSink::new(&mut db, &conv);
        sink.materialize(&Job::Bridge {
            net: NetId::new(0),
            pair,
        });
        sink.net_failed(NetId::new(0), FailureKind::NotReached);
        assert_eq!(
            db.nets[0].route_segments,
            vec![RouteSegment {
                layer: 1,
                p1: Point::new(3.0, 3.0),
                p2: Point::new(3.0, 6.0)
            }]
        );
        assert_eq!(db.nets[0].status, NetStatus::NotReached);
    }
}
