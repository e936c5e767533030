use crate::db::core::DesignDB;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Writes every net with its final status and materialized wires.
pub fn save_routes(db: &DesignDB, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut out = BufWriter::new(file);
    write_routes(db, &mut out)?;
    out.flush()
}

pub fn write_routes<W: Write>(db: &DesignDB, out: &mut W) -> std::io::Result<()> {
    writeln!(
        out,
        "DIE {} {} {} {}",
        db.die_area.min.x, db.die_area.min.y, db.die_area.max.x, db.die_area.max.y
    )?;
    for layer in &db.layers {
        writeln!(out, "LAYER {}", layer.name)?;
    }

    for net in &db.nets {
        writeln!(out, "NET {} {}", net.name, net.status.label())?;
        for seg in &net.route_segments {
            let layer_name = db.layer_name(seg.layer);
            if seg.is_via() {
                writeln!(
                    out,
                    "  VIA {} {} {:.3} {:.3}",
                    layer_name,
                    db.layer_name(seg.layer + 1),
                    seg.p1.x,
                    seg.p1.y
                )?;
            } else {
                writeln!(
                    out,
                    "  WIRE {} {:.3} {:.3} {:.3} {:.3}",
                    layer_name, seg.p1.x, seg.p1.y, seg.p2.x, seg.p2.y
                )?;
            }
        }
        writeln!(out, "END")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::core::{NetStatus, RouteSegment};
    use crate::geom::point::Point;

    #[test]
    fn writes_wires_vias_and_status() {
        let mut db = DesignDB::new();
        db.add_layer("M1".to_string());
        db.add_layer("M2".to_string());
        let net = db.add_net("n1".to_string());
        let data = &mut db.nets[net.index()];
        data.status = NetStatus::Routed;
        data.route_segments.push(RouteSegment {
            layer: 0,
            p1: Point::new(0.0, 0.0),
            p2: Point::new(3.0, 0.0),
        });
        data.route_segments.push(RouteSegment {
            layer: 0,
            p1: Point::new(3.0, 0.0),
            p2: Point::new(3.0, 0.0),
        });
        db.add_net("n2".to_string());

        let mut buf = Vec::new();
        write_routes(&db, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("NET n1 ROUTED"));
        assert!(text.contains("  WIRE M1 0.000 0.000 3.000 0.000"));
        assert!(text.contains("  VIA M1 M2 3.000 0.000"));
        assert!(text.contains("NET n2 PENDING"));
    }
}
