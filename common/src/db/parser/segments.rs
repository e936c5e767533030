use crate::db::core::DesignDB;
use crate::geom::point::Point;
use crate::geom::rect::Rect;
use anyhow::{Context, Result, anyhow, bail};
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Reads a segment list:
///
/// ```text
/// DIE   x1 y1 x2 y2
/// LAYER M1
/// BLOCK M1 x1 y1 x2 y2
/// SEG   net x1 y1 M1 x2 y2 M2
/// ```
pub fn parse(db: &mut DesignDB, filename: &str) -> Result<()> {
    let file = File::open(filename).context(format!("Failed to open segment file: {}", filename))?;
    parse_reader(db, BufReader::new(file))
}

pub fn parse_str(db: &mut DesignDB, text: &str) -> Result<()> {
    parse_reader(db, text.as_bytes())
}

fn parse_reader<R: BufRead>(db: &mut DesignDB, reader: R) -> Result<()> {
    let mut die_seen = false;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        let res = match parts[0] {
            "DIE" => {
                let v = parse_floats(&parts[1..], 4)?;
                db.die_area = Rect::new(Point::new(v[0], v[1]), Point::new(v[2], v[3]));
                die_seen = true;
                Ok(())
            }
            "LAYER" => {
                let name = parts.get(1).ok_or_else(|| anyhow!("LAYER without name"))?;
                db.add_layer(name.to_string());
                Ok(())
            }
            "BLOCK" => parse_block(db, &parts[1..]),
            "SEG" => parse_seg(db, &parts[1..]),
            other => Err(anyhow!("unknown record '{}'", other)),
        };
        res.with_context(|| format!("line {}: '{}'", line_no + 1, line))?;
    }

    if !die_seen {
        bail!("segment file has no DIE record");
    }
    if db.layers.is_empty() {
        log::warn!("No LAYER records. Assuming a two-layer stack (M1, M2).");
        db.add_layer("M1".to_string());
        db.add_layer("M2".to_string());
    }
    let outside = db
        .segments
        .iter()
        .filter(|s| !db.die_area.contains(s.start) || !db.die_area.contains(s.end))
        .count();
    if outside > 0 {
        log::warn!("{} segments have a terminal outside the die area.", outside);
    }
    log::info!(
        "Loaded {} segments on {} nets ({} layers, {} blockages)",
        db.num_segments(),
        db.num_nets(),
        db.layers.len(),
        db.blockages.len()
    );
    Ok(())
}

fn parse_block(db: &mut DesignDB, parts: &[&str]) -> Result<()> {
    if parts.len() != 5 {
        bail!("BLOCK expects a layer and 4 coordinates");
    }
    let layer = resolve_layer(db, parts[0])?;
    let v = parse_floats(&parts[1..], 4)?;
    db.add_blockage(
        layer,
        Rect::new(
            Point::new(v[0].min(v[2]), v[1].min(v[3])),
            Point::new(v[0].max(v[2]), v[1].max(v[3])),
        ),
    );
    Ok(())
}

fn parse_seg(db: &mut DesignDB, parts: &[&str]) -> Result<()> {
    if parts.len() != 7 {
        bail!("SEG expects: net x1 y1 layer1 x2 y2 layer2");
    }
    let start = parse_floats(&parts[1..3], 2)?;
    let start_layer = resolve_layer(db, parts[3])?;
    let end = parse_floats(&parts[4..6], 2)?;
    let end_layer = resolve_layer(db, parts[6])?;

    let net = db.add_net(parts[0].to_string());
    db.add_segment(
        net,
        Point::new(start[0], start[1]),
        start_layer,
        Point::new(end[0], end[1]),
        end_layer,
    );
    Ok(())
}

fn resolve_layer(db: &DesignDB, token: &str) -> Result<u8> {
    if let Some(&idx) = db.layer_name_map.get(token) {
        return Ok(idx);
    }
    token
        .parse::<u8>()
        .map_err(|_| anyhow!("unknown layer '{}'", token))
}

fn parse_floats(parts: &[&str], count: usize) -> Result<Vec<f64>> {
    if parts.len() < count {
        bail!("expected {} numbers, found {}", count, parts.len());
    }
    parts[..count]
        .iter()
        .map(|p| {
            p.parse::<f64>()
                .map_err(|_| anyhow!("invalid number '{}'", p))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# two nets
DIE 0 0 300 200
LAYER M1
LAYER M2
BLOCK M2 10 10 40 20
SEG a 5 5 M1 250 150 M2
SEG a 250 150 M2 260 20 M1
SEG b 100 100 0 120 180 1
";

    #[test]
    fn parses_all_record_kinds() {
        let mut db = DesignDB::new();
        parse_str(&mut db, SAMPLE).unwrap();
        assert_eq!(db.die_area.width(), 300.0);
        assert_eq!(db.layers.len(), 2);
        assert_eq!(db.blockages.len(), 1);
        assert_eq!(db.blockages[0].layer, 1);
        assert_eq!(db.num_segments(), 3);
        assert_eq!(db.num_nets(), 2);
        assert_eq!(db.nets[0].segments.len(), 2);
        assert_eq!(db.segments[2].end_layer, 1);
    }

    #[test]
    fn rejects_unknown_layer() {
        let mut db = DesignDB::new();
        let err = parse_str(&mut db, "DIE 0 0 10 10\nLAYER M1\nSEG a 1 1 M9 2 2 M1\n");
        assert!(err.is_err());
    }

    #[test]
    fn requires_die() {
        let mut db = DesignDB::new();
        assert!(parse_str(&mut db, "LAYER M1\n").is_err());
    }
}
