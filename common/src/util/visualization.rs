use crate::db::core::{DesignDB, NetStatus};
use crate::geom::rect::Rect;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

/// Renders region outlines, blockages, routed wires and terminals into a PNG.
/// Terminals of nets that did not route are drawn red.
pub fn draw_routed_design(
    db: &DesignDB,
    regions: &[Rect],
    filename: &str,
    width: u32,
    height: u32,
) {
    let w = width.max(16);
    let h = height.max(16);
    let mut img = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]));

    let mut bounds = db.die_area;
    for r in regions {
        bounds.min.x = bounds.min.x.min(r.min.x);
        bounds.min.y = bounds.min.y.min(r.min.y);
        bounds.max.x = bounds.max.x.max(r.max.x);
        bounds.max.y = bounds.max.y.max(r.max.y);
    }
    if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return;
    }

    let scale_x = w as f64 / bounds.width();
    let scale_y = h as f64 / bounds.height();
    let map = |x: f64, y: f64| {
        (
            (x - bounds.min.x) * scale_x,
            (h as f64 - (y - bounds.min.y) * scale_y),
        )
    };
    let to_image_rect = |r: &Rect| {
        let (x, y_bot) = map(r.min.x, r.min.y);
        let rw = (r.width() * scale_x).max(1.0);
        let rh = (r.height() * scale_y).max(1.0);
        ImageRect::at(x as i32, (y_bot - rh) as i32).of_size(rw as u32, rh as u32)
    };

    draw_hollow_rect_mut(&mut img, to_image_rect(&db.die_area), Rgba([90, 90, 90, 255]));
    for r in regions {
        draw_hollow_rect_mut(&mut img, to_image_rect(r), Rgba([60, 60, 120, 255]));
    }
    for b in &db.blockages {
        draw_filled_rect_mut(&mut img, to_image_rect(&b.rect), Rgba([70, 35, 35, 255]));
    }

    let colors = [
        // M1 (Horizontal): Blue
        Rgba([0, 110, 255, 255]),
        // M2 (Vertical): Red
        Rgba([255, 20, 80, 255]),
        // M3 (Horizontal): Green
        Rgba([0, 255, 100, 255]),
        // M4 (Vertical): Gold
        Rgba([255, 215, 0, 255]),
        // M5 (Horizontal): Violet
        Rgba([180, 50, 255, 255]),
        // M6 (Vertical): Cyan
        Rgba([0, 240, 255, 255]),
    ];

    let mut segments: Vec<_> = db
        .nets
        .iter()
        .flat_map(|n| n.route_segments.iter())
        .collect();
    segments.sort_by_key(|s| s.layer);

    for seg in segments {
        let (x1, y1) = map(seg.p1.x, seg.p1.y);
        let (x2, y2) = map(seg.p2.x, seg.p2.y);
        if seg.is_via() {
            let rect = ImageRect::at(x1 as i32 - 1, y1 as i32 - 1).of_size(3, 3);
            draw_filled_rect_mut(&mut img, rect, Rgba([255, 255, 255, 200]));
        } else {
            let color = colors[(seg.layer as usize).min(colors.len() - 1)];
            draw_line_segment_mut(
                &mut img,
                (x1 as f32, y1 as f32),
                (x2 as f32, y2 as f32),
                color,
            );
        }
    }

    for seg in &db.segments {
        let failed = db.nets[seg.net.index()].status != NetStatus::Routed;
        let color = if failed {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        };
        for p in [seg.start, seg.end] {
            let (px, py) = map(p.x, p.y);
            let rect = ImageRect::at(px as i32 - 1, py as i32 - 1).of_size(2, 2);
            draw_filled_rect_mut(&mut img, rect, color);
        }
    }

    if let Err(e) = img.save(Path::new(filename)) {
        log::warn!("Failed to write image {}: {}", filename, e);
    }
}
