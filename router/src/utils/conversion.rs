use regroute_common::geom::coord::GridCoord;
use regroute_common::geom::point::Point;
use regroute_common::geom::rect::Rect;

/// Scaling and offset between host units and routing-array indices.
#[derive(Clone, Debug)]
pub struct GridConverter {
    scale_x: f64,
    scale_y: f64,
    offset_x: f64,
    offset_y: f64,
    grid_w: u32,
    grid_h: u32,
}

impl GridConverter {
    pub fn from_steps(
        step_x: f64,
        step_y: f64,
        off_x: f64,
        off_y: f64,
        grid_w: u32,
        grid_h: u32,
    ) -> Self {
        Self {
            scale_x: 1.0 / step_x,
            scale_y: 1.0 / step_y,
            offset_x: off_x,
            offset_y: off_y,
            grid_w,
            grid_h,
        }
    }

    /// One grid step per `pitch` host units, with `margin` units of routing
    /// space on every side of the die.
    pub fn for_die(die: &Rect, pitch: f64, margin: f64) -> Self {
        let pitch = if pitch > 0.0 { pitch } else { 1.0 };
        let margin = margin.max(0.0);
        let grid_w = ((die.width() + 2.0 * margin) / pitch).ceil().max(0.0) as u32 + 1;
        let grid_h = ((die.height() + 2.0 * margin) / pitch).ceil().max(0.0) as u32 + 1;
        Self::from_steps(
            pitch,
            pitch,
            die.min.x - margin,
            die.min.y - margin,
            grid_w,
            grid_h,
        )
    }

    pub fn width(&self) -> u32 {
        self.grid_w
    }

    pub fn height(&self) -> u32 {
        self.grid_h
    }

    pub fn to_grid(&self, p: Point<f64>, layer: u8) -> GridCoord {
        let raw_x = (p.x - self.offset_x) * self.scale_x;
        let raw_y = (p.y - self.offset_y) * self.scale_y;

        let x = raw_x.round().max(0.0).min(self.grid_w.saturating_sub(1) as f64) as u32;
        let y = raw_y.round().max(0.0).min(self.grid_h.saturating_sub(1) as f64) as u32;

        GridCoord::new(x, y, layer)
    }

    pub fn to_world(&self, g: GridCoord) -> Point<f64> {
        Point::new(
            (g.x as f64 / self.scale_x) + self.offset_x,
            (g.y as f64 / self.scale_y) + self.offset_y,
        )
    }

    /// Host-unit rectangle covered by the whole routing array.
    pub fn world_bounds(&self) -> Rect {
        let max = self.to_world(GridCoord::new(
            self.grid_w.saturating_sub(1),
            self.grid_h.saturating_sub(1),
            0,
        ));
        Rect::new(Point::new(self.offset_x, self.offset_y), max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn die_gets_margin_on_every_side() {
        let die = Rect::new(Point::new(0.0, 0.0), Point::new(30.0, 15.0));
        let conv = GridConverter::for_die(&die, 3.0, 6.0);
        assert_eq!(conv.width(), 15);
        assert_eq!(conv.height(), 10);
        assert_eq!(conv.to_grid(Point::new(0.0, 0.0), 1), GridCoord::new(2, 2, 1));
        assert_eq!(conv.to_world(GridCoord::new(2, 2, 0)), Point::new(0.0, 0.0));
    }

    #[test]
    fn points_outside_are_clamped() {
        let die = Rect::new(Point::new(0.0, 0.0), Point::new(9.0, 9.0));
        let conv = GridConverter::for_die(&die, 3.0, 0.0);
        assert_eq!(conv.to_grid(Point::new(-50.0, 100.0), 0), GridCoord::new(0, 3, 0));
        assert_eq!(conv.to_grid(Point::new(4.0, 5.0), 0), GridCoord::new(1, 2, 0));
    }
}
