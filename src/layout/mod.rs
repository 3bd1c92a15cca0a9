// ============================================================================
// LAYOUT MODE — millimeter-accurate circle placement on a physical board
// ============================================================================

pub mod curve;
pub mod grid;
pub mod guide;
pub mod patterns;

use serde::{Deserialize, Serialize};

use crate::artboard::CellColor;

use self::grid::CircleGrid;

pub const INCH_TO_MM: f64 = 25.4;

/// One placed element: a center in board millimeters plus its color token.
/// The collection is an unordered list; the minimum center-to-center
/// distance (`step = diameter + separation`) is enforced at insertion time,
/// never retroactively.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub color: CellColor,
}

impl Circle {
    pub fn new(x: f64, y: f64, color: CellColor) -> Self {
        Self { x, y, color }
    }
}

/// Collision-checked placement: on acceptance the circle is appended to the
/// list and indexed in the grid. Returns whether it was placed.
pub fn try_place(
    circles: &mut Vec<Circle>,
    grid: &mut CircleGrid,
    x: f64,
    y: f64,
    step: f64,
    color: CellColor,
) -> bool {
    if !grid.try_insert(x, y, step) {
        return false;
    }
    circles.push(Circle::new(x, y, color));
    true
}

/// Extend a freehand stroke to the current pointer position. Circles are
/// interpolated at exact `step` spacing along the line from the last
/// accepted circle; the segment stops early at the first rejected
/// (colliding) candidate. `last` is the stroke's running anchor — `None`
/// starts a new stroke at the pointer.
pub fn freehand_stroke(
    circles: &mut Vec<Circle>,
    grid: &mut CircleGrid,
    last: &mut Option<(f64, f64)>,
    target: (f64, f64),
    step: f64,
    color: CellColor,
) {
    if step <= 0.0 {
        return;
    }

    let Some((lx, ly)) = *last else {
        if try_place(circles, grid, target.0, target.1, step, color) {
            *last = Some(target);
        }
        return;
    };

    let dx = target.0 - lx;
    let dy = target.1 - ly;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist < step {
        return;
    }

    let unit_x = dx / dist;
    let unit_y = dy / dist;
    let count = (dist / step).floor() as usize;
    for i in 1..=count {
        let x = lx + unit_x * i as f64 * step;
        let y = ly + unit_y * i as f64 * step;
        if try_place(circles, grid, x, y, step, color) {
            *last = Some((x, y));
        } else {
            break;
        }
    }
}

/// Remove every circle within `radius` of `center`. Returns how many were
/// removed; the caller decides when the grid gets rebuilt (immediately for
/// large removals, lazily on pointer release otherwise).
pub fn erase_circles(circles: &mut Vec<Circle>, center: (f64, f64), radius: f64) -> usize {
    let radius_sq = radius * radius;
    let before = circles.len();
    circles.retain(|c| {
        let dx = c.x - center.0;
        let dy = c.y - center.1;
        dx * dx + dy * dy > radius_sq
    });
    before - circles.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::colors::Rgb;

    fn white() -> CellColor {
        CellColor::Paint(Rgb::WHITE)
    }

    #[test]
    fn test_freehand_interpolates_at_step_spacing() {
        let step = 10.0;
        let mut circles = Vec::new();
        let mut grid = CircleGrid::new(step);
        let mut last = None;

        freehand_stroke(&mut circles, &mut grid, &mut last, (0.0, 0.0), step, white());
        assert_eq!(circles.len(), 1);

        // A long pointer jump lays down evenly spaced circles along the line.
        freehand_stroke(&mut circles, &mut grid, &mut last, (35.0, 0.0), step, white());
        assert_eq!(circles.len(), 4); // 0, 10, 20, 30
        assert_eq!(last, Some((30.0, 0.0)));

        // A short move below step adds nothing.
        freehand_stroke(&mut circles, &mut grid, &mut last, (37.0, 0.0), step, white());
        assert_eq!(circles.len(), 4);
    }

    #[test]
    fn test_freehand_stops_segment_on_collision() {
        let step = 10.0;
        let mut circles = vec![Circle::new(20.0, 0.0, white())];
        let mut grid = CircleGrid::new(step);
        grid.rebuild(&circles, step);
        let mut last = None;

        freehand_stroke(&mut circles, &mut grid, &mut last, (0.0, 0.0), step, white());
        // (10,0) is exactly step from both neighbors and is accepted; the
        // blocked candidate at (20,0) ends the segment.
        freehand_stroke(&mut circles, &mut grid, &mut last, (45.0, 0.0), step, white());
        assert_eq!(last, Some((10.0, 0.0)));
        assert_eq!(circles.len(), 3);
    }

    #[test]
    fn test_eraser_radius() {
        let mut circles = vec![
            Circle::new(0.0, 0.0, white()),
            Circle::new(5.0, 0.0, white()),
            Circle::new(20.0, 0.0, white()),
        ];
        let removed = erase_circles(&mut circles, (0.0, 0.0), 6.0);
        assert_eq!(removed, 2);
        assert_eq!(circles.len(), 1);
        assert_eq!(circles[0].x, 20.0);

        // Erasing empty space is a silent no-op.
        assert_eq!(erase_circles(&mut circles, (100.0, 100.0), 6.0), 0);
    }

    #[test]
    fn test_circle_serializes_with_color_token() {
        let circle = Circle::new(1.5, 2.5, CellColor::Mask);
        let json = serde_json::to_string(&circle).unwrap();
        assert_eq!(json, r#"{"x":1.5,"y":2.5,"color":"mask"}"#);
        let back: Circle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, circle);
    }
}
