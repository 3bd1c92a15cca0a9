// ============================================================================
// CURVE TOOL — piecewise cubic Bezier path with arc-length circle sampling
// ============================================================================

use crate::artboard::CellColor;

use super::grid::CircleGrid;
use super::{try_place, Circle};

/// One path anchor in board millimeters. `h1` shapes the curve arriving at
/// `p`, `h2` the curve leaving it.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CurvePoint {
    pub p: (f64, f64),
    pub h1: (f64, f64),
    pub h2: (f64, f64),
}

/// The in-progress or finalized Bezier path. Not part of history snapshots:
/// filling it commits circles and clears the path.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct CurvePath {
    pub points: Vec<CurvePoint>,
    pub closed: bool,
    pub finalized: bool,
}

impl CurvePath {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.closed = false;
        self.finalized = false;
    }

    /// Add an anchor at `coords`. The incoming handle mirrors the previous
    /// anchor's outgoing handle so consecutive segments join smoothly.
    pub fn push_anchor(&mut self, coords: (f64, f64)) {
        let mut point = CurvePoint {
            p: coords,
            h1: coords,
            h2: coords,
        };
        if let Some(prev) = self.points.last() {
            point.h1 = (2.0 * prev.p.0 - prev.h2.0, 2.0 * prev.p.1 - prev.h2.1);
        }
        self.points.push(point);
    }

    /// While the newest anchor is being dragged: the drag position becomes
    /// its outgoing handle, and the incoming handle is kept as the
    /// reflection through the anchor.
    pub fn drag_handle(&mut self, coords: (f64, f64)) {
        if let Some(point) = self.points.last_mut() {
            point.h2 = coords;
            point.h1 = (2.0 * point.p.0 - coords.0, 2.0 * point.p.1 - coords.1);
        }
    }

    /// Finalize as open or closed. Paths with fewer than two anchors are
    /// discarded. Returns whether the path survived.
    pub fn finalize(&mut self, close: bool) -> bool {
        if self.points.len() < 2 {
            self.clear();
            return false;
        }
        self.finalized = true;
        self.closed = close;
        true
    }

    /// Segment anchor pairs, including the wrap-around segment when closed.
    fn segments(&self) -> Vec<(CurvePoint, CurvePoint)> {
        let mut segs: Vec<(CurvePoint, CurvePoint)> = self
            .points
            .windows(2)
            .map(|w| (w[0], w[1]))
            .collect();
        if self.closed && self.points.len() > 1 {
            segs.push((*self.points.last().unwrap(), self.points[0]));
        }
        segs
    }
}

/// Point on the cubic Bezier from `p0` to `p1` at parameter `t`, using
/// `p0.h2` and `p1.h1` as control points.
pub fn bezier_point(t: f64, p0: &CurvePoint, p1: &CurvePoint) -> (f64, f64) {
    let (x0, y0) = p0.p;
    let (x1, y1) = p0.h2;
    let (x2, y2) = p1.h1;
    let (x3, y3) = p1.p;
    let u = 1.0 - t;
    let x = u.powi(3) * x0 + 3.0 * u * u * t * x1 + 3.0 * u * t * t * x2 + t.powi(3) * x3;
    let y = u.powi(3) * y0 + 3.0 * u * u * t * y1 + 3.0 * u * t * t * y2 + t.powi(3) * y3;
    (x, y)
}

/// Walk the path and place circles at uniform `step` arc-length spacing,
/// each subject to the grid's collision acceptance. Uses an adaptive
/// parametric step and back-interpolates whenever the accumulated chord
/// distance overshoots `step`, so spacing stays uniform regardless of how
/// fast the curve moves through parameter space. Returns the number of
/// circles placed.
pub fn sample_into(
    path: &CurvePath,
    circles: &mut Vec<Circle>,
    grid: &mut CircleGrid,
    step: f64,
    color: CellColor,
) -> usize {
    let segments = path.segments();
    if segments.is_empty() || step <= 0.01 {
        return 0;
    }

    let mut placed = 0;

    // The path's very first anchor gets a circle too.
    let start = segments[0].0.p;
    if try_place(circles, grid, start.0, start.1, step, color) {
        placed += 1;
    }
    let mut last_placed = start;

    for (p0, p1) in &segments {
        // Coarse chord estimate picks the parametric resolution: curvier or
        // longer segments get a finer dt.
        let chord = ((p1.p.0 - p0.p.0).powi(2) + (p1.p.1 - p0.p.1).powi(2)).sqrt();
        let dt = (1.0 / (chord * 2.0)).min(0.005);
        if !dt.is_finite() || dt <= 0.0 {
            continue;
        }

        let mut t = 0.0;
        let mut last_check = p0.p;
        while t < 1.0 {
            t += dt;
            let current = bezier_point(t.min(1.0), p0, p1);
            let dx = current.0 - last_placed.0;
            let dy = current.1 - last_placed.1;
            let dist = (dx * dx + dy * dy).sqrt();

            if dist >= step {
                // Back-interpolate to land exactly `step` from the last
                // placed circle.
                let overshoot = dist - step;
                let ratio = overshoot / dist;
                let point = (current.0 - dx * ratio, current.1 - dy * ratio);

                if try_place(circles, grid, point.0, point.1, step, color) {
                    placed += 1;
                }
                last_placed = point;

                // Rewind t to account for the part of this dt we gave back.
                let hop = ((current.0 - last_check.0).powi(2)
                    + (current.1 - last_check.1).powi(2))
                .sqrt();
                if hop > 0.0 {
                    let traveled = (dist - overshoot) / hop;
                    t = t - dt + dt * traveled;
                }
            }
            last_check = current;
        }
    }

    placed
}
