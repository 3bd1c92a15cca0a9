// ============================================================================
// SELECTION ENGINE — polygon lasso, lift/stamp, internal clipboard
// ============================================================================

use std::collections::HashMap;

use crate::artboard::{Artboard, Bounds, CellColor, BACKGROUND};
use crate::viewport::GridViewport;

/// Even-odd ray-casting point-in-polygon test. The polygon is implicitly
/// closed; vertices are artboard cell coordinates.
pub fn point_in_polygon(x: i32, y: i32, polygon: &[(i32, i32)]) -> bool {
    if polygon.is_empty() {
        return false;
    }
    let (px, py) = (x as f64, y as f64);
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].0 as f64, polygon[i].1 as f64);
        let (xj, yj) = (polygon[j].0 as f64, polygon[j].1 as f64);
        let crosses =
            ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi);
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// A finalized lasso selection: the polygon path in absolute coordinates,
/// its bounding box, and a snapshot of the covered colored cells keyed
/// relative to the bounding box origin. The snapshot never contains
/// background entries.
#[derive(Clone, PartialEq, Debug)]
pub struct Selection {
    pub path: Vec<(i32, i32)>,
    pub bounds: Bounds,
    pub pixels: HashMap<(i32, i32), CellColor>,
}

impl Selection {
    /// Finalize a lasso path into a selection. Paths with fewer than three
    /// vertices are discarded silently.
    pub fn from_lasso(path: Vec<(i32, i32)>, board: &Artboard) -> Option<Selection> {
        if path.len() < 3 {
            return None;
        }

        let mut bounds = Bounds {
            min_x: path[0].0,
            min_y: path[0].1,
            max_x: path[0].0,
            max_y: path[0].1,
        };
        for &(x, y) in &path {
            bounds.min_x = bounds.min_x.min(x);
            bounds.min_y = bounds.min_y.min(y);
            bounds.max_x = bounds.max_x.max(x);
            bounds.max_y = bounds.max_y.max(y);
        }

        let mut pixels = HashMap::new();
        for y in bounds.min_y..=bounds.max_y {
            for x in bounds.min_x..=bounds.max_x {
                if point_in_polygon(x, y, &path) {
                    let color = board.get(x, y);
                    if !color.is_background() {
                        pixels.insert((x - bounds.min_x, y - bounds.min_y), color);
                    }
                }
            }
        }

        Some(Selection {
            path,
            bounds,
            pixels,
        })
    }

    /// Hit test: bounding-box quick reject, then the polygon test.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        if !self.bounds.contains(x, y) {
            return false;
        }
        point_in_polygon(x, y, &self.path)
    }

    /// Detach into a floating selection, clearing every covered cell from
    /// the store. The caller snapshots history first.
    pub fn lift(self, board: &mut Artboard) -> FloatingSelection {
        for y in self.bounds.min_y..=self.bounds.max_y {
            for x in self.bounds.min_x..=self.bounds.max_x {
                if point_in_polygon(x, y, &self.path) {
                    board.set(x, y, BACKGROUND);
                }
            }
        }
        FloatingSelection {
            x: self.bounds.min_x,
            y: self.bounds.min_y,
            width: self.bounds.width(),
            height: self.bounds.height(),
            pixels: self.pixels,
        }
    }

    /// Clear every cell inside the polygon to background.
    pub fn delete_cells(&self, board: &mut Artboard) {
        for y in self.bounds.min_y..=self.bounds.max_y {
            for x in self.bounds.min_x..=self.bounds.max_x {
                if point_in_polygon(x, y, &self.path) {
                    board.set(x, y, BACKGROUND);
                }
            }
        }
    }

    /// Non-mutating clipboard capture.
    pub fn to_clipboard(&self) -> ClipboardBuffer {
        ClipboardBuffer {
            width: self.bounds.width(),
            height: self.bounds.height(),
            pixels: self.pixels.clone(),
        }
    }
}

/// A detached, movable block of cells not yet merged back into the store.
/// `x`/`y` is the absolute top-left anchor; the snapshot is keyed relative
/// to it (background implicit via absence).
#[derive(Clone, PartialEq, Debug)]
pub struct FloatingSelection {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub pixels: HashMap<(i32, i32), CellColor>,
}

impl FloatingSelection {
    /// Bounding-box hit test in absolute coordinates.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Merge the snapshot into the store at the current anchor.
    pub fn stamp(&self, board: &mut Artboard) {
        for (&(rel_x, rel_y), &color) in &self.pixels {
            board.set(self.x + rel_x, self.y + rel_y, color);
        }
    }

    pub fn to_clipboard(&self) -> ClipboardBuffer {
        ClipboardBuffer {
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
        }
    }
}

/// The internal clipboard: dimensions plus a relative color snapshot.
#[derive(Clone, PartialEq, Debug)]
pub struct ClipboardBuffer {
    pub width: i32,
    pub height: i32,
    pub pixels: HashMap<(i32, i32), CellColor>,
}

impl ClipboardBuffer {
    /// Materialize as a floating selection centered in the given viewport.
    pub fn to_floating(&self, viewport: &GridViewport) -> FloatingSelection {
        FloatingSelection {
            x: viewport.offset_x + (viewport.grid_width as i32 - self.width) / 2,
            y: viewport.offset_y + (viewport.grid_height as i32 - self.height) / 2,
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
        }
    }
}
