// ============================================================================
// VIEWPORT MAPPERS — screen↔cell (grid mode) and screen↔mm (layout mode)
// ============================================================================

use serde::{Deserialize, Serialize};

/// The rectangular window onto the infinite artboard. `offset_x/offset_y`
/// is the absolute artboard cell at the window's top-left corner; the window
/// itself is always `grid_width × grid_height` cells.
///
/// Screen mapping uses a uniform cell spacing chosen so the whole window fits
/// the rendering surface, with the grid centered inside it.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GridViewport {
    pub grid_width: u32,
    pub grid_height: u32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl GridViewport {
    pub fn new(grid_width: u32, grid_height: u32) -> Self {
        Self {
            grid_width,
            grid_height,
            offset_x: 0,
            offset_y: 0,
        }
    }

    /// Uniform cell size in surface pixels.
    pub fn spacing(&self, surface_w: f64, surface_h: f64) -> f64 {
        let sx = surface_w / self.grid_width as f64;
        let sy = surface_h / self.grid_height as f64;
        sx.min(sy)
    }

    pub fn cell_count(&self) -> usize {
        self.grid_width as usize * self.grid_height as usize
    }

    /// Window-relative cell → absolute artboard cell.
    pub fn view_to_abs(&self, vx: i32, vy: i32) -> (i32, i32) {
        (vx + self.offset_x, vy + self.offset_y)
    }

    /// Absolute artboard cell → window-relative cell (may be out of window).
    pub fn abs_to_view(&self, x: i32, y: i32) -> (i32, i32) {
        (x - self.offset_x, y - self.offset_y)
    }

    /// Whether an absolute cell falls inside the visible window.
    pub fn contains_abs(&self, x: i32, y: i32) -> bool {
        let (vx, vy) = self.abs_to_view(x, y);
        vx >= 0 && vx < self.grid_width as i32 && vy >= 0 && vy < self.grid_height as i32
    }

    /// Surface pixel → absolute artboard cell. Returns `None` when the point
    /// lies outside the (centered) grid area — callers treat that as a no-op
    /// input.
    pub fn screen_to_cell(
        &self,
        sx: f64,
        sy: f64,
        surface_w: f64,
        surface_h: f64,
    ) -> Option<(i32, i32)> {
        let spacing = self.spacing(surface_w, surface_h);
        if spacing <= 0.0 {
            return None;
        }
        let grid_px_w = self.grid_width as f64 * spacing;
        let grid_px_h = self.grid_height as f64 * spacing;
        let origin_x = (surface_w - grid_px_w) / 2.0;
        let origin_y = (surface_h - grid_px_h) / 2.0;

        let vx = ((sx - origin_x) / spacing).floor() as i32;
        let vy = ((sy - origin_y) / spacing).floor() as i32;
        if vx < 0 || vx >= self.grid_width as i32 || vy < 0 || vy >= self.grid_height as i32 {
            return None;
        }
        Some(self.view_to_abs(vx, vy))
    }
}

// ---------------------------------------------------------------------------
//  Layout (millimeter) view
// ---------------------------------------------------------------------------

/// Continuous view transform for layout mode: `scale` is pixels per mm,
/// `offset_x/offset_y` is the board-space point (mm) shown at the center of
/// the surface. Pan moves the offset; zoom is about the surface center.
/// Entirely independent of the grid viewport.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct LayoutView {
    pub scale: f64,
    #[serde(rename = "offsetX")]
    pub offset_x: f64,
    #[serde(rename = "offsetY")]
    pub offset_y: f64,
}

impl LayoutView {
    pub const MIN_SCALE: f64 = 0.1;
    pub const MAX_SCALE: f64 = 20.0;

    /// Default view: unit scale, centered on the physical board.
    pub fn centered(board_w_mm: f64, board_h_mm: f64) -> Self {
        Self {
            scale: 1.0,
            offset_x: board_w_mm / 2.0,
            offset_y: board_h_mm / 2.0,
        }
    }

    /// Board mm → surface pixel.
    pub fn mm_to_screen(&self, x_mm: f64, y_mm: f64, surface_w: f64, surface_h: f64) -> (f64, f64) {
        (
            (x_mm - self.offset_x) * self.scale + surface_w / 2.0,
            (y_mm - self.offset_y) * self.scale + surface_h / 2.0,
        )
    }

    /// Surface pixel → board mm. `None` for points off the surface or a
    /// degenerate scale; callers treat that as a no-op input.
    pub fn screen_to_mm(
        &self,
        sx: f64,
        sy: f64,
        surface_w: f64,
        surface_h: f64,
    ) -> Option<(f64, f64)> {
        if self.scale == 0.0 {
            return None;
        }
        if sx < 0.0 || sy < 0.0 || sx > surface_w || sy > surface_h {
            return None;
        }
        Some((
            (sx - surface_w / 2.0) / self.scale + self.offset_x,
            (sy - surface_h / 2.0) / self.scale + self.offset_y,
        ))
    }

    pub fn clamp_scale(scale: f64) -> f64 {
        scale.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
    }
}
