// ============================================================================
// EDITOR — explicit editing state plus the controller that mutates it
// ============================================================================
//
// All mutable editing state lives in `EditorState`; the `Editor` wraps it
// with the history manager, settings, and pointer-gesture bookkeeping. Every
// user-visible mutation goes through a controller method that snapshots
// history *before* touching the state — that ordering is the one invariant
// everything here leans on.

use image::RgbaImage;
use rand::thread_rng;

use crate::artboard::{Artboard, Bounds, CellColor, BACKGROUND};
use crate::components::colors::{PaletteMatcher, LIMITED_PALETTE};
use crate::components::history::HistoryManager;
use crate::components::selection::{ClipboardBuffer, FloatingSelection, Selection};
use crate::layout::curve::CurvePath;
use crate::layout::grid::CircleGrid;
use crate::layout::guide::{GuideImage, GuideMask};
use crate::layout::patterns;
use crate::layout::{erase_circles, freehand_stroke, Circle, INCH_TO_MM};
use crate::ops::brush;
use crate::ops::fill;
use crate::ops::generate::{random_pattern, PatternGrid};
use crate::settings::EditorSettings;
use crate::viewport::{GridViewport, LayoutView};

/// Which of the two editing surfaces is active.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Grid,
    Layout,
}

/// The active drawing tool. Decided once per pointer-down; pointer-move
/// events dispatch on the gesture captured at down time, never by re-reading
/// ambient state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tool {
    // Grid mode
    Pencil,
    SquareBrush,
    CircleBrush,
    PixelEraser,
    AreaFill,
    GlobalFill,
    // Layout mode
    Freehand,
    CircleEraser,
    Curve,
}

impl Tool {
    pub fn available_in(&self, mode: Mode) -> bool {
        match mode {
            Mode::Grid => matches!(
                self,
                Tool::Pencil
                    | Tool::SquareBrush
                    | Tool::CircleBrush
                    | Tool::PixelEraser
                    | Tool::AreaFill
                    | Tool::GlobalFill
            ),
            Mode::Layout => matches!(self, Tool::Freehand | Tool::CircleEraser | Tool::Curve),
        }
    }

    fn default_for(mode: Mode) -> Tool {
        match mode {
            Mode::Grid => Tool::Pencil,
            Mode::Layout => Tool::Freehand,
        }
    }

    /// Grid tools that keep painting while the pointer moves.
    fn drags(&self) -> bool {
        matches!(
            self,
            Tool::Pencil | Tool::SquareBrush | Tool::CircleBrush | Tool::PixelEraser
        )
    }
}

/// Everything the editor can mutate, in one explicit struct. History
/// snapshots capture the durable subset of this (see `components::history`);
/// the spatial index and staged pattern are derived/transient.
pub struct EditorState {
    pub board: Artboard,
    pub viewport: GridViewport,
    /// In-progress lasso vertices (absolute coordinates); empty = inactive.
    pub lasso: Vec<(i32, i32)>,
    pub selection: Option<Selection>,
    pub floating: Option<FloatingSelection>,
    pub clipboard: Option<ClipboardBuffer>,
    /// Pattern rendered but not yet committed through the mask.
    pub staged_background: Option<PatternGrid>,
    pub circles: Vec<Circle>,
    pub circle_grid: CircleGrid,
    pub guide: Option<GuideImage>,
    pub layout_view: LayoutView,
    pub board_width_in: f64,
    pub board_height_in: f64,
    pub curve: CurvePath,
}

pub const DEFAULT_GRID_WIDTH: u32 = 51;
pub const DEFAULT_GRID_HEIGHT: u32 = 26;
pub const DEFAULT_BOARD_INCHES: f64 = 23.0;

impl EditorState {
    pub fn new() -> Self {
        let board_mm = DEFAULT_BOARD_INCHES * INCH_TO_MM;
        Self {
            board: Artboard::new(),
            viewport: GridViewport::new(DEFAULT_GRID_WIDTH, DEFAULT_GRID_HEIGHT),
            lasso: Vec::new(),
            selection: None,
            floating: None,
            clipboard: None,
            staged_background: None,
            circles: Vec::new(),
            circle_grid: CircleGrid::new(1.0),
            guide: None,
            layout_view: LayoutView::centered(board_mm, board_mm),
            board_width_in: DEFAULT_BOARD_INCHES,
            board_height_in: DEFAULT_BOARD_INCHES,
            curve: CurvePath::default(),
        }
    }

    pub fn board_width_mm(&self) -> f64 {
        self.board_width_in * INCH_TO_MM
    }

    pub fn board_height_mm(&self) -> f64 {
        self.board_height_in * INCH_TO_MM
    }

    /// Whether any content exists worth saving/exporting.
    pub fn has_art(&self) -> bool {
        !self.board.is_empty() || !self.circles.is_empty()
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Pointer gesture decided at down time.
#[derive(Clone, Copy)]
enum Gesture {
    Idle,
    /// Grid stroke with the tool captured at pointer-down.
    Drawing(Tool),
    /// Pressed inside a finalized selection; lifts on first movement.
    PressedSelection { start_screen: (f64, f64) },
    /// Moving a floating selection in whole-cell steps.
    DraggingFloating {
        start_screen: (f64, f64),
        start_origin: (i32, i32),
    },
    /// Layout stroke (freehand or eraser) with the captured tool.
    LayoutStroke(Tool),
}

pub struct Editor {
    pub state: EditorState,
    pub history: HistoryManager,
    pub settings: EditorSettings,
    pub mode: Mode,
    pub tool: Tool,
    pub selected_color: CellColor,
    /// Lasso capture mode; orthogonal to the drawing tool, as a mode toggle.
    pub selection_mode: bool,
    matcher: PaletteMatcher,
    gesture: Gesture,
    /// Last accepted circle of the active freehand stroke.
    freehand_last: Option<(f64, f64)>,
    /// Newest curve anchor is still being dragged.
    curve_dragging: bool,
    /// Spatial index needs a rebuild at stroke end (lazy after erasing).
    grid_dirty: bool,
}

impl Editor {
    pub fn new() -> Self {
        Self::with_settings(EditorSettings::default())
    }

    pub fn with_settings(settings: EditorSettings) -> Self {
        Self {
            state: EditorState::new(),
            history: HistoryManager::new(settings.max_undo_steps),
            selected_color: BACKGROUND, // white, like a fresh light board
            settings,
            mode: Mode::Grid,
            tool: Tool::Pencil,
            selection_mode: false,
            matcher: PaletteMatcher::new(),
            gesture: Gesture::Idle,
            freehand_last: None,
            curve_dragging: false,
            grid_dirty: false,
        }
    }

    /// Wipe back to a fresh document, keeping settings.
    pub fn reset_project(&mut self) {
        self.state = EditorState::new();
        self.history.clear();
        self.gesture = Gesture::Idle;
        self.selection_mode = false;
        self.freehand_last = None;
        self.curve_dragging = false;
        self.grid_dirty = false;
    }

    fn step_mm(&self) -> f64 {
        self.settings.step_mm()
    }

    pub fn rebuild_circle_grid(&mut self) {
        let step = self.step_mm();
        self.state.circle_grid.rebuild(&self.state.circles, step);
        self.grid_dirty = false;
    }

    // -- Pointer flow --------------------------------------------------------

    /// Pointer press at surface pixel `(sx, sy)` on a `sw × sh` surface.
    /// Errors are blocking validation messages for the user; the state is
    /// untouched when one is returned.
    pub fn pointer_down(&mut self, sx: f64, sy: f64, sw: f64, sh: f64) -> Result<(), String> {
        match self.mode {
            Mode::Grid => {
                self.grid_pointer_down(sx, sy, sw, sh);
                Ok(())
            }
            Mode::Layout => self.layout_pointer_down(sx, sy, sw, sh),
        }
    }

    pub fn pointer_move(&mut self, sx: f64, sy: f64, sw: f64, sh: f64) {
        match self.mode {
            Mode::Grid => self.grid_pointer_move(sx, sy, sw, sh),
            Mode::Layout => self.layout_pointer_move(sx, sy, sw, sh),
        }
    }

    pub fn pointer_up(&mut self) {
        if self.grid_dirty {
            self.rebuild_circle_grid();
        }
        self.gesture = Gesture::Idle;
        self.freehand_last = None;
        self.curve_dragging = false;
    }

    /// Double-click finalizes an in-progress lasso.
    pub fn double_click(&mut self) {
        if self.selection_mode && self.state.lasso.len() >= 3 {
            self.finalize_lasso();
        }
    }

    fn grid_pointer_down(&mut self, sx: f64, sy: f64, sw: f64, sh: f64) {
        let coords = self.state.viewport.screen_to_cell(sx, sy, sw, sh);

        if let Some(floating) = &self.state.floating {
            if let Some((x, y)) = coords {
                if floating.contains(x, y) {
                    self.gesture = Gesture::DraggingFloating {
                        start_screen: (sx, sy),
                        start_origin: (floating.x, floating.y),
                    };
                    return;
                }
            }
            // Clicking elsewhere stamps the block down, then the press
            // continues as a normal tool application.
            self.deselect();
        }

        if let Some(selection) = &self.state.selection {
            if let Some((x, y)) = coords {
                if selection.contains(x, y) {
                    self.gesture = Gesture::PressedSelection {
                        start_screen: (sx, sy),
                    };
                    return;
                }
            }
            self.deselect();
        }

        if self.selection_mode {
            let Some(point) = coords else { return };
            if self.state.lasso.is_empty() {
                self.deselect();
            }
            if self.state.lasso.len() >= 3 && self.state.lasso[0] == point {
                self.finalize_lasso();
            } else {
                self.state.lasso.push(point);
            }
            return;
        }

        self.gesture = Gesture::Drawing(self.tool);
        self.history.snapshot(&self.state);
        self.commit_staged_background();
        self.apply_grid_tool(coords);
    }

    fn grid_pointer_move(&mut self, sx: f64, sy: f64, sw: f64, sh: f64) {
        match self.gesture {
            Gesture::DraggingFloating {
                start_screen,
                start_origin,
            } => {
                let spacing = self.state.viewport.spacing(sw, sh);
                if spacing <= 0.0 {
                    return;
                }
                let dx = ((sx - start_screen.0) / spacing).round() as i32;
                let dy = ((sy - start_screen.1) / spacing).round() as i32;
                if let Some(floating) = &mut self.state.floating {
                    floating.x = start_origin.0 + dx;
                    floating.y = start_origin.1 + dy;
                }
            }
            Gesture::PressedSelection { start_screen } => {
                // First movement converts the press into a floating drag.
                self.lift_selection();
                if let Some(floating) = &self.state.floating {
                    self.gesture = Gesture::DraggingFloating {
                        start_screen,
                        start_origin: (floating.x, floating.y),
                    };
                }
            }
            Gesture::Drawing(tool) if tool.drags() => {
                let coords = self.state.viewport.screen_to_cell(sx, sy, sw, sh);
                self.apply_grid_tool(coords);
            }
            _ => {}
        }
    }

    fn apply_grid_tool(&mut self, coords: Option<(i32, i32)>) {
        if self.state.floating.is_some() {
            return;
        }
        let Some((x, y)) = coords else { return };
        let Gesture::Drawing(tool) = self.gesture else {
            return;
        };

        let selection = self.state.selection.as_ref();
        let size = self.settings.brush_size;
        let color = self.selected_color;
        match tool {
            Tool::Pencil => brush::pencil(&mut self.state.board, selection, x, y, color),
            Tool::SquareBrush => {
                brush::square_brush(&mut self.state.board, selection, x, y, size, color)
            }
            Tool::CircleBrush => {
                brush::circle_brush(&mut self.state.board, selection, x, y, size, color)
            }
            Tool::PixelEraser => {
                brush::pixel_eraser(&mut self.state.board, selection, x, y, size)
            }
            Tool::AreaFill => fill::flood_fill(
                &mut self.state.board,
                &self.state.viewport,
                selection,
                (x, y),
                color,
            ),
            Tool::GlobalFill => {
                fill::global_fill(&mut self.state.board, selection, (x, y), color)
            }
            _ => {}
        }
    }

    fn layout_pointer_down(&mut self, sx: f64, sy: f64, sw: f64, sh: f64) -> Result<(), String> {
        let Some((mx, my)) = self.state.layout_view.screen_to_mm(sx, sy, sw, sh) else {
            return Ok(());
        };

        match self.tool {
            Tool::Freehand => {
                if self.selected_color.is_mask() {
                    return Err("Select a color before adding circles.".to_string());
                }
                self.gesture = Gesture::LayoutStroke(Tool::Freehand);
                self.history.snapshot(&self.state);
                self.rebuild_circle_grid();
                self.freehand_last = None;
                let step = self.step_mm();
                freehand_stroke(
                    &mut self.state.circles,
                    &mut self.state.circle_grid,
                    &mut self.freehand_last,
                    (mx, my),
                    step,
                    self.selected_color,
                );
            }
            Tool::CircleEraser => {
                self.gesture = Gesture::LayoutStroke(Tool::CircleEraser);
                self.history.snapshot(&self.state);
                self.erase_circles_at(mx, my);
            }
            Tool::Curve => {
                if self.state.curve.finalized {
                    return Ok(());
                }
                self.history.snapshot(&self.state);

                if self.state.curve.points.len() >= 2 {
                    let first = self.state.curve.points[0].p;
                    let close_threshold = 10.0 / self.state.layout_view.scale;
                    let dist_sq = (mx - first.0).powi(2) + (my - first.1).powi(2);
                    if dist_sq < close_threshold * close_threshold {
                        return self.finalize_curve(true).map(|_| ());
                    }
                }

                self.curve_dragging = true;
                self.state.curve.push_anchor((mx, my));
            }
            _ => {}
        }
        Ok(())
    }

    fn layout_pointer_move(&mut self, sx: f64, sy: f64, sw: f64, sh: f64) {
        let Some((mx, my)) = self.state.layout_view.screen_to_mm(sx, sy, sw, sh) else {
            return;
        };

        match self.gesture {
            Gesture::LayoutStroke(Tool::Freehand) => {
                let step = self.step_mm();
                freehand_stroke(
                    &mut self.state.circles,
                    &mut self.state.circle_grid,
                    &mut self.freehand_last,
                    (mx, my),
                    step,
                    self.selected_color,
                );
            }
            Gesture::LayoutStroke(Tool::CircleEraser) => {
                self.erase_circles_at(mx, my);
            }
            _ => {
                if self.curve_dragging && !self.state.curve.is_empty() {
                    self.state.curve.drag_handle((mx, my));
                }
            }
        }
    }

    fn erase_circles_at(&mut self, mx: f64, my: f64) {
        let radius = self.settings.brush_size as f64 / 2.0 * self.step_mm();
        let removed = erase_circles(&mut self.state.circles, (mx, my), radius);
        if removed > 10 {
            // Large removals rebuild now; small ones wait for stroke end.
            self.rebuild_circle_grid();
        } else if removed > 0 {
            self.grid_dirty = true;
        }
    }

    // -- Selection actions ---------------------------------------------------

    fn finalize_lasso(&mut self) {
        let path = std::mem::take(&mut self.state.lasso);
        if path.len() < 3 {
            return;
        }
        self.history.snapshot(&self.state);
        self.state.selection = Selection::from_lasso(path, &self.state.board);
    }

    /// Remove the most recent in-progress lasso vertex.
    pub fn lasso_backspace(&mut self) {
        self.state.lasso.pop();
    }

    /// Detach the finalized selection into a floating block.
    pub fn lift_selection(&mut self) {
        if self.state.selection.is_none() {
            return;
        }
        self.history.snapshot(&self.state);
        let selection = self.state.selection.take().unwrap();
        self.state.floating = Some(selection.lift(&mut self.state.board));
    }

    /// Stamp any floating block and drop all selection state. No-op when
    /// nothing is selected.
    pub fn deselect(&mut self) {
        if self.state.selection.is_none()
            && self.state.floating.is_none()
            && self.state.lasso.is_empty()
        {
            return;
        }
        if self.state.selection.is_some() || self.state.floating.is_some() {
            self.history.snapshot(&self.state);
        }
        if let Some(floating) = self.state.floating.take() {
            floating.stamp(&mut self.state.board);
        }
        self.state.selection = None;
        self.state.lasso.clear();
        self.gesture = Gesture::Idle;
    }

    /// Clear the cells under the finalized selection, then deselect.
    pub fn delete_selection(&mut self) {
        let Some(selection) = self.state.selection.clone() else {
            return;
        };
        self.history.snapshot(&self.state);
        selection.delete_cells(&mut self.state.board);
        self.deselect();
    }

    pub fn copy(&mut self) {
        let clip = if let Some(floating) = &self.state.floating {
            floating.to_clipboard()
        } else if let Some(selection) = &self.state.selection {
            selection.to_clipboard()
        } else {
            return;
        };
        self.state.clipboard = Some(clip);
    }

    /// Copy, then remove the source: a floating block is discarded outright,
    /// a finalized selection has its cells cleared.
    pub fn cut(&mut self) {
        if self.state.selection.is_none() && self.state.floating.is_none() {
            return;
        }
        self.history.snapshot(&self.state);
        self.copy();
        if self.state.floating.is_some() {
            self.state.floating = None;
        } else {
            self.delete_selection();
        }
    }

    /// Materialize the clipboard as a floating block centered in the
    /// viewport. Stamps any open selection first.
    pub fn paste(&mut self) {
        let Some(clip) = self.state.clipboard.clone() else {
            return;
        };
        self.deselect();
        self.history.snapshot(&self.state);
        self.state.floating = Some(clip.to_floating(&self.state.viewport));
    }

    // -- History -------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.state.staged_background = None;
        if self.history.undo(&mut self.state) {
            self.rebuild_circle_grid();
            true
        } else {
            false
        }
    }

    pub fn redo(&mut self) -> bool {
        self.state.staged_background = None;
        if self.history.redo(&mut self.state) {
            self.rebuild_circle_grid();
            true
        } else {
            false
        }
    }

    // -- Grid-mode actions ---------------------------------------------------

    /// Pick the color under the pointer if it is a palette entry or the
    /// mask sentinel.
    pub fn eyedropper(&mut self, sx: f64, sy: f64, sw: f64, sh: f64) {
        let Some((x, y)) = self.state.viewport.screen_to_cell(sx, sy, sw, sh) else {
            return;
        };
        let color = self.state.board.get(x, y);
        let in_palette = match color {
            CellColor::Mask => true,
            CellColor::Paint(rgb) => LIMITED_PALETTE.contains(&rgb),
        };
        if in_palette {
            self.selected_color = color;
        }
    }

    /// Shift the viewport anchor by whole cells (a completed pan gesture).
    pub fn pan_grid_by_cells(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        self.state.staged_background = None;
        self.history.snapshot(&self.state);
        self.state.viewport.offset_x += dx;
        self.state.viewport.offset_y += dy;
    }

    /// Resize the viewport window. Resets the viewport anchor, like opening
    /// a fresh window onto the board.
    pub fn set_grid_size(&mut self, width: u32, height: u32) -> Result<(), String> {
        if !(1..=200).contains(&width) || !(1..=200).contains(&height) {
            return Err("Enter valid dimensions for width and height (1-200).".to_string());
        }
        if width == self.state.viewport.grid_width && height == self.state.viewport.grid_height {
            return Ok(());
        }
        self.deselect();
        self.history.snapshot(&self.state);
        self.state.viewport.grid_width = width;
        self.state.viewport.grid_height = height;
        self.state.viewport.offset_x = 0;
        self.state.viewport.offset_y = 0;
        self.state.staged_background = None;
        Ok(())
    }

    /// Render a random background pattern over the viewport. When the
    /// window contains mask cells the pattern is staged instead of written,
    /// so commit only lands inside the mask.
    pub fn generate_background(&mut self) {
        self.deselect();
        let vp = self.state.viewport;
        let mut has_mask = false;
        'scan: for vy in 0..vp.grid_height as i32 {
            for vx in 0..vp.grid_width as i32 {
                let (x, y) = vp.view_to_abs(vx, vy);
                if self.state.board.get(x, y).is_mask() {
                    has_mask = true;
                    break 'scan;
                }
            }
        }

        let pattern = random_pattern(vp.grid_width, vp.grid_height, &mut thread_rng());

        if has_mask {
            self.state.staged_background = Some(pattern);
        } else {
            self.state.staged_background = None;
            self.history.snapshot(&self.state);
            for (vy, row) in pattern.iter().enumerate() {
                for (vx, &color) in row.iter().enumerate() {
                    let (x, y) = vp.view_to_abs(vx as i32, vy as i32);
                    self.state.board.set(x, y, color);
                }
            }
        }
    }

    /// Write the staged pattern into the viewport's mask cells only.
    pub fn commit_staged_background(&mut self) {
        let Some(pattern) = self.state.staged_background.take() else {
            return;
        };
        self.history.snapshot(&self.state);
        let vp = self.state.viewport;
        for vy in 0..vp.grid_height as i32 {
            for vx in 0..vp.grid_width as i32 {
                let (x, y) = vp.view_to_abs(vx, vy);
                if self.state.board.get(x, y).is_mask() {
                    let color = pattern[vy as usize][vx as usize];
                    self.state.board.set(x, y, color);
                }
            }
        }
    }

    /// Paint the selected color along the mask's border cells.
    pub fn stroke_mask_outline(&mut self) -> Result<(), String> {
        self.deselect();
        self.commit_staged_background();
        if self.selected_color.is_mask() {
            return Err("Select a color for the stroke, not the mask tool itself.".to_string());
        }

        let bounds = self.state.board.art_bounds().unwrap_or(Bounds {
            min_x: self.state.viewport.offset_x,
            min_y: self.state.viewport.offset_y,
            max_x: self.state.viewport.offset_x + self.state.viewport.grid_width as i32 - 1,
            max_y: self.state.viewport.offset_y + self.state.viewport.grid_height as i32 - 1,
        });
        let (has_mask, border) = brush::mask_border_cells(&self.state.board, bounds);
        if !has_mask {
            return Err("Create a mask area first to use the stroke tool.".to_string());
        }
        if border.is_empty() {
            return Ok(());
        }

        self.history.snapshot(&self.state);
        for (x, y) in border {
            self.state.board.set(x, y, self.selected_color);
        }
        Ok(())
    }

    /// Quantize an image into the viewport: aspect-fit scale, palette-match
    /// every sufficiently opaque pixel, write centered. Replaces the board
    /// contents and starts a fresh history, like opening a new document.
    pub fn import_image(&mut self, img: &RgbaImage, scale: f64) {
        let cells =
            crate::io::quantize_image(img, &self.state.viewport, scale, &self.matcher);
        self.state.board.clear();
        self.state.staged_background = None;
        for ((x, y), color) in cells {
            self.state.board.set(x, y, color);
        }
        self.history.clear();
    }

    // -- Layout-mode actions -------------------------------------------------

    /// Install an uploaded guide image at the default centered placement.
    /// The guide is reference data, not history-tracked artwork.
    pub fn set_guide(&mut self, image: RgbaImage) {
        self.state.guide = Some(GuideImage::centered(
            image,
            self.state.board_width_mm(),
            self.state.board_height_mm(),
        ));
    }

    /// Reposition/resize the guide rectangle on the board (mm).
    pub fn set_guide_rect(&mut self, x_mm: f64, y_mm: f64, width_mm: f64, height_mm: f64) {
        if let Some(guide) = &mut self.state.guide {
            guide.x_mm = x_mm;
            guide.y_mm = y_mm;
            guide.width_mm = width_mm.max(1.0);
            guide.height_mm = height_mm.max(1.0);
        }
    }

    pub fn clear_guide(&mut self) {
        self.state.guide = None;
    }

    /// Run the configured placement pattern over the traced guide. Returns
    /// the number of circles placed.
    pub fn generate_pattern(&mut self, edges_only: bool) -> Result<usize, String> {
        let Some(guide) = &self.state.guide else {
            return Err("Upload a guide image first.".to_string());
        };
        let step = self.step_mm();
        if step <= 0.0 {
            return Err("Circle size and separation give a zero step.".to_string());
        }

        let mask = GuideMask::trace(guide, self.settings.sensitivity, self.settings.invert_guide);
        self.history.snapshot(&self.state);
        self.rebuild_circle_grid(); // compose with existing circles

        let color = if self.selected_color.is_mask() {
            BACKGROUND
        } else {
            self.selected_color
        };
        let placed = patterns::generate(
            self.settings.fill_pattern,
            &mask,
            &mut self.state.circles,
            &mut self.state.circle_grid,
            step,
            self.settings.circle_diameter_mm(),
            color,
            edges_only,
            &mut thread_rng(),
        );
        Ok(placed)
    }

    /// Finalize the curve path (open or closed) and immediately fill it.
    pub fn finalize_curve(&mut self, close: bool) -> Result<usize, String> {
        if !self.state.curve.finalize(close) {
            return Ok(0);
        }
        self.curve_dragging = false;
        self.fill_curve_path()
    }

    /// Sample the curve into circles at step spacing and clear the path.
    pub fn fill_curve_path(&mut self) -> Result<usize, String> {
        if self.state.curve.points.len() < 2 {
            return Err("Create a path with at least two points first.".to_string());
        }
        self.history.snapshot(&self.state);

        let step = self.step_mm();
        if step <= 0.01 {
            self.state.curve.clear();
            return Ok(0);
        }

        let color = if self.selected_color.is_mask() {
            BACKGROUND
        } else {
            self.selected_color
        };
        self.rebuild_circle_grid();
        let curve = self.state.curve.clone();
        let placed = crate::layout::curve::sample_into(
            &curve,
            &mut self.state.circles,
            &mut self.state.circle_grid,
            step,
            color,
        );
        self.state.curve.clear();
        Ok(placed)
    }

    pub fn clear_curve_path(&mut self) {
        self.state.curve.clear();
        self.curve_dragging = false;
    }

    /// Pan the layout view by a completed gesture's delta, in millimeters.
    pub fn pan_layout_by_mm(&mut self, dx_mm: f64, dy_mm: f64) {
        if dx_mm == 0.0 && dy_mm == 0.0 {
            return;
        }
        self.history.snapshot(&self.state);
        self.state.layout_view.offset_x += dx_mm;
        self.state.layout_view.offset_y += dy_mm;
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.state.layout_view.scale + 0.5);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.state.layout_view.scale - 0.5);
    }

    pub fn set_zoom(&mut self, scale: f64) {
        let scale = LayoutView::clamp_scale(scale);
        if scale == self.state.layout_view.scale {
            return;
        }
        self.history.snapshot(&self.state);
        self.state.layout_view.scale = scale;
    }

    /// Change the physical board dimensions (inches) and recenter the view.
    pub fn set_board_size_inches(&mut self, width: f64, height: f64) -> Result<(), String> {
        if !width.is_finite()
            || !height.is_finite()
            || width <= 0.0
            || height <= 0.0
            || width > 500.0
            || height > 500.0
        {
            return Err("Enter valid dimensions (1-500 inches).".to_string());
        }
        if width == self.state.board_width_in && height == self.state.board_height_in {
            return Ok(());
        }
        self.history.snapshot(&self.state);
        self.state.board_width_in = width;
        self.state.board_height_in = height;
        self.state.layout_view =
            LayoutView::centered(self.state.board_width_mm(), self.state.board_height_mm());
        Ok(())
    }

    /// Update the circle sizing knobs. The step changes with them, so the
    /// spatial index is rebuilt on the spot.
    pub fn set_circle_settings(&mut self, size_in: f64, separation_mm: f64) {
        self.settings.circle_size_in = size_in;
        self.settings.circle_separation_mm = separation_mm;
        self.rebuild_circle_grid();
    }

    // -- Mode & tool switching -----------------------------------------------

    /// Switch editing surfaces. Stamps any floating selection first.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        self.deselect();
        self.mode = mode;
        if !self.tool.available_in(mode) {
            self.tool = Tool::default_for(mode);
        }
        if mode == Mode::Grid {
            self.clear_curve_path();
        }
    }

    /// Select a drawing tool. Stamps any floating selection; abandoning the
    /// curve tool drops its path.
    pub fn set_tool(&mut self, tool: Tool) {
        if !tool.available_in(self.mode) {
            crate::log_warn!("tool {:?} unavailable in {:?} mode", tool, self.mode);
            return;
        }
        self.selection_mode = false;
        self.deselect();
        if self.tool == Tool::Curve && tool != Tool::Curve {
            self.clear_curve_path();
        }
        self.tool = tool;
    }

    /// Toggle lasso capture. Entering it drops any open selection.
    pub fn set_selection_mode(&mut self, on: bool) {
        if on == self.selection_mode {
            return;
        }
        self.selection_mode = on;
        if on {
            self.deselect();
        }
    }

    pub fn select_color(&mut self, color: CellColor) {
        self.selected_color = color;
    }

    /// Palette usage counts across both the board and the placed circles.
    pub fn color_usage(&self) -> std::collections::HashMap<CellColor, usize> {
        let mut counts = self.state.board.color_counts();
        for circle in &self.state.circles {
            *counts.entry(circle.color).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::colors::Rgb;

    // A 510×260 surface makes the default 51×26 window map at spacing 10,
    // with the grid flush against the surface origin.
    const SW: f64 = 510.0;
    const SH: f64 = 260.0;

    fn color(hex: &str) -> CellColor {
        CellColor::Paint(Rgb::from_hex(hex).unwrap())
    }

    /// Screen center of a window-relative cell at spacing 10.
    fn at(vx: i32, vy: i32) -> (f64, f64) {
        (vx as f64 * 10.0 + 5.0, vy as f64 * 10.0 + 5.0)
    }

    fn press(editor: &mut Editor, vx: i32, vy: i32) {
        let (sx, sy) = at(vx, vy);
        editor.pointer_down(sx, sy, SW, SH).unwrap();
        editor.pointer_up();
    }

    #[test]
    fn test_pencil_draw_and_undo() {
        let mut editor = Editor::new();
        editor.state.viewport.offset_x = 7;
        editor.state.viewport.offset_y = -3;
        editor.select_color(color("#ff0000"));

        press(&mut editor, 0, 0);
        assert_eq!(editor.state.board.get(7, -3), color("#ff0000"));

        assert!(editor.undo());
        assert_eq!(editor.state.board.get(7, -3), BACKGROUND);
        assert!(editor.redo());
        assert_eq!(editor.state.board.get(7, -3), color("#ff0000"));
    }

    #[test]
    fn test_drawing_outside_window_is_noop() {
        let mut editor = Editor::new();
        editor.select_color(color("#ff0000"));
        editor.pointer_down(5000.0, 5000.0, SW, SH).unwrap();
        editor.pointer_up();
        assert!(editor.state.board.is_empty());
    }

    #[test]
    fn test_lasso_lift_move_stamp() {
        let mut editor = Editor::new();
        editor.select_color(color("#ff0000"));
        press(&mut editor, 2, 2);
        editor.select_color(color("#0f49ff"));
        press(&mut editor, 3, 3);

        // Square lasso around cells (1,1)..(4,4), closed by re-clicking the
        // first vertex.
        editor.set_selection_mode(true);
        for &(vx, vy) in &[(1, 1), (4, 1), (4, 4), (1, 4), (1, 1)] {
            let (sx, sy) = at(vx, vy);
            editor.pointer_down(sx, sy, SW, SH).unwrap();
        }
        assert!(editor.state.selection.is_some());

        // Press inside, drag by (+3,+3) cells: the selection lifts on first
        // movement, then follows the pointer in whole cells.
        let (sx, sy) = at(2, 2);
        editor.pointer_down(sx, sy, SW, SH).unwrap();
        editor.pointer_move(sx + 30.0, sy + 30.0, SW, SH);
        editor.pointer_move(sx + 30.0, sy + 30.0, SW, SH);
        editor.pointer_up();
        assert!(editor.state.floating.is_some());

        editor.deselect();
        assert_eq!(editor.state.board.get(2, 2), BACKGROUND);
        assert_eq!(editor.state.board.get(3, 3), BACKGROUND);
        assert_eq!(editor.state.board.get(5, 5), color("#ff0000"));
        assert_eq!(editor.state.board.get(6, 6), color("#0f49ff"));
    }

    #[test]
    fn test_short_lasso_discards_silently() {
        let mut editor = Editor::new();
        editor.set_selection_mode(true);
        for &(vx, vy) in &[(1, 1), (3, 1)] {
            let (sx, sy) = at(vx, vy);
            editor.pointer_down(sx, sy, SW, SH).unwrap();
        }
        editor.double_click();
        assert!(editor.state.selection.is_none());
        // The two stray vertices stay until a third arrives or escape.
        assert_eq!(editor.state.lasso.len(), 2);
    }

    #[test]
    fn test_copy_paste_centers_floating() {
        let mut editor = Editor::new();
        editor.select_color(color("#ffff00"));
        press(&mut editor, 1, 1);

        editor.set_selection_mode(true);
        for &(vx, vy) in &[(0, 0), (2, 0), (2, 2), (0, 2), (0, 0)] {
            let (sx, sy) = at(vx, vy);
            editor.pointer_down(sx, sy, SW, SH).unwrap();
        }
        editor.copy();
        assert!(editor.state.clipboard.is_some());

        editor.deselect();
        editor.paste();
        let floating = editor.state.floating.as_ref().unwrap();
        assert_eq!(floating.x, (51 - 3) / 2);
        assert_eq!(floating.y, (26 - 3) / 2);

        editor.deselect(); // stamp
        assert_eq!(
            editor.state.board.get(24 + 1, 11 + 1),
            color("#ffff00")
        );
        // The source cell survived the copy untouched.
        assert_eq!(editor.state.board.get(1, 1), color("#ffff00"));
    }

    #[test]
    fn test_cut_discards_floating_without_stamping() {
        let mut editor = Editor::new();
        editor.select_color(color("#ff0000"));
        press(&mut editor, 1, 1);

        editor.set_selection_mode(true);
        for &(vx, vy) in &[(0, 0), (2, 0), (2, 2), (0, 2), (0, 0)] {
            let (sx, sy) = at(vx, vy);
            editor.pointer_down(sx, sy, SW, SH).unwrap();
        }
        editor.set_selection_mode(false);
        editor.lift_selection();
        editor.cut();
        assert!(editor.state.floating.is_none());
        assert!(editor.state.clipboard.is_some());
        // The lifted cells were cleared and never stamped back.
        assert_eq!(editor.state.board.get(1, 1), BACKGROUND);
    }

    #[test]
    fn test_generate_background_stages_over_mask() {
        let mut editor = Editor::new();
        editor.state.board.set(0, 0, CellColor::Mask);
        editor.state.board.set(5, 5, color("#ff0000"));

        editor.generate_background();
        // Mask in view: the pattern is staged, nothing written yet.
        assert!(editor.state.staged_background.is_some());
        assert_eq!(editor.state.board.get(0, 0), CellColor::Mask);
        assert_eq!(editor.state.board.get(5, 5), color("#ff0000"));

        editor.commit_staged_background();
        assert!(editor.state.staged_background.is_none());
        // Commit lands only in mask cells.
        assert!(!editor.state.board.get(0, 0).is_mask());
        assert_eq!(editor.state.board.get(5, 5), color("#ff0000"));
    }

    #[test]
    fn test_generate_background_writes_directly_without_mask() {
        let mut editor = Editor::new();
        editor.generate_background();
        assert!(editor.state.staged_background.is_none());
        assert!(editor.history.can_undo());
    }

    #[test]
    fn test_stroke_mask_outline() {
        let mut editor = Editor::new();
        for y in 0..3 {
            for x in 0..3 {
                editor.state.board.set(x, y, CellColor::Mask);
            }
        }
        editor.select_color(color("#29ff0f"));
        editor.stroke_mask_outline().unwrap();
        // Border cells repainted, the interior mask cell kept.
        assert_eq!(editor.state.board.get(0, 0), color("#29ff0f"));
        assert_eq!(editor.state.board.get(1, 1), CellColor::Mask);

        let mut empty = Editor::new();
        empty.select_color(color("#29ff0f"));
        assert!(empty.stroke_mask_outline().is_err());
    }

    #[test]
    fn test_freehand_stroke_undo_redo() {
        let mut editor = Editor::new();
        editor.set_mode(Mode::Layout);
        editor.select_color(color("#ff0000"));

        // Surface center maps to the board center at scale 1.
        editor.pointer_down(400.0, 300.0, 800.0, 600.0).unwrap();
        editor.pointer_move(500.0, 300.0, 800.0, 600.0);
        editor.pointer_up();
        let placed = editor.state.circles.len();
        assert_eq!(placed, 5); // 1 + floor(100 / 24.7)

        assert!(editor.undo());
        assert!(editor.state.circles.is_empty());
        assert!(editor.redo());
        assert_eq!(editor.state.circles.len(), placed);
        // The rebuilt index still rejects overlaps after redo.
        let (x, y) = (editor.state.circles[0].x, editor.state.circles[0].y);
        assert!(editor.state.circle_grid.collides(x, y, editor.settings.step_mm()));
    }

    #[test]
    fn test_freehand_rejects_mask_color() {
        let mut editor = Editor::new();
        editor.set_mode(Mode::Layout);
        editor.select_color(CellColor::Mask);
        assert!(editor.pointer_down(400.0, 300.0, 800.0, 600.0).is_err());
        assert!(editor.state.circles.is_empty());
    }

    #[test]
    fn test_circle_eraser_rebuilds_lazily() {
        let mut editor = Editor::new();
        editor.set_mode(Mode::Layout);
        editor.select_color(color("#ff0000"));
        editor.pointer_down(400.0, 300.0, 800.0, 600.0).unwrap();
        editor.pointer_move(520.0, 300.0, 800.0, 600.0);
        editor.pointer_up();
        let before = editor.state.circles.len();
        assert!(before >= 4);

        editor.set_tool(Tool::CircleEraser);
        editor.pointer_down(400.0, 300.0, 800.0, 600.0).unwrap();
        editor.pointer_up();
        assert!(editor.state.circles.len() < before);

        // The freed spot accepts a circle again after the rebuild.
        editor.set_tool(Tool::Freehand);
        editor.pointer_down(400.0, 300.0, 800.0, 600.0).unwrap();
        editor.pointer_up();
        assert_eq!(editor.state.circles.len(), before - 1 + 1);
    }

    #[test]
    fn test_mode_switch_stamps_floating() {
        let mut editor = Editor::new();
        editor.select_color(color("#9a0f9a"));
        press(&mut editor, 1, 1);
        editor.set_selection_mode(true);
        for &(vx, vy) in &[(0, 0), (2, 0), (2, 2), (0, 2), (0, 0)] {
            let (sx, sy) = at(vx, vy);
            editor.pointer_down(sx, sy, SW, SH).unwrap();
        }
        editor.set_selection_mode(false);
        editor.lift_selection();
        assert_eq!(editor.state.board.get(1, 1), BACKGROUND);

        editor.set_mode(Mode::Layout);
        assert!(editor.state.floating.is_none());
        assert_eq!(editor.state.board.get(1, 1), color("#9a0f9a"));
    }

    #[test]
    fn test_import_image_starts_fresh_history() {
        let mut editor = Editor::new();
        editor.select_color(color("#ff0000"));
        press(&mut editor, 0, 0);
        assert!(editor.history.can_undo());

        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
        editor.import_image(&img, 1.0);
        assert!(!editor.history.can_undo());
        assert!(!editor.state.board.is_empty());
        assert!(editor
            .state
            .board
            .iter()
            .all(|(_, &c)| c == color("#ff0000")));
    }

    #[test]
    fn test_grid_resize_validates_and_resets_anchor() {
        let mut editor = Editor::new();
        editor.state.viewport.offset_x = 9;
        assert!(editor.set_grid_size(0, 10).is_err());
        assert!(editor.set_grid_size(10, 201).is_err());
        assert_eq!(editor.state.viewport.offset_x, 9);

        editor.set_grid_size(10, 10).unwrap();
        assert_eq!(editor.state.viewport.grid_width, 10);
        assert_eq!(editor.state.viewport.offset_x, 0);
    }

    #[test]
    fn test_board_resize_recenters_view() {
        let mut editor = Editor::new();
        editor.set_mode(Mode::Layout);
        assert!(editor.set_board_size_inches(0.0, 10.0).is_err());
        assert!(editor.set_board_size_inches(10.0, 600.0).is_err());

        editor.set_board_size_inches(40.0, 20.0).unwrap();
        assert!((editor.state.layout_view.offset_x - 40.0 * INCH_TO_MM / 2.0).abs() < 1e-9);
        assert!((editor.state.layout_view.offset_y - 20.0 * INCH_TO_MM / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_clamps_and_snapshots() {
        let mut editor = Editor::new();
        for _ in 0..50 {
            editor.zoom_in();
        }
        assert_eq!(editor.state.layout_view.scale, LayoutView::MAX_SCALE);
        for _ in 0..100 {
            editor.zoom_out();
        }
        assert_eq!(editor.state.layout_view.scale, LayoutView::MIN_SCALE);
        assert!(editor.undo());
    }

    #[test]
    fn test_eyedropper_picks_palette_colors() {
        let mut editor = Editor::new();
        editor.state.board.set(0, 0, color("#0fffff"));
        editor.state.board.set(1, 0, CellColor::Mask);

        let (sx, sy) = at(0, 0);
        editor.eyedropper(sx, sy, SW, SH);
        assert_eq!(editor.selected_color, color("#0fffff"));
        let (sx, sy) = at(1, 0);
        editor.eyedropper(sx, sy, SW, SH);
        assert_eq!(editor.selected_color, CellColor::Mask);
    }

    #[test]
    fn test_curve_click_drag_and_fill() {
        let mut editor = Editor::new();
        editor.set_mode(Mode::Layout);
        editor.set_tool(Tool::Curve);
        editor.select_color(color("#ff0000"));

        // Two anchors 200 px (= 200 mm at scale 1) apart.
        editor.pointer_down(300.0, 300.0, 800.0, 600.0).unwrap();
        editor.pointer_up();
        editor.pointer_down(500.0, 300.0, 800.0, 600.0).unwrap();
        editor.pointer_up();
        assert_eq!(editor.state.curve.points.len(), 2);

        let placed = editor.fill_curve_path().unwrap();
        assert!(placed >= 8); // 200 mm / 24.7 mm step
        assert!(editor.state.curve.is_empty());
        assert_eq!(editor.state.circles.len(), placed);
    }

    #[test]
    fn test_curve_fill_needs_two_points() {
        let mut editor = Editor::new();
        editor.set_mode(Mode::Layout);
        editor.set_tool(Tool::Curve);
        editor.pointer_down(300.0, 300.0, 800.0, 600.0).unwrap();
        editor.pointer_up();
        assert!(editor.fill_curve_path().is_err());
    }

    #[test]
    fn test_color_usage_counts_both_surfaces() {
        let mut editor = Editor::new();
        editor.state.board.set(0, 0, color("#ff0000"));
        editor.state.board.set(1, 0, color("#ff0000"));
        editor.state.circles.push(Circle::new(1.0, 1.0, color("#ff0000")));
        editor.state.circles.push(Circle::new(50.0, 1.0, CellColor::Mask));

        let usage = editor.color_usage();
        assert_eq!(usage.get(&color("#ff0000")), Some(&3));
        assert_eq!(usage.get(&CellColor::Mask), Some(&1));
    }

    #[test]
    fn test_generate_pattern_requires_guide_and_undoes() {
        let mut editor = Editor::new();
        editor.set_mode(Mode::Layout);
        assert!(editor.generate_pattern(false).is_err());

        // A solid black guide traces fully solid at default sensitivity.
        let img = image::RgbaImage::from_pixel(32, 32, image::Rgba([0, 0, 0, 255]));
        editor.set_guide(img);
        editor.select_color(color("#ff0000"));
        let placed = editor.generate_pattern(false).unwrap();
        assert!(placed > 0);
        assert_eq!(editor.state.circles.len(), placed);

        // Edge-only passes place fewer circles than full fills.
        assert!(editor.undo());
        assert!(editor.state.circles.is_empty());
        let edge_placed = editor.generate_pattern(true).unwrap();
        assert!(edge_placed > 0 && edge_placed < placed);
    }

    #[test]
    fn test_pan_snapshots_before_moving() {
        let mut editor = Editor::new();
        editor.pan_grid_by_cells(4, -2);
        assert_eq!(
            (editor.state.viewport.offset_x, editor.state.viewport.offset_y),
            (4, -2)
        );
        assert!(editor.undo());
        assert_eq!(
            (editor.state.viewport.offset_x, editor.state.viewport.offset_y),
            (0, 0)
        );

        editor.pan_layout_by_mm(10.0, 5.0);
        let centered = LayoutView::centered(
            editor.state.board_width_mm(),
            editor.state.board_height_mm(),
        );
        assert_eq!(editor.state.layout_view.offset_x, centered.offset_x + 10.0);
        assert!(editor.undo());
        assert_eq!(editor.state.layout_view.offset_x, centered.offset_x);
    }
}
