// ============================================================================
// IO — project files, image import quantization, PNG/SVG export
// ============================================================================

use std::fs;
use std::path::Path;

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::artboard::{Artboard, CellColor};
use crate::components::colors::PaletteMatcher;
use crate::editor::{Editor, Mode};
use crate::layout::Circle;
use crate::project::{GridProject, LayoutProject};
use crate::viewport::GridViewport;

// ---------------------------------------------------------------------------
//  Physical export constants
// ---------------------------------------------------------------------------

/// Physical diameter of one grid dot.
pub const DOT_DIAMETER_MM: f64 = 1.68;
/// Gap between dot edges (same horizontally and vertically).
pub const DOT_GAP_MM: f64 = 0.923;
/// Center-to-center pitch of the grid dots (≈ 2.603 mm).
pub const DOT_STEP_MM: f64 = DOT_DIAMETER_MM + DOT_GAP_MM;
/// Raster export renders one dot diameter at this many pixels.
pub const DOT_DIAMETER_PX: f64 = 40.0;
/// Raster export gutter reserved for the ruler numbers.
const RULER_GUTTER_PX: u32 = 40;
/// Outer padding around the raster export.
const PADDING_PX: u32 = 20;
/// Fixed pixel width of layout-mode PNG exports.
const LAYOUT_EXPORT_WIDTH_PX: u32 = 4000;

// ---------------------------------------------------------------------------
//  Error type for project file operations
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ProjectError {
    Io(std::io::Error),
    Json(String),
    InvalidFormat(String),
}

impl std::fmt::Display for ProjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectError::Io(e) => write!(f, "I/O error: {}", e),
            ProjectError::Json(e) => write!(f, "JSON error: {}", e),
            ProjectError::InvalidFormat(e) => write!(f, "Invalid project file: {}", e),
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<std::io::Error> for ProjectError {
    fn from(e: std::io::Error) -> Self {
        ProjectError::Io(e)
    }
}

impl From<serde_json::Error> for ProjectError {
    fn from(e: serde_json::Error) -> Self {
        ProjectError::Json(e.to_string())
    }
}

// ---------------------------------------------------------------------------
//  Project save / load
// ---------------------------------------------------------------------------

/// Serialize the active mode's project to JSON text.
pub fn project_to_json(editor: &Editor) -> Result<String, ProjectError> {
    match editor.mode {
        Mode::Grid => {
            if editor.state.board.is_empty() {
                return Err(ProjectError::InvalidFormat(
                    "nothing to save — the board is empty".to_string(),
                ));
            }
            Ok(serde_json::to_string(&GridProject::capture(&editor.state))?)
        }
        Mode::Layout => {
            if editor.state.circles.is_empty() && editor.state.guide.is_none() {
                return Err(ProjectError::InvalidFormat(
                    "nothing to save — no circles or guide".to_string(),
                ));
            }
            Ok(serde_json::to_string(&LayoutProject::capture(editor))?)
        }
    }
}

pub fn save_project(editor: &Editor, path: &Path) -> Result<(), ProjectError> {
    let json = project_to_json(editor)?;
    fs::write(path, json)?;
    crate::log_info!("project saved to {}", path.display());
    Ok(())
}

/// Read a project file into a JSON value. Mode dispatch happens at apply
/// time — both formats are versionless JSON objects.
pub fn load_project(path: &Path) -> Result<serde_json::Value, ProjectError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Apply a parsed project to the editor, dispatching on the `mode` field.
/// Returns which mode was loaded.
pub fn apply_project(editor: &mut Editor, value: serde_json::Value) -> Result<Mode, ProjectError> {
    let mode = value
        .get("mode")
        .and_then(|m| m.as_str())
        .unwrap_or("generate")
        .to_string();
    match mode.as_str() {
        "logo-top" => {
            let project: LayoutProject = serde_json::from_value(value)?;
            project.apply(editor)?;
            Ok(Mode::Layout)
        }
        "generate" => {
            let project: GridProject = serde_json::from_value(value)?;
            project.apply(editor)?;
            Ok(Mode::Grid)
        }
        other => Err(ProjectError::InvalidFormat(format!(
            "unknown mode '{}'",
            other
        ))),
    }
}

// ---------------------------------------------------------------------------
//  Image import quantization
// ---------------------------------------------------------------------------

/// Alpha below this is treated as empty during import.
const IMPORT_ALPHA_CUTOFF: u8 = 128;

/// Quantize an image into artboard cells: scale it to fit the viewport
/// (aspect-preserving, times the user's `scale` factor), palette-match every
/// sufficiently opaque pixel, and center the result in the window. Rows are
/// quantized in parallel; this runs before any store mutation.
pub fn quantize_image(
    img: &RgbaImage,
    viewport: &GridViewport,
    scale: f64,
    matcher: &PaletteMatcher,
) -> Vec<((i32, i32), CellColor)> {
    let grid_w = viewport.grid_width as f64;
    let grid_h = viewport.grid_height as f64;
    let img_aspect = img.width() as f64 / img.height().max(1) as f64;
    let grid_aspect = grid_w / grid_h;

    let (draw_w, draw_h) = if img_aspect > grid_aspect {
        let w = grid_w * scale;
        (w, w / img_aspect)
    } else {
        let h = grid_h * scale;
        (h * img_aspect, h)
    };
    let draw_w = (draw_w.round().max(1.0)) as u32;
    let draw_h = (draw_h.round().max(1.0)) as u32;

    let resized =
        image::imageops::resize(img, draw_w, draw_h, image::imageops::FilterType::Nearest);

    let start_x =
        viewport.offset_x + ((viewport.grid_width as f64 - draw_w as f64) / 2.0).floor() as i32;
    let start_y =
        viewport.offset_y + ((viewport.grid_height as f64 - draw_h as f64) / 2.0).floor() as i32;

    (0..draw_h)
        .into_par_iter()
        .flat_map_iter(|y| {
            let resized = &resized;
            (0..draw_w).filter_map(move |x| {
                let [r, g, b, a] = resized.get_pixel(x, y).0;
                if a < IMPORT_ALPHA_CUTOFF {
                    return None;
                }
                let color = CellColor::Paint(matcher.closest(r, g, b));
                Some(((start_x + x as i32, start_y + y as i32), color))
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
//  Raster helpers
// ---------------------------------------------------------------------------

fn fill_disc(img: &mut RgbaImage, cx: f64, cy: f64, radius: f64, color: Rgba<u8>) {
    let min_x = ((cx - radius).floor().max(0.0)) as u32;
    let min_y = ((cy - radius).floor().max(0.0)) as u32;
    let max_x = ((cx + radius).ceil() as u32).min(img.width().saturating_sub(1));
    let max_y = ((cy + radius).ceil() as u32).min(img.height().saturating_sub(1));
    let r_sq = radius * radius;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= r_sq {
                img.put_pixel(x, y, color);
            }
        }
    }
}

/// 5×8 bitmap digits for the exported ruler numbers ('1' is 4 wide).
const DIGIT_GLYPHS: [&[&[u8]]; 10] = [
    &[&[0,1,1,1,0], &[1,0,0,0,1], &[1,0,0,1,1], &[1,0,1,0,1], &[1,1,0,0,1], &[1,0,0,0,1], &[0,1,1,1,0], &[0,0,0,0,0]],
    &[&[0,1,1,0], &[0,0,1,0], &[0,0,1,0], &[0,0,1,0], &[0,0,1,0], &[0,0,1,0], &[0,1,1,1], &[0,0,0,0]],
    &[&[0,1,1,1,0], &[1,0,0,0,1], &[0,0,0,0,1], &[0,0,0,1,0], &[0,0,1,0,0], &[0,1,0,0,0], &[1,1,1,1,1], &[0,0,0,0,0]],
    &[&[0,1,1,1,0], &[1,0,0,0,1], &[0,0,0,1,0], &[0,0,1,1,0], &[0,0,0,0,1], &[1,0,0,0,1], &[0,1,1,1,0], &[0,0,0,0,0]],
    &[&[0,0,0,1,0], &[0,0,1,1,0], &[0,1,0,1,0], &[1,0,0,1,0], &[1,1,1,1,1], &[0,0,0,1,0], &[0,0,0,1,0], &[0,0,0,0,0]],
    &[&[1,1,1,1,1], &[1,0,0,0,0], &[1,1,1,1,0], &[0,0,0,0,1], &[0,0,0,0,1], &[1,0,0,0,1], &[0,1,1,1,0], &[0,0,0,0,0]],
    &[&[0,0,1,1,0], &[0,1,0,0,0], &[1,0,0,0,0], &[1,1,1,1,0], &[1,0,0,0,1], &[1,0,0,0,1], &[0,1,1,1,0], &[0,0,0,0,0]],
    &[&[1,1,1,1,1], &[0,0,0,0,1], &[0,0,0,1,0], &[0,0,1,0,0], &[0,0,1,0,0], &[0,1,0,0,0], &[0,1,0,0,0], &[0,0,0,0,0]],
    &[&[0,1,1,1,0], &[1,0,0,0,1], &[1,0,0,0,1], &[0,1,1,1,0], &[1,0,0,0,1], &[1,0,0,0,1], &[0,1,1,1,0], &[0,0,0,0,0]],
    &[&[0,1,1,1,0], &[1,0,0,0,1], &[1,0,0,0,1], &[0,1,1,1,1], &[0,0,0,0,1], &[0,0,0,1,0], &[0,1,1,0,0], &[0,0,0,0,0]],
];

/// Blit a non-negative number centered at `(cx, cy)`, scaled up from the
/// 8-row glyphs by an integer factor.
fn draw_number(img: &mut RgbaImage, number: u32, cx: f64, cy: f64, scale: u32, color: Rgba<u8>) {
    let digits: Vec<usize> = number
        .to_string()
        .bytes()
        .map(|b| (b - b'0') as usize)
        .collect();
    let total_w: u32 = digits
        .iter()
        .map(|&d| DIGIT_GLYPHS[d][0].len() as u32 * scale)
        .sum::<u32>()
        + (digits.len().saturating_sub(1) as u32) * scale;
    let glyph_h = 8 * scale;

    let mut pen_x = (cx - total_w as f64 / 2.0).round() as i64;
    let top = (cy - glyph_h as f64 / 2.0).round() as i64;
    for &d in &digits {
        let glyph = DIGIT_GLYPHS[d];
        for (row, bits) in glyph.iter().enumerate() {
            for (col, &bit) in bits.iter().enumerate() {
                if bit == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        let px = pen_x + (col as u32 * scale + sx) as i64;
                        let py = top + (row as u32 * scale + sy) as i64;
                        if px >= 0 && py >= 0 && (px as u32) < img.width() && (py as u32) < img.height()
                        {
                            img.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
        pen_x += (glyph[0].len() as u32 * scale + scale) as i64;
    }
}

// ---------------------------------------------------------------------------
//  Grid-mode export
// ---------------------------------------------------------------------------

fn viewport_all_mask(board: &Artboard, viewport: &GridViewport) -> bool {
    for vy in 0..viewport.grid_height as i32 {
        for vx in 0..viewport.grid_width as i32 {
            let (x, y) = viewport.view_to_abs(vx, vy);
            if !board.get(x, y).is_mask() {
                return false;
            }
        }
    }
    true
}

/// Render the visible window as a drill-map style raster: black backdrop,
/// one white disc per non-mask cell at the physical pitch (scaled to
/// [`DOT_DIAMETER_PX`]), with 1-based ruler numbers in the gutters. Mask
/// cells are skipped, letting the backdrop show through.
pub fn render_grid_png(board: &Artboard, viewport: &GridViewport) -> Result<RgbaImage, String> {
    if viewport_all_mask(board, viewport) {
        return Err("There is no visible artwork in the current view to export.".to_string());
    }

    let radius_px = DOT_DIAMETER_PX / 2.0;
    let step_px = (DOT_STEP_MM / DOT_DIAMETER_MM) * DOT_DIAMETER_PX;

    let (gw, gh) = (viewport.grid_width, viewport.grid_height);
    let art_area_w = if gw > 1 { (gw - 1) as f64 * step_px } else { 0.0 };
    let art_area_h = if gh > 1 { (gh - 1) as f64 * step_px } else { 0.0 };
    let art_px_w = art_area_w + DOT_DIAMETER_PX;
    let art_px_h = art_area_h + DOT_DIAMETER_PX;

    let width = RULER_GUTTER_PX + art_px_w.ceil() as u32 + PADDING_PX;
    let height = RULER_GUTTER_PX + art_px_h.ceil() as u32 + PADDING_PX;
    let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));

    let origin_x = RULER_GUTTER_PX as f64 + radius_px;
    let origin_y = RULER_GUTTER_PX as f64 + radius_px;

    // Ruler numbers are viewport-relative and 1-based.
    let font_color = Rgba([0xe0, 0xe0, 0xe0, 255]);
    let glyph_scale = ((radius_px * 0.9 / 8.0).round() as u32).max(1);
    for x in 0..gw {
        draw_number(
            &mut img,
            x + 1,
            origin_x + x as f64 * step_px,
            RULER_GUTTER_PX as f64 / 2.0,
            glyph_scale,
            font_color,
        );
    }
    for y in 0..gh {
        draw_number(
            &mut img,
            y + 1,
            RULER_GUTTER_PX as f64 / 2.0,
            origin_y + y as f64 * step_px,
            glyph_scale,
            font_color,
        );
    }

    let white = Rgba([255, 255, 255, 255]);
    for vy in 0..gh as i32 {
        for vx in 0..gw as i32 {
            let (x, y) = viewport.view_to_abs(vx, vy);
            if board.get(x, y).is_mask() {
                continue;
            }
            fill_disc(
                &mut img,
                origin_x + vx as f64 * step_px,
                origin_y + vy as f64 * step_px,
                radius_px,
                white,
            );
        }
    }

    Ok(img)
}

/// SVG twin of [`render_grid_png`], in true millimeter units: one circle per
/// non-mask cell in the window at the physical diameter and pitch.
pub fn render_grid_svg(board: &Artboard, viewport: &GridViewport) -> Result<String, String> {
    if viewport_all_mask(board, viewport) {
        return Err("There is no visible artwork in the current view to export.".to_string());
    }

    let radius_mm = DOT_DIAMETER_MM / 2.0;
    let margin_mm = DOT_STEP_MM;
    let (gw, gh) = (viewport.grid_width, viewport.grid_height);
    let art_w = if gw > 1 { (gw - 1) as f64 * DOT_STEP_MM } else { 0.0 };
    let art_h = if gh > 1 { (gh - 1) as f64 * DOT_STEP_MM } else { 0.0 };
    let total_w = art_w + 2.0 * margin_mm;
    let total_h = art_h + 2.0 * margin_mm;

    let mut svg = format!(
        "<svg width=\"{:.3}mm\" height=\"{:.3}mm\" viewBox=\"0 0 {:.3} {:.3}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        total_w, total_h, total_w, total_h
    );
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"#000000\" />\n");

    for vy in 0..gh as i32 {
        for vx in 0..gw as i32 {
            let (x, y) = viewport.view_to_abs(vx, vy);
            if board.get(x, y).is_mask() {
                continue;
            }
            svg.push_str(&format!(
                "  <circle cx=\"{:.3}\" cy=\"{:.3}\" r=\"{}\" fill=\"#ffffff\" />\n",
                margin_mm + vx as f64 * DOT_STEP_MM,
                margin_mm + vy as f64 * DOT_STEP_MM,
                radius_mm
            ));
        }
    }

    svg.push_str("</svg>");
    Ok(svg)
}

// ---------------------------------------------------------------------------
//  Layout-mode export
// ---------------------------------------------------------------------------

/// Render the placed circles at a fixed export width, scaled to the physical
/// board aspect. Mask-colored circles are excluded.
pub fn render_layout_png(
    circles: &[Circle],
    board_w_mm: f64,
    board_h_mm: f64,
    diameter_mm: f64,
) -> Result<RgbaImage, String> {
    if circles.is_empty() {
        return Err("There is no artwork to export.".to_string());
    }

    let scale = LAYOUT_EXPORT_WIDTH_PX as f64 / board_w_mm;
    let height = ((board_h_mm * scale).round() as u32).max(1);
    let mut img = RgbaImage::from_pixel(LAYOUT_EXPORT_WIDTH_PX, height, Rgba([0, 0, 0, 255]));

    let radius_px = diameter_mm / 2.0 * scale;
    for circle in circles {
        let CellColor::Paint(rgb) = circle.color else {
            continue; // mask-colored circles stay out of exports
        };
        fill_disc(
            &mut img,
            circle.x * scale,
            circle.y * scale,
            radius_px,
            Rgba([rgb.r, rgb.g, rgb.b, 255]),
        );
    }
    Ok(img)
}

/// SVG twin of [`render_layout_png`] at true mm coordinates and diameter.
pub fn render_layout_svg(
    circles: &[Circle],
    board_w_mm: f64,
    board_h_mm: f64,
    diameter_mm: f64,
) -> Result<String, String> {
    if circles.is_empty() {
        return Err("There is no artwork to export.".to_string());
    }

    let radius_mm = diameter_mm / 2.0;
    let mut svg = format!(
        "<svg width=\"{:.3}mm\" height=\"{:.3}mm\" viewBox=\"0 0 {:.3} {:.3}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        board_w_mm, board_h_mm, board_w_mm, board_h_mm
    );
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"#000000\" />\n");

    for circle in circles {
        let CellColor::Paint(rgb) = circle.color else {
            continue;
        };
        svg.push_str(&format!(
            "  <circle cx=\"{:.3}\" cy=\"{:.3}\" r=\"{:.3}\" fill=\"{}\" />\n",
            circle.x,
            circle.y,
            radius_mm,
            rgb.hex()
        ));
    }

    svg.push_str("</svg>");
    Ok(svg)
}

// ---------------------------------------------------------------------------
//  File helpers
// ---------------------------------------------------------------------------

pub fn write_png(img: &RgbaImage, path: &Path) -> Result<(), String> {
    img.save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| format!("could not write {}: {}", path.display(), e))
}

pub fn load_image(path: &Path) -> Result<RgbaImage, String> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|e| format!("could not read {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::colors::Rgb;

    fn color(hex: &str) -> CellColor {
        CellColor::Paint(Rgb::from_hex(hex).unwrap())
    }

    #[test]
    fn test_quantize_centers_and_scales() {
        // A 10×10 red square into a 20×10 window: aspect-fit gives a 10×10
        // block centered horizontally at columns 5..15.
        let img = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let vp = GridViewport::new(20, 10);
        let matcher = PaletteMatcher::new();
        let cells = quantize_image(&img, &vp, 1.0, &matcher);
        assert_eq!(cells.len(), 100);
        let xs: Vec<i32> = cells.iter().map(|((x, _), _)| *x).collect();
        assert_eq!(*xs.iter().min().unwrap(), 5);
        assert_eq!(*xs.iter().max().unwrap(), 14);
        assert!(cells.iter().all(|(_, c)| *c == color("#ff0000")));
    }

    #[test]
    fn test_quantize_skips_transparent() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 255, 10]));
        let vp = GridViewport::new(4, 4);
        let matcher = PaletteMatcher::new();
        let cells = quantize_image(&img, &vp, 1.0, &matcher);
        assert_eq!(cells.len(), 15);
    }

    #[test]
    fn test_grid_png_skips_mask_and_fails_on_all_mask() {
        let mut board = Artboard::new();
        let vp = GridViewport::new(3, 2);
        for y in 0..2 {
            for x in 0..3 {
                board.set(x, y, CellColor::Mask);
            }
        }
        assert!(render_grid_png(&board, &vp).is_err());

        // One visible cell is enough to export.
        board.set(1, 1, color("#ff0000"));
        let img = render_grid_png(&board, &vp).unwrap();
        let step_px = (DOT_STEP_MM / DOT_DIAMETER_MM) * DOT_DIAMETER_PX;
        let expected_w = RULER_GUTTER_PX as f64 + 2.0 * step_px + DOT_DIAMETER_PX;
        assert_eq!(img.width(), expected_w.ceil() as u32 + PADDING_PX);

        // Cell (1,1) renders as a white disc; cell (0,0) stays black.
        let origin = RULER_GUTTER_PX as f64 + DOT_DIAMETER_PX / 2.0;
        let center = |v: i32| (origin + v as f64 * step_px) as u32;
        assert_eq!(img.get_pixel(center(1), center(1)).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(center(0), center(0)).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_grid_svg_counts_circles() {
        let mut board = Artboard::new();
        let vp = GridViewport::new(3, 3);
        board.set(0, 0, CellColor::Mask);
        let svg = render_grid_svg(&board, &vp).unwrap();
        // 9 cells minus one mask.
        assert_eq!(svg.matches("<circle").count(), 8);
        assert!(svg.contains("width=\"10.412mm\""));
        assert!(svg.contains("r=\"0.84\""));
    }

    #[test]
    fn test_layout_exports_exclude_mask_circles() {
        let circles = vec![
            Circle::new(10.0, 10.0, color("#0f49ff")),
            Circle::new(30.0, 10.0, CellColor::Mask),
        ];
        let svg = render_layout_svg(&circles, 100.0, 50.0, 12.7).unwrap();
        assert_eq!(svg.matches("<circle").count(), 1);
        assert!(svg.contains("fill=\"#0f49ff\""));

        let png = render_layout_png(&circles, 100.0, 50.0, 12.7).unwrap();
        assert_eq!(png.width(), 4000);
        assert_eq!(png.height(), 2000);
        // The blue circle center is filled, the mask circle's is not.
        assert_eq!(png.get_pixel(400, 400).0, [0x0f, 0x49, 0xff, 255]);
        assert_eq!(png.get_pixel(1200, 400).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_layout_export_requires_artwork() {
        assert!(render_layout_png(&[], 100.0, 50.0, 12.7).is_err());
        assert!(render_layout_svg(&[], 100.0, 50.0, 12.7).is_err());
    }
}
