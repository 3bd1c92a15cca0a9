// ============================================================================
// PROJECT FILES — versionless JSON capture/restore for both editing modes
// ============================================================================
//
// Both formats are versionless, so loading is defensive: required fields are
// checked explicitly, optional ones fall back to defaults, and the editor is
// reset *before* any field is applied so a corrupt file can never leave a
// hybrid state behind.

use std::io::Cursor;

use base64::Engine;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::artboard::CellColor;
use crate::editor::{Editor, EditorState, Mode};
use crate::io::ProjectError;
use crate::layout::{Circle, INCH_TO_MM};
use crate::viewport::LayoutView;

/// `artboardOffset` in grid projects.
#[derive(Clone, Copy, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

// ---------------------------------------------------------------------------
//  Grid mode (.pixelart)
// ---------------------------------------------------------------------------

/// Grid-mode project: the viewport dimensions, its anchor, and the sparse
/// cells as `["x,y", colorToken]` pairs.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GridProject {
    pub mode: String,
    #[serde(default)]
    pub grid_width: u32,
    #[serde(default)]
    pub grid_height: u32,
    #[serde(default)]
    pub artboard_offset: Offset,
    #[serde(default)]
    pub pixel_data: Option<Vec<(String, CellColor)>>,
}

fn parse_cell_key(key: &str) -> Option<(i32, i32)> {
    let (x, y) = key.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

impl GridProject {
    pub fn capture(state: &EditorState) -> Self {
        let mut entries: Vec<((i32, i32), CellColor)> =
            state.board.iter().map(|(&k, &c)| (k, c)).collect();
        entries.sort_by_key(|&((x, y), _)| (y, x));
        Self {
            mode: "generate".to_string(),
            grid_width: state.viewport.grid_width,
            grid_height: state.viewport.grid_height,
            artboard_offset: Offset {
                x: state.viewport.offset_x,
                y: state.viewport.offset_y,
            },
            pixel_data: Some(
                entries
                    .into_iter()
                    .map(|((x, y), c)| (format!("{},{}", x, y), c))
                    .collect(),
            ),
        }
    }

    /// Restore into a freshly-reset editor. Rejects files missing the
    /// required fields; normalizes coordinates so the minimum occupied cell
    /// becomes (0,0), shifting the viewport anchor to compensate so the
    /// visible window is unchanged.
    pub fn apply(self, editor: &mut Editor) -> Result<(), ProjectError> {
        // Reset first: a corrupt file leaves clean defaults, never a hybrid.
        editor.reset_project();
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(ProjectError::InvalidFormat(
                "missing gridWidth/gridHeight".to_string(),
            ));
        }
        let Some(pixel_data) = self.pixel_data else {
            return Err(ProjectError::InvalidFormat("missing pixelData".to_string()));
        };

        let mut cells = Vec::with_capacity(pixel_data.len());
        for (key, color) in &pixel_data {
            let Some(cell) = parse_cell_key(key) else {
                return Err(ProjectError::InvalidFormat(format!(
                    "bad cell key '{}'",
                    key
                )));
            };
            cells.push((cell, *color));
        }

        // Normalize: shift everything so the minimum occupied coordinate is
        // (0,0), compensating through the viewport anchor.
        let mut offset = self.artboard_offset;
        if let Some(&((fx, fy), _)) = cells.first() {
            let (mut min_x, mut min_y) = (fx, fy);
            for &((x, y), _) in &cells {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
            }
            if min_x != 0 || min_y != 0 {
                for ((x, y), _) in &mut cells {
                    *x -= min_x;
                    *y -= min_y;
                }
                offset.x -= min_x;
                offset.y -= min_y;
            }
        }

        editor.set_mode(Mode::Grid);
        editor.state.viewport.grid_width = self.grid_width;
        editor.state.viewport.grid_height = self.grid_height;
        editor.state.viewport.offset_x = offset.x;
        editor.state.viewport.offset_y = offset.y;
        editor.state.board.clear();
        for ((x, y), color) in cells {
            editor.state.board.set(x, y, color);
        }
        editor.history.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
//  Layout mode (.ltjproj)
// ---------------------------------------------------------------------------

/// Saved guide placement: the raster travels as a base64 PNG data URL.
#[derive(Serialize, Deserialize, Debug)]
pub struct GuideState {
    #[serde(rename = "imageDataUrl")]
    pub image_data_url: String,
    #[serde(rename = "artboardX")]
    pub artboard_x: f64,
    #[serde(rename = "artboardY")]
    pub artboard_y: f64,
    #[serde(rename = "widthMM")]
    pub width_mm: f64,
    #[serde(rename = "heightMM")]
    pub height_mm: f64,
}

/// Circle sizing knobs as stored on the wire (stringly, matching the
/// project format).
#[derive(Serialize, Deserialize, Debug)]
pub struct CircleSettings {
    #[serde(rename = "circleSize")]
    pub circle_size: String,
    #[serde(rename = "circleSeparation")]
    pub circle_separation: String,
}

fn default_board_width_in() -> f64 {
    95.1
}

fn default_board_height_in() -> f64 {
    18.0
}

/// Layout-mode project: physical board dimensions, the placed circles, the
/// optional guide, the view transform, and the sizing settings.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LayoutProject {
    pub mode: String,
    #[serde(default = "default_board_width_in")]
    pub artboard_width_inches: f64,
    #[serde(default = "default_board_height_in")]
    pub artboard_height_inches: f64,
    #[serde(default)]
    pub logo_top_circles: Vec<Circle>,
    #[serde(default)]
    pub logo_top_state: Option<GuideState>,
    #[serde(default)]
    pub logo_top_view: Option<LayoutView>,
    #[serde(default)]
    pub settings: Option<CircleSettings>,
}

impl LayoutProject {
    pub fn capture(editor: &Editor) -> Self {
        let state = &editor.state;
        let guide_state = state.guide.as_ref().and_then(|guide| {
            match image_to_data_url(&guide.image) {
                Ok(url) => Some(GuideState {
                    image_data_url: url,
                    artboard_x: guide.x_mm,
                    artboard_y: guide.y_mm,
                    width_mm: guide.width_mm,
                    height_mm: guide.height_mm,
                }),
                Err(e) => {
                    crate::log_err!("guide image not saved: {}", e);
                    None
                }
            }
        });

        Self {
            mode: "logo-top".to_string(),
            artboard_width_inches: state.board_width_in,
            artboard_height_inches: state.board_height_in,
            logo_top_circles: state.circles.clone(),
            logo_top_state: guide_state,
            logo_top_view: Some(state.layout_view),
            settings: Some(CircleSettings {
                circle_size: editor.settings.circle_size_in.to_string(),
                circle_separation: editor.settings.circle_separation_mm.to_string(),
            }),
        }
    }

    /// Restore into a freshly-reset editor.
    pub fn apply(self, editor: &mut Editor) -> Result<(), ProjectError> {
        if self.mode != "logo-top" {
            return Err(ProjectError::InvalidFormat(
                "not a layout project".to_string(),
            ));
        }

        editor.reset_project();
        editor.set_mode(Mode::Layout);
        editor.state.board_width_in = self.artboard_width_inches;
        editor.state.board_height_in = self.artboard_height_inches;
        editor.state.layout_view = self.logo_top_view.unwrap_or_else(|| {
            LayoutView::centered(
                self.artboard_width_inches * INCH_TO_MM,
                self.artboard_height_inches * INCH_TO_MM,
            )
        });

        if let Some(settings) = self.settings {
            let size = settings.circle_size.parse().unwrap_or(0.5);
            let separation = settings.circle_separation.parse().unwrap_or(12.0);
            editor.set_circle_settings(size, separation);
        }

        editor.state.circles = self.logo_top_circles;

        if let Some(guide) = self.logo_top_state {
            match image_from_data_url(&guide.image_data_url) {
                Ok(image) => {
                    editor.set_guide(image);
                    editor.set_guide_rect(
                        guide.artboard_x,
                        guide.artboard_y,
                        guide.width_mm,
                        guide.height_mm,
                    );
                }
                Err(e) => {
                    // The rest of the project is intact; the guide is only
                    // reference imagery.
                    crate::log_err!("guide image in project file unreadable: {}", e);
                }
            }
        }

        editor.rebuild_circle_grid();
        editor.history.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
//  Data URL helpers
// ---------------------------------------------------------------------------

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

pub fn image_to_data_url(img: &RgbaImage) -> Result<String, String> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img.clone())
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .map_err(|e| format!("PNG encode failed: {}", e))?;
    Ok(format!(
        "{}{}",
        PNG_DATA_URL_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    ))
}

pub fn image_from_data_url(url: &str) -> Result<RgbaImage, String> {
    let payload = url
        .split_once("base64,")
        .map(|(_, data)| data)
        .ok_or_else(|| "not a base64 data URL".to_string())?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| format!("base64 decode failed: {}", e))?;
    let img = image::load_from_memory(&bytes).map_err(|e| format!("image decode failed: {}", e))?;
    Ok(img.to_rgba8())
}
