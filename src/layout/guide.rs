// ============================================================================
// GUIDE IMAGE — traced raster sampled into a bilevel placement mask
// ============================================================================

use image::RgbaImage;

/// Fixed horizontal resolution the guide is resampled to before tracing.
/// Bounds the cost of every mask pass (including concentric erosion), which
/// must complete synchronously inside one action.
pub const PROCESS_WIDTH: u32 = 200;

/// Alpha below this is never solid, regardless of brightness.
const ALPHA_CUTOFF: u8 = 128;

/// The uploaded guide raster plus its placement rectangle on the physical
/// board, in millimeters.
#[derive(Clone, Debug)]
pub struct GuideImage {
    pub image: RgbaImage,
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl GuideImage {
    /// Default placement: half the board width, aspect-preserving height,
    /// centered on the board.
    pub fn centered(image: RgbaImage, board_w_mm: f64, board_h_mm: f64) -> Self {
        let aspect = image.width() as f64 / image.height().max(1) as f64;
        let width_mm = board_w_mm / 2.0;
        let height_mm = width_mm / aspect;
        Self {
            x_mm: (board_w_mm - width_mm) / 2.0,
            y_mm: (board_h_mm - height_mm) / 2.0,
            width_mm,
            height_mm,
            image,
        }
    }
}

/// Bilevel trace of the guide: one bool per processed pixel, plus the
/// mm↔pixel mapping back onto the board. A pixel is solid iff its alpha
/// clears the cutoff and its brightness compares against the sensitivity
/// threshold (below it normally, above it when inverted).
#[derive(Clone, Debug)]
pub struct GuideMask {
    width: u32,
    height: u32,
    solid: Vec<bool>,
    pub origin_x_mm: f64,
    pub origin_y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub mm_per_px_x: f64,
    pub mm_per_px_y: f64,
}

impl GuideMask {
    /// Trace a guide at [`PROCESS_WIDTH`]. `sensitivity` is the 0..1
    /// brightness threshold.
    pub fn trace(guide: &GuideImage, sensitivity: f64, inverted: bool) -> GuideMask {
        let width = PROCESS_WIDTH;
        let height =
            ((width as f64 * (guide.height_mm / guide.width_mm)).round() as u32).max(1);
        let resized = image::imageops::resize(
            &guide.image,
            width,
            height,
            image::imageops::FilterType::Triangle,
        );

        let mut solid = vec![false; (width * height) as usize];
        for (i, pixel) in resized.pixels().enumerate() {
            let [r, g, b, a] = pixel.0;
            if a < ALPHA_CUTOFF {
                continue;
            }
            let brightness = (r as f64 + g as f64 + b as f64) / (255.0 * 3.0);
            solid[i] = if inverted {
                brightness > sensitivity
            } else {
                brightness < sensitivity
            };
        }

        GuideMask {
            width,
            height,
            solid,
            origin_x_mm: guide.x_mm,
            origin_y_mm: guide.y_mm,
            width_mm: guide.width_mm,
            height_mm: guide.height_mm,
            mm_per_px_x: guide.width_mm / width as f64,
            mm_per_px_y: guide.height_mm / height as f64,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Solidity at a mask pixel; out-of-range is never solid.
    pub fn solid(&self, px: i64, py: i64) -> bool {
        if px < 0 || px >= self.width as i64 || py < 0 || py >= self.height as i64 {
            return false;
        }
        self.solid[(py as u32 * self.width + px as u32) as usize]
    }

    /// Solid with at least one non-solid 4-neighbor.
    pub fn is_edge(&self, px: i64, py: i64) -> bool {
        self.solid(px, py)
            && (!self.solid(px + 1, py)
                || !self.solid(px - 1, py)
                || !self.solid(px, py + 1)
                || !self.solid(px, py - 1))
    }

    /// Map a board position (mm) to its mask pixel, if it falls on the
    /// guide rectangle at all.
    fn mask_pixel(&self, x_mm: f64, y_mm: f64) -> Option<(i64, i64)> {
        let rel_x = x_mm - self.origin_x_mm;
        let rel_y = y_mm - self.origin_y_mm;
        if rel_x < 0.0 || rel_y < 0.0 || rel_x >= self.width_mm || rel_y >= self.height_mm {
            return None;
        }
        Some((
            (rel_x / self.mm_per_px_x).round() as i64,
            (rel_y / self.mm_per_px_y).round() as i64,
        ))
    }

    /// Solidity at a board position (mm).
    pub fn solid_at_mm(&self, x_mm: f64, y_mm: f64) -> bool {
        match self.mask_pixel(x_mm, y_mm) {
            Some((px, py)) => self.solid(px, py),
            None => false,
        }
    }

    /// Edge test in board space: solid here, but not at one of the four
    /// positions one mask pixel away.
    pub fn is_edge_at_mm(&self, x_mm: f64, y_mm: f64) -> bool {
        self.solid_at_mm(x_mm, y_mm)
            && (!self.solid_at_mm(x_mm + self.mm_per_px_x, y_mm)
                || !self.solid_at_mm(x_mm - self.mm_per_px_x, y_mm)
                || !self.solid_at_mm(x_mm, y_mm + self.mm_per_px_y)
                || !self.solid_at_mm(x_mm, y_mm - self.mm_per_px_y))
    }

    /// All currently-solid pixels that sit on an edge. The concentric
    /// generator peels these off ring by ring.
    pub fn edge_pixels(&self) -> Vec<(u32, u32)> {
        let mut edges = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_edge(x as i64, y as i64) {
                    edges.push((x, y));
                }
            }
        }
        edges
    }

    /// Clear a pixel (erosion step on a working copy).
    pub fn clear(&mut self, px: u32, py: u32) {
        if px < self.width && py < self.height {
            self.solid[(py * self.width + px) as usize] = false;
        }
    }

    /// Board position (mm) of a mask pixel's sample point.
    pub fn pixel_to_mm(&self, px: u32, py: u32) -> (f64, f64) {
        (
            self.origin_x_mm + px as f64 * self.mm_per_px_x,
            self.origin_y_mm + py as f64 * self.mm_per_px_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// A guide whose left half is black (solid at default sensitivity) and
    /// right half white.
    fn half_black_guide() -> GuideImage {
        let mut img = RgbaImage::new(100, 50);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            *pixel = if x < 50 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            };
        }
        GuideImage {
            image: img,
            x_mm: 10.0,
            y_mm: 20.0,
            width_mm: 100.0,
            height_mm: 50.0,
        }
    }

    #[test]
    fn test_sensitivity_and_invert() {
        let guide = half_black_guide();
        let mask = GuideMask::trace(&guide, 0.2, false);
        assert!(mask.solid(10, 10));
        assert!(!mask.solid(190, 10));

        let inverted = GuideMask::trace(&guide, 0.2, true);
        assert!(!inverted.solid(10, 10));
        assert!(inverted.solid(190, 10));
    }

    #[test]
    fn test_transparent_is_never_solid() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0]));
        let guide = GuideImage {
            image: img,
            x_mm: 0.0,
            y_mm: 0.0,
            width_mm: 10.0,
            height_mm: 10.0,
        };
        let mask = GuideMask::trace(&guide, 0.5, false);
        assert!(mask.edge_pixels().is_empty());
        assert!(!mask.solid_at_mm(5.0, 5.0));
    }

    #[test]
    fn test_mm_mapping_respects_placement() {
        let guide = half_black_guide();
        let mask = GuideMask::trace(&guide, 0.2, false);
        // 30mm into the board is 20mm into the guide — the black half.
        assert!(mask.solid_at_mm(30.0, 40.0));
        // 105mm is in the white half.
        assert!(!mask.solid_at_mm(105.0, 40.0));
        // Off the guide rectangle entirely.
        assert!(!mask.solid_at_mm(5.0, 40.0));
        assert!(!mask.solid_at_mm(30.0, 5.0));
    }

    #[test]
    fn test_edge_detection_and_erosion() {
        let guide = half_black_guide();
        let mut mask = GuideMask::trace(&guide, 0.2, false);
        let edges = mask.edge_pixels();
        assert!(!edges.is_empty());
        // Interior pixels are not edges.
        assert!(!mask.is_edge(10, 10));

        // Erode one full ring: the edge set moves inward.
        for &(x, y) in &edges {
            mask.clear(x, y);
        }
        let next = mask.edge_pixels();
        assert!(!next.is_empty());
        assert!(next.iter().all(|p| !edges.contains(p)));
    }

    #[test]
    fn test_centered_placement() {
        let img = RgbaImage::new(200, 100);
        let guide = GuideImage::centered(img, 584.2, 584.2);
        assert!((guide.width_mm - 292.1).abs() < 1e-9);
        assert!((guide.height_mm - 146.05).abs() < 1e-9);
        assert!((guide.x_mm - 146.05).abs() < 1e-9);
    }
}
