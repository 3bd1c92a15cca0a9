// ============================================================================
// PLACEMENT PATTERNS — lattice, disordered, and concentric circle fills
// ============================================================================

use rand::Rng;

use crate::artboard::CellColor;

use super::grid::CircleGrid;
use super::guide::GuideMask;
use super::{try_place, Circle};

/// Automatic placement strategy over a traced guide.
#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillPattern {
    Hexagonal,
    Square,
    Disordered,
    Concentric,
}

impl Default for FillPattern {
    fn default() -> Self {
        FillPattern::Hexagonal
    }
}

/// Run one pattern generation pass. Every candidate funnels through the
/// spatial grid's accept/reject, so generation composes with circles that
/// already exist. Returns the number of circles placed.
#[allow(clippy::too_many_arguments)]
pub fn generate(
    pattern: FillPattern,
    mask: &GuideMask,
    circles: &mut Vec<Circle>,
    grid: &mut CircleGrid,
    step: f64,
    diameter_mm: f64,
    color: CellColor,
    edges_only: bool,
    rng: &mut impl Rng,
) -> usize {
    match pattern {
        FillPattern::Hexagonal | FillPattern::Square => lattice(
            pattern == FillPattern::Hexagonal,
            mask,
            circles,
            grid,
            step,
            color,
            edges_only,
        ),
        FillPattern::Disordered => {
            disordered(mask, circles, grid, step, diameter_mm, color, edges_only, rng)
        }
        FillPattern::Concentric => concentric(mask, circles, grid, step, color, edges_only),
    }
}

/// Regular lattice over the guide's bounding box. Hex mode tightens the row
/// pitch to `step·√3/2` and offsets odd rows by half a step.
fn lattice(
    hexagonal: bool,
    mask: &GuideMask,
    circles: &mut Vec<Circle>,
    grid: &mut CircleGrid,
    step: f64,
    color: CellColor,
    edges_only: bool,
) -> usize {
    let y_step = if hexagonal {
        step * 3f64.sqrt() / 2.0
    } else {
        step
    };

    let row_start = (mask.origin_y_mm / y_step).floor() as i64;
    let row_end = ((mask.origin_y_mm + mask.height_mm) / y_step).ceil() as i64;
    // One extra column each side so the hex offset cannot miss the boundary.
    let col_start = (mask.origin_x_mm / step).floor() as i64 - 1;
    let col_end = ((mask.origin_x_mm + mask.width_mm) / step).ceil() as i64 + 1;

    let mut placed = 0;
    for row in row_start..=row_end {
        let x_offset = if hexagonal && row % 2 != 0 {
            step / 2.0
        } else {
            0.0
        };
        for col in col_start..=col_end {
            let x = col as f64 * step + x_offset;
            let y = row as f64 * y_step;

            if !mask.solid_at_mm(x, y) {
                continue;
            }
            if edges_only && !mask.is_edge_at_mm(x, y) {
                continue;
            }
            if try_place(circles, grid, x, y, step, color) {
                placed += 1;
            }
        }
    }
    placed
}

/// Rejection-sampled random placement. The attempt count is capped at twice
/// the theoretical maximum packing of the guide rectangle, so density
/// saturates without looping forever.
#[allow(clippy::too_many_arguments)]
fn disordered(
    mask: &GuideMask,
    circles: &mut Vec<Circle>,
    grid: &mut CircleGrid,
    step: f64,
    diameter_mm: f64,
    color: CellColor,
    edges_only: bool,
    rng: &mut impl Rng,
) -> usize {
    let area = mask.width_mm * mask.height_mm;
    let circle_area = std::f64::consts::PI * (diameter_mm / 2.0).powi(2);
    if circle_area <= 0.0 {
        return 0;
    }
    let attempts = ((area / circle_area).floor() as usize) * 2;

    let mut placed = 0;
    for _ in 0..attempts {
        let x = mask.origin_x_mm + rng.gen::<f64>() * mask.width_mm;
        let y = mask.origin_y_mm + rng.gen::<f64>() * mask.height_mm;

        if !mask.solid_at_mm(x, y) {
            continue;
        }
        if edges_only && !mask.is_edge_at_mm(x, y) {
            continue;
        }
        if try_place(circles, grid, x, y, step, color) {
            placed += 1;
        }
    }
    placed
}

/// Iterative erosion: place circles along the current edge ring of the
/// mask, peel that ring off a working copy, repeat until nothing solid
/// remains. Edges-only mode stops after the first ring.
fn concentric(
    mask: &GuideMask,
    circles: &mut Vec<Circle>,
    grid: &mut CircleGrid,
    step: f64,
    color: CellColor,
    edges_only: bool,
) -> usize {
    let mut working = mask.clone();
    let mut placed = 0;

    loop {
        let ring = working.edge_pixels();
        if ring.is_empty() {
            break;
        }

        for &(px, py) in &ring {
            let (x, y) = working.pixel_to_mm(px, py);
            if try_place(circles, grid, x, y, step, color) {
                placed += 1;
            }
        }

        if edges_only {
            break;
        }
        for &(px, py) in &ring {
            working.clear(px, py);
        }
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::colors::Rgb;
    use crate::layout::guide::GuideImage;
    use image::{Rgba, RgbaImage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn solid_guide(w_mm: f64, h_mm: f64) -> GuideMask {
        let img = RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 255]));
        let guide = GuideImage {
            image: img,
            x_mm: 0.0,
            y_mm: 0.0,
            width_mm: w_mm,
            height_mm: h_mm,
        };
        GuideMask::trace(&guide, 0.2, false)
    }

    fn check_non_overlapping(circles: &[Circle], step: f64) {
        for (i, a) in circles.iter().enumerate() {
            for b in &circles[i + 1..] {
                let d = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
                assert!(d >= step * 0.994, "overlap at distance {}", d);
            }
        }
    }

    #[test]
    fn test_square_lattice_fills_solid_guide() {
        let mask = solid_guide(100.0, 100.0);
        let step = 10.0;
        let mut circles = Vec::new();
        let mut grid = CircleGrid::new(step);
        let mut rng = StdRng::seed_from_u64(7);
        let placed = generate(
            FillPattern::Square,
            &mask,
            &mut circles,
            &mut grid,
            step,
            8.0,
            CellColor::Paint(Rgb::WHITE),
            false,
            &mut rng,
        );
        // Roughly one circle per step² over the guide area.
        assert!(placed >= 80 && placed <= 130, "placed {}", placed);
        check_non_overlapping(&circles, step);
    }

    #[test]
    fn test_hex_is_denser_than_square() {
        let mask = solid_guide(120.0, 120.0);
        let step = 8.0;
        let mut rng = StdRng::seed_from_u64(7);

        let mut square = Vec::new();
        let mut grid = CircleGrid::new(step);
        generate(
            FillPattern::Square,
            &mask,
            &mut square,
            &mut grid,
            step,
            6.0,
            CellColor::Paint(Rgb::WHITE),
            false,
            &mut rng,
        );

        let mut hex = Vec::new();
        let mut grid = CircleGrid::new(step);
        generate(
            FillPattern::Hexagonal,
            &mask,
            &mut hex,
            &mut grid,
            step,
            6.0,
            CellColor::Paint(Rgb::WHITE),
            false,
            &mut rng,
        );
        assert!(hex.len() > square.len());
        check_non_overlapping(&hex, step);
    }

    #[test]
    fn test_disordered_respects_collision() {
        let mask = solid_guide(80.0, 80.0);
        let step = 9.0;
        let mut circles = Vec::new();
        let mut grid = CircleGrid::new(step);
        let mut rng = StdRng::seed_from_u64(42);
        let placed = generate(
            FillPattern::Disordered,
            &mask,
            &mut circles,
            &mut grid,
            step,
            7.0,
            CellColor::Paint(Rgb::WHITE),
            false,
            &mut rng,
        );
        assert!(placed > 10);
        check_non_overlapping(&circles, step);
    }

    #[test]
    fn test_concentric_edges_only_single_ring() {
        let mask = solid_guide(100.0, 100.0);
        let step = 5.0;

        let mut full = Vec::new();
        let mut grid = CircleGrid::new(step);
        let mut rng = StdRng::seed_from_u64(7);
        generate(
            FillPattern::Concentric,
            &mask,
            &mut full,
            &mut grid,
            step,
            4.0,
            CellColor::Paint(Rgb::WHITE),
            false,
            &mut rng,
        );

        let mut ring = Vec::new();
        let mut grid = CircleGrid::new(step);
        generate(
            FillPattern::Concentric,
            &mask,
            &mut ring,
            &mut grid,
            step,
            4.0,
            CellColor::Paint(Rgb::WHITE),
            true,
            &mut rng,
        );

        // Full erosion keeps going inward; edges-only stops at one ring.
        assert!(full.len() > ring.len());
        check_non_overlapping(&full, step);
    }

    #[test]
    fn test_empty_mask_places_nothing() {
        let img = RgbaImage::from_pixel(32, 32, Rgba([255, 255, 255, 255]));
        let guide = GuideImage {
            image: img,
            x_mm: 0.0,
            y_mm: 0.0,
            width_mm: 50.0,
            height_mm: 50.0,
        };
        let mask = GuideMask::trace(&guide, 0.2, false);
        let mut circles = Vec::new();
        let mut grid = CircleGrid::new(5.0);
        let mut rng = StdRng::seed_from_u64(7);
        for pattern in [
            FillPattern::Square,
            FillPattern::Hexagonal,
            FillPattern::Disordered,
            FillPattern::Concentric,
        ] {
            let placed = generate(
                pattern,
                &mask,
                &mut circles,
                &mut grid,
                5.0,
                4.0,
                CellColor::Paint(Rgb::WHITE),
                false,
                &mut rng,
            );
            assert_eq!(placed, 0);
        }
    }
}
