// ============================================================================
// GRID BRUSHES — pencil, square, circle, eraser, mask outline stroke
// ============================================================================

use crate::artboard::{Artboard, Bounds, CellColor, BACKGROUND};
use crate::components::selection::Selection;

/// Hand-tuned disc shapes for tiny brushes, where the analytic circle test
/// degenerates into an ugly blob. Offsets are row-major into an N×N box.
const SMALL_DISC_2: &[(i32, i32)] = &[(0, 0), (1, 0), (0, 1), (1, 1)];
const SMALL_DISC_3: &[(i32, i32)] = &[(0, 1), (1, 0), (1, 1), (1, 2), (2, 1)];
const SMALL_DISC_4: &[(i32, i32)] = &[
    (0, 1), (0, 2), (1, 0), (1, 1), (1, 2), (1, 3),
    (2, 0), (2, 1), (2, 2), (2, 3), (3, 1), (3, 2),
];
const SMALL_DISC_5: &[(i32, i32)] = &[
    (0, 2), (1, 1), (1, 2), (1, 3), (2, 0), (2, 1), (2, 2),
    (2, 3), (2, 4), (3, 1), (3, 2), (3, 3), (4, 2),
];

fn small_disc(size: u32) -> Option<&'static [(i32, i32)]> {
    match size {
        2 => Some(SMALL_DISC_2),
        3 => Some(SMALL_DISC_3),
        4 => Some(SMALL_DISC_4),
        5 => Some(SMALL_DISC_5),
        _ => None,
    }
}

fn allowed(selection: Option<&Selection>, x: i32, y: i32) -> bool {
    selection.map_or(true, |sel| sel.contains(x, y))
}

/// Single-cell pencil.
pub fn pencil(
    board: &mut Artboard,
    selection: Option<&Selection>,
    x: i32,
    y: i32,
    color: CellColor,
) {
    if allowed(selection, x, y) {
        board.set(x, y, color);
    }
}

/// Square brush of `size` cells, centered on the pointer cell.
pub fn square_brush(
    board: &mut Artboard,
    selection: Option<&Selection>,
    x: i32,
    y: i32,
    size: u32,
    color: CellColor,
) {
    let size = size.max(1) as i32;
    let start_x = x - size / 2;
    let start_y = y - size / 2;
    for cy in start_y..start_y + size {
        for cx in start_x..start_x + size {
            if allowed(selection, cx, cy) {
                board.set(cx, cy, color);
            }
        }
    }
}

/// Circular brush. Sizes 2–5 use the hand-tuned disc patterns; larger sizes
/// fall back to a radius test over the bounding square.
pub fn circle_brush(
    board: &mut Artboard,
    selection: Option<&Selection>,
    x: i32,
    y: i32,
    size: u32,
    color: CellColor,
) {
    let size = size.max(1);
    if size == 1 {
        pencil(board, selection, x, y, color);
        return;
    }

    if let Some(pattern) = small_disc(size) {
        let offset = (size / 2) as i32;
        for &(dx, dy) in pattern {
            let cx = x + dx - offset;
            let cy = y + dy - offset;
            if allowed(selection, cx, cy) {
                board.set(cx, cy, color);
            }
        }
        return;
    }

    let radius = size as f64 / 2.0;
    let start_x = (x as f64 - radius).floor() as i32;
    let end_x = (x as f64 + radius).ceil() as i32;
    let start_y = (y as f64 - radius).floor() as i32;
    let end_y = (y as f64 + radius).ceil() as i32;
    for cy in start_y..end_y {
        for cx in start_x..end_x {
            let dx = (cx - x) as f64;
            let dy = (cy - y) as f64;
            if (dx * dx + dy * dy).sqrt() < radius && allowed(selection, cx, cy) {
                board.set(cx, cy, color);
            }
        }
    }
}

/// Square eraser: paints background, which the sparse store turns into
/// key removal.
pub fn pixel_eraser(
    board: &mut Artboard,
    selection: Option<&Selection>,
    x: i32,
    y: i32,
    size: u32,
) {
    square_brush(board, selection, x, y, size, BACKGROUND);
}

// ---------------------------------------------------------------------------
//  Mask outline stroke
// ---------------------------------------------------------------------------

/// Find every mask cell with at least one non-mask 4-neighbor, scanning one
/// cell beyond `bounds` so a stroke can wrap the whole shape. Returns
/// whether any mask cell exists in the scanned area at all, plus the border
/// cells.
pub fn mask_border_cells(board: &Artboard, bounds: Bounds) -> (bool, Vec<(i32, i32)>) {
    let mut has_mask = false;
    let mut border = Vec::new();
    for y in bounds.min_y - 1..=bounds.max_y + 1 {
        for x in bounds.min_x - 1..=bounds.max_x + 1 {
            if !board.get(x, y).is_mask() {
                continue;
            }
            has_mask = true;
            let neighbors = [(x, y - 1), (x, y + 1), (x - 1, y), (x + 1, y)];
            if neighbors.iter().any(|&(nx, ny)| !board.get(nx, ny).is_mask()) {
                border.push((x, y));
            }
        }
    }
    (has_mask, border)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::colors::Rgb;

    fn color(hex: &str) -> CellColor {
        CellColor::Paint(Rgb::from_hex(hex).unwrap())
    }

    #[test]
    fn test_pencil_respects_selection() {
        let mut board = Artboard::new();
        board.set(10, 10, color("#222222"));
        let sel = Selection::from_lasso(vec![(0, 0), (4, 0), (4, 4), (0, 4)], &board).unwrap();

        pencil(&mut board, Some(&sel), 2, 2, color("#ff0000"));
        pencil(&mut board, Some(&sel), 10, 10, color("#ff0000"));
        assert_eq!(board.get(2, 2), color("#ff0000"));
        assert_eq!(board.get(10, 10), color("#222222"));
    }

    #[test]
    fn test_square_brush_footprint() {
        let mut board = Artboard::new();
        square_brush(&mut board, None, 5, 5, 3, color("#0f49ff"));
        assert_eq!(board.len(), 9);
        assert_eq!(board.get(4, 4), color("#0f49ff"));
        assert_eq!(board.get(6, 6), color("#0f49ff"));
        assert_eq!(board.get(7, 5), BACKGROUND);
    }

    #[test]
    fn test_small_disc_pattern() {
        let mut board = Artboard::new();
        circle_brush(&mut board, None, 5, 5, 3, color("#ffff00"));
        // The 3-disc is a plus shape: center plus 4-neighbors.
        assert_eq!(board.len(), 5);
        assert_eq!(board.get(5, 5), color("#ffff00"));
        assert_eq!(board.get(4, 5), color("#ffff00"));
        assert_eq!(board.get(4, 4), BACKGROUND);
    }

    #[test]
    fn test_large_circle_brush_is_round() {
        let mut board = Artboard::new();
        circle_brush(&mut board, None, 10, 10, 8, color("#ff0000"));
        assert_eq!(board.get(10, 10), color("#ff0000"));
        // Corners of the bounding square stay empty.
        assert_eq!(board.get(6, 6), BACKGROUND);
        assert_eq!(board.get(14, 14), BACKGROUND);
    }

    #[test]
    fn test_eraser_removes_cells() {
        let mut board = Artboard::new();
        square_brush(&mut board, None, 5, 5, 3, color("#0f8d0f"));
        pixel_eraser(&mut board, None, 5, 5, 3);
        assert!(board.is_empty());
    }

    #[test]
    fn test_mask_border() {
        let mut board = Artboard::new();
        // A 4×4 mask block: the 12 perimeter cells form the border.
        for y in 0..4 {
            for x in 0..4 {
                board.set(x, y, CellColor::Mask);
            }
        }
        let bounds = board.art_bounds().unwrap();
        let (has_mask, border) = mask_border_cells(&board, bounds);
        assert!(has_mask);
        assert_eq!(border.len(), 12);
        assert!(!border.contains(&(1, 1)));
        assert!(border.contains(&(0, 0)));
    }

    #[test]
    fn test_mask_border_without_mask() {
        let mut board = Artboard::new();
        board.set(0, 0, color("#ff0000"));
        let (has_mask, border) = mask_border_cells(&board, board.art_bounds().unwrap());
        assert!(!has_mask);
        assert!(border.is_empty());
    }
}
