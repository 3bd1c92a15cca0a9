// ============================================================================
// BACKGROUND GENERATORS — procedural whole-viewport patterns
// ============================================================================
//
// Each generator fills a grid_height × grid_width buffer of cell colors.
// The editor either writes the buffer straight into the viewport or, when
// mask cells are present, stages it so the commit only lands inside the
// mask (see Editor::generate_background).

use rand::seq::SliceRandom;
use rand::Rng;

use crate::artboard::CellColor;
use crate::components::colors::{Rgb, LIMITED_PALETTE, RAINBOW_PALETTE};

/// A generated pattern, row-major: `buffer[row][col]`.
pub type PatternGrid = Vec<Vec<CellColor>>;

fn paint(rgb: Rgb) -> CellColor {
    CellColor::Paint(rgb)
}

fn random_palette_color(rng: &mut impl Rng) -> Rgb {
    LIMITED_PALETTE[rng.gen_range(0..LIMITED_PALETTE.len())]
}

/// Two distinct random palette entries.
fn random_color_pair(rng: &mut impl Rng) -> (Rgb, Rgb) {
    let first = random_palette_color(rng);
    let mut second = random_palette_color(rng);
    while second == first {
        second = random_palette_color(rng);
    }
    (first, second)
}

/// Render a randomly chosen pattern for a `width × height` viewport.
pub fn random_pattern(width: u32, height: u32, rng: &mut impl Rng) -> PatternGrid {
    let mut grid =
        vec![vec![CellColor::Paint(Rgb::WHITE); width as usize]; height as usize];
    let (w, h) = (width as i32, height as i32);
    match rng.gen_range(0..11) {
        0 => horizontal_rainbow(&mut grid, w, h),
        1 => vertical_rainbow(&mut grid, w, h),
        2 => horizontal_bands(&mut grid, w, h, rng),
        3 => vertical_bands(&mut grid, w, h, rng),
        4 => checkerboard(&mut grid, w, h, rng),
        5 => border(&mut grid, w, h, rng),
        6 => random_rects(&mut grid, w, h, rng),
        7 => tetromino_tiling(&mut grid, w, h, rng),
        8 => concentric_rings(&mut grid, w, h, rng),
        9 => starburst(&mut grid, w, h, rng),
        _ => triangular_wedges(&mut grid, w, h, rng),
    }
    grid
}

fn horizontal_rainbow(grid: &mut PatternGrid, w: i32, h: i32) {
    for x in 0..w {
        let idx = (x as f64 / w as f64 * RAINBOW_PALETTE.len() as f64).floor() as usize;
        let color = paint(RAINBOW_PALETTE[idx.min(RAINBOW_PALETTE.len() - 1)]);
        for y in 0..h {
            grid[y as usize][x as usize] = color;
        }
    }
}

fn vertical_rainbow(grid: &mut PatternGrid, w: i32, h: i32) {
    for y in 0..h {
        let idx = (y as f64 / h as f64 * RAINBOW_PALETTE.len() as f64).floor() as usize;
        let color = paint(RAINBOW_PALETTE[idx.min(RAINBOW_PALETTE.len() - 1)]);
        for x in 0..w {
            grid[y as usize][x as usize] = color;
        }
    }
}

fn horizontal_bands(grid: &mut PatternGrid, w: i32, h: i32, rng: &mut impl Rng) {
    let bands = rng.gen_range(2..7);
    let mut y = 0;
    while y < h {
        let band_h = (rng.gen::<f64>() * (h as f64 / bands as f64)).floor() as i32 + 1;
        let color = paint(random_palette_color(rng));
        for row in y..(y + band_h).min(h) {
            for x in 0..w {
                grid[row as usize][x as usize] = color;
            }
        }
        y += band_h;
    }
}

fn vertical_bands(grid: &mut PatternGrid, w: i32, h: i32, rng: &mut impl Rng) {
    let bands = rng.gen_range(2..7);
    let mut x = 0;
    while x < w {
        let band_w = (rng.gen::<f64>() * (w as f64 / bands as f64)).floor() as i32 + 2;
        let color = paint(random_palette_color(rng));
        for col in x..(x + band_w).min(w) {
            for y in 0..h {
                grid[y as usize][col as usize] = color;
            }
        }
        x += band_w;
    }
}

fn checkerboard(grid: &mut PatternGrid, w: i32, h: i32, rng: &mut impl Rng) {
    let (c1, c2) = random_color_pair(rng);
    let tile = rng.gen_range(1..5);
    for y in 0..h {
        for x in 0..w {
            let parity = (x / tile + y / tile) % 2;
            grid[y as usize][x as usize] = paint(if parity == 0 { c1 } else { c2 });
        }
    }
}

fn border(grid: &mut PatternGrid, w: i32, h: i32, rng: &mut impl Rng) {
    let (border_color, fill_color) = random_color_pair(rng);
    let thickness = rng.gen_range(1..4);
    for y in 0..h {
        for x in 0..w {
            let on_border =
                x < thickness || x >= w - thickness || y < thickness || y >= h - thickness;
            grid[y as usize][x as usize] =
                paint(if on_border { border_color } else { fill_color });
        }
    }
}

fn random_rects(grid: &mut PatternGrid, w: i32, h: i32, rng: &mut impl Rng) {
    let mut base = random_palette_color(rng);
    if base == Rgb::WHITE {
        base = LIMITED_PALETTE[0];
    }
    for row in grid.iter_mut() {
        for cell in row.iter_mut() {
            *cell = paint(base);
        }
    }

    let shapes = rng.gen_range(0..(w / 2).max(1)) + w / 4;
    for _ in 0..shapes {
        let color = random_palette_color(rng);
        if color == base {
            continue;
        }
        let start_x = rng.gen_range(0..w);
        let start_y = rng.gen_range(0..h);
        let shape_w = rng.gen_range(0..(w / 3).max(1)) + 2;
        let shape_h = rng.gen_range(0..(h / 3).max(1)) + 2;
        for y in start_y..(start_y + shape_h).min(h) {
            for x in start_x..(start_x + shape_w).min(w) {
                grid[y as usize][x as usize] = paint(color);
            }
        }
    }
}

/// Tile the viewport with tetromino pieces at 2×2 cells per tile. Cells a
/// piece cannot be fitted into fall back to dark green.
fn tetromino_tiling(grid: &mut PatternGrid, w: i32, h: i32, rng: &mut impl Rng) {
    type Piece = &'static [&'static [u8]];
    const PIECES: &[Piece] = &[
        // I
        &[&[1, 1, 1, 1]],
        &[&[1], &[1], &[1], &[1]],
        // O
        &[&[1, 1], &[1, 1]],
        // T
        &[&[0, 1, 0], &[1, 1, 1]],
        &[&[1, 0], &[1, 1], &[1, 0]],
        &[&[1, 1, 1], &[0, 1, 0]],
        &[&[0, 1], &[1, 1], &[0, 1]],
        // J
        &[&[1, 0, 0], &[1, 1, 1]],
        &[&[1, 1], &[1, 0], &[1, 0]],
        &[&[1, 1, 1], &[0, 0, 1]],
        &[&[0, 1], &[0, 1], &[1, 1]],
        // L
        &[&[0, 0, 1], &[1, 1, 1]],
        &[&[1, 0], &[1, 0], &[1, 1]],
        &[&[1, 1, 1], &[1, 0, 0]],
        &[&[1, 1], &[0, 1], &[0, 1]],
        // S
        &[&[0, 1, 1], &[1, 1, 0]],
        &[&[1, 0], &[1, 1], &[0, 1]],
        // Z
        &[&[1, 1, 0], &[0, 1, 1]],
        &[&[0, 1], &[1, 1], &[1, 0]],
    ];

    let fallback = Rgb::from_hex("#0f8d0f").unwrap();
    let piece_colors: Vec<Rgb> = LIMITED_PALETTE
        .iter()
        .copied()
        .filter(|&c| c != LIMITED_PALETTE[0] && c != Rgb::WHITE)
        .collect();

    let tile_w = w / 2;
    let tile_h = h / 2;
    if tile_w == 0 || tile_h == 0 {
        let color = piece_colors.first().copied().unwrap_or(fallback);
        for row in grid.iter_mut() {
            for cell in row.iter_mut() {
                *cell = paint(color);
            }
        }
        return;
    }

    let mut tiles: Vec<Vec<Option<Rgb>>> = vec![vec![None; tile_w as usize]; tile_h as usize];

    for y in 0..tile_h {
        for x in 0..tile_w {
            if tiles[y as usize][x as usize].is_some() {
                continue;
            }

            let mut order: Vec<usize> = (0..PIECES.len()).collect();
            order.shuffle(rng);
            let mut placed = false;

            'pieces: for &pi in &order {
                let piece = PIECES[pi];
                let ph = piece.len() as i32;
                let pw = piece[0].len() as i32;

                // Try anchoring the piece so one of its filled cells covers
                // (x, y).
                for py in 0..ph {
                    for px in 0..pw {
                        if piece[py as usize][px as usize] == 0 {
                            continue;
                        }
                        let ay = y - py;
                        let ax = x - px;
                        if ay < 0 || ax < 0 || ay + ph > tile_h || ax + pw > tile_w {
                            continue;
                        }

                        let overlaps = (0..ph).any(|cy| {
                            (0..pw).any(|cx| {
                                piece[cy as usize][cx as usize] == 1
                                    && tiles[(ay + cy) as usize][(ax + cx) as usize].is_some()
                            })
                        });
                        if overlaps {
                            continue;
                        }

                        let color = piece_colors[rng.gen_range(0..piece_colors.len())];
                        for cy in 0..ph {
                            for cx in 0..pw {
                                if piece[cy as usize][cx as usize] == 1 {
                                    tiles[(ay + cy) as usize][(ax + cx) as usize] = Some(color);
                                }
                            }
                        }
                        placed = true;
                        break 'pieces;
                    }
                }
            }

            if !placed {
                tiles[y as usize][x as usize] = Some(fallback);
            }
        }
    }

    // Scale the tile grid up 2×, pre-filling with the fallback so odd
    // viewport dimensions stay covered.
    for row in grid.iter_mut() {
        for cell in row.iter_mut() {
            *cell = paint(fallback);
        }
    }
    for ty in 0..tile_h {
        for tx in 0..tile_w {
            let color = tiles[ty as usize][tx as usize].unwrap_or(fallback);
            for dy in 0..2 {
                for dx in 0..2 {
                    grid[(ty * 2 + dy) as usize][(tx * 2 + dx) as usize] = paint(color);
                }
            }
        }
    }
}

fn concentric_rings(grid: &mut PatternGrid, w: i32, h: i32, rng: &mut impl Rng) {
    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0;
    let band = rng.gen_range(2..5) as f64;
    for y in 0..h {
        for x in 0..w {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            let idx = (dist / band).floor() as usize % RAINBOW_PALETTE.len();
            grid[y as usize][x as usize] = paint(RAINBOW_PALETTE[idx]);
        }
    }
}

fn starburst(grid: &mut PatternGrid, w: i32, h: i32, rng: &mut impl Rng) {
    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0;
    let slices = RAINBOW_PALETTE.len() * rng.gen_range(1..3);
    for y in 0..h {
        for x in 0..w {
            let mut angle = (y as f64 - cy).atan2(x as f64 - cx);
            if angle < 0.0 {
                angle += std::f64::consts::TAU;
            }
            let slice = (angle / std::f64::consts::TAU * slices as f64).floor() as usize;
            grid[y as usize][x as usize] = paint(RAINBOW_PALETTE[slice % RAINBOW_PALETTE.len()]);
        }
    }
}

fn triangular_wedges(grid: &mut PatternGrid, w: i32, h: i32, rng: &mut impl Rng) {
    let cx = w as f64 / 2.0;
    let cy = h as f64 / 2.0;
    let wedges = rng.gen_range(4..8) * 2;
    let ring_width = rng.gen_range(3..6) as f64;
    let (c1, c2) = random_color_pair(rng);

    for y in 0..h {
        for x in 0..w {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            let mut angle = dy.atan2(dx);
            if angle < 0.0 {
                angle += std::f64::consts::TAU;
            }
            let ring = (dist / ring_width).floor() as i64;
            let wedge = (angle / std::f64::consts::TAU * wedges as f64).floor() as i64;
            grid[y as usize][x as usize] = paint(if (ring + wedge) % 2 == 0 { c1 } else { c2 });
        }
    }
}
