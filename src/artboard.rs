// ============================================================================
// SPARSE ARTBOARD — infinite integer-plane color store
// ============================================================================

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::components::colors::Rgb;

/// Token string for the reserved mask sentinel in project files.
pub const MASK_TOKEN: &str = "mask";

/// The value stored in an artboard cell: either a concrete palette color or
/// the reserved mask sentinel. The mask marks a cell as "reserved" — it is
/// excluded from exports and is the only thing background generators will
/// overwrite when committing a staged pattern.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CellColor {
    Mask,
    Paint(Rgb),
}

/// White — the implicit color of every absent cell.
pub const BACKGROUND: CellColor = CellColor::Paint(Rgb::WHITE);

impl CellColor {
    /// The serialized token: `"mask"` or `"#rrggbb"`.
    pub fn token(&self) -> String {
        match self {
            CellColor::Mask => MASK_TOKEN.to_string(),
            CellColor::Paint(rgb) => rgb.hex(),
        }
    }

    pub fn from_token(token: &str) -> Option<CellColor> {
        if token == MASK_TOKEN {
            Some(CellColor::Mask)
        } else {
            Rgb::from_hex(token).map(CellColor::Paint)
        }
    }

    pub fn is_background(&self) -> bool {
        *self == BACKGROUND
    }

    pub fn is_mask(&self) -> bool {
        matches!(self, CellColor::Mask)
    }
}

// Project files carry cell colors as plain token strings.
impl Serialize for CellColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.token())
    }
}

impl<'de> Deserialize<'de> for CellColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TokenVisitor;
        impl Visitor<'_> for TokenVisitor {
            type Value = CellColor;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a color token (\"mask\" or \"#rrggbb\")")
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<CellColor, E> {
                CellColor::from_token(v)
                    .ok_or_else(|| E::custom(format!("invalid color token '{}'", v)))
            }
        }
        deserializer.deserialize_str(TokenVisitor)
    }
}

/// Inclusive axis-aligned bounds on the artboard plane.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Bounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Bounds {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn width(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y + 1
    }
}

// ---------------------------------------------------------------------------
//  The store
// ---------------------------------------------------------------------------

/// Sparse mapping from integer coordinate to cell color on an unbounded
/// plane. Absent keys read as [`BACKGROUND`]; writing the background color
/// removes the key, so `len()` is always exactly the number of
/// non-background cells and memory stays proportional to drawn content.
///
/// No bounds checking anywhere — every `i32` coordinate is valid, which is
/// what makes the artboard logically infinite.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Artboard {
    cells: HashMap<(i32, i32), CellColor>,
}

impl Artboard {
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }

    pub fn get(&self, x: i32, y: i32) -> CellColor {
        self.cells.get(&(x, y)).copied().unwrap_or(BACKGROUND)
    }

    pub fn set(&mut self, x: i32, y: i32, color: CellColor) {
        if color.is_background() {
            self.cells.remove(&(x, y));
        } else {
            self.cells.insert((x, y), color);
        }
    }

    /// Number of non-background cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(i32, i32), &CellColor)> {
        self.cells.iter()
    }

    /// Occupied keys, for store-wide passes (global fill, normalization).
    pub fn keys(&self) -> impl Iterator<Item = &(i32, i32)> {
        self.cells.keys()
    }

    /// Bounding box of all occupied cells, or `None` when the board is empty.
    pub fn art_bounds(&self) -> Option<Bounds> {
        let mut keys = self.cells.keys();
        let &(x0, y0) = keys.next()?;
        let mut bounds = Bounds {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for &(x, y) in keys {
            bounds.min_x = bounds.min_x.min(x);
            bounds.min_y = bounds.min_y.min(y);
            bounds.max_x = bounds.max_x.max(x);
            bounds.max_y = bounds.max_y.max(y);
        }
        Some(bounds)
    }

    /// Per-color usage counts over the stored (non-background) cells.
    pub fn color_counts(&self) -> HashMap<CellColor, usize> {
        let mut counts: HashMap<CellColor, usize> = HashMap::new();
        for color in self.cells.values() {
            *counts.entry(*color).or_insert(0) += 1;
        }
        counts
    }
}
