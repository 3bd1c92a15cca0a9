//! dotboard — a pixel-art editor engine for illuminated peg boards.
//!
//! Two editing surfaces share one document model:
//!
//! * **Grid mode** — a sparse, logically infinite artboard of palette-colored
//!   cells, viewed through a fixed-size window. Brushes, lasso selection with
//!   lift/stamp semantics, flood/global fill, background generators, and
//!   palette-quantized image import all operate here.
//! * **Layout mode** — millimeter-accurate placement of discrete circles on
//!   a physical board, with spatial-hash collision enforcement, guide-image
//!   tracing, pattern generators, and a Bezier-path sampler.
//!
//! Snapshot-based undo/redo spans both surfaces. The `cli` module provides a
//! headless batch interface over the same engine.

pub mod artboard;
pub mod cli;
pub mod components;
pub mod editor;
pub mod io;
pub mod layout;
pub mod logger;
pub mod ops;
pub mod project;
pub mod settings;
pub mod viewport;

pub use artboard::{Artboard, CellColor, BACKGROUND};
pub use editor::{Editor, EditorState, Mode, Tool};
pub use settings::EditorSettings;
