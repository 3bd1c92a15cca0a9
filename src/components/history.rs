// ============================================================================
// HISTORY MANAGER — bounded snapshot undo/redo with content dedup
// ============================================================================

use std::collections::VecDeque;

use crate::artboard::Artboard;
use crate::components::selection::{FloatingSelection, Selection};
use crate::editor::EditorState;
use crate::layout::Circle;
use crate::viewport::LayoutView;

/// One restorable point of the editing state. Captures everything needed to
/// fully restore editing: the sparse store, the viewport anchor, the circle
/// list, both selection forms, the layout view transform, and the physical
/// board dimensions. The circle spatial index is deliberately absent — it is
/// derived data and is rebuilt after every restore.
#[derive(Clone, PartialEq, Debug)]
pub struct Snapshot {
    board: Artboard,
    offset: (i32, i32),
    circles: Vec<Circle>,
    selection: Option<Selection>,
    floating: Option<FloatingSelection>,
    layout_view: LayoutView,
    board_width_in: f64,
    board_height_in: f64,
}

impl Snapshot {
    pub fn capture(state: &EditorState) -> Self {
        Self {
            board: state.board.clone(),
            offset: (state.viewport.offset_x, state.viewport.offset_y),
            circles: state.circles.clone(),
            selection: state.selection.clone(),
            floating: state.floating.clone(),
            layout_view: state.layout_view,
            board_width_in: state.board_width_in,
            board_height_in: state.board_height_in,
        }
    }

    /// Content equality against the live state, used for push dedup.
    fn matches(&self, state: &EditorState) -> bool {
        self.offset == (state.viewport.offset_x, state.viewport.offset_y)
            && self.layout_view == state.layout_view
            && self.board_width_in == state.board_width_in
            && self.board_height_in == state.board_height_in
            && self.circles == state.circles
            && self.selection == state.selection
            && self.floating == state.floating
            && self.board == state.board
    }

    pub fn restore_into(&self, state: &mut EditorState) {
        state.board = self.board.clone();
        state.viewport.offset_x = self.offset.0;
        state.viewport.offset_y = self.offset.1;
        state.circles = self.circles.clone();
        state.selection = self.selection.clone();
        state.floating = self.floating.clone();
        state.layout_view = self.layout_view;
        state.board_width_in = self.board_width_in;
        state.board_height_in = self.board_height_in;
        // Any staged pattern was rendered against the pre-restore state.
        state.staged_background = None;
    }
}

/// Undo/redo stacks over full-state snapshots.
///
/// The contract every mutating action follows: call [`snapshot`] first to
/// capture the pre-state, then mutate. Identical consecutive snapshots are
/// not pushed, the stack is bounded (oldest evicted), and any new snapshot
/// invalidates the redo stack.
pub struct HistoryManager {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
    max_entries: usize,
}

impl HistoryManager {
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Capture the pre-mutation state. No-ops when the state is identical
    /// to the top of the stack.
    pub fn snapshot(&mut self, state: &EditorState) {
        if let Some(top) = self.undo_stack.back() {
            if top.matches(state) {
                return;
            }
        }
        self.undo_stack.push_back(Snapshot::capture(state));
        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
    }

    /// Restore the most recent snapshot, moving the current state onto the
    /// redo stack. Returns whether anything was undone.
    pub fn undo(&mut self, state: &mut EditorState) -> bool {
        let Some(prev) = self.undo_stack.pop_back() else {
            return false;
        };
        self.redo_stack.push(Snapshot::capture(state));
        prev.restore_into(state);
        true
    }

    /// Symmetric to [`undo`].
    pub fn redo(&mut self, state: &mut EditorState) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push_back(Snapshot::capture(state));
        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.pop_front();
        }
        next.restore_into(state);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artboard::CellColor;
    use crate::components::colors::Rgb;

    fn red() -> CellColor {
        CellColor::Paint(Rgb::from_hex("#ff0000").unwrap())
    }

    #[test]
    fn test_snapshot_dedup() {
        let state = EditorState::new();
        let mut history = HistoryManager::new(50);
        history.snapshot(&state);
        history.snapshot(&state);
        assert_eq!(history.undo_count(), 1);
    }

    #[test]
    fn test_undo_redo_symmetry() {
        let mut state = EditorState::new();
        let mut history = HistoryManager::new(50);

        history.snapshot(&state);
        state.board.set(1, 1, red());
        let before_undo = Snapshot::capture(&state);

        assert!(history.undo(&mut state));
        assert!(state.board.is_empty());

        assert!(history.redo(&mut state));
        assert!(before_undo.matches(&state));
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut state = EditorState::new();
        let mut history = HistoryManager::new(50);
        assert!(!history.undo(&mut state));
        assert!(!history.redo(&mut state));
    }

    #[test]
    fn test_new_snapshot_clears_redo() {
        let mut state = EditorState::new();
        let mut history = HistoryManager::new(50);

        history.snapshot(&state);
        state.board.set(0, 0, red());
        history.undo(&mut state);
        assert!(history.can_redo());

        history.snapshot(&state);
        state.board.set(2, 2, red());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_bounded_stack_evicts_oldest() {
        let mut state = EditorState::new();
        let mut history = HistoryManager::new(3);
        for i in 0..6 {
            history.snapshot(&state);
            state.board.set(i, 0, red());
        }
        assert_eq!(history.undo_count(), 3);
        // Undoing everything lands on the oldest *retained* state, which
        // already has the first three cells drawn.
        while history.undo(&mut state) {}
        assert_eq!(state.board.len(), 3);
    }
}
