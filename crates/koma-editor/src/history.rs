//! Undo/Redo snapshot stacks.
//!
//! History stores whole states rather than inverse commands. The caller
//! records the state *before* a mutation; undo hands back the previous
//! state in exchange for the current one, so redo can give it back.
//!
//! Two independent instances are used: one for the document (one entry
//! per structural mutation or drag) and one per panel for its mask (one
//! entry per paint gesture).

use koma_core::PanelId;
use koma_core::model::Mask;
use std::collections::HashMap;

/// Linear undo/redo over snapshots of `T`.
#[derive(Debug, Clone)]
pub struct SnapshotStack<T> {
    undo_stack: Vec<T>,
    redo_stack: Vec<T>,
    /// Maximum undo depth.
    max_depth: usize,
}

impl<T> SnapshotStack<T> {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Push the state as it was before a mutation. Clears redo; the
    /// oldest entry is dropped past the depth limit.
    pub fn record(&mut self, before: T) {
        self.undo_stack.push(before);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Step back: returns the state to restore and keeps `current` for
    /// redo. `None` (and `current` dropped) at an empty history.
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Step forward through previously undone states.
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

}

/// Per-panel mask undo/redo.
#[derive(Debug, Clone)]
pub struct MaskHistory {
    stacks: HashMap<PanelId, SnapshotStack<Mask>>,
    max_depth: usize,
}

impl MaskHistory {
    pub fn new(max_depth: usize) -> Self {
        Self {
            stacks: HashMap::new(),
            max_depth,
        }
    }

    pub fn record(&mut self, panel: PanelId, before: Mask) {
        let depth = self.max_depth;
        self.stacks
            .entry(panel)
            .or_insert_with(|| SnapshotStack::new(depth))
            .record(before);
    }

    pub fn undo(&mut self, panel: PanelId, current: Mask) -> Option<Mask> {
        self.stacks.get_mut(&panel)?.undo(current)
    }

    pub fn redo(&mut self, panel: PanelId, current: Mask) -> Option<Mask> {
        self.stacks.get_mut(&panel)?.redo(current)
    }

    pub fn can_undo(&self, panel: PanelId) -> bool {
        self.stacks.get(&panel).is_some_and(SnapshotStack::can_undo)
    }

    pub fn can_redo(&self, panel: PanelId) -> bool {
        self.stacks.get(&panel).is_some_and(SnapshotStack::can_redo)
    }

    /// Drop a deleted panel's stacks.
    pub fn forget(&mut self, panel: PanelId) {
        self.stacks.remove(&panel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn undo_redo_swaps_states() {
        let mut stack = SnapshotStack::new(100);
        let mut state = 1;

        stack.record(state);
        state = 2;

        state = stack.undo(state).unwrap();
        assert_eq!(state, 1);
        state = stack.redo(state).unwrap();
        assert_eq!(state, 2);
    }

    #[test]
    fn redo_clears_on_new_action() {
        let mut stack = SnapshotStack::new(100);
        stack.record(0);
        let state = stack.undo(1).unwrap();
        assert!(stack.can_redo());

        stack.record(state);
        assert!(!stack.can_redo());
    }

    #[test]
    fn max_depth_trims_oldest() {
        let mut stack = SnapshotStack::new(3);
        for i in 0..5 {
            stack.record(i);
        }
        let mut undo_count = 0;
        let mut state = 5;
        while let Some(prev) = stack.undo(state) {
            state = prev;
            undo_count += 1;
        }
        assert_eq!(undo_count, 3);
        assert_eq!(state, 2);
    }

    #[test]
    fn empty_history_is_noop() {
        let mut stack: SnapshotStack<u8> = SnapshotStack::new(10);
        assert_eq!(stack.undo(7), None);
        assert_eq!(stack.redo(7), None);
        assert!(!stack.can_undo());
    }

    #[test]
    fn mask_history_is_per_panel() {
        let a = koma_core::ObjectId::intern("mask_panel_a");
        let b = koma_core::ObjectId::intern("mask_panel_b");
        let mut history = MaskHistory::new(10);
        history.record(a, Mask::default());

        assert!(history.can_undo(a));
        assert!(!history.can_undo(b));
        assert!(history.undo(b, Mask::default()).is_none());
        assert_eq!(history.undo(a, Mask::default()), Some(Mask::default()));
    }
}
