// Snapshot-based undo/redo. Every entry is a deep copy of the layers and the
// active index; restoring swaps the whole set in one assignment.

use std::collections::VecDeque;

use log::debug;

use crate::layer::{Document, Snapshot};

/// Undo depth used when none is configured.
pub const DEFAULT_HISTORY_LIMIT: usize = 40;

pub struct History {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::with_capacity(limit.min(64)),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the current state before a mutation. Clears redo; drops the
    /// oldest entry once the limit is exceeded.
    pub fn push(&mut self, doc: &Document) {
        self.push_snapshot(doc.snapshot());
    }

    /// Record a snapshot taken earlier, for mutations that are validated
    /// before they are known to need an entry.
    pub fn push_snapshot(&mut self, snapshot: Snapshot) {
        self.undo.push_back(snapshot);
        if self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        self.redo.clear();
        debug!("history push (undo {}, redo 0)", self.undo.len());
    }

    /// Step back. Returns false when there is nothing to undo.
    pub fn undo(&mut self, doc: &mut Document) -> bool {
        let Some(previous) = self.undo.pop_back() else {
            return false;
        };
        self.redo.push(doc.snapshot());
        doc.restore(previous);
        debug!("undo (undo {}, redo {})", self.undo.len(), self.redo.len());
        true
    }

    /// Step forward again. Returns false when there is nothing to redo.
    pub fn redo(&mut self, doc: &mut Document) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        self.undo.push_back(doc.snapshot());
        if self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        doc.restore(next);
        debug!("redo (undo {}, redo {})", self.undo.len(), self.redo.len());
        true
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerFill;
    use crate::types::Rgba;

    #[test]
    fn undo_and_redo_walk_the_stacks() {
        let mut doc = Document::new(4, 4);
        let mut h = History::default();
        let before = doc.clone();

        h.push(&doc);
        doc.add_layer(None, LayerFill::Transparent);
        let after = doc.clone();

        assert!(h.undo(&mut doc));
        assert_eq!(doc.snapshot(), before.snapshot());
        assert!(h.redo(&mut doc));
        assert_eq!(doc.snapshot(), after.snapshot());
        assert!(!h.redo(&mut doc));
    }

    #[test]
    fn empty_stacks_are_benign() {
        let mut doc = Document::new(4, 4);
        let mut h = History::default();
        assert!(!h.undo(&mut doc));
        assert!(!h.redo(&mut doc));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn new_push_clears_redo() {
        let mut doc = Document::new(4, 4);
        let mut h = History::default();
        h.push(&doc);
        doc.set_visible(0, false).unwrap();
        h.undo(&mut doc);
        assert!(h.can_redo());
        h.push(&doc);
        assert!(!h.can_redo());
    }

    #[test]
    fn oldest_entry_is_evicted_past_the_limit() {
        let mut doc = Document::new(2, 2);
        let mut h = History::new(3);
        for shade in 0..5u8 {
            h.push(&doc);
            doc.active_layer_mut().buffer.set(0, 0, Rgba::rgb(shade, 0, 0));
        }
        assert_eq!(h.undo_len(), 3);
        while h.undo(&mut doc) {}
        // the white and shade-0 states were evicted
        assert_eq!(doc.active_layer().buffer.get(0, 0), Rgba::rgb(1, 0, 0));
    }
}
