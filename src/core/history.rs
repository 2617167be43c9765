//! Undo history with compound-change grouping.
//!
//! Every edit pushes a snapshot of the text as it was before the edit.
//! Snapshots are rope clones, which share structure, so keeping a few hundred
//! of them is cheap. Inside a compound change only the first edit records a
//! snapshot, so undo rolls the whole group back at once.

use ropey::Rope;
use tracing::trace;

/// Grouping hooks of the host's undo system.
pub trait HistoryService {
    fn begin_compound_change(&mut self);
    fn end_compound_change(&mut self);
    /// While locked, nested begin/end pairs are ignored and every edit joins
    /// the currently open group.
    fn lock(&mut self);
    fn unlock(&mut self);
}

/// Text before an edit, plus where the cursor goes when it is restored.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub text: Rope,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    depth: usize,
    locked: bool,
    /// Whether the open group already has its snapshot.
    group_recorded: bool,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            depth: 0,
            locked: false,
            group_recorded: false,
            limit: limit.max(1),
        }
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        self.trim();
    }

    fn in_group(&self) -> bool {
        self.depth > 0 || self.locked
    }

    /// Records `before` as the state to return to when this edit is undone.
    pub fn record(&mut self, before: &Rope, offset: usize) {
        if self.in_group() {
            if self.group_recorded {
                return;
            }
            self.group_recorded = true;
        }
        self.undo_stack.push(Snapshot {
            text: before.clone(),
            offset,
        });
        self.redo_stack.clear();
        self.trim();
    }

    fn trim(&mut self) {
        if self.undo_stack.len() > self.limit {
            let excess = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..excess);
        }
    }

    /// Pops the latest undo step, stashing `current` for redo.
    pub fn undo(&mut self, current: &Rope) -> Option<Snapshot> {
        let snapshot = self.undo_stack.pop()?;
        self.redo_stack.push(Snapshot {
            text: current.clone(),
            offset: snapshot.offset,
        });
        Some(snapshot)
    }

    /// Pops the latest redo step, stashing `current` for undo.
    pub fn redo(&mut self, current: &Rope) -> Option<Snapshot> {
        let snapshot = self.redo_stack.pop()?;
        self.undo_stack.push(Snapshot {
            text: current.clone(),
            offset: snapshot.offset,
        });
        Some(snapshot)
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl HistoryService for History {
    fn begin_compound_change(&mut self) {
        if self.locked {
            return;
        }
        if self.depth == 0 {
            self.group_recorded = false;
        }
        self.depth += 1;
        trace!(depth = self.depth, "begin_compound_change");
    }

    fn end_compound_change(&mut self) {
        if self.locked {
            return;
        }
        self.depth = self.depth.saturating_sub(1);
        trace!(depth = self.depth, "end_compound_change");
    }

    fn lock(&mut self) {
        if !self.in_group() {
            self.group_recorded = false;
        }
        self.locked = true;
    }

    fn unlock(&mut self) {
        self.locked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rope(s: &str) -> Rope {
        Rope::from_str(s)
    }

    #[test]
    fn test_each_edit_is_a_step_outside_groups() {
        let mut h = History::default();
        h.record(&rope("a"), 0);
        h.record(&rope("ab"), 1);
        assert_eq!(h.undo_count(), 2);
    }

    #[test]
    fn test_compound_change_records_once() {
        let mut h = History::default();
        h.begin_compound_change();
        h.record(&rope(""), 0);
        h.record(&rope("a"), 1);
        h.record(&rope("ab"), 2);
        h.end_compound_change();
        assert_eq!(h.undo_count(), 1);

        let snap = h.undo(&rope("abc")).unwrap();
        assert_eq!(snap.text.to_string(), "");
        assert_eq!(h.redo_count(), 1);
    }

    #[test]
    fn test_lock_swallows_nested_groups() {
        let mut h = History::default();
        h.begin_compound_change();
        h.lock();
        h.begin_compound_change();
        h.record(&rope("x"), 0);
        h.end_compound_change();
        h.begin_compound_change();
        h.record(&rope("xy"), 1);
        h.end_compound_change();
        h.unlock();
        h.end_compound_change();
        assert_eq!(h.undo_count(), 1);

        // The group is closed now, so the next edit is a new step.
        h.record(&rope("xyz"), 2);
        assert_eq!(h.undo_count(), 2);
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut h = History::default();
        h.record(&rope(""), 0);
        h.undo(&rope("a"));
        assert_eq!(h.redo_count(), 1);
        h.record(&rope(""), 0);
        assert_eq!(h.redo_count(), 0);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut h = History::new(2);
        h.record(&rope("1"), 0);
        h.record(&rope("2"), 0);
        h.record(&rope("3"), 0);
        assert_eq!(h.undo_count(), 2);
        let snap = h.undo(&rope("4")).unwrap();
        assert_eq!(snap.text.to_string(), "3");
        let snap = h.undo(&rope("3")).unwrap();
        assert_eq!(snap.text.to_string(), "2");
        assert!(h.undo(&rope("2")).is_none());
    }
}
