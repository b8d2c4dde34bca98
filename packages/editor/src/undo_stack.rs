//! # Undo/Redo Stack
//!
//! Snapshot history of the page configuration.
//!
//! ## Design
//!
//! - Committed configs are shared `Arc` snapshots, so each entry keeps the
//!   config before and after a change instead of an inverse mutation
//! - Undo hands back `before`, redo hands back `after`
//! - New entries clear the redo stack
//! - Batches group several commits into one undo step
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = UndoStack::new();
//! history.record(before, after, "add_section");
//!
//! if let Some(config) = history.undo() {
//!     store.replace_snapshot(config);
//! }
//! ```

use std::sync::Arc;

use pagewright_common::PageConfig;

const DEFAULT_MAX_LEVELS: usize = 100;

/// One undo step
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub before: Arc<PageConfig>,
    pub after: Arc<PageConfig>,
    pub description: Option<String>,
}

#[derive(Debug, Default)]
struct PendingBatch {
    before: Option<Arc<PageConfig>>,
    after: Option<Arc<PageConfig>>,
    description: Option<String>,
}

/// Undo/redo stack for page editing
#[derive(Debug)]
pub struct UndoStack {
    /// Most recent last
    undo_stack: Vec<HistoryEntry>,

    /// Most recently undone last
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    current_batch: Option<PendingBatch>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_MAX_LEVELS)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Record one committed change
    pub fn record(
        &mut self,
        before: Arc<PageConfig>,
        after: Arc<PageConfig>,
        description: impl Into<String>,
    ) {
        if let Some(batch) = &mut self.current_batch {
            // Keep the first `before` and the last `after`
            batch.before.get_or_insert(before);
            batch.after = Some(after);
            batch.description.get_or_insert_with(|| description.into());
            return;
        }

        self.push(HistoryEntry {
            before,
            after,
            description: Some(description.into()),
        });
    }

    /// Start a batch of changes (will be undone/redone together)
    pub fn begin_batch(&mut self) {
        self.current_batch = Some(PendingBatch::default());
    }

    /// End the current batch and push it as one entry
    pub fn end_batch(&mut self) {
        let Some(batch) = self.current_batch.take() else {
            return;
        };
        if let (Some(before), Some(after)) = (batch.before, batch.after) {
            self.push(HistoryEntry {
                before,
                after,
                description: batch.description,
            });
        }
    }

    /// Overrides the description taken from the first change in the batch
    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    pub fn is_batching(&self) -> bool {
        self.current_batch.is_some()
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Config to restore, if there is anything to undo
    pub fn undo(&mut self) -> Option<Arc<PageConfig>> {
        let entry = self.undo_stack.pop()?;
        let before = Arc::clone(&entry.before);
        self.redo_stack.push(entry);
        Some(before)
    }

    /// Config to restore, if there is anything to redo
    pub fn redo(&mut self) -> Option<Arc<PageConfig>> {
        let entry = self.redo_stack.pop()?;
        let after = Arc::clone(&entry.after);
        self.undo_stack.push(entry);
        Some(after)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    /// Descriptions of undoable entries, most recent first
    pub fn undo_descriptions(&self) -> Vec<Option<&str>> {
        self.undo_stack
            .iter()
            .rev()
            .map(|entry| entry.description.as_deref())
            .collect()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_common::Section;

    fn snapshot(ids: &[&str]) -> Arc<PageConfig> {
        let mut page = PageConfig::new();
        for id in ids {
            page.sections.push(Section::new(*id, "text"));
        }
        Arc::new(page)
    }

    #[test]
    fn test_undo_redo() {
        let mut stack = UndoStack::new();
        let empty = snapshot(&[]);
        let one = snapshot(&["a"]);

        stack.record(Arc::clone(&empty), Arc::clone(&one), "add_section");
        assert!(stack.can_undo());

        let restored = stack.undo().unwrap();
        assert!(Arc::ptr_eq(&restored, &empty));
        assert!(stack.can_redo());

        let restored = stack.redo().unwrap();
        assert!(Arc::ptr_eq(&restored, &one));
        assert!(stack.undo().is_some());
        assert!(stack.undo().is_none());
    }

    #[test]
    fn test_new_entry_clears_redo() {
        let mut stack = UndoStack::new();
        stack.record(snapshot(&[]), snapshot(&["a"]), "one");
        stack.undo();
        assert!(stack.can_redo());

        stack.record(snapshot(&[]), snapshot(&["b"]), "two");
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_batch_is_one_step() {
        let mut stack = UndoStack::new();
        let start = snapshot(&[]);

        stack.begin_batch();
        stack.set_batch_description("insert hero");
        stack.record(Arc::clone(&start), snapshot(&["a"]), "add_section");
        stack.record(snapshot(&["a"]), snapshot(&["a", "b"]), "add_section");
        stack.end_batch();

        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.undo_descriptions(), vec![Some("insert hero")]);
        assert!(Arc::ptr_eq(&stack.undo().unwrap(), &start));
    }

    #[test]
    fn test_empty_batch_records_nothing() {
        let mut stack = UndoStack::new();
        stack.begin_batch();
        stack.end_batch();
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_max_levels() {
        let mut stack = UndoStack::with_max_levels(2);
        for name in ["a", "b", "c"] {
            stack.record(snapshot(&[]), snapshot(&[name]), name);
        }
        assert_eq!(stack.undo_levels(), 2);
        assert_eq!(stack.undo_descriptions(), vec![Some("c"), Some("b")]);
    }
}
