//! # Undo/Redo History
//!
//! Bounded past/present/future stacks of whole block-sequence snapshots.
//!
//! - Every edit records the new state as `present`, pushing the old one to `past`
//! - `past` never exceeds `max_size`; the oldest entry is dropped first
//! - A new edit clears `future`
//! - Undo/redo hand back the snapshot the canvas should restore
//!
//! Snapshots copy the whole sequence. Lessons hold tens of blocks, so this
//! stays cheap; structural sharing would be the next step if that changes.

use std::collections::VecDeque;

use crate::block::Block;

/// Default number of undo levels
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 50;

/// Immutable copy of the block sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Blocks at the time of capture
    pub blocks: Vec<Block>,
}

impl Snapshot {
    /// Capture a copy of `blocks`
    #[must_use]
    pub fn capture(blocks: &[Block]) -> Self {
        Self {
            blocks: blocks.to_vec(),
        }
    }
}

/// Undo/redo history for one canvas session
#[derive(Debug, Clone)]
pub struct HistoryManager {
    /// Older states, most recent last
    past: VecDeque<Snapshot>,

    /// State matching the canvas right now
    present: Option<Snapshot>,

    /// Undone states, next redo first
    future: VecDeque<Snapshot>,

    /// Maximum length of `past`
    max_size: usize,
}

impl HistoryManager {
    /// Create a history with the default bound
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_HISTORY_SIZE)
    }

    /// Create a history with a custom bound
    #[must_use]
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present: None,
            future: VecDeque::new(),
            max_size,
        }
    }

    /// Drop all history and start from `blocks`
    pub fn reset(&mut self, blocks: &[Block]) {
        self.past.clear();
        self.future.clear();
        self.present = Some(Snapshot::capture(blocks));
    }

    /// Record `blocks` as the new present state
    pub fn save_to_history(&mut self, blocks: &[Block]) {
        if let Some(previous) = self.present.take() {
            self.past.push_back(previous);
            while self.past.len() > self.max_size {
                self.past.pop_front();
            }
        }
        self.present = Some(Snapshot::capture(blocks));

        // New edit invalidates redo
        self.future.clear();
    }

    /// Step back; returns the blocks to restore
    pub fn undo(&mut self) -> Option<Vec<Block>> {
        let restored = self.past.pop_back()?;
        if let Some(current) = self.present.take() {
            self.future.push_front(current);
        }
        let blocks = restored.blocks.clone();
        self.present = Some(restored);
        Some(blocks)
    }

    /// Step forward; returns the blocks to restore
    pub fn redo(&mut self) -> Option<Vec<Block>> {
        let restored = self.future.pop_front()?;
        if let Some(current) = self.present.take() {
            self.past.push_back(current);
            while self.past.len() > self.max_size {
                self.past.pop_front();
            }
        }
        let blocks = restored.blocks.clone();
        self.present = Some(restored);
        Some(blocks)
    }

    /// Check if undo is available
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Check if redo is available
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of undo levels available
    #[must_use]
    pub fn undo_levels(&self) -> usize {
        self.past.len()
    }

    /// Number of redo levels available
    #[must_use]
    pub fn redo_levels(&self) -> usize {
        self.future.len()
    }

    /// The present snapshot, if any
    #[must_use]
    pub fn present(&self) -> Option<&Snapshot> {
        self.present.as_ref()
    }

    /// Configured bound
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockContent;

    fn seq(texts: &[&str]) -> Vec<Block> {
        texts
            .iter()
            .map(|t| Block::new(BlockContent::text(*t)))
            .collect()
    }

    #[test]
    fn test_history_creation() {
        let history = HistoryManager::new();
        assert_eq!(history.max_size(), DEFAULT_MAX_HISTORY_SIZE);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.present().is_none());
    }

    #[test]
    fn test_undo_on_empty_is_noop() {
        let mut history = HistoryManager::new();
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = HistoryManager::new();
        let v0 = seq(&["a"]);
        let v1 = seq(&["a", "b"]);
        history.reset(&v0);
        history.save_to_history(&v1);

        assert_eq!(history.undo().unwrap(), v0);
        assert!(history.can_redo());
        assert_eq!(history.redo().unwrap(), v1);
        assert!(!history.can_redo());
        assert_eq!(history.present().unwrap().blocks, v1);
    }

    #[test]
    fn test_new_edit_clears_future() {
        let mut history = HistoryManager::new();
        history.reset(&seq(&[]));
        history.save_to_history(&seq(&["a"]));
        history.undo();
        assert_eq!(history.redo_levels(), 1);

        history.save_to_history(&seq(&["b"]));
        assert_eq!(history.redo_levels(), 0);
    }

    #[test]
    fn test_max_size_enforced() {
        let mut history = HistoryManager::with_max_size(3);
        history.reset(&seq(&[]));
        for i in 0..10 {
            history.save_to_history(&seq(&[i.to_string().as_str()]));
            assert!(history.undo_levels() <= 3);
        }
        assert_eq!(history.undo_levels(), 3);

        // Oldest entries were dropped: three undos land on "6"
        history.undo();
        history.undo();
        let blocks = history.undo().unwrap();
        assert_eq!(blocks[0].content, BlockContent::text("6"));
        assert!(history.undo().is_none());
    }
}
