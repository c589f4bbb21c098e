//! Single-slot block clipboard.
//!
//! Copy stores a snapshot of the block. Paste duplicates that snapshot, not
//! the block's current state on the canvas.

use crate::block::Block;

/// Holds at most one copied block
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    block: Option<Block>,
}

impl Clipboard {
    /// Create an empty clipboard
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a copy of `block`, replacing previous contents
    pub fn copy(&mut self, block: &Block) {
        self.block = Some(block.clone());
    }

    /// The copied block, if any
    #[must_use]
    pub fn get(&self) -> Option<&Block> {
        self.block.as_ref()
    }

    /// Whether anything has been copied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.block.is_none()
    }

    /// Empty the clipboard
    pub fn clear(&mut self) {
        self.block = None;
    }
}
