//! Block Registry
//!
//! Fixed catalog mapping a block kind tag to the payload and size a new
//! block of that kind starts with. The editor reads it, never mutates it.

use std::collections::HashMap;
use std::str::FromStr;

use crate::block::{
    Block, BlockContent, BlockKind, EmbedData, HeadingData, ImageData, PageBreakData, PdfData,
    Size, TextData, VideoData,
};

/// Catalog entry for one block kind
#[derive(Debug, Clone)]
pub struct BlockDefinition {
    /// Kind this entry describes
    pub kind: BlockKind,
    /// Palette label
    pub label: &'static str,
    /// Payload for freshly added blocks
    pub default_content: BlockContent,
    /// Size for freshly added blocks
    pub default_size: Size,
}

impl BlockDefinition {
    /// Instantiate a new block from this definition
    #[must_use]
    pub fn instantiate(&self) -> Block {
        Block::new(self.default_content.clone()).with_size(self.default_size)
    }
}

/// Registry of known block kinds
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    definitions: HashMap<BlockKind, BlockDefinition>,
}

impl BlockRegistry {
    /// Create the built-in catalog
    #[must_use]
    pub fn new() -> Self {
        let definitions = BlockKind::ALL
            .into_iter()
            .map(|kind| (kind, builtin_definition(kind)))
            .collect();
        Self { definitions }
    }

    /// Look up a definition by tag; `None` for unknown tags
    #[must_use]
    pub fn get_block_definition(&self, tag: &str) -> Option<&BlockDefinition> {
        let kind = BlockKind::from_str(tag).ok()?;
        self.definitions.get(&kind)
    }

    /// Look up a definition by kind
    #[must_use]
    pub fn definition(&self, kind: BlockKind) -> Option<&BlockDefinition> {
        self.definitions.get(&kind)
    }

    /// All definitions in palette order
    pub fn definitions(&self) -> impl Iterator<Item = &BlockDefinition> {
        BlockKind::ALL
            .iter()
            .filter_map(|kind| self.definitions.get(kind))
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_definition(kind: BlockKind) -> BlockDefinition {
    let (label, default_content) = match kind {
        BlockKind::Heading => ("Heading", BlockContent::Heading(HeadingData::default())),
        BlockKind::Text => (
            "Text",
            BlockContent::Text(TextData {
                content: "Start typing...".to_string(),
                ..TextData::default()
            }),
        ),
        BlockKind::Image => ("Image", BlockContent::Image(ImageData::default())),
        BlockKind::Video => ("Video", BlockContent::Video(VideoData::default())),
        BlockKind::Pdf => ("PDF", BlockContent::Pdf(PdfData::default())),
        BlockKind::Embed => ("Embed", BlockContent::Embed(EmbedData::default())),
        BlockKind::PageBreak => ("Page Break", BlockContent::PageBreak(PageBreakData {})),
    };
    BlockDefinition {
        kind,
        label,
        default_content,
        default_size: kind.default_size(),
    }
}
