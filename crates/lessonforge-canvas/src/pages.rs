//! Page Segmentation
//!
//! Pages are not stored; they are derived by scanning the block sequence for
//! `page_break` sentinels. Page 0 is everything before the first break.

use std::ops::Range;

use crate::block::Block;

/// Number of pages (page breaks + 1; an empty lesson has one page)
#[must_use]
pub fn page_count(blocks: &[Block]) -> usize {
    blocks.iter().filter(|b| b.is_page_break()).count() + 1
}

/// Index ranges of each page's content, page breaks excluded
#[must_use]
pub fn page_ranges(blocks: &[Block]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for (i, block) in blocks.iter().enumerate() {
        if block.is_page_break() {
            ranges.push(start..i);
            start = i + 1;
        }
    }
    ranges.push(start..blocks.len());
    ranges
}

/// Page that the block at `index` belongs to
#[must_use]
pub fn page_of(blocks: &[Block], index: usize) -> Option<usize> {
    if index >= blocks.len() {
        return None;
    }
    Some(blocks[..index].iter().filter(|b| b.is_page_break()).count())
}

/// Content blocks of page `page`; empty for pages past the end
#[must_use]
pub fn blocks_on_page(blocks: &[Block], page: usize) -> &[Block] {
    match page_ranges(blocks).get(page) {
        Some(range) => &blocks[range.clone()],
        None => &[],
    }
}

/// Where a block added while viewing `current_page` is inserted.
///
/// That is immediately before the `(current_page + 1)`-th page break, so the
/// block lands at the end of the page being viewed. When there are not that
/// many breaks the block is appended.
#[must_use]
pub fn insertion_index(blocks: &[Block], current_page: usize) -> usize {
    blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.is_page_break())
        .nth(current_page)
        .map(|(i, _)| i)
        .unwrap_or(blocks.len())
}
