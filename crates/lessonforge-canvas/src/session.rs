//! Editor Session
//!
//! An [`EditorSession`] is the canvas state for one open lesson: the ordered
//! block sequence, the selection, the page being viewed, the clipboard, the
//! undo history and the auto-save bookkeeping. Opening another lesson
//! replaces the session wholesale.
//!
//! Every mutator that changes the block sequence records a history snapshot
//! and marks the session dirty. Invalid input (unknown ids or block types)
//! is absorbed as a no-op.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::autosave::AutoSaveController;
use crate::block::{Block, BlockId};
use crate::clipboard::Clipboard;
use crate::config::EditorConfig;
use crate::error::Error;
use crate::gateway::{ContentMeta, LessonRecord, LessonUpdate, SchemaCapabilities};
use crate::history::HistoryManager;
use crate::migration::{plan_migration, MigrationPlan};
use crate::pages;
use crate::registry::BlockRegistry;

/// How the session's initial blocks were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Stored blocks were used, or there was nothing to migrate
    NotNeeded,
    /// Legacy content was converted synchronously
    Migrated,
    /// A placeholder is shown until presentation slides arrive
    AwaitingSlides,
    /// Slides could not be fetched; an error is shown and nothing is saved
    Failed,
}

impl MigrationStatus {
    /// Whether the canvas may be written back to the lesson
    #[must_use]
    pub fn is_persistable(&self) -> bool {
        !matches!(self, Self::AwaitingSlides | Self::Failed)
    }
}

/// Canvas state for one open lesson
#[derive(Debug, Clone)]
pub struct EditorSession {
    lesson_id: String,
    title: String,
    blocks: Vec<Block>,
    selected_block_id: Option<BlockId>,
    current_page: usize,
    first_page_background: String,
    clipboard: Clipboard,
    history: HistoryManager,
    autosave: AutoSaveController,
    registry: BlockRegistry,
    duplicate_offset: f64,
    schema: SchemaCapabilities,
    migration: MigrationStatus,
    opened_at: DateTime<Utc>,
}

impl EditorSession {
    /// Create a session over `blocks`; history starts at that state
    #[must_use]
    pub fn new(
        lesson_id: impl Into<String>,
        title: impl Into<String>,
        blocks: Vec<Block>,
        config: &EditorConfig,
    ) -> Self {
        let mut history = HistoryManager::with_max_size(config.max_history_size);
        history.reset(&blocks);
        Self {
            lesson_id: lesson_id.into(),
            title: title.into(),
            blocks,
            selected_block_id: None,
            current_page: 0,
            first_page_background: config.first_page_background.clone(),
            clipboard: Clipboard::new(),
            history,
            autosave: AutoSaveController::new(config.autosave.enabled),
            registry: BlockRegistry::new(),
            duplicate_offset: config.duplicate_offset,
            schema: config.schema,
            migration: MigrationStatus::NotNeeded,
            opened_at: Utc::now(),
        }
    }

    /// Build a session from a stored lesson, migrating legacy content.
    ///
    /// Migrated sessions start dirty so the converted blocks get saved.
    #[must_use]
    pub fn from_record(record: &LessonRecord, config: &EditorConfig) -> (Self, MigrationStatus) {
        let (blocks, status) = if record.needs_migration() {
            match plan_migration(record) {
                MigrationPlan::Ready(blocks) => (blocks, MigrationStatus::Migrated),
                MigrationPlan::PendingSlides { placeholder } => {
                    (placeholder, MigrationStatus::AwaitingSlides)
                }
            }
        } else {
            (
                record.content_blocks.clone().unwrap_or_default(),
                MigrationStatus::NotNeeded,
            )
        };

        let mut session = Self::new(record.id.clone(), record.title.clone(), blocks, config);
        if let Some(background) = record
            .content_meta
            .as_ref()
            .and_then(|meta| meta.first_page_background.clone())
        {
            session.first_page_background = background;
        }
        session.migration = status;
        if status == MigrationStatus::Migrated {
            session.autosave.mark_dirty();
        }
        (session, status)
    }

    /// Swap in a custom registry
    #[must_use]
    pub fn with_registry(mut self, registry: BlockRegistry) -> Self {
        self.registry = registry;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────

    /// Lesson being edited
    #[must_use]
    pub fn lesson_id(&self) -> &str {
        &self.lesson_id
    }

    /// Lesson title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Ordered block sequence
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Find a block by id
    #[must_use]
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Selected block id
    #[must_use]
    pub fn selected_block_id(&self) -> Option<&str> {
        self.selected_block_id.as_deref()
    }

    /// Selected block
    #[must_use]
    pub fn selected_block(&self) -> Option<&Block> {
        self.selected_block_id.as_deref().and_then(|id| self.block(id))
    }

    /// Page being viewed
    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Number of pages
    #[must_use]
    pub fn page_count(&self) -> usize {
        pages::page_count(&self.blocks)
    }

    /// Content blocks of `page`
    #[must_use]
    pub fn blocks_on_page(&self, page: usize) -> &[Block] {
        pages::blocks_on_page(&self.blocks, page)
    }

    /// First page background color
    #[must_use]
    pub fn first_page_background(&self) -> &str {
        &self.first_page_background
    }

    /// Clipboard
    #[must_use]
    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    /// Undo history
    #[must_use]
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Auto-save state
    #[must_use]
    pub fn autosave(&self) -> &AutoSaveController {
        &self.autosave
    }

    pub(crate) fn autosave_mut(&mut self) -> &mut AutoSaveController {
        &mut self.autosave
    }

    /// Whether there are edits since the last save
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.autosave.has_unsaved_changes
    }

    /// Migration state of the canvas
    #[must_use]
    pub fn migration_status(&self) -> MigrationStatus {
        self.migration
    }

    /// When the session was opened
    #[must_use]
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    // ── Canvas mutators ──────────────────────────────────────────────────

    /// Add a block of kind `tag` on the current page and select it.
    ///
    /// Unknown tags are logged and ignored.
    pub fn add_block(&mut self, tag: &str) -> Option<BlockId> {
        let Some(definition) = self.registry.get_block_definition(tag) else {
            let err = Error::InvalidBlockType(tag.to_string());
            warn!(lesson_id = %self.lesson_id, error = %err, "Ignoring add_block");
            return None;
        };

        let block = definition.instantiate();
        let id = block.id.clone();
        let index = pages::insertion_index(&self.blocks, self.current_page);
        self.blocks.insert(index, block);
        self.selected_block_id = Some(id.clone());
        debug!(lesson_id = %self.lesson_id, block_id = %id, index, "Block added");

        self.commit_edit();
        Some(id)
    }

    /// Merge `patch` into the payload of block `id`
    pub fn update_block(&mut self, id: &str, patch: &Map<String, Value>) -> bool {
        let Some(block) = self.blocks.iter_mut().find(|b| b.id == id) else {
            return false;
        };
        if let Err(err) = block.apply_patch(patch) {
            warn!(block_id = %id, error = %err, "Rejected block update");
            return false;
        }
        self.commit_edit();
        true
    }

    /// Remove block `id`; clears the selection if it was selected
    pub fn delete_block(&mut self, id: &str) -> bool {
        let Some(pos) = self.blocks.iter().position(|b| b.id == id) else {
            return false;
        };
        self.blocks.remove(pos);
        if self.selected_block_id.as_deref() == Some(id) {
            self.selected_block_id = None;
        }
        self.clamp_current_page();
        self.commit_edit();
        true
    }

    /// Change the selection (not undo-tracked)
    pub fn select_block(&mut self, id: Option<&str>) {
        match id {
            Some(id) if self.block(id).is_none() => {
                debug!(block_id = %id, "Ignoring selection of unknown block");
            }
            _ => self.selected_block_id = id.map(str::to_string),
        }
    }

    /// Clone block `id`, append the clone and select it
    pub fn duplicate_block(&mut self, id: &str) -> Option<BlockId> {
        let source = self.block(id)?.clone();
        Some(self.append_duplicate(&source))
    }

    /// Rebuild the sequence in the order of `ordered_ids`.
    ///
    /// Ids that are not on the canvas are skipped; blocks not named are
    /// dropped.
    pub fn reorder_blocks(&mut self, ordered_ids: &[BlockId]) {
        let mut by_id: HashMap<BlockId, Block> = self
            .blocks
            .drain(..)
            .map(|b| (b.id.clone(), b))
            .collect();
        self.blocks = ordered_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();

        if let Some(selected) = self.selected_block_id.as_deref() {
            if self.block(selected).is_none() {
                self.selected_block_id = None;
            }
        }
        self.clamp_current_page();
        self.commit_edit();
    }

    /// Move block `id` to `to_index` (clamped to the end)
    pub fn move_block(&mut self, id: &str, to_index: usize) -> bool {
        let Some(from) = self.blocks.iter().position(|b| b.id == id) else {
            return false;
        };
        let mut order: Vec<BlockId> = self.blocks.iter().map(|b| b.id.clone()).collect();
        let moved = order.remove(from);
        order.insert(to_index.min(order.len()), moved);
        self.reorder_blocks(&order);
        true
    }

    // ── Clipboard ────────────────────────────────────────────────────────

    /// Copy block `id` to the clipboard
    pub fn copy_block(&mut self, id: &str) -> bool {
        match self.blocks.iter().find(|b| b.id == id) {
            Some(block) => {
                self.clipboard.copy(block);
                true
            }
            None => false,
        }
    }

    /// Paste the clipboard block as a duplicate.
    ///
    /// Pastes the block as it was when copied, even if the original has
    /// been edited since.
    pub fn paste_block(&mut self) -> Option<BlockId> {
        let source = self.clipboard.get()?.clone();
        Some(self.append_duplicate(&source))
    }

    // ── History ──────────────────────────────────────────────────────────

    /// Undo the last edit
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(blocks) => {
                self.restore(blocks);
                true
            }
            None => false,
        }
    }

    /// Redo the last undone edit
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(blocks) => {
                self.restore(blocks);
                true
            }
            None => false,
        }
    }

    /// Check if undo is available
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if redo is available
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ── View and metadata ────────────────────────────────────────────────

    /// Switch the page being viewed (clamped to the last page)
    pub fn set_current_page(&mut self, page: usize) {
        self.current_page = page.min(self.page_count() - 1);
    }

    /// Change the first page background
    pub fn set_first_page_background(&mut self, color: impl Into<String>) {
        self.first_page_background = color.into();
        self.autosave.mark_dirty();
    }

    /// Replace the whole sequence, e.g. when slides arrive.
    ///
    /// History restarts from the new sequence.
    pub fn replace_blocks(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
        self.history.reset(&self.blocks);
        self.selected_block_id = None;
        self.clamp_current_page();
        self.autosave.mark_dirty();
    }

    /// Install converted slides; the session becomes dirty so they get saved
    pub fn complete_slide_migration(&mut self, blocks: Vec<Block>) {
        self.replace_blocks(blocks);
        self.migration = MigrationStatus::Migrated;
    }

    /// Show the slide fetch error inline.
    ///
    /// The error blocks are display-only: the dirty flag is left alone and
    /// saves are refused until the lesson is reopened.
    pub fn fail_slide_migration(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
        self.history.reset(&self.blocks);
        self.selected_block_id = None;
        self.clamp_current_page();
        self.migration = MigrationStatus::Failed;
    }

    /// Build the save payload, honoring schema capabilities
    #[must_use]
    pub fn save_payload(&self) -> LessonUpdate {
        let content_meta = if self.schema.content_meta {
            Some(ContentMeta {
                first_page_background: Some(self.first_page_background.clone()),
            })
        } else {
            debug!(lesson_id = %self.lesson_id, "Schema has no content_meta, omitting");
            None
        };
        LessonUpdate {
            content_blocks: self.blocks.clone(),
            content_meta,
        }
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn append_duplicate(&mut self, source: &Block) -> BlockId {
        let copy = source.duplicate(self.duplicate_offset);
        let id = copy.id.clone();
        self.blocks.push(copy);
        self.selected_block_id = Some(id.clone());
        self.commit_edit();
        id
    }

    fn restore(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
        if let Some(selected) = self.selected_block_id.as_deref() {
            if self.block(selected).is_none() {
                self.selected_block_id = None;
            }
        }
        self.clamp_current_page();
        self.autosave.mark_dirty();
    }

    fn clamp_current_page(&mut self) {
        self.current_page = self.current_page.min(self.page_count() - 1);
    }

    fn commit_edit(&mut self) {
        self.history.save_to_history(&self.blocks);
        self.autosave.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockContent, BlockKind};
    use serde_json::json;

    fn session_with(blocks: Vec<Block>) -> EditorSession {
        EditorSession::new("lesson-1", "Lesson", blocks, &EditorConfig::default())
    }

    fn text(s: &str) -> Block {
        Block::new(BlockContent::text(s))
    }

    fn brk() -> Block {
        Block::new(BlockContent::page_break())
    }

    fn ids(session: &EditorSession) -> Vec<String> {
        session.blocks().iter().map(|b| b.id.clone()).collect()
    }

    #[test]
    fn test_add_block_on_first_page() {
        let (a, b, c) = (text("A"), text("B"), text("C"));
        let mut session = session_with(vec![a.clone(), b.clone(), brk(), c.clone()]);

        let id = session.add_block("text").unwrap();
        assert_eq!(session.blocks()[2].id, id);
        assert_eq!(session.blocks()[3].kind(), BlockKind::PageBreak);
        assert_eq!(session.selected_block_id(), Some(id.as_str()));
        assert!(session.has_unsaved_changes());
        assert!(session.can_undo());
    }

    #[test]
    fn test_add_block_on_second_page() {
        let mut session = session_with(vec![text("A"), brk(), text("B"), brk(), text("C")]);
        session.set_current_page(1);

        let id = session.add_block("heading").unwrap();
        assert_eq!(session.blocks()[3].id, id);
        assert!(session.blocks()[4].is_page_break());
    }

    #[test]
    fn test_add_unknown_block_is_noop() {
        let mut session = session_with(vec![text("A")]);
        assert!(session.add_block("quiz").is_none());
        assert_eq!(session.blocks().len(), 1);
        assert!(!session.has_unsaved_changes());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_update_block() {
        let a = text("A");
        let mut session = session_with(vec![a.clone()]);

        let patch = json!({"content": "Changed"});
        assert!(session.update_block(&a.id, patch.as_object().unwrap()));
        assert_eq!(session.block(&a.id).unwrap().content, BlockContent::text("Changed"));

        assert!(!session.update_block("missing", patch.as_object().unwrap()));
    }

    #[test]
    fn test_delete_selected_clears_selection() {
        let (a, b) = (text("A"), text("B"));
        let mut session = session_with(vec![a.clone(), b.clone()]);

        session.select_block(Some(&a.id));
        assert!(session.delete_block(&b.id));
        assert_eq!(session.selected_block_id(), Some(a.id.as_str()));

        assert!(session.delete_block(&a.id));
        assert_eq!(session.selected_block_id(), None);
    }

    #[test]
    fn test_select_is_not_undo_tracked() {
        let a = text("A");
        let mut session = session_with(vec![a.clone()]);
        session.select_block(Some(&a.id));
        assert!(!session.can_undo());
        assert!(!session.has_unsaved_changes());

        session.select_block(Some("missing"));
        assert_eq!(session.selected_block_id(), Some(a.id.as_str()));
        session.select_block(None);
        assert_eq!(session.selected_block_id(), None);
    }

    #[test]
    fn test_duplicate_appends_and_selects() {
        let (a, b) = (text("A"), text("B"));
        let mut session = session_with(vec![a.clone(), brk(), b]);

        let copy_id = session.duplicate_block(&a.id).unwrap();
        let last = session.blocks().last().unwrap();
        assert_eq!(last.id, copy_id);
        assert_eq!(last.content, a.content);
        assert_eq!(last.position.x, a.position.x + 20.0);
        assert_eq!(session.selected_block_id(), Some(copy_id.as_str()));
        assert!(session.duplicate_block("missing").is_none());
    }

    #[test]
    fn test_reorder_drops_unknown_and_unnamed() {
        let (a, b, c) = (text("A"), text("B"), text("C"));
        let mut session = session_with(vec![a.clone(), b.clone(), c.clone()]);
        session.select_block(Some(&b.id));

        session.reorder_blocks(&[c.id.clone(), "ghost".to_string(), a.id.clone()]);
        assert_eq!(ids(&session), vec![c.id.clone(), a.id.clone()]);
        assert_eq!(session.selected_block_id(), None);
    }

    #[test]
    fn test_move_block() {
        let (a, b, c) = (text("A"), text("B"), text("C"));
        let mut session = session_with(vec![a.clone(), b.clone(), c.clone()]);
        assert!(session.move_block(&a.id, 10));
        assert_eq!(ids(&session), vec![b.id, c.id, a.id]);
        assert!(!session.move_block("missing", 0));
    }

    #[test]
    fn test_paste_uses_copied_snapshot() {
        let a = text("A");
        let mut session = session_with(vec![a.clone()]);

        assert!(session.paste_block().is_none());
        assert_eq!(session.blocks().len(), 1);

        assert!(session.copy_block(&a.id));
        let patch = json!({"content": "Edited"});
        session.update_block(&a.id, patch.as_object().unwrap());

        let pasted = session.paste_block().unwrap();
        assert_eq!(session.blocks().len(), 2);
        assert_eq!(session.block(&pasted).unwrap().content, BlockContent::text("A"));
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut session = session_with(vec![text("A")]);
        session.add_block("text");
        session.add_block("heading");
        let before_undo = session.blocks().to_vec();

        assert!(session.undo());
        assert_eq!(session.blocks().len(), 2);
        assert!(session.redo());
        assert_eq!(session.blocks(), before_undo.as_slice());
        assert!(!session.redo());
    }

    #[test]
    fn test_undo_back_to_loaded_state() {
        let initial = vec![text("A"), text("B")];
        let mut session = session_with(initial.clone());
        let id = session.add_block("text").unwrap();

        assert!(session.undo());
        assert_eq!(session.blocks(), initial.as_slice());
        assert_eq!(session.selected_block_id(), None);
        assert!(session.block(&id).is_none());
        assert!(!session.undo());
    }

    #[test]
    fn test_history_stays_bounded() {
        let config = EditorConfig {
            max_history_size: 5,
            ..EditorConfig::default()
        };
        let mut session = EditorSession::new("l", "L", Vec::new(), &config);
        for _ in 0..20 {
            session.add_block("text");
            assert!(session.history().undo_levels() <= 5);
        }
    }

    #[test]
    fn test_current_page_clamped() {
        let mut session = session_with(vec![text("A"), brk(), text("B")]);
        session.set_current_page(9);
        assert_eq!(session.current_page(), 1);
    }

    #[test]
    fn test_save_payload_respects_schema() {
        let mut config = EditorConfig::default();
        let session = EditorSession::new("l", "L", vec![text("A")], &config);
        let payload = session.save_payload();
        assert_eq!(
            payload.content_meta.unwrap().first_page_background.as_deref(),
            Some("#ffffff")
        );

        config.schema.content_meta = false;
        let session = EditorSession::new("l", "L", vec![text("A")], &config);
        assert!(session.save_payload().content_meta.is_none());
    }

    #[test]
    fn test_from_record_migrates_text() {
        let record = LessonRecord::new("l1", "Intro").with_legacy("text", None, Some("Hello".into()));
        let (session, status) = EditorSession::from_record(&record, &EditorConfig::default());
        assert_eq!(status, MigrationStatus::Migrated);
        assert_eq!(session.blocks()[0].content, BlockContent::heading("Intro", 1));
        assert_eq!(session.blocks()[1].content, BlockContent::text("Hello"));
        assert!(session.has_unsaved_changes());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_failed_slide_migration_stays_clean() {
        let record = LessonRecord::new("deck", "Deck").with_legacy("presentation", None, None);
        let (mut session, status) = EditorSession::from_record(&record, &EditorConfig::default());
        assert_eq!(status, MigrationStatus::AwaitingSlides);
        assert!(!session.migration_status().is_persistable());

        session.fail_slide_migration(vec![text("Could not load")]);
        assert_eq!(session.migration_status(), MigrationStatus::Failed);
        assert!(!session.migration_status().is_persistable());
        assert!(!session.has_unsaved_changes());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_completed_slide_migration_is_dirty() {
        let record = LessonRecord::new("deck", "Deck").with_legacy("presentation", None, None);
        let (mut session, _) = EditorSession::from_record(&record, &EditorConfig::default());

        session.complete_slide_migration(vec![text("Slide 1")]);
        assert_eq!(session.migration_status(), MigrationStatus::Migrated);
        assert!(session.migration_status().is_persistable());
        assert!(session.has_unsaved_changes());
    }

    #[test]
    fn test_from_record_uses_stored_blocks_and_meta() {
        let blocks = vec![text("Stored")];
        let mut record = LessonRecord::new("l1", "Intro")
            .with_legacy("text", None, Some("Old".into()))
            .with_blocks(blocks.clone());
        record.content_meta = Some(ContentMeta {
            first_page_background: Some("#000000".into()),
        });

        let (session, status) = EditorSession::from_record(&record, &EditorConfig::default());
        assert_eq!(status, MigrationStatus::NotNeeded);
        assert_eq!(session.blocks(), blocks.as_slice());
        assert_eq!(session.first_page_background(), "#000000");
        assert!(!session.has_unsaved_changes());
    }
}
