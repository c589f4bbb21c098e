//! LessonForge Canvas - Lesson Editor Core
//!
//! This crate provides the editing core behind the LessonForge lesson canvas:
//! - Block: Block model and payload types
//! - Registry: Block definitions and defaults per block kind
//! - Pages: Page segmentation over `page_break` sentinels
//! - Session: Editing state for one open lesson
//! - History: Bounded undo/redo snapshots
//! - Clipboard: Single-slot block clipboard
//! - Migration: Legacy content and presentation conversion
//! - AutoSave: Dirty tracking and save bookkeeping
//! - Editor: Lesson open/save orchestration over the gateways
//! - Store: SQLite implementation of the gateways
//! - Error: Error types for editor operations
//!
//! ## Features
//!
//! - Closed set of block kinds with typed payloads
//! - Page-relative insertion of new blocks
//! - Undo/redo with a configurable depth (50 by default)
//! - One-time migration of legacy lessons into blocks
//! - Background presentation migration with stale-result detection
//! - Periodic auto-save with overlap protection
//!
//! ## Usage
//!
//! ```ignore
//! use lessonforge_canvas::{EditorConfig, LessonEditor, SqliteLessonStore};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let store = Arc::new(SqliteLessonStore::connect("sqlite:lessons.db?mode=rwc").await?);
//! let config = EditorConfig::default().with_schema(store.capabilities());
//! let editor = Arc::new(LessonEditor::new(store.clone(), store, config));
//!
//! // Ticks every `editor.autosave.interval_secs` until cancelled
//! let shutdown = CancellationToken::new();
//! let autosave = editor.spawn_configured_autosave(shutdown.clone());
//!
//! editor.open_lesson("lesson-1").await?;
//! editor.with_session_mut(|s| s.add_block("heading")).await;
//! editor.save().await?;
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! [editor]
//! max_history_size = 50
//! first_page_background = "#ffffff"
//! duplicate_offset = 20.0
//!
//! [editor.autosave]
//! enabled = true
//! interval_secs = 30
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod autosave;
pub mod block;
pub mod clipboard;
pub mod config;
pub mod editor;
pub mod error;
pub mod gateway;
pub mod history;
pub mod migration;
pub mod pages;
pub mod registry;
pub mod session;
pub mod store;

// Re-export main types
pub use autosave::AutoSaveController;
pub use block::{
    Block, BlockContent, BlockId, BlockKind, EmbedData, HeadingData, ImageData, PageBreakData,
    PdfData, Position, Size, TextData, TextTone, VideoData, VideoProvider,
};
pub use clipboard::Clipboard;
pub use config::{AutoSaveConfig, EditorConfig};
pub use editor::{LessonEditor, OpenedLesson, SlideMigrationOutcome};
pub use error::{Error, Result};
pub use gateway::{
    ContentMeta, LessonRecord, LessonUpdate, PersistenceGateway, SchemaCapabilities, Slide,
    SlideGateway,
};
pub use history::{HistoryManager, Snapshot, DEFAULT_MAX_HISTORY_SIZE};
pub use migration::{LegacyContentType, MigrationPlan};
pub use registry::{BlockDefinition, BlockRegistry};
pub use session::{EditorSession, MigrationStatus};
pub use store::{LessonSummary, SqliteLessonStore};
