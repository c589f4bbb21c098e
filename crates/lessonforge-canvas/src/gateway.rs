//! Gateway traits and records
//!
//! The editor core talks to storage through two collaborators: a
//! persistence gateway that loads and saves lesson records, and a slide
//! gateway that serves the slides of legacy multi-slide presentations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::error::Result;
use crate::migration::LegacyContentType;

/// Lesson presentation metadata stored next to the blocks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMeta {
    /// Background color of the first page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_page_background: Option<String>,
}

/// A lesson as stored upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonRecord {
    /// Lesson ID
    pub id: String,

    /// Lesson title
    pub title: String,

    /// Serialized block sequence (`None` before the first save)
    #[serde(default)]
    pub content_blocks: Option<Vec<Block>>,

    /// Presentation metadata
    #[serde(default)]
    pub content_meta: Option<ContentMeta>,

    /// Legacy content type (`text`, `video`, `pdf`, `image`, `ppt`, `presentation`)
    #[serde(default)]
    pub content_type: Option<String>,

    /// Legacy content URL
    #[serde(default)]
    pub content_url: Option<String>,

    /// Legacy content text
    #[serde(default)]
    pub content_text: Option<String>,
}

impl LessonRecord {
    /// Create a lesson with no content
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set legacy content fields
    #[must_use]
    pub fn with_legacy(
        mut self,
        content_type: impl Into<String>,
        content_url: Option<String>,
        content_text: Option<String>,
    ) -> Self {
        self.content_type = Some(content_type.into());
        self.content_url = content_url;
        self.content_text = content_text;
        self
    }

    /// Set the stored block sequence
    #[must_use]
    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.content_blocks = Some(blocks);
        self
    }

    /// Whether a non-empty block sequence is stored
    #[must_use]
    pub fn has_blocks(&self) -> bool {
        self.content_blocks
            .as_ref()
            .is_some_and(|blocks| !blocks.is_empty())
    }

    /// Whether any legacy content field is populated
    #[must_use]
    pub fn has_legacy_content(&self) -> bool {
        // Presentation slides live in their own table
        if self.content_type.as_deref().map(LegacyContentType::parse)
            == Some(LegacyContentType::Presentation)
        {
            return true;
        }
        let filled = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.content_type) && (filled(&self.content_url) || filled(&self.content_text))
    }

    /// Whether opening this lesson should run the migration engine
    #[must_use]
    pub fn needs_migration(&self) -> bool {
        !self.has_blocks() && self.has_legacy_content()
    }
}

/// Fields written by a save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonUpdate {
    /// Block sequence
    pub content_blocks: Vec<Block>,

    /// Metadata; omitted when the schema cannot hold it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_meta: Option<ContentMeta>,
}

/// One slide of a legacy presentation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// Position in the deck (ascending)
    pub slide_number: i64,

    /// Slide title
    #[serde(default)]
    pub title: Option<String>,

    /// Primary content type (`text`, `video`, `image`, `pdf`, `audio`)
    pub content_type: String,

    /// Text content (primary for `text`, supplementary otherwise)
    #[serde(default)]
    pub content_text: Option<String>,

    /// Media URL
    #[serde(default)]
    pub content_url: Option<String>,
}

/// What the persisted schema can store, resolved once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaCapabilities {
    /// The lesson table has a `content_meta` column
    pub content_meta: bool,
}

impl SchemaCapabilities {
    /// Capabilities supported by both descriptors
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        Self {
            content_meta: self.content_meta && other.content_meta,
        }
    }
}

impl Default for SchemaCapabilities {
    fn default() -> Self {
        Self { content_meta: true }
    }
}

/// Load/save of lesson records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Load a lesson; fails with `NotFound` for unknown ids
    async fn load_lesson(&self, lesson_id: &str) -> Result<LessonRecord>;

    /// Write blocks (and metadata); fails with `SaveFailure`
    async fn save_lesson(&self, lesson_id: &str, update: LessonUpdate) -> Result<LessonRecord>;
}

/// Slide source for legacy presentations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlideGateway: Send + Sync {
    /// Ordered slides of a lesson; an empty list is a valid result
    async fn load_slides(&self, lesson_id: &str) -> Result<Vec<Slide>>;
}
