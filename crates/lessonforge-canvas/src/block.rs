//! Lesson Block Types
//!
//! This module defines the block structure for the lesson canvas.
//! A lesson is an ordered sequence of blocks; `page_break` blocks are
//! sentinels that split the sequence into pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Block identifier, unique within one canvas session
pub type BlockId = String;

/// Generate a fresh block id (`block-{unix_millis}-{suffix}`)
#[must_use]
pub fn new_block_id() -> BlockId {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("block-{}-{}", Utc::now().timestamp_millis(), &suffix[..9])
}

/// A single content block on the lesson canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Unique block ID
    pub id: BlockId,

    /// Kind tag and payload, serialized as `type` + `data`
    #[serde(flatten)]
    pub content: BlockContent,

    /// Canvas position (carried, not used for pagination)
    #[serde(default)]
    pub position: Position,

    /// Canvas size
    pub size: Size,

    /// When the block was created
    pub created_at: DateTime<Utc>,

    /// When the block was last modified
    pub updated_at: DateTime<Utc>,
}

impl Block {
    /// Create a block with a fresh id and the kind's default size
    #[must_use]
    pub fn new(content: BlockContent) -> Self {
        let now = Utc::now();
        let size = content.kind().default_size();
        Self {
            id: new_block_id(),
            content,
            position: Position::default(),
            size,
            created_at: now,
            updated_at: now,
        }
    }

    /// Override the size
    #[must_use]
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Get the block kind
    #[must_use]
    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }

    /// Whether this block is a page sentinel
    #[must_use]
    pub fn is_page_break(&self) -> bool {
        matches!(self.content, BlockContent::PageBreak(_))
    }

    /// Clone this block under a new id, shifted by `offset` on both axes
    #[must_use]
    pub fn duplicate(&self, offset: f64) -> Self {
        let now = Utc::now();
        Self {
            id: new_block_id(),
            content: self.content.clone(),
            position: self.position.offset(offset, offset),
            size: self.size,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a partial payload into this block, refreshing `updated_at`
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<()> {
        self.content.merge(patch)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Canvas position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset
    pub x: f64,
    /// Vertical offset
    pub y: f64,
}

impl Position {
    /// Shift by the given deltas
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Canvas size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width in canvas units
    pub width: f64,
    /// Height in canvas units
    pub height: f64,
}

impl Size {
    /// Create a size
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Closed set of block kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Section heading
    Heading,
    /// Rich text
    Text,
    /// Image
    Image,
    /// Video (YouTube, Vimeo or a direct file)
    Video,
    /// PDF document
    Pdf,
    /// Embedded iframe or raw HTML
    Embed,
    /// Page sentinel
    PageBreak,
}

impl BlockKind {
    /// All kinds, in palette order
    pub const ALL: [BlockKind; 7] = [
        Self::Heading,
        Self::Text,
        Self::Image,
        Self::Video,
        Self::Pdf,
        Self::Embed,
        Self::PageBreak,
    ];

    /// Get the tag string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Pdf => "pdf",
            Self::Embed => "embed",
            Self::PageBreak => "page_break",
        }
    }

    /// Default canvas size for new blocks of this kind
    #[must_use]
    pub fn default_size(&self) -> Size {
        match self {
            Self::Heading => Size::new(800.0, 60.0),
            Self::Text => Size::new(800.0, 200.0),
            Self::Image => Size::new(600.0, 400.0),
            Self::Video => Size::new(800.0, 450.0),
            Self::Pdf => Size::new(800.0, 1000.0),
            Self::Embed => Size::new(800.0, 480.0),
            Self::PageBreak => Size::new(800.0, 40.0),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidBlockType(s.to_string()))
    }
}

/// Block payload, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BlockContent {
    /// Heading block
    Heading(HeadingData),
    /// Text block
    Text(TextData),
    /// Image block
    Image(ImageData),
    /// Video block
    Video(VideoData),
    /// PDF block
    Pdf(PdfData),
    /// Embed block
    Embed(EmbedData),
    /// Page break sentinel
    PageBreak(PageBreakData),
}

impl BlockContent {
    /// Heading with the given text and level
    #[must_use]
    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        Self::Heading(HeadingData {
            text: text.into(),
            level,
        })
    }

    /// Plain text block
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::text_with_tone(content, TextTone::Plain)
    }

    /// Text block with a presentation tone
    #[must_use]
    pub fn text_with_tone(content: impl Into<String>, tone: TextTone) -> Self {
        Self::Text(TextData {
            content: content.into(),
            tone,
        })
    }

    /// Image block
    #[must_use]
    pub fn image(url: impl Into<String>, alt: impl Into<String>) -> Self {
        Self::Image(ImageData {
            url: url.into(),
            alt: alt.into(),
            caption: String::new(),
        })
    }

    /// Video block; the provider is sniffed from the URL
    #[must_use]
    pub fn video(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::Video(VideoData {
            provider: VideoProvider::detect(&url),
            url,
            title: String::new(),
        })
    }

    /// PDF block
    #[must_use]
    pub fn pdf(url: impl Into<String>) -> Self {
        Self::Pdf(PdfData {
            url: url.into(),
            title: String::new(),
        })
    }

    /// Embed block framing a source URL
    #[must_use]
    pub fn embed_src(src: impl Into<String>) -> Self {
        Self::Embed(EmbedData {
            src: Some(src.into()),
            ..EmbedData::default()
        })
    }

    /// Embed block carrying raw HTML
    #[must_use]
    pub fn embed_html(html: impl Into<String>, height: u32) -> Self {
        Self::Embed(EmbedData {
            src: None,
            html: Some(html.into()),
            height,
        })
    }

    /// Page break sentinel
    #[must_use]
    pub fn page_break() -> Self {
        Self::PageBreak(PageBreakData {})
    }

    /// Get the kind of this payload
    #[must_use]
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Heading(_) => BlockKind::Heading,
            Self::Text(_) => BlockKind::Text,
            Self::Image(_) => BlockKind::Image,
            Self::Video(_) => BlockKind::Video,
            Self::Pdf(_) => BlockKind::Pdf,
            Self::Embed(_) => BlockKind::Embed,
            Self::PageBreak(_) => BlockKind::PageBreak,
        }
    }

    /// Short human-readable summary, used by outlines and logs
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Heading(h) => h.text.clone(),
            Self::Text(t) => t.content.clone(),
            Self::Image(i) => i.url.clone(),
            Self::Video(v) => format!("{} ({})", v.url, v.provider.as_str()),
            Self::Pdf(p) => p.url.clone(),
            Self::Embed(e) => e
                .src
                .clone()
                .or_else(|| e.html.clone())
                .unwrap_or_default(),
            Self::PageBreak(_) => String::new(),
        }
    }

    /// Merge a JSON object into the payload key by key.
    ///
    /// The kind never changes; a patch that does not fit the kind's payload
    /// leaves the content untouched and returns an error.
    pub fn merge(&mut self, patch: &Map<String, Value>) -> Result<()> {
        let merged = match self {
            Self::Heading(d) => Self::Heading(merge_payload(d, patch)?),
            Self::Text(d) => Self::Text(merge_payload(d, patch)?),
            Self::Image(d) => Self::Image(merge_payload(d, patch)?),
            Self::Video(d) => Self::Video(merge_payload(d, patch)?),
            Self::Pdf(d) => Self::Pdf(merge_payload(d, patch)?),
            Self::Embed(d) => Self::Embed(merge_payload(d, patch)?),
            Self::PageBreak(d) => Self::PageBreak(merge_payload(d, patch)?),
        };
        *self = merged;
        Ok(())
    }
}

fn merge_payload<T>(current: &T, patch: &Map<String, Value>) -> Result<T>
where
    T: Serialize + serde::de::DeserializeOwned,
{
    let mut value = serde_json::to_value(current)?;
    if let Value::Object(fields) = &mut value {
        for (key, patch_value) in patch {
            fields.insert(key.clone(), patch_value.clone());
        }
    }
    Ok(serde_json::from_value(value)?)
}

/// Heading payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingData {
    /// Heading text
    pub text: String,
    /// Heading level (1-6)
    pub level: u8,
}

impl Default for HeadingData {
    fn default() -> Self {
        Self {
            text: "New Heading".to_string(),
            level: 2,
        }
    }
}

/// Text payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextData {
    /// Text content (may contain inline HTML)
    pub content: String,
    /// Presentation tone
    pub tone: TextTone,
}

/// Presentation tone of a text block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTone {
    /// Regular body text
    #[default]
    Plain,
    /// Informational note
    Info,
    /// Warning note
    Warning,
    /// Error message
    Error,
}

/// Image payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageData {
    /// Image URL
    pub url: String,
    /// Alt text
    pub alt: String,
    /// Caption shown below the image
    pub caption: String,
}

/// Video payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoData {
    /// Video URL
    pub url: String,
    /// Player to use
    pub provider: VideoProvider,
    /// Optional title
    pub title: String,
}

/// Video player sub-type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoProvider {
    /// YouTube embed
    Youtube,
    /// Vimeo embed
    Vimeo,
    /// Native HTML5 video element
    #[default]
    Html5,
}

impl VideoProvider {
    /// Pick the player from the URL by substring match
    #[must_use]
    pub fn detect(url: &str) -> Self {
        if url.contains("youtube.com") || url.contains("youtu.be") {
            Self::Youtube
        } else if url.contains("vimeo.com") {
            Self::Vimeo
        } else {
            Self::Html5
        }
    }

    /// Get the tag string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Vimeo => "vimeo",
            Self::Html5 => "html5",
        }
    }
}

/// PDF payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfData {
    /// Document URL
    pub url: String,
    /// Optional title
    pub title: String,
}

/// Embed payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedData {
    /// Iframe source
    pub src: Option<String>,
    /// Raw HTML, used when there is no source URL
    pub html: Option<String>,
    /// Frame height in pixels
    pub height: u32,
}

impl Default for EmbedData {
    fn default() -> Self {
        Self {
            src: None,
            html: None,
            height: 480,
        }
    }
}

/// Page break payload (empty)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageBreakData {}
