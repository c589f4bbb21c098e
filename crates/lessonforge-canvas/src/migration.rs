//! Legacy lesson migration
//!
//! Converts lessons stored in the single-field legacy format (one text,
//! video, PDF, image or PowerPoint item, or a multi-slide presentation)
//! into a block sequence.
//!
//! Single-item content converts synchronously. Presentations need their
//! slides from the [`SlideGateway`], so they start as a loading placeholder
//! and are replaced once the slides arrive.

use tracing::{debug, warn};

use crate::block::{Block, BlockContent, ImageData, PdfData, TextTone};
use crate::error::{Error, Result};
use crate::gateway::{LessonRecord, Slide, SlideGateway};

/// Office Online viewer used to frame PowerPoint files
pub const OFFICE_VIEWER_URL: &str = "https://view.officeapps.live.com/op/embed.aspx?src=";

/// Note appended to migrated lessons whose content was converted
pub const MIGRATION_NOTICE: &str = "This lesson was migrated automatically from the legacy format. \
Review the blocks below and adjust them as needed.";

/// Text shown while presentation slides are loading
pub const LOADING_PLACEHOLDER: &str = "Loading presentation slides...";

/// Legacy `content_type` values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyContentType {
    /// Raw text
    Text,
    /// Video URL
    Video,
    /// PDF URL
    Pdf,
    /// Image URL
    Image,
    /// PowerPoint file URL
    Ppt,
    /// Multi-slide presentation
    Presentation,
    /// Anything else
    Other(String),
}

impl LegacyContentType {
    /// Parse a stored tag
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "text" => Self::Text,
            "video" => Self::Video,
            "pdf" => Self::Pdf,
            "image" => Self::Image,
            "ppt" | "pptx" => Self::Ppt,
            "presentation" => Self::Presentation,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Outcome of planning a migration
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationPlan {
    /// Final block sequence
    Ready(Vec<Block>),
    /// Placeholder to show until the slides are fetched
    PendingSlides {
        /// Blocks to display in the meantime
        placeholder: Vec<Block>,
    },
}

/// Decide how to migrate `record`
#[must_use]
pub fn plan_migration(record: &LessonRecord) -> MigrationPlan {
    let kind = record
        .content_type
        .as_deref()
        .map(LegacyContentType::parse);
    match kind {
        Some(LegacyContentType::Presentation) => MigrationPlan::PendingSlides {
            placeholder: loading_placeholder(),
        },
        _ => MigrationPlan::Ready(migrate_single(record)),
    }
}

/// Synchronous path: heading, the converted item, then a migration note
/// (omitted for plain text, which converts to exactly heading + text)
#[must_use]
pub fn migrate_single(record: &LessonRecord) -> Vec<Block> {
    let mut blocks = vec![Block::new(BlockContent::heading(record.title.clone(), 1))];

    let url = non_empty(record.content_url.as_deref());
    let text = non_empty(record.content_text.as_deref());
    let kind = record
        .content_type
        .as_deref()
        .map(LegacyContentType::parse)
        .unwrap_or_else(|| LegacyContentType::Other(String::new()));

    match (&kind, url, text) {
        (LegacyContentType::Text, _, Some(text)) => {
            blocks.push(Block::new(BlockContent::text(text)));
        }
        (LegacyContentType::Video, Some(url), _) => {
            blocks.push(Block::new(BlockContent::video(url)));
        }
        (LegacyContentType::Pdf, Some(url), _) => {
            blocks.push(Block::new(BlockContent::Pdf(PdfData {
                url: url.to_string(),
                title: record.title.clone(),
            })));
        }
        (LegacyContentType::Image, Some(url), _) => {
            blocks.push(Block::new(BlockContent::Image(ImageData {
                url: url.to_string(),
                alt: record.title.clone(),
                caption: String::new(),
            })));
        }
        (LegacyContentType::Ppt, Some(url), _) => {
            blocks.push(Block::new(BlockContent::embed_src(office_viewer_url(url))));
            blocks.push(Block::new(BlockContent::text_with_tone(
                download_link_html(url),
                TextTone::Info,
            )));
        }
        (LegacyContentType::Other(_), _, Some(text)) => {
            blocks.push(Block::new(BlockContent::text(text)));
        }
        _ => {
            warn!(
                lesson_id = %record.id,
                content_type = ?record.content_type,
                "Legacy lesson has no convertible content"
            );
        }
    }

    // Plain text carries over verbatim and gets no review note
    if blocks.len() > 1 && kind != LegacyContentType::Text {
        blocks.push(Block::new(BlockContent::text_with_tone(
            MIGRATION_NOTICE,
            TextTone::Info,
        )));
    }

    debug!(lesson_id = %record.id, block_count = blocks.len(), "Migrated legacy lesson");
    blocks
}

/// Placeholder shown while slides load
#[must_use]
pub fn loading_placeholder() -> Vec<Block> {
    vec![Block::new(BlockContent::text_with_tone(
        LOADING_PLACEHOLDER,
        TextTone::Info,
    ))]
}

/// Fetch slides and convert them; gateway errors become `MigrationFailure`
pub async fn fetch_presentation_blocks(
    gateway: &dyn SlideGateway,
    lesson_id: &str,
) -> Result<Vec<Block>> {
    let slides = gateway
        .load_slides(lesson_id)
        .await
        .map_err(|e| Error::migration_failure(e.to_string()))?;
    Ok(blocks_from_slides(&slides))
}

/// Convert an ordered slide list into a paginated block sequence
#[must_use]
pub fn blocks_from_slides(slides: &[Slide]) -> Vec<Block> {
    if slides.is_empty() {
        return vec![
            Block::new(BlockContent::heading("Presentation (Empty)", 1)),
            Block::new(BlockContent::text_with_tone(
                "This presentation does not contain any slides yet.",
                TextTone::Info,
            )),
        ];
    }

    let mut ordered: Vec<&Slide> = slides.iter().collect();
    ordered.sort_by_key(|slide| slide.slide_number);

    let mut blocks = Vec::new();
    for (i, slide) in ordered.iter().enumerate() {
        if i > 0 {
            blocks.push(Block::new(BlockContent::page_break()));
        }
        blocks.extend(slide_blocks(slide));
    }

    blocks.push(Block::new(BlockContent::page_break()));
    blocks.push(Block::new(BlockContent::text_with_tone(
        format!(
            "End of presentation: {} slide{} migrated from the legacy format.",
            ordered.len(),
            if ordered.len() == 1 { "" } else { "s" }
        ),
        TextTone::Info,
    )));
    blocks
}

/// Error block shown in place of slides that could not be fetched
#[must_use]
pub fn migration_error_blocks(err: &Error) -> Vec<Block> {
    vec![Block::new(BlockContent::text_with_tone(
        format!("Could not load presentation slides: {err}"),
        TextTone::Error,
    ))]
}

fn slide_blocks(slide: &Slide) -> Vec<Block> {
    let mut blocks = Vec::new();

    let title = non_empty(slide.title.as_deref());
    if let Some(title) = title {
        blocks.push(Block::new(BlockContent::heading(title, 2)));
    }

    let url = non_empty(slide.content_url.as_deref());
    let text = non_empty(slide.content_text.as_deref());
    let primary = slide.content_type.trim().to_ascii_lowercase();

    let content = match (primary.as_str(), url) {
        ("text", _) => text.map(BlockContent::text),
        ("video", Some(url)) => Some(BlockContent::video(url)),
        ("image", Some(url)) => Some(BlockContent::image(url, title.unwrap_or_default())),
        ("pdf", Some(url)) => Some(BlockContent::pdf(url)),
        ("audio", Some(url)) => Some(BlockContent::embed_html(audio_player_html(url), 80)),
        _ => None,
    };
    if let Some(content) = content {
        blocks.push(Block::new(content));
    }

    // Supplementary text on media slides
    if primary != "text" {
        if let Some(text) = text {
            blocks.push(Block::new(BlockContent::text(text)));
        }
    }

    blocks
}

/// Office Online viewer URL wrapping the encoded file link
#[must_use]
pub fn office_viewer_url(url: &str) -> String {
    format!("{OFFICE_VIEWER_URL}{}", urlencoding::encode(url))
}

/// Inline audio player markup
#[must_use]
pub fn audio_player_html(url: &str) -> String {
    format!(
        r#"<audio controls preload="metadata" style="width:100%" src="{}"></audio>"#,
        html_escape(url)
    )
}

fn download_link_html(url: &str) -> String {
    format!(
        r#"<p>Trouble viewing the presentation? <a href="{}" target="_blank" rel="noopener" download>Download the PowerPoint file</a>.</p>"#,
        html_escape(url)
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockKind, VideoProvider};
    use crate::gateway::MockSlideGateway;

    fn kinds(blocks: &[Block]) -> Vec<BlockKind> {
        blocks.iter().map(Block::kind).collect()
    }

    fn slide(n: i64, content_type: &str, title: Option<&str>, text: Option<&str>, url: Option<&str>) -> Slide {
        Slide {
            slide_number: n,
            title: title.map(String::from),
            content_type: content_type.to_string(),
            content_text: text.map(String::from),
            content_url: url.map(String::from),
        }
    }

    #[test]
    fn test_legacy_content_type_parse() {
        assert_eq!(LegacyContentType::parse("PPT"), LegacyContentType::Ppt);
        assert_eq!(LegacyContentType::parse(" video "), LegacyContentType::Video);
        assert_eq!(
            LegacyContentType::parse("quiz"),
            LegacyContentType::Other("quiz".to_string())
        );
    }

    #[test]
    fn test_migrate_text_is_heading_and_text_only() {
        let record = LessonRecord::new("l1", "Intro").with_legacy("text", None, Some("Hello".into()));
        let blocks = migrate_single(&record);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].content, BlockContent::heading("Intro", 1));
        assert_eq!(blocks[1].content, BlockContent::text("Hello"));
    }

    #[test]
    fn test_migrate_media_appends_notice() {
        let record = LessonRecord::new("l1", "Watch")
            .with_legacy("video", Some("https://youtu.be/xyz".into()), None);
        let blocks = migrate_single(&record);

        assert_eq!(
            kinds(&blocks),
            vec![BlockKind::Heading, BlockKind::Video, BlockKind::Text]
        );
        match &blocks[2].content {
            BlockContent::Text(t) => {
                assert_eq!(t.tone, TextTone::Info);
                assert_eq!(t.content, MIGRATION_NOTICE);
            }
            _ => panic!("Expected migration notice"),
        }
    }

    #[test]
    fn test_migrate_video_youtube() {
        let record = LessonRecord::new("l1", "Watch")
            .with_legacy("video", Some("https://youtu.be/xyz".into()), None);
        let blocks = migrate_single(&record);
        match &blocks[1].content {
            BlockContent::Video(v) => {
                assert_eq!(v.provider, VideoProvider::Youtube);
                assert_eq!(v.url, "https://youtu.be/xyz");
            }
            _ => panic!("Expected Video block"),
        }
    }

    #[test]
    fn test_migrate_ppt() {
        let url = "https://example.com/a.pptx";
        let record = LessonRecord::new("l1", "Deck").with_legacy("ppt", Some(url.into()), None);
        let blocks = migrate_single(&record);

        assert_eq!(
            kinds(&blocks),
            vec![BlockKind::Heading, BlockKind::Embed, BlockKind::Text, BlockKind::Text]
        );
        match &blocks[1].content {
            BlockContent::Embed(e) => {
                let src = e.src.as_deref().unwrap();
                assert!(src.starts_with(OFFICE_VIEWER_URL));
                assert!(src.contains("https%3A%2F%2Fexample.com%2Fa.pptx"));
            }
            _ => panic!("Expected Embed block"),
        }
        match &blocks[2].content {
            BlockContent::Text(t) => assert!(t.content.contains(url)),
            _ => panic!("Expected download link"),
        }
    }

    #[test]
    fn test_migrate_pdf_and_image() {
        let pdf = LessonRecord::new("l1", "Doc").with_legacy("pdf", Some("https://x/a.pdf".into()), None);
        assert_eq!(kinds(&migrate_single(&pdf))[1], BlockKind::Pdf);

        let img = LessonRecord::new("l1", "Pic").with_legacy("image", Some("https://x/a.png".into()), None);
        assert_eq!(kinds(&migrate_single(&img))[1], BlockKind::Image);
    }

    #[test]
    fn test_migrate_missing_content_yields_heading_only() {
        let record = LessonRecord::new("l1", "Empty").with_legacy("video", None, None);
        let blocks = migrate_single(&record);
        assert_eq!(kinds(&blocks), vec![BlockKind::Heading]);
    }

    #[test]
    fn test_plan_presentation_is_pending() {
        let record = LessonRecord::new("l1", "Deck").with_legacy("presentation", None, None);
        match plan_migration(&record) {
            MigrationPlan::PendingSlides { placeholder } => {
                assert_eq!(placeholder.len(), 1);
                assert_eq!(placeholder[0].kind(), BlockKind::Text);
            }
            MigrationPlan::Ready(_) => panic!("Expected pending plan"),
        }
    }

    #[test]
    fn test_slides_empty() {
        let blocks = blocks_from_slides(&[]);
        assert_eq!(blocks[0].content, BlockContent::heading("Presentation (Empty)", 1));
        assert_eq!(kinds(&blocks), vec![BlockKind::Heading, BlockKind::Text]);
    }

    #[test]
    fn test_slides_paginated() {
        let slides = vec![
            slide(2, "video", Some("Demo"), Some("Watch closely"), Some("https://vimeo.com/1")),
            slide(1, "text", Some("Welcome"), Some("Hi there"), None),
            slide(3, "audio", None, None, Some("https://x/a.mp3")),
        ];
        let blocks = blocks_from_slides(&slides);

        assert_eq!(
            kinds(&blocks),
            vec![
                BlockKind::Heading,
                BlockKind::Text,
                BlockKind::PageBreak,
                BlockKind::Heading,
                BlockKind::Video,
                BlockKind::Text,
                BlockKind::PageBreak,
                BlockKind::Embed,
                BlockKind::PageBreak,
                BlockKind::Text,
            ]
        );
        assert_eq!(blocks[0].content, BlockContent::heading("Welcome", 2));
        match &blocks[7].content {
            BlockContent::Embed(e) => assert!(e.html.as_deref().unwrap().contains("<audio")),
            _ => panic!("Expected audio embed"),
        }
    }

    #[tokio::test]
    async fn test_presentation_fetch_failure_becomes_error_block() {
        let mut gateway = MockSlideGateway::new();
        gateway
            .expect_load_slides()
            .returning(|_| Err(Error::database("connection reset")));

        let err = fetch_presentation_blocks(&gateway, "l1").await.unwrap_err();
        let blocks = migration_error_blocks(&err);
        assert_eq!(blocks.len(), 1);
        match &blocks[0].content {
            BlockContent::Text(t) => {
                assert_eq!(t.tone, TextTone::Error);
                assert!(t.content.contains("connection reset"));
            }
            _ => panic!("Expected error block"),
        }
    }

    #[tokio::test]
    async fn test_fetch_presentation_maps_error() {
        let mut gateway = MockSlideGateway::new();
        gateway
            .expect_load_slides()
            .returning(|_| Err(Error::database("boom")));

        let err = fetch_presentation_blocks(&gateway, "l1").await.unwrap_err();
        assert_eq!(err.code(), "migration_failure");
    }
}
