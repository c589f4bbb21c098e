//! Lesson Store
//!
//! SQLite-backed implementation of both gateways: lesson records live in
//! `lessons`, legacy presentation slides in `lesson_slides`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};
use std::path::Path;
use tracing::{debug, info};

use crate::block::Block;
use crate::error::{Error, Result};
use crate::gateway::{
    ContentMeta, LessonRecord, LessonUpdate, PersistenceGateway, SchemaCapabilities, Slide,
    SlideGateway,
};

/// SQLite-based lesson store
pub struct SqliteLessonStore {
    pool: SqlitePool,
    capabilities: SchemaCapabilities,
}

impl SqliteLessonStore {
    /// Create a store over an existing pool; call [`init`](Self::init) before use
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            capabilities: SchemaCapabilities::default(),
        }
    }

    /// Open (or create) a database file and initialize the schema
    pub async fn from_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::database(format!("Failed to create directory: {e}")))?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        Self::connect(&url).await
    }

    /// Connect to a database URL and initialize the schema
    pub async fn connect(url: &str) -> Result<Self> {
        // Every connection to an in-memory database gets its own database
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        let mut store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    /// Create tables and resolve schema capabilities
    pub async fn init(&mut self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lessons (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content_blocks TEXT,
                content_meta TEXT,
                content_type TEXT,
                content_url TEXT,
                content_text TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS lesson_slides (
                lesson_id TEXT NOT NULL,
                slide_number INTEGER NOT NULL,
                title TEXT,
                content_type TEXT NOT NULL,
                content_text TEXT,
                content_url TEXT,
                PRIMARY KEY (lesson_id, slide_number)
            );

            CREATE INDEX IF NOT EXISTS idx_slides_lesson_id ON lesson_slides(lesson_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Databases created before content_meta existed keep their old shape
        let columns = sqlx::query("PRAGMA table_info(lessons)")
            .fetch_all(&self.pool)
            .await?;
        let content_meta = columns
            .iter()
            .any(|row| row.get::<String, _>("name") == "content_meta");
        self.capabilities = SchemaCapabilities { content_meta };

        info!(content_meta, "Lesson store initialized");
        Ok(())
    }

    /// Capabilities of the persisted schema
    #[must_use]
    pub fn capabilities(&self) -> SchemaCapabilities {
        self.capabilities
    }

    /// Insert or replace a lesson record
    pub async fn insert_lesson(&self, record: &LessonRecord) -> Result<()> {
        let blocks_json = record
            .content_blocks
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO lessons
            (id, title, content_blocks, content_type, content_url, content_text, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.title)
        .bind(blocks_json)
        .bind(&record.content_type)
        .bind(&record.content_url)
        .bind(&record.content_text)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        if let Some(meta) = &record.content_meta {
            self.write_meta(&record.id, meta).await?;
        }
        Ok(())
    }

    /// Insert or replace a presentation slide
    pub async fn insert_slide(&self, lesson_id: &str, slide: &Slide) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO lesson_slides
            (lesson_id, slide_number, title, content_type, content_text, content_url)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(lesson_id)
        .bind(slide.slide_number)
        .bind(&slide.title)
        .bind(&slide.content_type)
        .bind(&slide.content_text)
        .bind(&slide.content_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List all lessons
    pub async fn list_lessons(&self) -> Result<Vec<LessonSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, content_type,
                   content_blocks IS NOT NULL AND content_blocks NOT IN ('', '[]') AS has_blocks
            FROM lessons
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| LessonSummary {
                id: row.get("id"),
                title: row.get("title"),
                content_type: row.get("content_type"),
                has_blocks: row.get::<i64, _>("has_blocks") != 0,
            })
            .collect())
    }

    /// Ids of lessons with no blocks but legacy content
    pub async fn list_lessons_needing_migration(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM lessons
            WHERE (content_blocks IS NULL OR content_blocks IN ('', '[]'))
              AND content_type IS NOT NULL AND content_type != ''
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn write_meta(&self, lesson_id: &str, meta: &ContentMeta) -> Result<()> {
        if !self.capabilities.content_meta {
            return Err(Error::SchemaIncompatible(
                "lessons table has no content_meta column".to_string(),
            ));
        }
        sqlx::query("UPDATE lessons SET content_meta = ? WHERE id = ?")
            .bind(serde_json::to_string(meta)?)
            .bind(lesson_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn write_update(&self, lesson_id: &str, update: LessonUpdate) -> Result<()> {
        if update.content_meta.is_some() && !self.capabilities.content_meta {
            return Err(Error::SchemaIncompatible(
                "lessons table has no content_meta column".to_string(),
            ));
        }

        let blocks_json = serde_json::to_string(&update.content_blocks)?;
        let result = sqlx::query(
            r#"
            UPDATE lessons
            SET content_blocks = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&blocks_json)
        .bind(Utc::now().to_rfc3339())
        .bind(lesson_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::save_failure(format!("lesson {lesson_id} does not exist")));
        }

        if let Some(meta) = &update.content_meta {
            self.write_meta(lesson_id, meta).await?;
        }
        Ok(())
    }

    fn parse_lesson(&self, row: &SqliteRow) -> Result<LessonRecord> {
        let blocks_json: Option<String> = row.get("content_blocks");
        let content_blocks = match blocks_json.as_deref() {
            None | Some("") => None,
            Some(json) => Some(serde_json::from_str::<Vec<Block>>(json)?),
        };

        let content_meta = if self.capabilities.content_meta {
            let meta_json: Option<String> = row.get("content_meta");
            meta_json
                .as_deref()
                .map(serde_json::from_str::<ContentMeta>)
                .transpose()?
        } else {
            None
        };

        Ok(LessonRecord {
            id: row.get("id"),
            title: row.get("title"),
            content_blocks,
            content_meta,
            content_type: row.get("content_type"),
            content_url: row.get("content_url"),
            content_text: row.get("content_text"),
        })
    }
}

#[async_trait]
impl PersistenceGateway for SqliteLessonStore {
    async fn load_lesson(&self, lesson_id: &str) -> Result<LessonRecord> {
        let columns = if self.capabilities.content_meta {
            "id, title, content_blocks, content_meta, content_type, content_url, content_text"
        } else {
            "id, title, content_blocks, content_type, content_url, content_text"
        };
        let row = sqlx::query(&format!("SELECT {columns} FROM lessons WHERE id = ?"))
            .bind(lesson_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => self.parse_lesson(&row),
            None => Err(Error::NotFound(lesson_id.to_string())),
        }
    }

    async fn save_lesson(&self, lesson_id: &str, update: LessonUpdate) -> Result<LessonRecord> {
        debug!(lesson_id = %lesson_id, block_count = update.content_blocks.len(), "Writing lesson");
        match self.write_update(lesson_id, update).await {
            Ok(()) => {}
            Err(err @ (Error::SaveFailure(_) | Error::SchemaIncompatible(_))) => return Err(err),
            Err(other) => return Err(Error::save_failure(other.to_string())),
        }
        self.load_lesson(lesson_id)
            .await
            .map_err(|e| Error::save_failure(e.to_string()))
    }
}

#[async_trait]
impl SlideGateway for SqliteLessonStore {
    async fn load_slides(&self, lesson_id: &str) -> Result<Vec<Slide>> {
        let rows = sqlx::query(
            r#"
            SELECT slide_number, title, content_type, content_text, content_url
            FROM lesson_slides
            WHERE lesson_id = ?
            ORDER BY slide_number ASC
            "#,
        )
        .bind(lesson_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Slide {
                slide_number: row.get("slide_number"),
                title: row.get("title"),
                content_type: row.get("content_type"),
                content_text: row.get("content_text"),
                content_url: row.get("content_url"),
            })
            .collect())
    }
}

/// Summary of a lesson for listing
#[derive(Debug, Clone)]
pub struct LessonSummary {
    /// Lesson ID
    pub id: String,
    /// Lesson title
    pub title: String,
    /// Legacy content type, if any
    pub content_type: Option<String>,
    /// Whether a block sequence is stored
    pub has_blocks: bool,
}
