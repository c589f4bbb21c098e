//! Lesson inspection commands

use anyhow::{Context, Result};
use lessonforge_canvas::{EditorSession, MigrationStatus, SlideMigrationOutcome};

use super::{build_editor, open_store};
use crate::config::AppConfig;

/// Create the schema and report what it supports
pub async fn init(config: &AppConfig) -> Result<()> {
    let store = open_store(config).await?;
    let capabilities = store.capabilities();

    println!("Database ready: {}", config.database.url);
    println!(
        "  content_meta column: {}",
        if capabilities.content_meta { "yes" } else { "no" }
    );
    Ok(())
}

/// List all lessons
pub async fn list(config: &AppConfig) -> Result<()> {
    let store = open_store(config).await?;
    let lessons = store.list_lessons().await?;

    if lessons.is_empty() {
        println!("No lessons.");
        return Ok(());
    }

    for lesson in lessons {
        let state = match (lesson.has_blocks, lesson.content_type.as_deref()) {
            (true, _) => "blocks".to_string(),
            (false, Some(legacy)) if !legacy.is_empty() => format!("legacy:{legacy}"),
            (false, _) => "empty".to_string(),
        };
        println!("{:<24} {:<16} {}", lesson.id, state, lesson.title);
    }
    Ok(())
}

/// Print the page outline of a lesson
pub async fn show(config: &AppConfig, lesson_id: &str) -> Result<()> {
    let store = open_store(config).await?;
    let editor = build_editor(config, store);

    let mut opened = editor
        .open_lesson(lesson_id)
        .await
        .with_context(|| format!("Failed to open lesson {lesson_id}"))?;
    if opened.wait_for_migration().await? == Some(SlideMigrationOutcome::Failed) {
        println!("(presentation slides could not be loaded)");
    } else if opened.status != MigrationStatus::NotNeeded {
        println!("(converted from legacy content, not saved)");
    }

    let outline = editor
        .with_session(outline)
        .await
        .unwrap_or_default();
    println!("{outline}");
    Ok(())
}

/// Render a plain-text outline of the session's pages
pub fn outline(session: &EditorSession) -> String {
    let mut out = format!("{} [{}]\n", session.title(), session.lesson_id());
    for page in 0..session.page_count() {
        out.push_str(&format!("Page {}\n", page + 1));
        for block in session.blocks_on_page(page) {
            out.push_str(&format!(
                "  - {:<10} {}\n",
                block.kind().as_str(),
                block.content.summary()
            ));
        }
    }
    out
}
