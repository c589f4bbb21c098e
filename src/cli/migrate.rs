//! Legacy migration commands

use anyhow::{bail, Context, Result};
use lessonforge_canvas::{LessonEditor, MigrationStatus, SlideMigrationOutcome};
use tracing::{info, warn};

use super::{build_editor, open_store};
use crate::config::AppConfig;

/// What happened to one lesson
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub lesson_id: String,
    pub status: MigrationStatus,
    pub block_count: usize,
    pub saved: bool,
}

/// Open a lesson, wait for any slide conversion and save the result
pub async fn migrate_lesson(
    editor: &LessonEditor,
    lesson_id: &str,
    dry_run: bool,
) -> Result<MigrationOutcome> {
    let mut opened = editor
        .open_lesson(lesson_id)
        .await
        .with_context(|| format!("Failed to open lesson {lesson_id}"))?;
    match opened.wait_for_migration().await? {
        Some(SlideMigrationOutcome::Failed) => {
            bail!("Slides for lesson {lesson_id} could not be loaded; lesson left unchanged")
        }
        Some(SlideMigrationOutcome::Stale) => {
            bail!("Lesson {lesson_id} was replaced before its slides arrived")
        }
        Some(SlideMigrationOutcome::Committed) | None => {}
    }

    let block_count = editor
        .with_session(|s| s.blocks().len())
        .await
        .unwrap_or_default();

    let saved = if opened.status == MigrationStatus::NotNeeded || dry_run {
        false
    } else {
        editor
            .save()
            .await
            .with_context(|| format!("Failed to save lesson {lesson_id}"))?;
        true
    };

    Ok(MigrationOutcome {
        lesson_id: lesson_id.to_string(),
        status: opened.status,
        block_count,
        saved,
    })
}

/// Migrate one lesson
pub async fn run(config: &AppConfig, lesson_id: &str, dry_run: bool) -> Result<()> {
    let store = open_store(config).await?;
    let editor = build_editor(config, store);

    let outcome = migrate_lesson(&editor, lesson_id, dry_run).await?;
    print_outcome(&outcome, dry_run);
    Ok(())
}

/// Migrate every lesson that still needs it; failures are reported and skipped
pub async fn run_all(config: &AppConfig, dry_run: bool) -> Result<()> {
    let store = open_store(config).await?;
    let pending = store.list_lessons_needing_migration().await?;
    let editor = build_editor(config, store);

    info!(count = pending.len(), dry_run, "Migrating legacy lessons");
    let mut failed = 0usize;
    for lesson_id in &pending {
        match migrate_lesson(&editor, lesson_id, dry_run).await {
            Ok(outcome) => print_outcome(&outcome, dry_run),
            Err(e) => {
                failed += 1;
                warn!(lesson_id = %lesson_id, error = %e, "Migration failed");
                println!("{lesson_id}: failed ({e:#})");
            }
        }
    }
    editor.close().await;

    println!(
        "{} lesson(s) processed, {} failed{}",
        pending.len(),
        failed,
        if dry_run { " (dry run)" } else { "" }
    );
    Ok(())
}

fn print_outcome(outcome: &MigrationOutcome, dry_run: bool) {
    let action = match (outcome.status, outcome.saved) {
        (MigrationStatus::NotNeeded, _) => "already migrated",
        (_, true) => "migrated",
        (_, false) if dry_run => "would migrate",
        (_, false) => "not saved",
    };
    println!(
        "{}: {} ({} blocks)",
        outcome.lesson_id, action, outcome.block_count
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lessonforge_canvas::{
        EditorConfig, Error, LessonRecord, PersistenceGateway, Slide, SlideGateway,
        SqliteLessonStore,
    };
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    struct UnreachableSlides;

    #[async_trait]
    impl SlideGateway for UnreachableSlides {
        async fn load_slides(&self, _lesson_id: &str) -> lessonforge_canvas::Result<Vec<Slide>> {
            Err(Error::database("connection refused"))
        }
    }

    async fn memory_store() -> Arc<SqliteLessonStore> {
        Arc::new(SqliteLessonStore::connect("sqlite::memory:").await.unwrap())
    }

    fn editor_for(store: &Arc<SqliteLessonStore>) -> LessonEditor {
        LessonEditor::new(store.clone(), store.clone(), EditorConfig::default())
    }

    #[tokio::test]
    async fn test_migrate_saves_legacy_lesson() {
        let store = memory_store().await;
        let record = LessonRecord::new("pdf-1", "Reading")
            .with_legacy("pdf", Some("https://example.com/a.pdf".into()), None);
        store.insert_lesson(&record).await.unwrap();
        let editor = editor_for(&store);

        let outcome = assert_ok!(migrate_lesson(&editor, "pdf-1", false).await);
        assert_eq!(outcome.status, MigrationStatus::Migrated);
        assert!(outcome.saved);
        assert!(store.load_lesson("pdf-1").await.unwrap().has_blocks());
        assert!(store.list_lessons_needing_migration().await.unwrap().is_empty());

        let again = assert_ok!(migrate_lesson(&editor, "pdf-1", false).await);
        assert_eq!(again.status, MigrationStatus::NotNeeded);
        assert!(!again.saved);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_store_untouched() {
        let store = memory_store().await;
        let record = LessonRecord::new("deck", "Deck").with_legacy("presentation", None, None);
        store.insert_lesson(&record).await.unwrap();
        let slide = Slide {
            slide_number: 1,
            content_type: "text".into(),
            content_text: Some("Only slide".into()),
            ..Slide::default()
        };
        store.insert_slide("deck", &slide).await.unwrap();
        let editor = editor_for(&store);

        let outcome = assert_ok!(migrate_lesson(&editor, "deck", true).await);
        assert_eq!(outcome.status, MigrationStatus::AwaitingSlides);
        assert!(!outcome.saved);
        assert!(outcome.block_count > 1);
        assert!(!store.load_lesson("deck").await.unwrap().has_blocks());
    }

    #[tokio::test]
    async fn test_failed_slide_fetch_is_not_saved() {
        let store = memory_store().await;
        let record = LessonRecord::new("deck", "Deck").with_legacy("presentation", None, None);
        store.insert_lesson(&record).await.unwrap();
        let editor = LessonEditor::new(
            store.clone(),
            Arc::new(UnreachableSlides),
            EditorConfig::default(),
        );

        let err = assert_err!(migrate_lesson(&editor, "deck", false).await);
        assert!(err.to_string().contains("could not be loaded"));

        let stored = store.load_lesson("deck").await.unwrap();
        assert!(stored.content_blocks.is_none());
        assert_eq!(
            store.list_lessons_needing_migration().await.unwrap(),
            vec!["deck".to_string()]
        );
    }
}
