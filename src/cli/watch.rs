//! Keep a lesson open with auto-save running until shutdown

use anyhow::{Context, Result};
use lessonforge_canvas::{LessonEditor, SlideMigrationOutcome};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{build_editor, open_store};
use crate::config::AppConfig;

/// Open `lesson_id` and let the configured auto-save loop run until `shutdown`
/// fires. Returns whether the final flush wrote anything.
pub async fn watch_lesson(
    editor: Arc<LessonEditor>,
    lesson_id: &str,
    shutdown: CancellationToken,
) -> Result<bool> {
    let mut opened = editor
        .open_lesson(lesson_id)
        .await
        .with_context(|| format!("Failed to open lesson {lesson_id}"))?;
    if opened.wait_for_migration().await? == Some(SlideMigrationOutcome::Failed) {
        warn!(lesson_id = %lesson_id, "Slides could not be loaded; nothing will be saved");
    }

    let autosave = editor.spawn_configured_autosave(shutdown.clone());
    if autosave.is_none() {
        info!(lesson_id = %lesson_id, "Auto-save disabled; watching without saving");
    }

    shutdown.cancelled().await;
    if let Some(handle) = autosave {
        handle.await.context("Auto-save loop panicked")?;
    }

    let flushed = editor.autosave_tick().await?;
    editor.close().await;
    Ok(flushed)
}

/// Watch one lesson until Ctrl+C
pub async fn run(config: &AppConfig, lesson_id: &str) -> Result<()> {
    let store = open_store(config).await?;
    let editor = Arc::new(build_editor(config, store));
    let shutdown = CancellationToken::new();

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
        }
        info!("Received Ctrl+C signal");
        signal.cancel();
    });

    println!("Watching {lesson_id}; press Ctrl+C to stop");
    let flushed = watch_lesson(editor, lesson_id, shutdown).await?;
    if flushed {
        println!("{lesson_id}: final changes saved");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lessonforge_canvas::{
        AutoSaveConfig, EditorConfig, LessonRecord, PersistenceGateway, SqliteLessonStore,
    };
    use std::time::Duration;
    use tokio_test::assert_ok;

    async fn pdf_store() -> Arc<SqliteLessonStore> {
        let store = Arc::new(SqliteLessonStore::connect("sqlite::memory:").await.unwrap());
        let record = LessonRecord::new("pdf-1", "Reading")
            .with_legacy("pdf", Some("https://example.com/a.pdf".into()), None);
        store.insert_lesson(&record).await.unwrap();
        store
    }

    fn editor_with(store: &Arc<SqliteLessonStore>, enabled: bool) -> Arc<LessonEditor> {
        let config = EditorConfig {
            autosave: AutoSaveConfig {
                enabled,
                interval_secs: 1,
            },
            ..EditorConfig::default()
        };
        Arc::new(LessonEditor::new(store.clone(), store.clone(), config))
    }

    #[tokio::test]
    async fn test_watch_autosaves_migrated_lesson() {
        let store = pdf_store().await;
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(watch_lesson(
            editor_with(&store, true),
            "pdf-1",
            shutdown.clone(),
        ));

        let mut saved = false;
        for _ in 0..50 {
            if store.load_lesson("pdf-1").await.unwrap().has_blocks() {
                saved = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        shutdown.cancel();

        assert!(saved);
        let flushed = assert_ok!(task.await.unwrap());
        assert!(!flushed);
    }

    #[tokio::test]
    async fn test_watch_with_autosave_disabled_saves_nothing() {
        let store = pdf_store().await;
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let flushed =
            assert_ok!(watch_lesson(editor_with(&store, false), "pdf-1", shutdown).await);
        assert!(!flushed);
        assert!(!store.load_lesson("pdf-1").await.unwrap().has_blocks());
    }
}
