//! Lesson Editor
//!
//! Owns the active [`EditorSession`] and coordinates the I/O around it:
//! loading lessons through the persistence gateway, running presentation
//! migrations in the background, saving, and the periodic auto-save loop.
//!
//! Installing a session bumps a generation counter. Background work captures
//! the generation it started under and only commits if it is unchanged, so
//! a slow slide fetch for a lesson the user already left cannot overwrite
//! the canvas of the lesson they opened next. An open that fails leaves the
//! generation, and the work of the session still on screen, untouched.
//!
//! Hosts drive auto-save with [`LessonEditor::spawn_configured_autosave`],
//! which ticks every `autosave.interval_secs`, or with
//! [`LessonEditor::spawn_autosave`] and an explicit interval.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::EditorConfig;
use crate::error::{Error, Result};
use crate::gateway::{LessonRecord, PersistenceGateway, SlideGateway};
use crate::migration::{fetch_presentation_blocks, migration_error_blocks};
use crate::session::{EditorSession, MigrationStatus};

/// How a background slide migration ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideMigrationOutcome {
    /// Slides were converted and installed; the session is dirty
    Committed,
    /// The fetch failed; an error is shown and the lesson is left as-is
    Failed,
    /// Another lesson was opened first; the result was discarded
    Stale,
}

/// Result of opening a lesson
#[derive(Debug)]
pub struct OpenedLesson {
    /// Lesson that was opened
    pub lesson_id: String,
    /// Generation the session was installed under
    pub generation: u64,
    /// How the initial blocks were obtained
    pub status: MigrationStatus,
    /// Background slide migration
    pub slide_migration: Option<JoinHandle<SlideMigrationOutcome>>,
}

impl OpenedLesson {
    /// Wait for a pending slide migration; `None` if there was none
    pub async fn wait_for_migration(&mut self) -> Result<Option<SlideMigrationOutcome>> {
        match self.slide_migration.take() {
            Some(handle) => handle
                .await
                .map(Some)
                .map_err(|e| Error::Internal(format!("slide migration task failed: {e}"))),
            None => Ok(None),
        }
    }
}

/// Editor for one lesson at a time
pub struct LessonEditor {
    persistence: Arc<dyn PersistenceGateway>,
    slides: Arc<dyn SlideGateway>,
    config: EditorConfig,
    session: Arc<RwLock<Option<EditorSession>>>,
    /// Bumped whenever the installed session changes
    generation: Arc<AtomicU64>,
    /// Bumped on every open request, to detect overtaken opens
    open_ticket: AtomicU64,
}

impl LessonEditor {
    /// Create an editor with no lesson open
    #[must_use]
    pub fn new(
        persistence: Arc<dyn PersistenceGateway>,
        slides: Arc<dyn SlideGateway>,
        config: EditorConfig,
    ) -> Self {
        Self {
            persistence,
            slides,
            config,
            session: Arc::new(RwLock::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            open_ticket: AtomicU64::new(0),
        }
    }

    /// Editor configuration
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Current session generation
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Open a lesson, replacing the active session.
    ///
    /// Stored blocks are used as-is. Legacy lessons are migrated; for
    /// presentations a placeholder is shown and the slides are fetched in a
    /// background task. On error the current session stays installed.
    pub async fn open_lesson(&self, lesson_id: &str) -> Result<OpenedLesson> {
        let ticket = self.open_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        info!(lesson_id = %lesson_id, ticket, "Opening lesson");

        let record = self.persistence.load_lesson(lesson_id).await?;
        let (session, status) = EditorSession::from_record(&record, &self.config);

        let generation = {
            let mut guard = self.session.write().await;
            if self.open_ticket.load(Ordering::SeqCst) != ticket {
                debug!(lesson_id = %lesson_id, ticket, "Lesson open superseded");
                return Err(Error::Superseded(lesson_id.to_string()));
            }
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *guard = Some(session);
            generation
        };

        let slide_migration = (status == MigrationStatus::AwaitingSlides)
            .then(|| self.spawn_slide_migration(&record, generation));

        Ok(OpenedLesson {
            lesson_id: lesson_id.to_string(),
            generation,
            status,
            slide_migration,
        })
    }

    /// Close the active lesson; pending background work goes stale
    pub async fn close(&self) -> Option<EditorSession> {
        let mut guard = self.session.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        guard.take()
    }

    /// Read the active session
    pub async fn with_session<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&EditorSession) -> R,
    {
        let guard = self.session.read().await;
        guard.as_ref().map(f)
    }

    /// Mutate the active session
    pub async fn with_session_mut<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut EditorSession) -> R,
    {
        let mut guard = self.session.write().await;
        guard.as_mut().map(f)
    }

    /// Save the active lesson.
    ///
    /// Fails with `NoLessonSelected` when nothing is open and with
    /// `SaveInProgress` while another save is in flight. A canvas still
    /// waiting for slides, or showing a slide fetch error, is never written.
    /// A failed save leaves the dirty flag untouched. If the lesson was
    /// replaced while the write was in flight, the result is not applied to
    /// the new session.
    pub async fn save(&self) -> Result<LessonRecord> {
        let (lesson_id, generation, revision, payload) = {
            let mut guard = self.session.write().await;
            let session = guard.as_mut().ok_or(Error::NoLessonSelected)?;
            match session.migration_status() {
                MigrationStatus::AwaitingSlides => {
                    return Err(Error::MigrationPending(session.lesson_id().to_string()));
                }
                MigrationStatus::Failed => {
                    return Err(Error::migration_failure(format!(
                        "slides for {} could not be loaded; reopen the lesson to retry",
                        session.lesson_id()
                    )));
                }
                MigrationStatus::NotNeeded | MigrationStatus::Migrated => {}
            }
            let revision = session.autosave_mut().begin_save()?;
            (
                session.lesson_id().to_string(),
                self.generation.load(Ordering::SeqCst),
                revision,
                session.save_payload(),
            )
        };

        let block_count = payload.content_blocks.len();
        let result = self.persistence.save_lesson(&lesson_id, payload).await;

        let mut guard = self.session.write().await;
        let current = guard
            .as_mut()
            .filter(|s| s.lesson_id() == lesson_id)
            .filter(|_| self.generation.load(Ordering::SeqCst) == generation);

        match result {
            Ok(record) => {
                match current {
                    Some(session) => session.autosave_mut().complete_save(revision, Utc::now()),
                    None => debug!(lesson_id = %lesson_id, "Lesson replaced during save"),
                }
                info!(lesson_id = %lesson_id, block_count, "Lesson saved");
                Ok(record)
            }
            Err(err) => {
                if let Some(session) = current {
                    session.autosave_mut().fail_save();
                }
                error!(lesson_id = %lesson_id, error = %err, "Lesson save failed");
                Err(match err {
                    Error::SaveFailure(_) | Error::SchemaIncompatible(_) => err,
                    other => Error::save_failure(other.to_string()),
                })
            }
        }
    }

    /// Save if the active session is due (enabled, dirty, not saving, and
    /// not showing a migration placeholder or error)
    pub async fn autosave_tick(&self) -> Result<bool> {
        let due = self
            .with_session(|s| {
                s.autosave().should_autosave() && s.migration_status().is_persistable()
            })
            .await
            .unwrap_or(false);
        if !due {
            return Ok(false);
        }
        self.save().await.map(|_| true)
    }

    /// Run the auto-save loop at the configured interval.
    ///
    /// Returns `None` when auto-save is disabled in [`EditorConfig`].
    pub fn spawn_configured_autosave(
        self: &Arc<Self>,
        shutdown: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        let autosave = &self.config.autosave;
        if !autosave.enabled {
            debug!("Auto-save disabled, loop not started");
            return None;
        }
        Some(self.spawn_autosave(Duration::from_secs(autosave.interval_secs.max(1)), shutdown))
    }

    /// Run the auto-save loop until `shutdown` is cancelled
    pub fn spawn_autosave(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let editor = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        match editor.autosave_tick().await {
                            Ok(true) => debug!("Auto-save completed"),
                            Ok(false) => {}
                            Err(Error::SaveInProgress) => debug!("Auto-save skipped, save in flight"),
                            Err(e) => warn!(error = %e, "Auto-save failed"),
                        }
                    }
                    _ = shutdown.cancelled() => {
                        info!("Auto-save loop shutting down");
                        break;
                    }
                }
            }
        })
    }

    fn spawn_slide_migration(
        &self,
        record: &LessonRecord,
        generation: u64,
    ) -> JoinHandle<SlideMigrationOutcome> {
        let slides = Arc::clone(&self.slides);
        let session = Arc::clone(&self.session);
        let current_generation = Arc::clone(&self.generation);
        let lesson_id = record.id.clone();

        tokio::spawn(async move {
            let fetched = fetch_presentation_blocks(slides.as_ref(), &lesson_id).await;

            let mut guard = session.write().await;
            if current_generation.load(Ordering::SeqCst) != generation {
                debug!(lesson_id = %lesson_id, generation, "Discarding stale slide migration");
                return SlideMigrationOutcome::Stale;
            }
            let Some(active) = guard.as_mut().filter(|s| s.lesson_id() == lesson_id) else {
                return SlideMigrationOutcome::Stale;
            };
            match fetched {
                Ok(blocks) => {
                    info!(lesson_id = %lesson_id, block_count = blocks.len(), "Presentation migrated");
                    active.complete_slide_migration(blocks);
                    SlideMigrationOutcome::Committed
                }
                Err(err) => {
                    warn!(lesson_id = %lesson_id, error = %err, "Presentation migration failed");
                    active.fail_slide_migration(migration_error_blocks(&err));
                    SlideMigrationOutcome::Failed
                }
            }
        })
    }
}
