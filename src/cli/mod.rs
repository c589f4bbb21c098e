//! CLI module for LessonForge
//!
//! Provides operator commands against the lesson database:
//! - `init`: Create the schema and report its capabilities
//! - `list`: List lessons and their migration state
//! - `show`: Print the page outline of a lesson
//! - `migrate` / `migrate-all`: Convert legacy lessons into blocks

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lessonforge_canvas::{LessonEditor, SqliteLessonStore};
use std::sync::Arc;
use tracing::warn;

use crate::config::AppConfig;

pub mod lessons;
pub mod migrate;
pub mod watch;

/// LessonForge CLI
#[derive(Parser, Debug)]
#[command(name = "lessonforge")]
#[command(about = "Lesson canvas editor tooling")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database schema
    Init,
    /// List lessons
    List,
    /// Print the page outline of a lesson
    Show {
        /// Lesson ID
        lesson_id: String,
    },
    /// Migrate one legacy lesson into blocks
    Migrate {
        /// Lesson ID
        lesson_id: String,
        /// Convert without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Migrate every lesson that still has only legacy content
    MigrateAll {
        /// Convert without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Keep a lesson open with auto-save running until Ctrl+C
    Watch {
        /// Lesson ID
        lesson_id: String,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    match cli.command {
        Some(Commands::Init) => lessons::init(&config).await,
        Some(Commands::List) => lessons::list(&config).await,
        Some(Commands::Show { lesson_id }) => lessons::show(&config, &lesson_id).await,
        Some(Commands::Migrate { lesson_id, dry_run }) => {
            migrate::run(&config, &lesson_id, dry_run).await
        }
        Some(Commands::MigrateAll { dry_run }) => migrate::run_all(&config, dry_run).await,
        Some(Commands::Watch { lesson_id }) => watch::run(&config, &lesson_id).await,
        None => print_help(),
    }
}

/// Print top-level usage
pub fn print_help() -> Result<()> {
    let mut cmd = <Cli as clap::CommandFactory>::command();
    cmd.print_help()?;
    println!();
    Ok(())
}

/// Open the configured store
pub(crate) async fn open_store(config: &AppConfig) -> Result<Arc<SqliteLessonStore>> {
    let store = SqliteLessonStore::connect(&config.database.url)
        .await
        .with_context(|| format!("Failed to open lesson database {}", config.database.url))?;
    Ok(Arc::new(store))
}

/// Build an editor over `store` with schema capabilities resolved once
pub(crate) fn build_editor(config: &AppConfig, store: Arc<SqliteLessonStore>) -> LessonEditor {
    let editor_config = config.editor.clone().with_schema(store.capabilities());
    if config.editor.schema.content_meta && !editor_config.schema.content_meta {
        warn!("Lesson table has no content_meta column; page backgrounds will not be saved");
    }
    LessonEditor::new(store.clone(), store, editor_config)
}
