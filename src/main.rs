//! LessonForge - Lesson Canvas Editor
//!
//! CLI entry point for operating on a LessonForge lesson database.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod loader;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lessonforge=info,lessonforge_canvas=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = cli::Cli::parse();
    if cli.command.is_none() {
        return cli::print_help();
    }

    debug!("Starting LessonForge v{}", env!("CARGO_PKG_VERSION"));
    if !std::path::Path::new(".env").exists() {
        debug!(".env file not found, using defaults and environment");
    }

    let config = loader::load_config()?;
    if !config.editor.autosave.enabled {
        warn!("Auto-save is disabled in configuration");
    }

    cli::run(cli, config).await
}
