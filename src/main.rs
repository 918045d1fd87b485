//! Terminal front-end for the Florecillas reader.
//!
//! - Parse command-line arguments.
//! - Load configuration from `conf/config.toml` (or `--config`).
//! - List the catalog, or open one book and drive its reader screen from
//!   stdin until the reader quits.

mod cli;
mod commands;
mod narrator;
mod reader;
mod terminal;

use crate::cli::{Cli, Command, ReadArgs};
use crate::narrator::ConsoleNarrator;
use crate::terminal::TerminalSurface;
use anyhow::{Context, Result};
use clap::Parser;
use florecillas_core::config::{AppConfig, load_config};
use florecillas_core::storage::{FileStore, KeyValueStore, MemoryStore};
use florecillas_core::{Library, Message, ReaderSession, ScreenConfig, ScreenRuntime};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        config = %cli.config.display(),
        level = %config.log_level,
        "Starting Florecillas reader"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building async runtime")?;
    let command = cli.command;
    let result = runtime.block_on(async move {
        match command {
            Command::Books => list_books(&config),
            Command::Read(args) => read_book(&config, args).await,
        }
    });
    // Stdin reads park a blocking thread; don't wait for it on exit.
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

fn open_library(config: &AppConfig) -> Result<Library> {
    Library::load(Path::new(&config.library_path), Path::new(&config.books_dir))
}

fn list_books(config: &AppConfig) -> Result<()> {
    let library = open_library(config)?;
    for book in library.books() {
        if book.author.is_empty() {
            println!("{:<12} {}", book.id, book.title);
        } else {
            println!("{:<12} {} ({})", book.id, book.title, book.author);
        }
    }
    Ok(())
}

async fn read_book(config: &AppConfig, args: ReadArgs) -> Result<()> {
    let mut library = open_library(config)?;
    let title = library
        .book(&args.book_id)
        .map(|book| book.title.clone())
        .unwrap_or_else(|| args.book_id.clone());
    let chapter_count = match library.select(&args.book_id) {
        Ok(chapters) => chapters.len(),
        Err(err) => {
            eprintln!("No se puede abrir el libro: {err}");
            return Ok(());
        }
    };

    let kv: Arc<dyn KeyValueStore> = if args.ephemeral {
        info!("Using in-memory storage for this session");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::new(&config.storage_dir))
    };
    let mut session = ReaderSession::init(kv).await;

    let surface = Arc::new(TerminalSurface::new(
        chapter_count,
        config.surface_rows_measured_per_layout,
        config.min_dwell(),
    ));
    let mut narrator = ConsoleNarrator::new(config.speech_words_per_minute);

    let (runtime, handle, snapshots) = match ScreenRuntime::open(
        &mut session,
        &library,
        &args.book_id,
        surface.clone(),
        &mut narrator,
        ScreenConfig::from(config),
    ) {
        Ok(opened) => opened,
        Err(err) => {
            eprintln!("No se puede abrir el libro: {err}");
            return Ok(());
        }
    };
    surface.attach(handle.clone());

    let interrupt = handle.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        interrupt.send(Message::Unmount);
    }) {
        warn!("Failed to install Ctrl-C handler: {err}");
    }

    let (_, input) = tokio::join!(runtime.run(), reader::drive(handle, snapshots, surface, title));
    input
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
