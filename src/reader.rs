//! Interactive reading loop: stdin commands in, screen snapshots out.

use crate::commands::{self, Command, HELP};
use crate::terminal::TerminalSurface;
use anyhow::{Context, Result};
use florecillas_core::preferences::PreferenceChange;
use florecillas_core::restore::RestoreState;
use florecillas_core::speech::PlaybackStatus;
use florecillas_core::{Message, ScreenHandle, ScreenSnapshot};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info};

pub async fn drive(
    handle: ScreenHandle,
    mut snapshots: watch::Receiver<ScreenSnapshot>,
    surface: Arc<TerminalSurface>,
    title: String,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    let mut last = snapshots.borrow_and_update().clone();

    println!("{title} ({} capítulos)", last.chapters.len());
    println!("{HELP}");

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    debug!("Screen runtime went away");
                    break;
                }
                let current = snapshots.borrow_and_update().clone();
                report_changes(&last, &current);
                let closed = current.closed;
                last = current;
                if closed {
                    break;
                }
            }
            line = lines.next_line(), if input_open => {
                match line.context("reading stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match commands::parse(&line) {
                        Ok(command) => dispatch(command, &handle, &last, &surface),
                        Err(err) => println!("{err:#}"),
                    },
                    None => {
                        info!("Input closed; closing the book");
                        input_open = false;
                        handle.send(Message::Unmount);
                    }
                }
            }
        }
    }
    Ok(())
}

fn dispatch(
    command: Command,
    handle: &ScreenHandle,
    last: &ScreenSnapshot,
    surface: &TerminalSurface,
) {
    let message = match command {
        Command::Scroll { index, visible_ms } => {
            Message::VisibilityChanged(surface.rows_from(index, visible_ms))
        }
        Command::Toc(index) => Message::NavigateToChapter(index),
        Command::Bookmark(index) => Message::ToggleBookmark(index.unwrap_or(last.current_index)),
        Command::Play => Message::StartNarration,
        Command::Stop => Message::StopNarration,
        Command::Theme => Message::ChangePreferences(PreferenceChange::ToggleTheme),
        Command::Align => Message::ChangePreferences(PreferenceChange::ToggleTextAlign),
        Command::Font(step) => Message::ChangePreferences(PreferenceChange::FontSize(step)),
        Command::Status => {
            print_status(last);
            return;
        }
        Command::Snapshot => {
            match serde_json::to_string_pretty(last) {
                Ok(json) => println!("{json}"),
                Err(err) => println!("snapshot unavailable: {err}"),
            }
            return;
        }
        Command::Help => {
            println!("{HELP}");
            return;
        }
        Command::Quit => Message::Unmount,
    };
    if !handle.send(message) {
        println!("the book is already closed");
    }
}

fn report_changes(before: &ScreenSnapshot, after: &ScreenSnapshot) {
    if before.restore_state != after.restore_state {
        match after.restore_state {
            Some(RestoreState::Succeeded) => {
                println!("posición restaurada: capítulo {}", after.current_index + 1)
            }
            Some(RestoreState::Abandoned) => println!("no se pudo restaurar la posición"),
            _ => {}
        }
    }
    if before.narrated_index != after.narrated_index {
        match after.narrated_index {
            Some(index) => println!("narrando capítulo {}", index + 1),
            None => println!("narración detenida"),
        }
    }
    if before.preferences != after.preferences {
        let prefs = &after.preferences;
        println!(
            "tema {} · letra {} · alineación {}",
            prefs.theme, prefs.font_size, prefs.text_align
        );
    }
    let bookmarks_changed = before
        .chapters
        .iter()
        .zip(&after.chapters)
        .find(|(old, new)| old.bookmarked != new.bookmarked);
    if let Some((_, chapter)) = bookmarks_changed {
        let state = if chapter.bookmarked { "añadido" } else { "quitado" };
        println!("marcador {state}: capítulo {}", chapter.index + 1);
    }
}

fn print_status(snapshot: &ScreenSnapshot) {
    for chapter in &snapshot.chapters {
        let cursor = if chapter.index == snapshot.current_index { '>' } else { ' ' };
        let mark = if chapter.bookmarked { '*' } else { ' ' };
        let voice = if chapter.narrated { "♪" } else { " " };
        let title = chapter.title.as_deref().unwrap_or("(sin título)");
        println!("{cursor}{mark}{voice} {:>3}. {title}", chapter.index + 1);
    }
    let narration = match snapshot.narration_status {
        PlaybackStatus::Speaking => snapshot
            .narration
            .map(|n| format!("fragmento {} de {}", n.chunk_index + 1, n.chunk_count))
            .unwrap_or_else(|| "hablando".to_string()),
        _ => "inactiva".to_string(),
    };
    println!("narración: {narration}");
}
