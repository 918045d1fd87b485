//! Parsing of the interactive reader commands typed on stdin.
//!
//! Chapter numbers are 1-based on the command line and 0-based everywhere
//! else.

use anyhow::{Context, Result, bail};
use florecillas_core::preferences::FontSizeStep;

pub const DEFAULT_VISIBLE_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Pretend the list settled with `index` at the top for `visible_ms`.
    Scroll { index: usize, visible_ms: u64 },
    Toc(usize),
    Bookmark(Option<usize>),
    Play,
    Stop,
    Theme,
    Align,
    Font(FontSizeStep),
    Status,
    Snapshot,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  scroll <n> [ms]   chapter n reaches the top of the screen for ms (default 1000)
  toc <n>           jump to chapter n from the table of contents
  bookmark [n]      toggle a bookmark on chapter n (default: current)
  play | stop       narrate the current chapter / stop narrating
  theme | align     toggle day/night theme or text alignment
  font + | font -   change the font size
  status            show chapters, bookmarks and narration
  snapshot          print the screen state as JSON
  quit              close the book";

pub fn parse(line: &str) -> Result<Command> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        bail!("empty command");
    };
    let command = match name.to_ascii_lowercase().as_str() {
        "scroll" | "s" => {
            let index = chapter_arg(words.next())?;
            let visible_ms = match words.next() {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("`{raw}` is not a duration in ms"))?,
                None => DEFAULT_VISIBLE_MS,
            };
            Command::Scroll { index, visible_ms }
        }
        "toc" | "goto" => Command::Toc(chapter_arg(words.next())?),
        "bookmark" | "b" => match words.next() {
            Some(raw) => Command::Bookmark(Some(chapter_arg(Some(raw))?)),
            None => Command::Bookmark(None),
        },
        "play" | "p" => Command::Play,
        "stop" => Command::Stop,
        "theme" => Command::Theme,
        "align" => Command::Align,
        "font" => match words.next() {
            Some("+") => Command::Font(FontSizeStep::Increase),
            Some("-") => Command::Font(FontSizeStep::Decrease),
            _ => bail!("usage: font + | font -"),
        },
        "status" | "ls" => Command::Status,
        "snapshot" => Command::Snapshot,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => bail!("unknown command `{other}` (try `help`)"),
    };
    if let Some(extra) = words.next() {
        bail!("unexpected argument `{extra}`");
    }
    Ok(command)
}

fn chapter_arg(raw: Option<&str>) -> Result<usize> {
    let Some(raw) = raw else {
        bail!("missing chapter number");
    };
    let number: usize = raw
        .parse()
        .with_context(|| format!("`{raw}` is not a chapter number"))?;
    match number.checked_sub(1) {
        Some(index) => Ok(index),
        None => bail!("chapters are numbered from 1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_defaults_dwell() {
        assert_eq!(
            parse("scroll 4").expect("parse"),
            Command::Scroll {
                index: 3,
                visible_ms: DEFAULT_VISIBLE_MS
            }
        );
        assert_eq!(
            parse("s 1 120").expect("parse"),
            Command::Scroll {
                index: 0,
                visible_ms: 120
            }
        );
    }

    #[test]
    fn bookmark_number_is_optional() {
        assert_eq!(parse("bookmark").expect("parse"), Command::Bookmark(None));
        assert_eq!(parse("b 2").expect("parse"), Command::Bookmark(Some(1)));
    }

    #[test]
    fn font_needs_a_direction() {
        assert_eq!(
            parse("font +").expect("parse"),
            Command::Font(FontSizeStep::Increase)
        );
        assert!(parse("font").is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse("").is_err());
        assert!(parse("toc 0").is_err());
        assert!(parse("toc dos").is_err());
        assert!(parse("play now").is_err());
        assert!(parse("dance").is_err());
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(parse("  PLAY ").expect("parse"), Command::Play);
        assert_eq!(parse("Quit").expect("parse"), Command::Quit);
    }
}
