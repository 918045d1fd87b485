//! Book catalog and chapter content.
//!
//! The catalog is a JSON list of books; each book's chapters live in
//! `<books_dir>/<id>.json` as a list of `{title?, content}` objects and are
//! loaded once, when the book is selected. Chapter text is normalized at load
//! time and never modified afterwards.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

static ESCAPED_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\n").expect("valid regex"));
static EXCESS_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub cover_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterRef {
    pub index: usize,
    pub title: Option<String>,
    pub content: String,
}

#[derive(Deserialize)]
struct RawChapter {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: String,
}

/// Content failures are fatal to the screen that asked for the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    BookNotFound { book_id: String },
    Unreadable { book_id: String, reason: String },
}

impl std::fmt::Display for ContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentError::BookNotFound { book_id } => {
                write!(f, "no content found for book `{book_id}`")
            }
            ContentError::Unreadable { book_id, reason } => {
                write!(f, "content for book `{book_id}` could not be read: {reason}")
            }
        }
    }
}

impl std::error::Error for ContentError {}

pub trait ContentStore {
    /// Chapters of an already-selected book, in reading order.
    fn chapters(&self, book_id: &str) -> Result<&[ChapterRef], ContentError>;
}

#[derive(Debug, Default)]
pub struct Library {
    books: Vec<BookEntry>,
    books_dir: PathBuf,
    loaded: HashMap<String, Vec<ChapterRef>>,
}

impl Library {
    pub fn load(catalog_path: &Path, books_dir: &Path) -> Result<Self> {
        let data = fs::read_to_string(catalog_path)
            .with_context(|| format!("reading catalog {}", catalog_path.display()))?;
        let books: Vec<BookEntry> = serde_json::from_str(&data)
            .with_context(|| format!("parsing catalog {}", catalog_path.display()))?;
        info!(
            path = %catalog_path.display(),
            count = books.len(),
            "Loaded book catalog"
        );
        Ok(Self {
            books,
            books_dir: books_dir.to_path_buf(),
            loaded: HashMap::new(),
        })
    }

    /// Build a library from in-memory chapter lists; the catalog is derived
    /// from the ids.
    pub fn from_chapters<I, S>(books: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<(Option<String>, String)>)>,
        S: Into<String>,
    {
        let mut library = Self::default();
        for (id, chapters) in books {
            let id = id.into();
            library.books.push(BookEntry {
                id: id.clone(),
                title: id.clone(),
                author: String::new(),
                cover_color: None,
            });
            let chapters = chapters
                .into_iter()
                .map(|(title, content)| RawChapter { title, content })
                .collect();
            library.loaded.insert(id, to_chapter_refs(chapters));
        }
        library
    }

    pub fn books(&self) -> &[BookEntry] {
        &self.books
    }

    pub fn book(&self, book_id: &str) -> Option<&BookEntry> {
        self.books.iter().find(|book| book.id == book_id)
    }

    /// Load the chapters of `book_id` if they are not loaded yet.
    pub fn select(&mut self, book_id: &str) -> Result<&[ChapterRef], ContentError> {
        if !self.loaded.contains_key(book_id) {
            if self.book(book_id).is_none() {
                warn!(book_id, "Book is not in the catalog");
                return Err(ContentError::BookNotFound {
                    book_id: book_id.to_string(),
                });
            }
            let chapters = self.read_chapter_file(book_id)?;
            self.loaded.insert(book_id.to_string(), chapters);
        }
        self.chapters(book_id)
    }

    fn read_chapter_file(&self, book_id: &str) -> Result<Vec<ChapterRef>, ContentError> {
        let path = self.books_dir.join(format!("{book_id}.json"));
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(book_id, path = %path.display(), "Chapter file missing");
                return Err(ContentError::BookNotFound {
                    book_id: book_id.to_string(),
                });
            }
            Err(err) => {
                return Err(ContentError::Unreadable {
                    book_id: book_id.to_string(),
                    reason: err.to_string(),
                });
            }
        };
        let raw: Vec<RawChapter> =
            serde_json::from_str(&data).map_err(|err| ContentError::Unreadable {
                book_id: book_id.to_string(),
                reason: err.to_string(),
            })?;
        let chapters = to_chapter_refs(raw);
        debug!(book_id, chapters = chapters.len(), "Loaded chapter file");
        Ok(chapters)
    }
}

impl ContentStore for Library {
    fn chapters(&self, book_id: &str) -> Result<&[ChapterRef], ContentError> {
        match self.loaded.get(book_id) {
            Some(chapters) if !chapters.is_empty() => Ok(chapters),
            _ => Err(ContentError::BookNotFound {
                book_id: book_id.to_string(),
            }),
        }
    }
}

fn to_chapter_refs(raw: Vec<RawChapter>) -> Vec<ChapterRef> {
    raw.into_iter()
        .enumerate()
        .map(|(index, chapter)| ChapterRef {
            index,
            title: chapter
                .title
                .map(|title| title.trim().to_string())
                .filter(|title| !title.is_empty()),
            content: normalize_chapter_text(&chapter.content),
        })
        .collect()
}

/// Turn escaped `\n` sequences into paragraph breaks, collapse runs of blank
/// lines and apply NFC.
pub fn normalize_chapter_text(raw: &str) -> String {
    let expanded = ESCAPED_NEWLINE.replace_all(raw, "\n\n");
    let collapsed = EXCESS_BLANK_LINES.replace_all(&expanded, "\n\n");
    collapsed.nfc().collect()
}
