//! Reading session controller for the Florecillas reader.
//!
//! The crate keeps a reader's place in a long, virtualized chapter list:
//! it persists progress and bookmarks, turns visibility samples into a
//! current chapter, restores the saved position when a book is reopened and
//! narrates the current chapter through an injected speech engine.
//!
//! Rendering, storage and speech are reached only through the traits in
//! [`surface`], [`storage`] and [`speech`], so the front-end decides what a
//! "screen" or a "voice" actually is.

pub mod cancellation;
pub mod config;
pub mod content;
pub mod preferences;
pub mod progress;
pub mod restore;
pub mod screen;
pub mod session;
pub mod speech;
pub mod storage;
pub mod surface;
pub mod viewport;

pub use content::{BookEntry, ChapterRef, ContentError, ContentStore, Library};
pub use progress::{BookmarkSet, ReadingProgress};
pub use screen::{
    ChapterView, Effect, JumpKind, Message, ReaderScreen, ScreenConfig, ScreenHandle,
    ScreenRuntime, ScreenSnapshot,
};
pub use session::ReaderSession;
pub use surface::{JumpError, RenderSurface, VisibleRow};
