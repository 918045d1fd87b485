//! Reading progress and per-chapter bookmarks.
//!
//! [`ProgressStore`] owns the single [`ReadingProgress`] record and the
//! [`BookmarkSet`] covering every book. Each mutation replaces the in-memory
//! value first and then persists the whole value, so a failed or interrupted
//! write can lose the latest update but never corrupt an earlier one.

use crate::storage::{BOOKMARKS_KEY, KeyValueStore, LAST_CHAPTER_KEY};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Last chapter the reader dwelled on. One per installation, not per book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub book_id: String,
    pub chapter_index: usize,
}

/// Bookmarked chapter indices keyed by book identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkSet {
    books: BTreeMap<String, BTreeSet<usize>>,
}

impl BookmarkSet {
    pub fn contains(&self, book_id: &str, chapter_index: usize) -> bool {
        self.books
            .get(book_id)
            .is_some_and(|chapters| chapters.contains(&chapter_index))
    }

    /// Flip membership; returns whether the chapter is bookmarked afterwards.
    pub fn toggle(&mut self, book_id: &str, chapter_index: usize) -> bool {
        let chapters = self.books.entry(book_id.to_string()).or_default();
        let now_present = if chapters.remove(&chapter_index) {
            false
        } else {
            chapters.insert(chapter_index);
            true
        };
        if chapters.is_empty() {
            self.books.remove(book_id);
        }
        now_present
    }

    pub fn chapters(&self, book_id: &str) -> impl Iterator<Item = usize> + '_ {
        self.books
            .get(book_id)
            .into_iter()
            .flat_map(|chapters| chapters.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

/// Result of [`ProgressStore::load_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedState {
    pub progress: Option<ReadingProgress>,
    pub bookmarks: BookmarkSet,
}

pub struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
    progress: Option<ReadingProgress>,
    bookmarks: BookmarkSet,
}

impl ProgressStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            progress: None,
            bookmarks: BookmarkSet::default(),
        }
    }

    /// Read both entities. Absent, unreadable and malformed values all load
    /// as "no prior state".
    pub async fn load_all(&mut self) -> LoadedState {
        self.progress = match self.kv.get(LAST_CHAPTER_KEY).await {
            Ok(Some(raw)) => decode_progress(&raw),
            Ok(None) => None,
            Err(err) => {
                warn!("Failed to read reading progress: {err:#}");
                None
            }
        };
        self.bookmarks = match self.kv.get(BOOKMARKS_KEY).await {
            Ok(Some(raw)) => decode_bookmarks(&raw),
            Ok(None) => BookmarkSet::default(),
            Err(err) => {
                warn!("Failed to read bookmarks: {err:#}");
                BookmarkSet::default()
            }
        };
        info!(
            has_progress = self.progress.is_some(),
            bookmarked_books = self.bookmarks.books.len(),
            "Loaded reading state"
        );
        LoadedState {
            progress: self.progress.clone(),
            bookmarks: self.bookmarks.clone(),
        }
    }

    pub fn progress(&self) -> Option<&ReadingProgress> {
        self.progress.as_ref()
    }

    pub fn bookmarks(&self) -> &BookmarkSet {
        &self.bookmarks
    }

    pub fn is_bookmarked(&self, book_id: &str, chapter_index: usize) -> bool {
        self.bookmarks.contains(book_id, chapter_index)
    }

    /// Overwrite the progress record. Range checking is the caller's job.
    pub async fn save_progress(&mut self, book_id: &str, chapter_index: usize) {
        let progress = ReadingProgress {
            book_id: book_id.to_string(),
            chapter_index,
        };
        self.progress = Some(progress.clone());
        debug!(book_id, chapter_index, "Saving reading progress");
        self.persist(LAST_CHAPTER_KEY, &progress).await;
    }

    /// Returns whether the chapter is bookmarked after the toggle.
    pub async fn toggle_bookmark(&mut self, book_id: &str, chapter_index: usize) -> bool {
        let bookmarked = self.bookmarks.toggle(book_id, chapter_index);
        info!(book_id, chapter_index, bookmarked, "Toggled bookmark");
        let snapshot = self.bookmarks.clone();
        self.persist(BOOKMARKS_KEY, &snapshot).await;
        bookmarked
    }

    async fn persist<T: Serialize>(&self, key: &str, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key, "Failed to encode value for storage: {err}");
                return;
            }
        };
        if let Err(err) = self.kv.set(key, &payload).await {
            warn!(key, "Failed to persist value; keeping in-memory state: {err:#}");
        }
    }
}

fn decode_progress(raw: &str) -> Option<ReadingProgress> {
    match serde_json::from_str(raw) {
        Ok(progress) => Some(progress),
        Err(err) => {
            warn!("Ignoring malformed reading progress: {err}");
            None
        }
    }
}

fn decode_bookmarks(raw: &str) -> BookmarkSet {
    match serde_json::from_str(raw) {
        Ok(bookmarks) => bookmarks,
        Err(err) => {
            warn!("Ignoring malformed bookmarks; starting empty: {err}");
            BookmarkSet::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store_with(memory: MemoryStore) -> (Arc<MemoryStore>, ProgressStore) {
        let memory = Arc::new(memory);
        let store = ProgressStore::new(memory.clone());
        (memory, store)
    }

    #[tokio::test]
    async fn bookmark_membership_follows_toggle_parity() {
        let (_memory, mut store) = store_with(MemoryStore::new());
        store.load_all().await;

        for toggles in 1..=6 {
            store.toggle_bookmark("libro1", 4).await;
            assert_eq!(store.is_bookmarked("libro1", 4), toggles % 2 == 1);
        }
        assert!(!store.is_bookmarked("libro2", 4));
    }

    #[tokio::test]
    async fn every_toggle_persists_the_whole_set() {
        let (memory, mut store) = store_with(MemoryStore::new());
        store.load_all().await;

        store.toggle_bookmark("libro1", 2).await;
        store.toggle_bookmark("libro2", 0).await;
        store.toggle_bookmark("libro1", 2).await;

        let writes = memory.writes();
        assert_eq!(writes.len(), 3);
        assert!(writes.iter().all(|(key, _)| key == BOOKMARKS_KEY));
        assert_eq!(writes[1].1, r#"{"libro1":[2],"libro2":[0]}"#);
        assert_eq!(memory.value(BOOKMARKS_KEY).as_deref(), Some(r#"{"libro2":[0]}"#));
    }

    #[tokio::test]
    async fn repeated_save_progress_persists_same_value() {
        let (memory, mut store) = store_with(MemoryStore::new());
        store.save_progress("libro1", 5).await;
        let once = memory.value(LAST_CHAPTER_KEY);
        store.save_progress("libro1", 5).await;

        assert_eq!(memory.value(LAST_CHAPTER_KEY), once);
        assert_eq!(once.as_deref(), Some(r#"{"bookId":"libro1","chapterIndex":5}"#));
    }

    #[tokio::test]
    async fn bare_list_bookmarks_load_as_empty_mapping() {
        let (_memory, mut store) =
            store_with(MemoryStore::new().with_value(BOOKMARKS_KEY, "[1, 2, 3]"));

        let loaded = store.load_all().await;

        assert!(loaded.bookmarks.is_empty());
        assert!(store.bookmarks().is_empty());
    }

    #[tokio::test]
    async fn persisted_state_loads_back() {
        let memory = MemoryStore::new()
            .with_value(LAST_CHAPTER_KEY, r#"{"bookId":"libro1","chapterIndex":5}"#)
            .with_value(BOOKMARKS_KEY, r#"{"libro1":[3,1,3]}"#);
        let (_memory, mut store) = store_with(memory);

        let loaded = store.load_all().await;

        assert_eq!(
            loaded.progress,
            Some(ReadingProgress {
                book_id: "libro1".to_string(),
                chapter_index: 5,
            })
        );
        assert_eq!(loaded.bookmarks.chapters("libro1").collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn read_failures_and_garbage_progress_mean_no_prior_state() {
        let (memory, mut store) =
            store_with(MemoryStore::new().with_value(LAST_CHAPTER_KEY, "not json"));
        assert_eq!(store.load_all().await.progress, None);

        memory.set_fail_reads(true);
        assert_eq!(store.load_all().await, LoadedState::default());
    }

    #[tokio::test]
    async fn write_failures_keep_memory_authoritative() {
        let (memory, mut store) = store_with(MemoryStore::new());
        memory.set_fail_writes(true);

        store.save_progress("libro1", 7).await;
        let bookmarked = store.toggle_bookmark("libro1", 7).await;

        assert!(bookmarked);
        assert_eq!(store.progress().map(|p| p.chapter_index), Some(7));
        assert!(store.is_bookmarked("libro1", 7));
        assert_eq!(memory.value(LAST_CHAPTER_KEY), None);
    }
}
