//! The single reading session shared by every screen.
//!
//! Created once with [`ReaderSession::init`] and passed by `&mut` to whatever
//! screen needs it; there is no global instance and no implicit teardown.

use crate::preferences::{PreferenceChange, ReaderPreferences};
use crate::progress::{BookmarkSet, ProgressStore, ReadingProgress};
use crate::storage::KeyValueStore;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ReaderSession {
    store: ProgressStore,
    preferences: ReaderPreferences,
    kv: Arc<dyn KeyValueStore>,
}

impl ReaderSession {
    pub async fn init(kv: Arc<dyn KeyValueStore>) -> Self {
        let mut store = ProgressStore::new(Arc::clone(&kv));
        store.load_all().await;
        let preferences = ReaderPreferences::load(kv.as_ref()).await;
        info!(
            theme = preferences.theme.as_str(),
            font_size = preferences.font_size,
            text_align = preferences.text_align.as_str(),
            "Reader session ready"
        );
        Self {
            store,
            preferences,
            kv,
        }
    }

    pub fn progress(&self) -> Option<&ReadingProgress> {
        self.store.progress()
    }

    pub fn bookmarks(&self) -> &BookmarkSet {
        self.store.bookmarks()
    }

    pub fn is_bookmarked(&self, book_id: &str, chapter_index: usize) -> bool {
        self.store.is_bookmarked(book_id, chapter_index)
    }

    pub fn preferences(&self) -> &ReaderPreferences {
        &self.preferences
    }

    pub async fn save_progress(&mut self, book_id: &str, chapter_index: usize) {
        self.store.save_progress(book_id, chapter_index).await;
    }

    pub async fn toggle_bookmark(&mut self, book_id: &str, chapter_index: usize) -> bool {
        self.store.toggle_bookmark(book_id, chapter_index).await
    }

    pub async fn apply_preference(&mut self, change: PreferenceChange) -> ReaderPreferences {
        let (key, value) = self.preferences.apply(change);
        info!(key, value = %value, "Reader preference changed");
        if let Err(err) = self.kv.set(key, &value).await {
            warn!(key, "Failed to persist preference: {err:#}");
        }
        self.preferences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{FontSizeStep, ThemeMode};
    use crate::storage::{BOOKMARKS_KEY, FONT_SIZE_KEY, LAST_CHAPTER_KEY, MemoryStore, THEME_KEY};

    #[tokio::test]
    async fn init_loads_everything_from_storage() {
        let kv = Arc::new(
            MemoryStore::new()
                .with_value(LAST_CHAPTER_KEY, r#"{"bookId":"libro1","chapterIndex":5}"#)
                .with_value(BOOKMARKS_KEY, r#"{"libro1":[2,7]}"#)
                .with_value(THEME_KEY, "night")
                .with_value(FONT_SIZE_KEY, "22"),
        );
        let session = ReaderSession::init(kv).await;

        assert_eq!(
            session.progress(),
            Some(&ReadingProgress {
                book_id: "libro1".to_string(),
                chapter_index: 5
            })
        );
        assert!(session.is_bookmarked("libro1", 7));
        assert!(!session.is_bookmarked("libro1", 5));
        assert_eq!(session.preferences().theme, ThemeMode::Night);
        assert_eq!(session.preferences().font_size, 22);
    }

    #[tokio::test]
    async fn preference_changes_survive_write_failures() {
        let kv = Arc::new(MemoryStore::new());
        let mut session = ReaderSession::init(kv.clone()).await;

        let prefs = session
            .apply_preference(PreferenceChange::FontSize(FontSizeStep::Increase))
            .await;
        assert_eq!(prefs.font_size, 20);
        assert_eq!(kv.value(FONT_SIZE_KEY).as_deref(), Some("20"));

        kv.set_fail_writes(true);
        let prefs = session.apply_preference(PreferenceChange::ToggleTheme).await;
        assert_eq!(prefs.theme, ThemeMode::Night);
        assert_eq!(kv.value(THEME_KEY), None);
    }
}
