//! Durable key-value persistence.
//!
//! The session stores every entity as one whole string value per key, so a
//! write either replaces the previous value completely or leaves it alone.
//! [`FileStore`] keeps one file per key under a cache directory (the file name
//! is a hash of the key to avoid filesystem issues); [`MemoryStore`] keeps
//! values in process and is used by tests and `--ephemeral` sessions.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

pub const LAST_CHAPTER_KEY: &str = "florecillas_last_chapter";
pub const BOOKMARKS_KEY: &str = "florecillas_bookmarks";
pub const THEME_KEY: &str = "florecillas_theme";
pub const FONT_SIZE_KEY: &str = "florecillas_font_size";
pub const TEXT_ALIGN_KEY: &str = "florecillas_text_align";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        self.dir.join(format!("{hash}.value"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("read {key}: {}", path.display())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create storage dir: {}", self.dir.display()))?;
        let path = self.path_for(key);
        let tmp_path = unique_temp_path(&path);
        fs::write(&tmp_path, value.as_bytes())
            .await
            .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
        if let Err(err) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err).with_context(|| format!("rename tmp to final: {}", path.display()));
        }
        Ok(())
    }
}

fn unique_temp_path(path: &Path) -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let nonce = SEQ.fetch_add(1, Ordering::Relaxed);
    let ts_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let mut name = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("entry.value")
        .to_string();
    name.push_str(&format!(".tmp-{ts_nanos}-{nonce}"));
    path.with_file_name(name)
}

/// In-process store with switchable failures for exercising error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: &str, value: &str) -> Self {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Release);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Current stored value for `key`.
    pub fn value(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::Acquire) {
            return Err(anyhow!("simulated read failure for {key}"));
        }
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(anyhow!("simulated write failure for {key}"));
        }
        self.values
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        self.writes
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?
            .push((key.to_string(), value.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_round_trips_and_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("kv"));

        assert_eq!(store.get(BOOKMARKS_KEY).await.expect("get"), None);
        store.set(BOOKMARKS_KEY, "{\"a\":[1]}").await.expect("set");
        store.set(BOOKMARKS_KEY, "{\"a\":[2]}").await.expect("overwrite");

        assert_eq!(
            store.get(BOOKMARKS_KEY).await.expect("get"),
            Some("{\"a\":[2]}".to_string())
        );
    }

    #[tokio::test]
    async fn file_store_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        store.set(THEME_KEY, "night").await.expect("set");
        store.set(FONT_SIZE_KEY, "20").await.expect("set");

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|name| name.ends_with(".value")));
    }

    #[tokio::test]
    async fn memory_store_failures_do_not_touch_values() {
        let store = MemoryStore::new().with_value(THEME_KEY, "day");
        store.set_fail_writes(true);
        assert!(store.set(THEME_KEY, "night").await.is_err());
        assert_eq!(store.value(THEME_KEY).as_deref(), Some("day"));
        assert!(store.writes().is_empty());

        store.set_fail_reads(true);
        assert!(store.get(THEME_KEY).await.is_err());
    }
}
