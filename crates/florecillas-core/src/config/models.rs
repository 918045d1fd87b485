use serde::{Deserialize, Serialize};
use std::time::Duration;

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "crate::config::defaults::default_storage_dir")]
    pub storage_dir: String,
    #[serde(default = "crate::config::defaults::default_library_path")]
    pub library_path: String,
    #[serde(default = "crate::config::defaults::default_books_dir")]
    pub books_dir: String,
    #[serde(default = "crate::config::defaults::default_min_dwell_ms")]
    pub min_dwell_ms: u64,
    #[serde(default = "crate::config::defaults::default_restore_retry_delay_ms")]
    pub restore_retry_delay_ms: u64,
    #[serde(default = "crate::config::defaults::default_restore_max_attempts")]
    pub restore_max_attempts: u32,
    #[serde(default = "crate::config::defaults::default_speech_chunk_max_chars")]
    pub speech_chunk_max_chars: usize,
    #[serde(default = "crate::config::defaults::default_speech_words_per_minute")]
    pub speech_words_per_minute: u32,
    #[serde(default = "crate::config::defaults::default_surface_rows_measured_per_layout")]
    pub surface_rows_measured_per_layout: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        use crate::config::defaults::*;
        AppConfig {
            log_level: default_log_level(),
            storage_dir: default_storage_dir(),
            library_path: default_library_path(),
            books_dir: default_books_dir(),
            min_dwell_ms: default_min_dwell_ms(),
            restore_retry_delay_ms: default_restore_retry_delay_ms(),
            restore_max_attempts: default_restore_max_attempts(),
            speech_chunk_max_chars: default_speech_chunk_max_chars(),
            speech_words_per_minute: default_speech_words_per_minute(),
            surface_rows_measured_per_layout: default_surface_rows_measured_per_layout(),
        }
    }
}

impl AppConfig {
    /// Clamp values that would break the controllers' invariants.
    pub(crate) fn sanitized(mut self) -> Self {
        self.restore_retry_delay_ms = self.restore_retry_delay_ms.max(1);
        self.restore_max_attempts = self.restore_max_attempts.max(2);
        self.speech_chunk_max_chars = self.speech_chunk_max_chars.max(1);
        self.speech_words_per_minute = self.speech_words_per_minute.max(1);
        self.surface_rows_measured_per_layout = self.surface_rows_measured_per_layout.max(1);
        self
    }

    pub fn min_dwell(&self) -> Duration {
        Duration::from_millis(self.min_dwell_ms)
    }

    pub fn restore_retry_delay(&self) -> Duration {
        Duration::from_millis(self.restore_retry_delay_ms.max(1))
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
