pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}

pub(crate) fn default_storage_dir() -> String {
    ".cache".to_string()
}

pub(crate) fn default_library_path() -> String {
    "data/biblioteca.json".to_string()
}

pub(crate) fn default_books_dir() -> String {
    "assets/books".to_string()
}

pub(crate) fn default_min_dwell_ms() -> u64 {
    500
}

pub(crate) fn default_restore_retry_delay_ms() -> u64 {
    100
}

pub(crate) fn default_restore_max_attempts() -> u32 {
    3
}

pub(crate) fn default_speech_chunk_max_chars() -> usize {
    3000
}

pub(crate) fn default_speech_words_per_minute() -> u32 {
    170
}

pub(crate) fn default_surface_rows_measured_per_layout() -> usize {
    4
}
