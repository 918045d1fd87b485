use super::models::AppConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).context("parsing config TOML")?;
    Ok(config.sanitized())
}

pub fn serialize_config(config: &AppConfig) -> Result<String> {
    toml::to_string(config).context("serializing config TOML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn empty_document_uses_defaults() {
        let config = parse_config("").expect("empty config parses");
        assert_eq!(config.min_dwell_ms, 500);
        assert_eq!(config.restore_max_attempts, 3);
        assert_eq!(config.speech_chunk_max_chars, 3000);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn zero_delay_and_single_attempt_are_clamped() {
        let config = parse_config(
            "restore_retry_delay_ms = 0\nrestore_max_attempts = 1\nspeech_chunk_max_chars = 0\n",
        )
        .expect("config parses");
        assert_eq!(config.restore_retry_delay_ms, 1);
        assert_eq!(config.restore_max_attempts, 2);
        assert_eq!(config.speech_chunk_max_chars, 1);
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut config = AppConfig::default();
        config.log_level = LogLevel::Warn;
        config.min_dwell_ms = 750;
        let text = serialize_config(&config).expect("serialize");
        let parsed = parse_config(&text).expect("parse");
        assert_eq!(parsed.log_level, LogLevel::Warn);
        assert_eq!(parsed.min_dwell_ms, 750);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/nonexistent/florecillas/config.toml"));
        assert_eq!(config.storage_dir, ".cache");
    }
}
