//! Reader appearance preferences stored as plain key-value strings.

use crate::storage::{FONT_SIZE_KEY, KeyValueStore, TEXT_ALIGN_KEY, THEME_KEY};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

pub const MIN_FONT_SIZE: u32 = 12;
pub const MAX_FONT_SIZE: u32 = 34;
pub const DEFAULT_FONT_SIZE: u32 = 18;
const FONT_SIZE_STEP: u32 = 2;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeMode {
    #[default]
    Day,
    Night,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Day => "day",
            ThemeMode::Night => "night",
        }
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "day" => Ok(ThemeMode::Day),
            "night" => Ok(ThemeMode::Night),
            other => Err(format!("unknown theme `{other}`")),
        }
    }
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ThemeMode::Day => "Day",
            ThemeMode::Night => "Night",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    #[default]
    Justify,
    Left,
}

impl TextAlign {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAlign::Justify => "justify",
            TextAlign::Left => "left",
        }
    }
}

impl FromStr for TextAlign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "justify" => Ok(TextAlign::Justify),
            "left" => Ok(TextAlign::Left),
            other => Err(format!("unknown text alignment `{other}`")),
        }
    }
}

impl std::fmt::Display for TextAlign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TextAlign::Justify => "Justified",
            TextAlign::Left => "Left",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSizeStep {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceChange {
    ToggleTheme,
    ToggleTextAlign,
    FontSize(FontSizeStep),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ReaderPreferences {
    pub theme: ThemeMode,
    pub font_size: u32,
    pub text_align: TextAlign,
}

impl Default for ReaderPreferences {
    fn default() -> Self {
        Self {
            theme: ThemeMode::Day,
            font_size: DEFAULT_FONT_SIZE,
            text_align: TextAlign::Justify,
        }
    }
}

impl ReaderPreferences {
    pub async fn load(kv: &dyn KeyValueStore) -> Self {
        let mut prefs = Self::default();
        if let Some(theme) = read_parsed::<ThemeMode>(kv, THEME_KEY).await {
            prefs.theme = theme;
        }
        if let Some(size) = read_parsed::<f32>(kv, FONT_SIZE_KEY).await {
            if size.is_finite() {
                prefs.font_size = (size.round() as u32).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
            }
        }
        if let Some(align) = read_parsed::<TextAlign>(kv, TEXT_ALIGN_KEY).await {
            prefs.text_align = align;
        }
        prefs
    }

    /// Apply `change` and return the key/value pair that must be persisted.
    pub fn apply(&mut self, change: PreferenceChange) -> (&'static str, String) {
        match change {
            PreferenceChange::ToggleTheme => {
                self.theme = match self.theme {
                    ThemeMode::Day => ThemeMode::Night,
                    ThemeMode::Night => ThemeMode::Day,
                };
                (THEME_KEY, self.theme.as_str().to_string())
            }
            PreferenceChange::ToggleTextAlign => {
                self.text_align = match self.text_align {
                    TextAlign::Justify => TextAlign::Left,
                    TextAlign::Left => TextAlign::Justify,
                };
                (TEXT_ALIGN_KEY, self.text_align.as_str().to_string())
            }
            PreferenceChange::FontSize(step) => {
                self.font_size = match step {
                    FontSizeStep::Increase => self.font_size.saturating_add(FONT_SIZE_STEP),
                    FontSizeStep::Decrease => self.font_size.saturating_sub(FONT_SIZE_STEP),
                }
                .clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
                (FONT_SIZE_KEY, self.font_size.to_string())
            }
        }
    }
}

async fn read_parsed<T: FromStr>(kv: &dyn KeyValueStore, key: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let raw = match kv.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(key, "Failed to read preference: {err:#}");
            return None;
        }
    };
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(key, "Ignoring unparseable preference: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn font_size_is_clamped_on_both_ends() {
        let mut prefs = ReaderPreferences::default();
        for _ in 0..20 {
            prefs.apply(PreferenceChange::FontSize(FontSizeStep::Increase));
        }
        assert_eq!(prefs.font_size, MAX_FONT_SIZE);
        for _ in 0..20 {
            prefs.apply(PreferenceChange::FontSize(FontSizeStep::Decrease));
        }
        assert_eq!(prefs.font_size, MIN_FONT_SIZE);
    }

    #[test]
    fn toggles_report_stored_strings() {
        let mut prefs = ReaderPreferences::default();
        assert_eq!(
            prefs.apply(PreferenceChange::ToggleTheme),
            (THEME_KEY, "night".to_string())
        );
        assert_eq!(
            prefs.apply(PreferenceChange::ToggleTextAlign),
            (TEXT_ALIGN_KEY, "left".to_string())
        );
    }

    #[tokio::test]
    async fn load_ignores_garbage_and_keeps_valid_values() {
        let kv = MemoryStore::new()
            .with_value(THEME_KEY, "night")
            .with_value(FONT_SIZE_KEY, "40")
            .with_value(TEXT_ALIGN_KEY, "centered");

        let prefs = ReaderPreferences::load(&kv).await;

        assert_eq!(prefs.theme, ThemeMode::Night);
        assert_eq!(prefs.font_size, MAX_FONT_SIZE);
        assert_eq!(prefs.text_align, TextAlign::Justify);
    }
}
