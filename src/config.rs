//! Configuration: the analysis settings file and the persisted user
//! preferences (theme, first-visit flag).
//!
//! Preferences are read once at startup through a [`PreferenceStore`] and
//! written back explicitly; nothing here is a global.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use log::warn;
use parking_lot::Mutex;
use toml_edit::DocumentMut;

use crate::{
    InspectorConfig,
    error::{InsightError, Result},
};

const THEME_KEY: &str = "theme";
const FIRST_VISIT_KEY: &str = "first_visit";

impl InspectorConfig {
    /// Parses a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml_edit::de::from_str(content).map_err(|e| InsightError::Config(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml_edit::ser::to_string_pretty(self).map_err(|e| InsightError::Config(e.to_string()))
    }
}

/// Key/value persistence boundary for preferences.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Flat TOML file of string values. Writes keep existing comments.
pub struct TomlFileStore {
    path: PathBuf,
}

impl TomlFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<DocumentMut> {
        if !self.path.exists() {
            return Ok(DocumentMut::new());
        }

        let content = fs::read_to_string(&self.path)?;
        content
            .parse::<DocumentMut>()
            .map_err(|e| InsightError::Config(format!("{}: {}", self.path.display(), e)))
    }
}

impl PreferenceStore for TomlFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let doc = self.read_document()?;
        Ok(doc.get(key).and_then(|item| item.as_str()).map(String::from))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut doc = self.read_document()?;
        doc[key] = toml_edit::value(value);

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, doc.to_string())?;

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub theme: Theme,
    pub first_visit: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            first_visit: true,
        }
    }
}

impl Preferences {
    /// Reads preferences once. Unreadable or unknown values fall back to the
    /// defaults so a broken store never blocks startup.
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let defaults = Preferences::default();

        let theme = match store.get(THEME_KEY) {
            Ok(Some(raw)) => Theme::parse(&raw).unwrap_or_else(|| {
                warn!("Ignoring unknown theme '{}'", raw);
                defaults.theme
            }),
            Ok(None) => defaults.theme,
            Err(e) => {
                warn!("Could not read theme preference: {}", e);
                defaults.theme
            }
        };

        let first_visit = match store.get(FIRST_VISIT_KEY) {
            Ok(Some(raw)) => raw.trim() != "false",
            Ok(None) => defaults.first_visit,
            Err(e) => {
                warn!("Could not read first-visit flag: {}", e);
                defaults.first_visit
            }
        };

        Self { theme, first_visit }
    }

    pub fn save(&self, store: &dyn PreferenceStore) -> Result<()> {
        store.set(THEME_KEY, self.theme.as_str())?;
        store.set(FIRST_VISIT_KEY, if self.first_visit { "true" } else { "false" })?;
        Ok(())
    }

    pub fn mark_visited(&mut self) {
        self.first_visit = false;
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_store() {
        let store = MemoryStore::new();
        assert_eq!(Preferences::load(&store), Preferences::default());
    }

    #[test]
    fn test_memory_round_trip() {
        let store = MemoryStore::new();
        let mut prefs = Preferences::default();
        prefs.toggle_theme();
        prefs.mark_visited();
        prefs.save(&store).unwrap();

        let loaded = Preferences::load(&store);
        assert_eq!(loaded.theme, Theme::Dark);
        assert!(!loaded.first_visit);
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let store = MemoryStore::new();
        store.set(THEME_KEY, "sepia").unwrap();
        assert_eq!(Preferences::load(&store).theme, Theme::Light);
    }

    #[test]
    fn test_toml_store_preserves_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.toml");
        fs::write(&path, "# user preferences\ntheme = \"light\"\n").unwrap();

        let store = TomlFileStore::new(&path);
        let prefs = Preferences {
            theme: Theme::Dark,
            first_visit: false,
        };
        prefs.save(&store).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# user preferences"));
        assert_eq!(Preferences::load(&store), prefs);
    }

    #[test]
    fn test_toml_store_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlFileStore::new(dir.path().join("nested").join("prefs.toml"));

        assert_eq!(store.get(THEME_KEY).unwrap(), None);
        store.set(THEME_KEY, "dark").unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_inspector_config_from_toml() {
        let config = InspectorConfig::from_toml_str(
            "max_file_size = 1024\nai_proxy_category = \"Synthetic\"\nparallel = false\n",
        )
        .unwrap();

        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.ai_proxy_category, "Synthetic");
        assert!(!config.parallel);
        assert_eq!(config.min_text_len, InspectorConfig::default().min_text_len);

        assert!(InspectorConfig::from_toml_str("max_file_size = \"big\"").is_err());
    }

    #[test]
    fn test_inspector_config_round_trip() {
        let config = InspectorConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(InspectorConfig::from_toml_str(&text).unwrap(), config);
    }
}
