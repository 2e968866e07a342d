//! Per-theme settings persistence
//!
//! Stores hold one flat key-value document per theme name:
//! - `MemoryStore`: process-local, used by tests and headless runs
//! - `JsonFileStore`: one `tcoto_pit_<theme>.json` file per theme (native)
//! - `LocalStorageStore`: browser LocalStorage under the same keys (wasm32)

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::settings::{SettingField, SettingValue, ThemeConfig};

/// Flat settings document
pub type SettingsDoc = BTreeMap<String, SettingValue>;

/// Storage key prefix shared by every backend
const KEY_PREFIX: &str = "tcoto_pit_";

/// Errors from settings import/export and storage
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings document must be a JSON object")]
    NotAnObject,
}

/// Storage key for a theme
pub fn storage_key(theme_name: &str) -> String {
    format!("{KEY_PREFIX}{theme_name}")
}

/// Settings storage backend
pub trait SettingsStore {
    /// Persisted document for a theme, if any
    fn load(&self, theme_name: &str) -> Option<SettingsDoc>;
    fn save(&mut self, theme_name: &str, doc: &SettingsDoc) -> Result<(), SettingsError>;
}

/// Build a theme's config: schema defaults merged with whatever the store holds
pub fn load_config(
    store: &dyn SettingsStore,
    theme_name: &str,
    schema: Vec<SettingField>,
) -> ThemeConfig {
    match store.load(theme_name) {
        Some(doc) => {
            log::info!("Loaded {} settings for '{}'", doc.len(), theme_name);
            ThemeConfig::with_overrides(schema, doc)
        }
        None => ThemeConfig::from_schema(schema),
    }
}

/// In-memory store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    docs: HashMap<String, SettingsDoc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self, theme_name: &str) -> Option<SettingsDoc> {
        self.docs.get(&storage_key(theme_name)).cloned()
    }

    fn save(&mut self, theme_name: &str, doc: &SettingsDoc) -> Result<(), SettingsError> {
        self.docs.insert(storage_key(theme_name), doc.clone());
        Ok(())
    }
}

/// File-per-theme JSON store
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl JsonFileStore {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, theme_name: &str) -> std::path::PathBuf {
        // Theme names like "Ducks & Toasters" contain characters we keep out of file names
        let safe: String = storage_key(theme_name)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SettingsStore for JsonFileStore {
    fn load(&self, theme_name: &str) -> Option<SettingsDoc> {
        let path = self.path_for(theme_name);
        let json = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&json) {
            Ok(doc) => Some(doc),
            Err(e) => {
                log::warn!("Ignoring corrupt settings file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn save(&mut self, theme_name: &str, doc: &SettingsDoc) -> Result<(), SettingsError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(theme_name);
        std::fs::write(&path, serde_json::to_string_pretty(doc)?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

/// Browser LocalStorage store
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }
}

#[cfg(target_arch = "wasm32")]
impl SettingsStore for LocalStorageStore {
    fn load(&self, theme_name: &str) -> Option<SettingsDoc> {
        let storage = Self::storage()?;
        let json = storage.get_item(&storage_key(theme_name)).ok().flatten()?;
        match serde_json::from_str(&json) {
            Ok(doc) => Some(doc),
            Err(e) => {
                log::warn!("Ignoring corrupt settings for '{}': {}", theme_name, e);
                None
            }
        }
    }

    fn save(&mut self, theme_name: &str, doc: &SettingsDoc) -> Result<(), SettingsError> {
        let json = serde_json::to_string(doc)?;
        if let Some(storage) = Self::storage() {
            if storage.set_item(&storage_key(theme_name), &json).is_err() {
                log::warn!("LocalStorage rejected settings for '{}'", theme_name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<SettingField> {
        vec![
            SettingField::header("Sizes"),
            SettingField::number("size", "Size", 40.0),
            SettingField::checkbox("enabled", "Enabled", true),
        ]
    }

    #[test]
    fn test_load_config_without_saved_doc() {
        let store = MemoryStore::new();
        let config = load_config(&store, "Ballpit", schema());
        assert_eq!(config.number("size"), 40.0);
    }

    #[test]
    fn test_memory_round_trip() {
        let mut store = MemoryStore::new();
        let mut doc = SettingsDoc::new();
        doc.insert("size".into(), SettingValue::Number(90.0));
        store.save("Ballpit", &doc).unwrap();

        let config = load_config(&store, "Ballpit", schema());
        assert_eq!(config.number("size"), 90.0);
        assert!(config.flag("enabled"));
        assert!(store.load("Ducks & Toasters").is_none());
    }

    #[test]
    fn test_json_file_store() {
        let dir = std::env::temp_dir().join(format!("thepit_settings_{}", std::process::id()));
        let mut store = JsonFileStore::new(&dir);
        let mut doc = SettingsDoc::new();
        doc.insert("enabled".into(), SettingValue::Bool(false));
        store.save("Ducks & Toasters", &doc).unwrap();

        let loaded = store.load("Ducks & Toasters").unwrap();
        assert_eq!(loaded.get("enabled"), Some(&SettingValue::Bool(false)));

        std::fs::write(store.path_for("Broken"), "{not json").unwrap();
        assert!(store.load("Broken").is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
