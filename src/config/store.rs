//! Config store: the single source of truth for every tunable setting
//!
//! Owns the on-disk document. Loading resolves the file path, decodes and
//! migrates the document, seeds an empty defaults snapshot, and re-saves
//! whenever any of that changed the content. There is no built-in fallback
//! document: a missing or corrupt file is an error.
//!
//! Reads hand out owned copies; nothing outside the store can mutate its
//! document through a returned value.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::document::ConfigDocument;
use crate::config::migration::{self, MigrationReport};
use crate::config::paths::{PathResolver, PathSource};
use crate::constants::sections;
use crate::error::{ConfigError, Result};
use crate::history::{PatchHistoryController, State};
use crate::persistence::{self, Durability};
use crate::tree;

/// Options used to locate and persist the settings file
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Path given by the caller (command line, tests)
    pub explicit_path: Option<PathBuf>,
    /// Root searched for `config/app_settings.json` after the working directory
    pub project_root: Option<PathBuf>,
    pub durability: Durability,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            explicit_path: None,
            project_root: None,
            durability: Durability::Sync,
        }
    }
}

impl StoreOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit_path: Some(path.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    document: ConfigDocument,
    durability: Durability,
    last_migration: MigrationReport,
}

impl ConfigStore {
    // ==========================================================================
    // Loading
    // ==========================================================================

    /// Resolve the settings path from `options` and the process environment, then load it
    pub fn load(options: &StoreOptions) -> Result<Self> {
        Self::load_with_env(options, &|key: &str| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with an explicit environment lookup
    pub fn load_with_env(options: &StoreOptions, env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let resolver = PathResolver::from_process(
            options.explicit_path.as_deref(),
            options.project_root.clone(),
            env,
        );
        let (path, source) = resolver.resolve();
        info!(path = %path.display(), source = ?source, "Resolved settings file");
        if source == PathSource::Fallback && !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        Self::open_with(path, options.durability)
    }

    /// Load the settings file at exactly `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(path.into(), Durability::Sync)
    }

    pub fn open_with(path: PathBuf, durability: Durability) -> Result<Self> {
        let (document, report, dirty) = read_and_upgrade(&path)?;
        let mut store = Self {
            path,
            document,
            durability,
            last_migration: report,
        };
        if dirty {
            info!(path = %store.path.display(), "Persisting upgraded settings document");
            store.save()?;
        }
        Ok(store)
    }

    /// Re-run the full load pipeline against the same file
    pub fn reload(&mut self) -> Result<()> {
        let (document, report, dirty) = read_and_upgrade(&self.path)?;
        self.document = document;
        self.last_migration = report;
        if dirty {
            self.save()?;
        }
        Ok(())
    }

    // ==========================================================================
    // Dotted-path access
    // ==========================================================================

    /// Read `path`, or `default` as soon as a segment is missing.
    ///
    /// Paths starting with `current`, `defaults_snapshot` or `metadata`
    /// address the whole document; any other path is relative to `current`.
    pub fn get(&self, path: &str, default: Value) -> Value {
        let Ok(segments) = tree::split_path(path) else {
            return default;
        };
        let (root, rest) = self.rooted(&segments);
        match tree::get_in_map(root, rest) {
            Some(value) => value.clone(),
            None if rest.is_empty() => Value::Object(root.clone()),
            None => default,
        }
    }

    /// Typed read; `None` when the path is missing or the value has another shape
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let value = self.get(path, Value::Null);
        if value.is_null() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Read `path` from the defaults snapshot
    pub fn get_default(&self, path: &str, default: Value) -> Value {
        let Ok(segments) = tree::split_path(path) else {
            return default;
        };
        tree::get_in_map(&self.document.defaults_snapshot, &segments)
            .cloned()
            .unwrap_or(default)
    }

    /// Write `value` at `path`, creating intermediate objects.
    /// With `auto_save` the document is persisted before returning.
    pub fn set(&mut self, path: &str, value: Value, auto_save: bool) -> Result<()> {
        let segments = tree::split_path(path)?;
        let (section, rest) = match segments.split_first() {
            Some((first, rest)) if is_section(first) => (*first, rest),
            _ => (sections::CURRENT, segments.as_slice()),
        };
        if rest.is_empty() {
            return Err(ConfigError::invalid_path(path, "cannot replace a whole section"));
        }

        if let Some(map) = self.document.section_mut(section) {
            tree::set_in_map(map, rest, value);
        }
        debug!(path = %path, auto_save, "Setting updated");

        if auto_save {
            self.save()?;
        }
        Ok(())
    }

    fn rooted<'a, 'p>(&'a self, segments: &'p [&'p str]) -> (&'a Map<String, Value>, &'p [&'p str]) {
        if let Some((first, rest)) = segments.split_first()
            && let Some(section) = self.document.section(first)
        {
            return (section, rest);
        }
        (&self.document.current, segments)
    }

    // ==========================================================================
    // Categories
    // ==========================================================================

    /// Copy of one category of `current` (empty when absent or not an object)
    pub fn get_category(&self, name: &str) -> Map<String, Value> {
        match self.document.current.get(name) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    /// Replace one category of `current`
    pub fn set_category(&mut self, name: &str, value: Map<String, Value>, auto_save: bool) -> Result<()> {
        if name.is_empty() {
            return Err(ConfigError::invalid_path(name, "category name is empty"));
        }
        self.document
            .current
            .insert(name.to_string(), Value::Object(value));
        debug!(category = %name, auto_save, "Category replaced");
        if auto_save {
            self.save()?;
        }
        Ok(())
    }

    /// Category names present in `current`, sorted
    pub fn categories(&self) -> Vec<String> {
        let mut names: Vec<String> = self.document.current.keys().cloned().collect();
        names.sort();
        names
    }

    // ==========================================================================
    // Defaults
    // ==========================================================================

    /// Restore `current` (or one category of it) from the defaults snapshot.
    /// An unknown category is logged and ignored.
    pub fn reset_to_defaults(&mut self, category: Option<&str>) -> Result<()> {
        match self.try_reset_to_defaults(category) {
            Err(ConfigError::UnknownCategory(name)) => {
                warn!(category = %name, "No defaults recorded for category, reset skipped");
                Ok(())
            }
            other => other.map(|_| ()),
        }
    }

    /// Like [`reset_to_defaults`](Self::reset_to_defaults) but reports an unknown category.
    /// Returns whether `current` changed.
    pub fn try_reset_to_defaults(&mut self, category: Option<&str>) -> Result<bool> {
        let changed = match category {
            None => {
                let changed = self.document.current != self.document.defaults_snapshot;
                self.document.current = self.document.defaults_snapshot.clone();
                changed
            }
            Some(name) => {
                let defaults = self
                    .document
                    .defaults_snapshot
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownCategory(name.to_string()))?;
                let changed = self.document.current.get(name) != Some(&defaults);
                self.document.current.insert(name.to_string(), defaults);
                changed
            }
        };

        if changed {
            info!(category = ?category, "Reset settings to defaults");
            self.save()?;
        } else {
            debug!(category = ?category, "Settings already match defaults");
        }
        Ok(changed)
    }

    /// Copy `current` (or one category of it) into the defaults snapshot.
    /// An unknown category is logged and ignored.
    pub fn save_current_as_defaults(&mut self, category: Option<&str>) -> Result<()> {
        match self.try_save_current_as_defaults(category) {
            Err(ConfigError::UnknownCategory(name)) => {
                warn!(category = %name, "Category not present in current settings, nothing saved as default");
                Ok(())
            }
            other => other.map(|_| ()),
        }
    }

    /// Like [`save_current_as_defaults`](Self::save_current_as_defaults) but reports an unknown category.
    /// Returns whether the defaults snapshot changed.
    pub fn try_save_current_as_defaults(&mut self, category: Option<&str>) -> Result<bool> {
        let changed = match category {
            None => {
                let changed = self.document.defaults_snapshot != self.document.current;
                self.document.defaults_snapshot = self.document.current.clone();
                changed
            }
            Some(name) => {
                let current = self
                    .document
                    .current
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownCategory(name.to_string()))?;
                let changed = self.document.defaults_snapshot.get(name) != Some(&current);
                self.document
                    .defaults_snapshot
                    .insert(name.to_string(), current);
                changed
            }
        };

        if changed {
            info!(category = ?category, "Saved current settings as defaults");
            self.save()?;
        }
        Ok(changed)
    }

    // ==========================================================================
    // History integration
    // ==========================================================================

    /// Controller mirroring `current`, bootstrapped without history or notification
    pub fn bootstrap_controller(&self) -> PatchHistoryController {
        let mut controller = PatchHistoryController::new();
        controller.bootstrap(self.document.current.clone(), false);
        controller
    }

    /// Replace `current` with state collected from a controller
    pub fn replace_current(&mut self, state: State, auto_save: bool) -> Result<()> {
        self.document.current = state;
        if auto_save {
            self.save()?;
        }
        Ok(())
    }

    // ==========================================================================
    // Persistence
    // ==========================================================================

    /// Write the full document atomically with a refreshed `last_modified`
    pub fn save(&mut self) -> Result<()> {
        self.document.touch();
        persistence::write_json_atomic(&self.path, &self.document, self.durability)?;
        info!(path = %self.path.display(), "Saved settings");
        Ok(())
    }

    /// Save, reporting failure as a logged warning instead of an error.
    /// The in-memory state stays valid either way; returns whether the write succeeded.
    pub fn save_or_warn(&mut self) -> bool {
        match self.save() {
            Ok(()) => true,
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "Settings were not saved; in-memory values are still active");
                false
            }
        }
    }

    // ==========================================================================
    // Accessors
    // ==========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the whole document
    pub fn document(&self) -> ConfigDocument {
        self.document.clone()
    }

    /// Copy of `current`
    pub fn current(&self) -> Map<String, Value> {
        self.document.current.clone()
    }

    /// Copy of the metadata section
    pub fn metadata(&self) -> Map<String, Value> {
        self.document.metadata.clone()
    }

    /// Report of the migration run during the most recent load
    pub fn last_migration(&self) -> &MigrationReport {
        &self.last_migration
    }
}

fn is_section(name: &str) -> bool {
    matches!(name, sections::CURRENT | sections::DEFAULTS | sections::METADATA)
}

/// Read, decode and validate a settings file without migrating it
pub fn read_document(path: &Path) -> Result<ConfigDocument> {
    let contents = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| ConfigError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })?;
    ConfigDocument::from_value(path, value)
}

/// Read + migrate + seed defaults. The flag says whether the result must be re-saved.
fn read_and_upgrade(path: &Path) -> Result<(ConfigDocument, MigrationReport, bool)> {
    let document = read_document(path)?;
    let (mut document, report) = migration::migrate(document);

    let seeded = document.seed_defaults();
    if seeded {
        info!(path = %path.display(), "Defaults snapshot was empty, seeded from current settings");
    }
    let versioned = document.ensure_version(env!("CARGO_PKG_VERSION"));

    info!(
        path = %path.display(),
        categories = document.current.len(),
        migrated = report.changed,
        "Loaded settings"
    );
    let dirty = report.changed || seeded || versioned;
    Ok((document, report, dirty))
}
