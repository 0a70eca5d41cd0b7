//! Persisted settings document
//!
//! The on-disk unit: `current` settings, the `defaults_snapshot` baseline used
//! by reset operations, and `metadata` carrying the migration watermark.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::constants::{metadata, sections};
use crate::error::{ConfigError, Result};

/// Settings document as stored in `app_settings.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Live settings, one object per category (graphics, geometry, ...)
    pub current: Map<String, Value>,

    /// Baseline restored by "reset to defaults"
    #[serde(default)]
    pub defaults_snapshot: Map<String, Value>,

    /// `version`, `units_version`, `last_modified`
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Unknown top-level keys written by other application versions.
    /// Kept so a save never drops data this build does not understand.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument {
    /// Build a document from parsed JSON, validating the top-level layout.
    /// `path` is only used for error messages.
    pub fn from_value(path: &Path, value: Value) -> Result<Self> {
        let Value::Object(root) = &value else {
            return Err(invalid(path, "top level is not a JSON object"));
        };
        match root.get(sections::CURRENT) {
            Some(Value::Object(_)) => {}
            Some(_) => return Err(invalid(path, "'current' is not an object")),
            None => return Err(invalid(path, "missing 'current' section")),
        }
        for section in [sections::DEFAULTS, sections::METADATA] {
            if let Some(v) = root.get(section)
                && !v.is_object()
            {
                return Err(invalid(path, format!("'{section}' is not an object")));
            }
        }

        serde_json::from_value(value).map_err(|e| invalid(path, e.to_string()))
    }

    /// Whole document as a JSON object (used for document-rooted path reads)
    pub fn to_value(&self) -> Value {
        // Infallible for this type: every field is already a JSON map
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Mutable access to one of the three named sections
    pub fn section_mut(&mut self, name: &str) -> Option<&mut Map<String, Value>> {
        match name {
            sections::CURRENT => Some(&mut self.current),
            sections::DEFAULTS => Some(&mut self.defaults_snapshot),
            sections::METADATA => Some(&mut self.metadata),
            _ => None,
        }
    }

    /// Read-only access to one of the three named sections
    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        match name {
            sections::CURRENT => Some(&self.current),
            sections::DEFAULTS => Some(&self.defaults_snapshot),
            sections::METADATA => Some(&self.metadata),
            _ => None,
        }
    }

    pub fn units_version(&self) -> Option<&str> {
        self.metadata.get(metadata::UNITS_VERSION).and_then(Value::as_str)
    }

    pub fn set_units_version(&mut self, version: &str) {
        self.metadata
            .insert(metadata::UNITS_VERSION.to_string(), Value::from(version));
    }

    pub fn version(&self) -> Option<&str> {
        self.metadata.get(metadata::VERSION).and_then(Value::as_str)
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.metadata.get(metadata::LAST_MODIFIED).and_then(Value::as_str)
    }

    /// Stamp `last_modified` with the current local time (RFC 3339)
    pub fn touch(&mut self) {
        self.metadata.insert(
            metadata::LAST_MODIFIED.to_string(),
            Value::from(chrono::Local::now().to_rfc3339()),
        );
    }

    /// Fill `metadata.version` when an older file never recorded it.
    /// Returns true if the field was added.
    pub fn ensure_version(&mut self, version: &str) -> bool {
        if self.version().is_some() {
            return false;
        }
        self.metadata
            .insert(metadata::VERSION.to_string(), Value::from(version));
        true
    }

    /// Seed an empty defaults snapshot from `current`.
    /// Returns true if seeding happened (the caller must persist).
    pub fn seed_defaults(&mut self) -> bool {
        if self.defaults_snapshot.is_empty() && !self.current.is_empty() {
            self.defaults_snapshot = self.current.clone();
            return true;
        }
        false
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidDocument {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path() -> &'static Path {
        Path::new("app_settings.json")
    }

    #[test]
    fn test_from_value_minimal() {
        let doc = ConfigDocument::from_value(path(), json!({"current": {"graphics": {}}})).unwrap();
        assert!(doc.current.contains_key("graphics"));
        assert!(doc.defaults_snapshot.is_empty());
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn test_from_value_rejects_bad_layout() {
        assert!(matches!(
            ConfigDocument::from_value(path(), json!([1, 2])),
            Err(ConfigError::InvalidDocument { .. })
        ));
        assert!(matches!(
            ConfigDocument::from_value(path(), json!({"metadata": {}})),
            Err(ConfigError::InvalidDocument { .. })
        ));
        assert!(matches!(
            ConfigDocument::from_value(path(), json!({"current": {}, "metadata": "si_v2"})),
            Err(ConfigError::InvalidDocument { .. })
        ));
    }

    #[test]
    fn test_unknown_top_level_keys_survive() {
        let value = json!({"current": {}, "presets": {"track": {"x": 1}}});
        let doc = ConfigDocument::from_value(path(), value).unwrap();
        assert_eq!(doc.extra.get("presets"), Some(&json!({"track": {"x": 1}})));
        assert_eq!(doc.to_value()["presets"]["track"]["x"], json!(1));
    }

    #[test]
    fn test_seed_defaults_only_when_empty() {
        let mut doc = ConfigDocument::from_value(
            path(),
            json!({"current": {"animation": {"speed": 1.0}}}),
        )
        .unwrap();
        assert!(doc.seed_defaults());
        assert_eq!(doc.defaults_snapshot, doc.current);

        // Copies are independent
        doc.current.insert("animation".into(), json!({"speed": 2.0}));
        assert_eq!(doc.defaults_snapshot["animation"]["speed"], json!(1.0));
        assert!(!doc.seed_defaults());
    }

    #[test]
    fn test_metadata_accessors() {
        let mut doc = ConfigDocument::default();
        assert_eq!(doc.units_version(), None);
        doc.set_units_version("si_v2");
        assert_eq!(doc.units_version(), Some("si_v2"));
        assert!(doc.ensure_version("4.9.5"));
        assert!(!doc.ensure_version("5.0.0"));
        assert_eq!(doc.version(), Some("4.9.5"));
        doc.touch();
        assert!(doc.last_modified().is_some());
    }
}
