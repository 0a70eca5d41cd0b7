//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used by the
//! settings store, providing a single source of truth for constant values.

/// Settings file location and path resolution
pub mod config {
    /// Settings file name
    pub const FILENAME: &str = "app_settings.json";

    /// Directory (relative to CWD or project root) holding the settings file
    pub const CONFIG_DIR: &str = "config";

    /// Application directory under the platform config dir (fallback project root)
    pub const APP_DIR: &str = "pss";

    /// Suffix appended to the file name for the atomic-write temporary file
    pub const TEMP_SUFFIX: &str = ".tmp";
}

/// Environment variables consumed by the store
pub mod env {
    /// Absolute or relative override for the settings file path
    pub const SETTINGS_FILE: &str = "PSS_SETTINGS_FILE";

    /// Set to `1` to echo path-resolution decisions to stdout
    pub const VERBOSE_CONFIG: &str = "PSS_VERBOSE_CONFIG";

    /// Log level for the command-line binary
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
}

/// Top-level section names of the persisted document
pub mod sections {
    pub const CURRENT: &str = "current";
    pub const DEFAULTS: &str = "defaults_snapshot";
    pub const METADATA: &str = "metadata";
}

/// Metadata keys
pub mod metadata {
    pub const VERSION: &str = "version";
    pub const UNITS_VERSION: &str = "units_version";
    pub const LAST_MODIFIED: &str = "last_modified";
}

/// Unit migration constants
pub mod units {
    /// Watermark written once the SI migration has run
    pub const CURRENT_UNITS_VERSION: &str = "si_v2";

    /// Values below this are assumed to be stored in bar
    pub const BAR_THRESHOLD: f64 = 1000.0;

    /// Pascals per bar
    pub const PA_PER_BAR: f64 = 100_000.0;

    /// Millimetres per metre
    pub const MM_PER_M: f64 = 1000.0;

    /// Canonical pressure unit label
    pub const PRESSURE_LABEL: &str = "Pa";

    /// Companion field naming the unit of the pressure values
    pub const PRESSURE_UNITS_KEY: &str = "pressure_units";

    /// Category holding length fields
    pub const GEOMETRY_CATEGORY: &str = "geometry";

    /// Category holding pressure fields
    pub const PNEUMATIC_CATEGORY: &str = "pneumatic";
}

/// Change-history constants
pub mod history {
    /// Default number of undoable commands kept per controller
    pub const DEFAULT_MAX_DEPTH: usize = 100;

    /// Origin reported when the tracked state is replaced wholesale at load
    pub const ORIGIN_BOOTSTRAP: &str = "bootstrap";

    /// Origin reported when a command is undone
    pub const ORIGIN_UNDO: &str = "undo";

    /// Origin reported when a command is redone
    pub const ORIGIN_REDO: &str = "redo";

    /// Origin used when the caller does not name one
    pub const ORIGIN_USER: &str = "user";
}
