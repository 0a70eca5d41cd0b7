//! Schema and unit migrations for settings documents
//!
//! Older application versions stored lengths in millimetres (often under
//! camelCase keys) and pressures in bar. `migrate` adds canonical snake_case SI
//! keys to both sections (`current` and `defaults_snapshot`) and then stamps
//! `metadata.units_version`. Legacy length and `_bar` keys stay in the document
//! next to their canonical counterparts, so nothing an older build wrote is
//! lost. A document already carrying the current watermark is returned
//! untouched, so migrating twice never double-converts.
//!
//! Known ambiguity: pressures below 1000 are assumed to be bar. This includes
//! keys ending in `_pa`, which already name the canonical unit: a `min_pa` of
//! 500 still becomes 50 000 000. A legitimately tiny Pascal value is
//! indistinguishable from an unconverted bar value; the heuristic is kept
//! as-is for compatibility with existing files.

use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::document::ConfigDocument;
use crate::constants::{sections, units};
use crate::tree::number_from_f64;

/// Legacy length field spellings: (camelCase, millimetre key, canonical metre key)
const LEGACY_LENGTH_FIELDS: &[(&str, &str, &str)] = &[
    ("frameLength", "frame_length_mm", "frame_length_m"),
    ("frameHeight", "frame_height_mm", "frame_height_m"),
    ("frameBeamSize", "frame_beam_size_mm", "frame_beam_size_m"),
    ("leverLength", "lever_length_mm", "lever_length_m"),
    ("cylinderBodyLength", "cylinder_body_length_mm", "cylinder_body_length_m"),
    ("tailRodLength", "tail_rod_length_mm", "tail_rod_length_m"),
    ("rodDiameter", "rod_diameter_mm", "rod_diameter_m"),
    ("pistonDiameter", "piston_diameter_mm", "piston_diameter_m"),
    ("pistonThickness", "piston_thickness_mm", "piston_thickness_m"),
    ("trackWidth", "track_width_mm", "track_width_m"),
    ("wheelBase", "wheel_base_mm", "wheel_base_m"),
];

/// A single field-level rewrite performed by the migration
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    /// Length moved from a legacy key (mm) to its canonical metre key
    Length {
        section: String,
        from: String,
        to: String,
    },
    /// Legacy key disagrees with the canonical key already present; both are kept
    LegacyConflict { section: String, key: String },
    /// Pressure assumed to be bar and rewritten in Pascals
    Pressure {
        section: String,
        key: String,
        from: f64,
        to: f64,
    },
    /// `pressure_units` normalized to the canonical label
    PressureUnits { section: String, from: String },
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conversion::Length { section, from, to } => {
                write!(f, "{section}.geometry.{from} (mm) -> {to} (m)")
            }
            Conversion::LegacyConflict { section, key } => {
                write!(f, "{section}.geometry.{key} kept (differs from canonical key)")
            }
            Conversion::Pressure { section, key, from, to } => {
                write!(f, "{section}.pneumatic.{key}: {from} bar -> {to} Pa")
            }
            Conversion::PressureUnits { section, from } => {
                write!(f, "{section}.pneumatic.pressure_units: '{from}' -> 'Pa'")
            }
        }
    }
}

/// Outcome of a migration run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    /// Document content differs from the input (conversions or a new watermark)
    pub changed: bool,
    /// Watermark found on the input document
    pub previous_units_version: Option<String>,
    /// Field-level rewrites, in the order they were applied
    pub conversions: Vec<Conversion>,
}

/// Whether the document still needs the SI migration
pub fn needs_migration(document: &ConfigDocument) -> bool {
    document.units_version() != Some(units::CURRENT_UNITS_VERSION)
}

/// Migrate a document to the current units version.
///
/// Returns the migrated document and a report; `report.changed` tells the
/// caller whether a re-save is warranted.
pub fn migrate(mut document: ConfigDocument) -> (ConfigDocument, MigrationReport) {
    let mut report = MigrationReport {
        previous_units_version: document.units_version().map(str::to_string),
        ..Default::default()
    };

    if !needs_migration(&document) {
        debug!(units_version = units::CURRENT_UNITS_VERSION, "Settings already at current units version");
        return (document, report);
    }

    info!(
        from = ?report.previous_units_version,
        to = units::CURRENT_UNITS_VERSION,
        "Migrating settings units"
    );

    for section in [sections::CURRENT, sections::DEFAULTS] {
        let Some(map) = document.section_mut(section) else {
            continue;
        };
        if let Some(Value::Object(geometry)) = map.get_mut(units::GEOMETRY_CATEGORY) {
            migrate_lengths(section, geometry, &mut report.conversions);
        }
        if let Some(Value::Object(pneumatic)) = map.get_mut(units::PNEUMATIC_CATEGORY) {
            migrate_pressures(section, pneumatic, &mut report.conversions);
        }
    }

    for conversion in &report.conversions {
        info!(conversion = %conversion, "Applied settings migration");
    }

    document.set_units_version(units::CURRENT_UNITS_VERSION);
    report.changed = true;
    (document, report)
}

/// Add canonical metre keys for legacy millimetre length keys.
/// An existing canonical key always wins; legacy keys are never removed.
fn migrate_lengths(section: &str, geometry: &mut Map<String, Value>, out: &mut Vec<Conversion>) {
    for (camel, mm_key, canonical) in LEGACY_LENGTH_FIELDS {
        let legacy_present: Vec<&str> = [*mm_key, *camel]
            .into_iter()
            .filter(|k| geometry.contains_key(*k))
            .collect();
        if legacy_present.is_empty() {
            continue;
        }

        if let Some(existing) = geometry.get(*canonical).and_then(Value::as_f64) {
            for key in legacy_present {
                let legacy_m = geometry.get(key).and_then(Value::as_f64).map(|mm| mm / units::MM_PER_M);
                if legacy_m != Some(existing) {
                    warn!(section = %section, key = %key, canonical = %canonical, "Legacy length differs from canonical value, keeping both");
                    out.push(Conversion::LegacyConflict {
                        section: section.to_string(),
                        key: key.to_string(),
                    });
                }
            }
            continue;
        }
        if geometry.contains_key(*canonical) {
            continue;
        }

        // Prefer the snake_case millimetre key over the camelCase one
        let source = legacy_present[0];
        let Some(mm) = geometry.get(source).and_then(Value::as_f64) else {
            warn!(section = %section, key = %source, "Legacy length is not numeric, leaving it untouched");
            continue;
        };
        let Some(metres) = number_from_f64(mm / units::MM_PER_M, false) else {
            continue;
        };

        geometry.insert(canonical.to_string(), metres);
        out.push(Conversion::Length {
            section: section.to_string(),
            from: source.to_string(),
            to: canonical.to_string(),
        });
    }
}

/// Convert bar-sized pressures to Pascals and normalize `pressure_units`.
/// Recurses into nested objects (e.g. per-valve groups).
fn migrate_pressures(section: &str, pneumatic: &mut Map<String, Value>, out: &mut Vec<Conversion>) {
    for (key, value) in pneumatic.iter_mut() {
        if key == units::PRESSURE_UNITS_KEY {
            if let Some(label) = value.as_str()
                && label != units::PRESSURE_LABEL
            {
                out.push(Conversion::PressureUnits {
                    section: section.to_string(),
                    from: label.to_string(),
                });
                *value = Value::from(units::PRESSURE_LABEL);
            }
            continue;
        }

        if let Value::Object(nested) = value {
            migrate_pressures(section, nested, out);
            continue;
        }

        if !is_pressure_key(key) {
            continue;
        }
        let Some(raw) = value.as_f64() else {
            continue;
        };
        if raw >= units::BAR_THRESHOLD {
            continue;
        }
        let pascals = raw * units::PA_PER_BAR;
        if let Some(converted) = number_from_f64(pascals, true) {
            *value = converted;
            out.push(Conversion::Pressure {
                section: section.to_string(),
                key: key.clone(),
                from: raw,
                to: pascals,
            });
        }
    }

    // `_bar` keys run last so a new `_pa` value is never scaled a second time
    let bar_keys: Vec<String> = pneumatic
        .keys()
        .filter(|k| k.ends_with("_bar"))
        .cloned()
        .collect();
    for bar_key in bar_keys {
        let pa_key = format!("{}_pa", bar_key.trim_end_matches("_bar"));
        if pneumatic.contains_key(&pa_key) {
            continue;
        }
        let Some(bar) = pneumatic.get(&bar_key).and_then(Value::as_f64) else {
            continue;
        };
        let Some(pa) = number_from_f64(bar * units::PA_PER_BAR, true) else {
            continue;
        };
        pneumatic.insert(pa_key.clone(), pa);
        out.push(Conversion::Pressure {
            section: section.to_string(),
            key: pa_key,
            from: bar,
            to: bar * units::PA_PER_BAR,
        });
    }
}

fn is_pressure_key(key: &str) -> bool {
    key.ends_with("pressure") || key.ends_with("_pa")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    fn doc(value: Value) -> ConfigDocument {
        ConfigDocument::from_value(Path::new("test.json"), value).unwrap()
    }

    #[test]
    fn test_frame_height_mm_to_m() {
        let input = doc(json!({
            "current": {"geometry": {"frame_height_mm": 650}},
            "metadata": {"units_version": "legacy"}
        }));
        let (out, report) = migrate(input);

        assert!(report.changed);
        assert_eq!(report.previous_units_version.as_deref(), Some("legacy"));
        assert_eq!(out.current["geometry"]["frame_height_m"], json!(0.65));
        assert_eq!(out.current["geometry"]["frame_height_mm"], json!(650));
        assert_eq!(out.units_version(), Some("si_v2"));
    }

    #[test]
    fn test_camel_case_keys_renamed_in_both_sections() {
        let input = doc(json!({
            "current": {"geometry": {"tailRodLength": 100, "frameHeight": 650}},
            "defaults_snapshot": {"geometry": {"tailRodLength": 200}}
        }));
        let (out, _report) = migrate(input);

        assert_eq!(out.current["geometry"]["tail_rod_length_m"], json!(0.1));
        assert_eq!(out.current["geometry"]["frame_height_m"], json!(0.65));
        assert_eq!(out.defaults_snapshot["geometry"]["tail_rod_length_m"], json!(0.2));
        assert_eq!(out.current["geometry"]["tailRodLength"], json!(100));
    }

    #[test]
    fn test_canonical_key_never_overwritten() {
        let input = doc(json!({
            "current": {"geometry": {"frame_height_m": 0.7, "frame_height_mm": 650}}
        }));
        let (out, report) = migrate(input);

        assert_eq!(out.current["geometry"]["frame_height_m"], json!(0.7));
        // The conflicting legacy value survives for inspection
        assert_eq!(out.current["geometry"]["frame_height_mm"], json!(650));
        assert_eq!(
            report.conversions,
            vec![Conversion::LegacyConflict {
                section: "current".into(),
                key: "frame_height_mm".into(),
            }]
        );
    }

    #[test]
    fn test_matching_legacy_key_is_not_a_conflict() {
        let input = doc(json!({
            "current": {"geometry": {"frame_height_m": 0.65, "frameHeight": 650}}
        }));
        let (out, report) = migrate(input);

        assert!(report.conversions.is_empty());
        assert_eq!(out.current["geometry"]["frameHeight"], json!(650));
        assert_eq!(out.current["geometry"]["frame_height_m"], json!(0.65));
    }

    #[test]
    fn test_pressures_below_threshold_become_pascals() {
        let input = doc(json!({
            "current": {"pneumatic": {
                "receiver_pressure": 2.5,
                "relief_safety_pressure": 50,
                "atmo_pressure": 101325,
                "pressure_units": "bar",
                "valves": {"min_pressure": 1}
            }}
        }));
        let (out, _report) = migrate(input);
        let pneumatic = &out.current["pneumatic"];

        assert_eq!(pneumatic["receiver_pressure"], json!(250_000));
        assert_eq!(pneumatic["relief_safety_pressure"], json!(5_000_000));
        // Already in Pascals
        assert_eq!(pneumatic["atmo_pressure"], json!(101325));
        assert_eq!(pneumatic["pressure_units"], json!("Pa"));
        assert_eq!(pneumatic["valves"]["min_pressure"], json!(100_000));
    }

    #[test]
    fn test_bar_suffixed_keys_gain_pa_sibling() {
        let input = doc(json!({"current": {"pneumatic": {"tank_bar": 3}}}));
        let (out, _report) = migrate(input);
        assert_eq!(out.current["pneumatic"]["tank_pa"], json!(300_000));
        assert_eq!(out.current["pneumatic"]["tank_bar"], json!(3));
    }

    #[test]
    fn test_small_pa_values_still_scaled() {
        let input = doc(json!({"current": {"pneumatic": {"min_pa": 500, "max_pa": 600_000}}}));
        let (out, _report) = migrate(input);
        assert_eq!(out.current["pneumatic"]["min_pa"], json!(50_000_000));
        assert_eq!(out.current["pneumatic"]["max_pa"], json!(600_000));
    }

    #[test]
    fn test_current_version_untouched() {
        let input = doc(json!({
            "current": {"geometry": {"frame_height_mm": 650}, "pneumatic": {"min_pressure": 1}},
            "metadata": {"units_version": "si_v2"}
        }));
        let (out, report) = migrate(input.clone());

        assert!(!report.changed);
        assert!(report.conversions.is_empty());
        assert_eq!(out, input);
    }

    #[test]
    fn test_migrate_twice_is_stable() {
        let input = doc(json!({
            "current": {"geometry": {"leverLength": 800}, "pneumatic": {"max_pressure": 8}}
        }));
        let (once, first) = migrate(input);
        let (twice, second) = migrate(once.clone());

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(once, twice);
        assert_eq!(twice.current["pneumatic"]["max_pressure"], json!(800_000));
    }

    #[test]
    fn test_watermark_only_counts_as_change() {
        let input = doc(json!({"current": {"graphics": {"fov": 60}}}));
        let (out, report) = migrate(input);
        assert!(report.changed);
        assert!(report.conversions.is_empty());
        assert_eq!(out.units_version(), Some("si_v2"));
    }

    #[test]
    fn test_non_numeric_legacy_length_left_alone() {
        let input = doc(json!({"current": {"geometry": {"frameHeight": "tall"}}}));
        let (out, _report) = migrate(input);
        assert_eq!(out.current["geometry"]["frameHeight"], json!("tall"));
        assert!(out.current["geometry"].get("frame_height_m").is_none());
    }
}
