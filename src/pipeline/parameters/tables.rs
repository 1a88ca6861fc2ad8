//! The lookup tables behind parameter extraction, bundled as one immutable value.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::names::DisplayNames;
use super::ranges::{ReferenceRange, ReferenceRanges};
use super::registry::{standard_pattern_definitions, ParameterRegistry, PatternDefinition};
use super::units::UnitAliases;
use super::RegistryError;

/// Registry + ranges + unit aliases + display names.
///
/// Built once and shared read-only (typically behind an `Arc`).
#[derive(Debug, Clone)]
pub struct ExtractionTables {
    pub registry: ParameterRegistry,
    pub ranges: ReferenceRanges,
    pub units: UnitAliases,
    pub names: DisplayNames,
}

/// One entry of a JSON table definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableEntry {
    #[serde(flatten)]
    pub pattern: PatternDefinition,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub reference_range: Option<ReferenceRange>,
}

/// On-disk table format.
///
/// ```json
/// {
///   "patterns": [
///     { "id": "glucose", "pattern": "glucose.*?(\\d+)\\s*(mg/dl)?", "category": "blood",
///       "display_name": "Glucose",
///       "reference_range": { "min": 70, "max": 100, "unit": "mg/dl" } }
///   ],
///   "unit_aliases": { "mg%": "mg/dl" }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesDefinition {
    pub patterns: Vec<TableEntry>,
    #[serde(default)]
    pub unit_aliases: HashMap<String, String>,
}

impl ExtractionTables {
    /// The built-in tables: 19 parameters with their ranges, names and unit aliases.
    ///
    /// The built-in patterns are fixed at compile time and covered by tests,
    /// so failure here is a programming error.
    pub fn standard() -> Self {
        let registry = ParameterRegistry::from_definitions(&standard_pattern_definitions())
            .expect("built-in parameter patterns must compile");
        Self {
            registry,
            ranges: ReferenceRanges::standard(),
            units: UnitAliases::standard(),
            names: DisplayNames::standard(),
        }
    }

    /// Swap in a different rule set, keeping ranges, aliases and names.
    pub fn with_registry(mut self, registry: ParameterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Compile a parsed definition. Unit aliases start from the standard table
    /// and are extended (or overridden) by the definition's own.
    pub fn from_definition(definition: &TablesDefinition) -> Result<Self, RegistryError> {
        let pattern_defs: Vec<PatternDefinition> = definition
            .patterns
            .iter()
            .map(|e| e.pattern.clone())
            .collect();
        let registry = ParameterRegistry::from_definitions(&pattern_defs)?;

        let mut ranges = ReferenceRanges::new();
        let mut names = DisplayNames::new();
        for entry in &definition.patterns {
            if let Some(range) = &entry.reference_range {
                if !range.is_valid() {
                    return Err(RegistryError::InvalidRange(entry.pattern.id.clone()));
                }
                ranges.insert(entry.pattern.id.clone(), range.clone());
            }
            if let Some(name) = &entry.display_name {
                names.insert(entry.pattern.id.clone(), name.clone());
            }
        }

        let mut units = UnitAliases::standard();
        for (raw, canonical) in &definition.unit_aliases {
            units.insert(raw, canonical.clone());
        }

        tracing::debug!(
            patterns = registry.len(),
            ranges = ranges.len(),
            unit_aliases = units.len(),
            "Extraction tables compiled"
        );

        Ok(Self {
            registry,
            ranges,
            units,
            names,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let definition: TablesDefinition =
            serde_json::from_str(json).map_err(|e| RegistryError::TablesParse(e.to_string()))?;
        Self::from_definition(&definition)
    }

    /// Load a JSON table definition from disk.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::TablesLoad(path.display().to_string(), e.to_string())
        })?;
        let tables = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), patterns = tables.registry.len(), "Loaded extraction tables");
        Ok(tables)
    }
}

impl Default for ExtractionTables {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParameterCategory;

    const CUSTOM: &str = r#"{
        "patterns": [
            {
                "id": "ferritin",
                "pattern": "ferritin.*?(\\d+\\.?\\d*)\\s*(ng/ml|ug/l)?",
                "category": "blood",
                "reference_range": { "min": 20, "max": 250, "unit": "ng/ml" }
            },
            {
                "id": "hba1c",
                "pattern": "hba1c.*?(\\d+\\.?\\d*)\\s*(%)?",
                "category": "blood",
                "display_name": "HbA1c"
            }
        ],
        "unit_aliases": { "ug/l": "ng/ml" }
    }"#;

    #[test]
    fn standard_tables_are_complete() {
        let tables = ExtractionTables::standard();
        assert_eq!(tables.registry.len(), 19);
        for pattern in tables.registry.iter() {
            assert!(tables.ranges.get(&pattern.id).is_some(), "no range for {}", pattern.id);
        }
    }

    #[test]
    fn custom_definition_compiles() {
        let tables = ExtractionTables::from_json_str(CUSTOM).unwrap();
        assert_eq!(tables.registry.len(), 2);
        assert_eq!(tables.registry.get("ferritin").unwrap().category, ParameterCategory::Blood);
        assert_eq!(tables.ranges.get("ferritin").unwrap().to_string(), "20.0-250.0 ng/ml");
        assert!(tables.ranges.get("hba1c").is_none());
        assert_eq!(tables.names.display_name("hba1c"), "HbA1c");
        assert_eq!(tables.names.display_name("ferritin"), "Ferritin");
        assert_eq!(tables.units.normalize("UG/L"), "ng/ml");
        // standard aliases are kept
        assert_eq!(tables.units.normalize("mg%"), "mg/dl");
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = ExtractionTables::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, RegistryError::TablesParse(_)));
    }

    #[test]
    fn invalid_pattern_in_file_fails_fast() {
        let json = r#"{ "patterns": [ { "id": "x", "pattern": "x(\\d", "category": "blood" } ] }"#;
        let err = ExtractionTables::from_json_str(json).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPattern { .. }));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let json = r#"{ "patterns": [ { "id": "x", "pattern": "x(\\d)", "category": "blood",
            "reference_range": { "min": 5, "max": 1, "unit": "u" } } ] }"#;
        let err = ExtractionTables::from_json_str(json).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidRange(ref id) if id == "x"));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.json");
        std::fs::write(&path, CUSTOM).unwrap();
        let tables = ExtractionTables::load(&path).unwrap();
        assert_eq!(tables.registry.len(), 2);
    }

    #[test]
    fn load_missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExtractionTables::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, RegistryError::TablesLoad(..)));
    }
}
