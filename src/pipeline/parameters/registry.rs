//! Ordered registry of named parameter recognition rules.
//!
//! Each rule is a case-insensitive regex with two capture groups:
//! group 1 = numeric value (required), group 2 = unit token (optional).
//! Registry order is significant: the first rule that matches a line wins it.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::RegistryError;
use crate::models::ParameterCategory;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// A compiled recognition rule.
#[derive(Debug, Clone)]
pub struct ParameterPattern {
    pub id: String,
    pub regex: Regex,
    pub category: ParameterCategory,
    /// Rules sharing a group may all claim the same line (e.g. `120/80`
    /// yields both systolic and diastolic). `None` = exclusive.
    pub line_group: Option<String>,
}

impl ParameterPattern {
    /// Whether `other` may also be tried on a line this rule has already won.
    pub fn shares_line_with(&self, other: &ParameterPattern) -> bool {
        match (&self.line_group, &other.line_group) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Serializable form of a rule, as found in table definition files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub id: String,
    pub pattern: String,
    pub category: ParameterCategory,
    #[serde(default)]
    pub line_group: Option<String>,
}

/// Immutable, ordered set of rules. Built once, shared read-only.
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    patterns: Vec<ParameterPattern>,
}

impl ParameterRegistry {
    /// Compile definitions in order. Any malformed rule fails the whole registry.
    pub fn from_definitions(definitions: &[PatternDefinition]) -> Result<Self, RegistryError> {
        let mut patterns: Vec<ParameterPattern> = Vec::with_capacity(definitions.len());

        for def in definitions {
            if def.id.trim().is_empty() {
                return Err(RegistryError::EmptyId);
            }
            if patterns.iter().any(|p| p.id == def.id) {
                return Err(RegistryError::DuplicateId(def.id.clone()));
            }

            let regex = RegexBuilder::new(&def.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| RegistryError::InvalidPattern {
                    id: def.id.clone(),
                    reason: e.to_string(),
                })?;

            // captures_len counts the implicit whole-match group 0
            if regex.captures_len() < 2 {
                return Err(RegistryError::MissingValueGroup(def.id.clone()));
            }

            patterns.push(ParameterPattern {
                id: def.id.clone(),
                regex,
                category: def.category,
                line_group: def.line_group.clone(),
            });
        }

        Ok(Self { patterns })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParameterPattern> {
        self.patterns.iter()
    }

    pub fn patterns(&self) -> &[ParameterPattern] {
        &self.patterns
    }

    pub fn get(&self, id: &str) -> Option<&ParameterPattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════
// Standard rules
// ═══════════════════════════════════════════════════════════

const BLOOD_PRESSURE_GROUP: &str = "blood_pressure";

/// (id, pattern, category, line group)
///
/// The total cholesterol rule also matches "LDL/HDL Cholesterol" lines and,
/// registered first, claims them. See [`lipid_specific_pattern_definitions`].
const STANDARD_PATTERNS: &[(&str, &str, ParameterCategory, Option<&str>)] = &[
    (
        "glucose",
        r"glucose.*?(\d+\.?\d*)\s*(mg/dl|mmol/l|mg%)?",
        ParameterCategory::Blood,
        None,
    ),
    (
        "cholesterol_total",
        r"(?:total\s+)?cholesterol.*?(\d+\.?\d*)\s*(mg/dl|mmol/l)?",
        ParameterCategory::Lipid,
        None,
    ),
    (
        "cholesterol_ldl",
        r"ldl.*?cholesterol.*?(\d+\.?\d*)\s*(mg/dl|mmol/l)?",
        ParameterCategory::Lipid,
        None,
    ),
    (
        "cholesterol_hdl",
        r"hdl.*?cholesterol.*?(\d+\.?\d*)\s*(mg/dl|mmol/l)?",
        ParameterCategory::Lipid,
        None,
    ),
    (
        "triglycerides",
        r"triglycerides.*?(\d+\.?\d*)\s*(mg/dl|mmol/l)?",
        ParameterCategory::Lipid,
        None,
    ),
    (
        "hemoglobin",
        r"h[ae]moglobin.*?(\d+\.?\d*)\s*(g/dl|g/l|gm%)?",
        ParameterCategory::Blood,
        None,
    ),
    (
        "hematocrit",
        r"hematocrit.*?(\d+\.?\d*)\s*(%|percent)?",
        ParameterCategory::Blood,
        None,
    ),
    (
        "blood_pressure_systolic",
        r"(?:blood pressure|bp).*?(\d+)/\d+\s*(mmhg)?",
        ParameterCategory::Blood,
        Some(BLOOD_PRESSURE_GROUP),
    ),
    (
        "blood_pressure_diastolic",
        r"(?:blood pressure|bp).*?\d+/(\d+)\s*(mmhg)?",
        ParameterCategory::Blood,
        Some(BLOOD_PRESSURE_GROUP),
    ),
    (
        "creatinine",
        r"creatinine.*?(\d+\.?\d*)\s*(mg/dl|umol/l|µmol/l|μmol/l)?",
        ParameterCategory::Kidney,
        None,
    ),
    (
        "bun",
        r"(?:bun|urea).*?(\d+\.?\d*)\s*(mg/dl|mmol/l)?",
        ParameterCategory::Kidney,
        None,
    ),
    (
        "alt",
        r"(?:alt|alat|sgpt).*?(\d+\.?\d*)\s*(u/l|iu/l)?",
        ParameterCategory::Liver,
        None,
    ),
    (
        "ast",
        r"(?:ast|asat|sgot).*?(\d+\.?\d*)\s*(u/l|iu/l)?",
        ParameterCategory::Liver,
        None,
    ),
    (
        "platelets",
        r"platelets.*?(\d+\.?\d*)\s*(lakhs?|/cumm|x10\^3)?",
        ParameterCategory::Blood,
        None,
    ),
    (
        "wbc",
        r"(?:wbc|white blood cells?).*?(\d+\.?\d*)\s*(thousands?|/cumm|x10\^3)?",
        ParameterCategory::Blood,
        None,
    ),
    (
        "rbc",
        r"(?:rbc|red blood cells?).*?(\d+\.?\d*)\s*(millions?|/cumm|x10\^6)?",
        ParameterCategory::Blood,
        None,
    ),
    (
        "vitamin_d",
        r"vitamin\s*d.*?(\d+\.?\d*)\s*(ng/ml|nmol/l)?",
        ParameterCategory::Vitamin,
        None,
    ),
    (
        "vitamin_b12",
        r"vitamin\s*b12.*?(\d+\.?\d*)\s*(pg/ml|pmol/l)?",
        ParameterCategory::Vitamin,
        None,
    ),
    (
        "tsh",
        r"tsh.*?(\d+\.?\d*)\s*(miu/l|µiu/ml|μiu/ml)?",
        ParameterCategory::Hormone,
        None,
    ),
];

/// The built-in rule set, in registry order.
pub fn standard_pattern_definitions() -> Vec<PatternDefinition> {
    STANDARD_PATTERNS
        .iter()
        .map(|(id, pattern, category, group)| PatternDefinition {
            id: (*id).to_string(),
            pattern: (*pattern).to_string(),
            category: *category,
            line_group: group.map(str::to_string),
        })
        .collect()
}

/// The built-in rule set with the LDL and HDL rules moved ahead of total
/// cholesterol, so "LDL/HDL Cholesterol" lines reach their own rules.
///
/// Not the default; inject it through
/// [`ExtractionTables::with_registry`](super::tables::ExtractionTables::with_registry).
pub fn lipid_specific_pattern_definitions() -> Vec<PatternDefinition> {
    let is_specific = |d: &PatternDefinition| d.id == "cholesterol_ldl" || d.id == "cholesterol_hdl";
    let (specific, mut definitions): (Vec<_>, Vec<_>) =
        standard_pattern_definitions().into_iter().partition(is_specific);
    let total = definitions
        .iter()
        .position(|d| d.id == "cholesterol_total")
        .unwrap_or(definitions.len());
    for (offset, def) in specific.into_iter().enumerate() {
        definitions.insert(total + offset, def);
    }
    definitions
}
