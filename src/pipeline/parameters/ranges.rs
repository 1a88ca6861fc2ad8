//! Reference ranges and status classification.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{ParameterStatus, ParameterValue};

/// Below `min * CRITICAL_LOW_FACTOR` a low value becomes critical.
pub const CRITICAL_LOW_FACTOR: f64 = 0.5;

/// Above `max * CRITICAL_HIGH_FACTOR` a high value becomes critical.
pub const CRITICAL_HIGH_FACTOR: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
    pub unit: String,
}

impl ReferenceRange {
    pub fn new(min: f64, max: f64, unit: impl Into<String>) -> Self {
        Self {
            min,
            max,
            unit: unit.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// `"70.0-100.0 mg/dl"`. Bounds always carry a decimal point.
impl fmt::Display for ReferenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}-{:?} {}", self.min, self.max, self.unit)
    }
}

/// Reference ranges keyed by parameter id.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRanges {
    by_id: HashMap<String, ReferenceRange>,
}

impl ReferenceRanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, range: ReferenceRange) {
        self.by_id.insert(id.into(), range);
    }

    pub fn get(&self, id: &str) -> Option<&ReferenceRange> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn standard() -> Self {
        let mut ranges = Self::new();
        for (id, min, max, unit) in STANDARD_RANGES {
            ranges.insert(*id, ReferenceRange::new(*min, *max, *unit));
        }
        ranges
    }
}

const STANDARD_RANGES: &[(&str, f64, f64, &str)] = &[
    ("glucose", 70.0, 100.0, "mg/dl"),
    ("cholesterol_total", 0.0, 200.0, "mg/dl"),
    ("cholesterol_ldl", 0.0, 100.0, "mg/dl"),
    ("cholesterol_hdl", 40.0, 999.0, "mg/dl"),
    ("triglycerides", 0.0, 150.0, "mg/dl"),
    ("hemoglobin", 12.0, 16.0, "g/dl"),
    ("hematocrit", 36.0, 48.0, "%"),
    ("blood_pressure_systolic", 90.0, 120.0, "mmHg"),
    ("blood_pressure_diastolic", 60.0, 80.0, "mmHg"),
    ("creatinine", 0.6, 1.2, "mg/dl"),
    ("bun", 7.0, 20.0, "mg/dl"),
    ("alt", 7.0, 40.0, "U/L"),
    ("ast", 10.0, 40.0, "U/L"),
    ("platelets", 1.5, 4.5, "lakhs"),
    ("wbc", 4.0, 11.0, "thousands"),
    ("rbc", 4.2, 5.4, "millions"),
    ("vitamin_d", 30.0, 100.0, "ng/ml"),
    ("vitamin_b12", 200.0, 900.0, "pg/ml"),
    ("tsh", 0.4, 4.0, "mIU/L"),
];

/// Derive a status from a value and its range.
///
/// No range or a non-numeric value is `Normal`. The critical check runs
/// before the plain low/high check on each side.
pub fn classify(range: Option<&ReferenceRange>, value: &ParameterValue) -> ParameterStatus {
    let (Some(range), Some(v)) = (range, value.as_f64()) else {
        return ParameterStatus::Normal;
    };

    if v < range.min {
        if v < range.min * CRITICAL_LOW_FACTOR {
            ParameterStatus::Critical
        } else {
            ParameterStatus::Low
        }
    } else if v > range.max {
        if v > range.max * CRITICAL_HIGH_FACTOR {
            ParameterStatus::Critical
        } else {
            ParameterStatus::High
        }
    } else {
        ParameterStatus::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> ParameterValue {
        ParameterValue::Numeric(v)
    }

    #[test]
    fn glucose_boundaries() {
        let ranges = ReferenceRanges::standard();
        let glucose = ranges.get("glucose");
        assert_eq!(classify(glucose, &num(70.0)), ParameterStatus::Normal);
        assert_eq!(classify(glucose, &num(100.0)), ParameterStatus::Normal);
        assert_eq!(classify(glucose, &num(100.1)), ParameterStatus::High);
        assert_eq!(classify(glucose, &num(200.0)), ParameterStatus::High);
        assert_eq!(classify(glucose, &num(201.0)), ParameterStatus::Critical);
        assert_eq!(classify(glucose, &num(69.9)), ParameterStatus::Low);
        assert_eq!(classify(glucose, &num(35.0)), ParameterStatus::Low);
        assert_eq!(classify(glucose, &num(34.9)), ParameterStatus::Critical);
    }

    #[test]
    fn zero_minimum_never_goes_low() {
        let ranges = ReferenceRanges::standard();
        let total = ranges.get("cholesterol_total");
        assert_eq!(classify(total, &num(0.0)), ParameterStatus::Normal);
        assert_eq!(classify(total, &num(250.0)), ParameterStatus::High);
        assert_eq!(classify(total, &num(401.0)), ParameterStatus::Critical);
    }

    #[test]
    fn missing_range_or_text_value_is_normal() {
        assert_eq!(classify(None, &num(1e9)), ParameterStatus::Normal);
        let ranges = ReferenceRanges::standard();
        assert_eq!(
            classify(ranges.get("glucose"), &ParameterValue::Text("positive".into())),
            ParameterStatus::Normal
        );
    }

    #[test]
    fn range_bounds_keep_a_decimal_point() {
        let ranges = ReferenceRanges::standard();
        assert_eq!(ranges.get("glucose").unwrap().to_string(), "70.0-100.0 mg/dl");
        assert_eq!(ranges.get("creatinine").unwrap().to_string(), "0.6-1.2 mg/dl");
        assert_eq!(ranges.get("tsh").unwrap().to_string(), "0.4-4.0 mIU/L");
        assert_eq!(ranges.get("hemoglobin").unwrap().to_string(), "12.0-16.0 g/dl");
        assert_eq!(ranges.get("wbc").unwrap().to_string(), "4.0-11.0 thousands");
    }

    #[test]
    fn standard_table_covers_every_parameter() {
        let ranges = ReferenceRanges::standard();
        assert_eq!(ranges.len(), 19);
        assert!(ranges.get("vitamin_b12").is_some());
        assert!(STANDARD_RANGES.iter().all(|(_, min, max, _)| min <= max));
    }

    #[test]
    fn validity_check() {
        assert!(ReferenceRange::new(1.0, 2.0, "u").is_valid());
        assert!(!ReferenceRange::new(3.0, 2.0, "u").is_valid());
        assert!(!ReferenceRange::new(f64::NAN, 2.0, "u").is_valid());
    }
}
