use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ParameterCategory, ParameterStatus};

/// Measured value of a parameter. Qualitative results ("positive", "trace")
/// are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Numeric(f64),
    Text(String),
}

impl ParameterValue {
    /// Coerce a captured token: numeric when it parses as `f64`, text otherwise.
    pub fn from_token(token: &str) -> Self {
        match token.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Numeric(v),
            _ => Self::Text(token.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One clinical parameter recognized in a lab report.
///
/// Built only by the parameter extractor; `status` is always derived from
/// `value` and the parameter's reference range, never supplied by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthParameter {
    /// Fresh per extraction run; no identity carries across reports.
    pub id: Uuid,
    /// Display name, also the deduplication key within one run.
    pub name: String,
    pub value: ParameterValue,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    pub status: ParameterStatus,
    pub category: ParameterCategory,
    /// The report line the value was read from (audit trail).
    pub source_line: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_tokens_coerce() {
        assert_eq!(ParameterValue::from_token("95"), ParameterValue::Numeric(95.0));
        assert_eq!(ParameterValue::from_token("0.6"), ParameterValue::Numeric(0.6));
        assert_eq!(ParameterValue::from_token("12."), ParameterValue::Numeric(12.0));
    }

    #[test]
    fn non_numeric_tokens_stay_text() {
        assert_eq!(
            ParameterValue::from_token("positive"),
            ParameterValue::Text("positive".into())
        );
        // Non-ASCII digits match `\d` but are not valid f64 input
        assert_eq!(
            ParameterValue::from_token("٩٥"),
            ParameterValue::Text("٩٥".into())
        );
        assert_eq!(ParameterValue::from_token("inf"), ParameterValue::Text("inf".into()));
    }

    #[test]
    fn value_serializes_untagged() {
        assert_eq!(serde_json::to_string(&ParameterValue::Numeric(4.5)).unwrap(), "4.5");
        assert_eq!(
            serde_json::to_string(&ParameterValue::Text("trace".into())).unwrap(),
            "\"trace\""
        );
    }

    #[test]
    fn parameter_json_shape() {
        let p = HealthParameter {
            id: Uuid::nil(),
            name: "Glucose".into(),
            value: ParameterValue::Numeric(95.0),
            unit: Some("mg/dl".into()),
            reference_range: Some("70.0-100.0 mg/dl".into()),
            status: ParameterStatus::Normal,
            category: ParameterCategory::Blood,
            source_line: "Glucose: 95 mg/dl".into(),
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["name"], "Glucose");
        assert_eq!(json["value"], 95.0);
        assert_eq!(json["status"], "normal");
        assert_eq!(json["category"], "blood");
        assert_eq!(json["source_line"], "Glucose: 95 mg/dl");
    }
}
