use std::collections::HashMap;

/// Parameter id → human-readable display name.
#[derive(Debug, Clone, Default)]
pub struct DisplayNames {
    names: HashMap<String, String>,
}

const STANDARD_NAMES: &[(&str, &str)] = &[
    ("glucose", "Glucose"),
    ("cholesterol_total", "Total Cholesterol"),
    ("cholesterol_ldl", "LDL Cholesterol"),
    ("cholesterol_hdl", "HDL Cholesterol"),
    ("triglycerides", "Triglycerides"),
    ("hemoglobin", "Hemoglobin"),
    ("hematocrit", "Hematocrit"),
    ("blood_pressure_systolic", "Systolic BP"),
    ("blood_pressure_diastolic", "Diastolic BP"),
    ("creatinine", "Creatinine"),
    ("bun", "BUN"),
    ("alt", "ALT"),
    ("ast", "AST"),
    ("platelets", "Platelets"),
    ("wbc", "WBC Count"),
    ("rbc", "RBC Count"),
    ("vitamin_d", "Vitamin D"),
    ("vitamin_b12", "Vitamin B12"),
    ("tsh", "TSH"),
];

impl DisplayNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut names = Self::new();
        for (id, name) in STANDARD_NAMES {
            names.insert(*id, *name);
        }
        names
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(id.into(), name.into());
    }

    /// Mapped name, or the id title-cased with underscores as spaces.
    pub fn display_name(&self, id: &str) -> String {
        match self.names.get(id) {
            Some(name) => name.clone(),
            None => title_case(&id.replace('_', " ")),
        }
    }
}

/// Uppercase the first letter of each alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_names() {
        let names = DisplayNames::standard();
        assert_eq!(names.display_name("cholesterol_total"), "Total Cholesterol");
        assert_eq!(names.display_name("wbc"), "WBC Count");
        assert_eq!(names.display_name("blood_pressure_diastolic"), "Diastolic BP");
    }

    #[test]
    fn fallback_title_cases_id() {
        let names = DisplayNames::standard();
        assert_eq!(names.display_name("serum_iron"), "Serum Iron");
        assert_eq!(names.display_name("vitamin_b6"), "Vitamin B6");
        assert_eq!(names.display_name("HBA1C"), "Hba1C");
    }
}
