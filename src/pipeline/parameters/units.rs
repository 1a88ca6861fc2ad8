//! Unit token normalization.

use std::collections::HashMap;

/// Raw unit spelling → canonical unit. Lookup is on the trimmed, lowercased
/// token; unknown tokens pass through in that normalized form.
#[derive(Debug, Clone, Default)]
pub struct UnitAliases {
    aliases: HashMap<String, String>,
}

const STANDARD_ALIASES: &[(&str, &str)] = &[
    ("mg%", "mg/dl"),
    ("gm%", "g/dl"),
    ("gm/dl", "g/dl"),
    ("gms/dl", "g/dl"),
    ("µmol/l", "umol/l"), // U+00B5 micro sign
    ("μmol/l", "umol/l"), // U+03BC greek mu
    ("iu/l", "U/L"),
    ("units/l", "U/L"),
    ("µiu/ml", "mIU/L"),
    ("μiu/ml", "mIU/L"),
    ("miu/l", "mIU/L"),
];

impl UnitAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut table = Self::new();
        for (raw, canonical) in STANDARD_ALIASES {
            table.insert(*raw, *canonical);
        }
        table
    }

    pub fn insert(&mut self, raw: &str, canonical: impl Into<String>) {
        self.aliases
            .insert(raw.trim().to_lowercase(), canonical.into());
    }

    pub fn normalize(&self, raw: &str) -> String {
        let key = raw.trim().to_lowercase();
        match self.aliases.get(&key) {
            Some(canonical) => canonical.clone(),
            None => key,
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_to_canonical() {
        let units = UnitAliases::standard();
        assert_eq!(units.normalize("mg%"), "mg/dl");
        assert_eq!(units.normalize("GM%"), "g/dl");
        assert_eq!(units.normalize(" gms/dl "), "g/dl");
        assert_eq!(units.normalize("IU/L"), "U/L");
        assert_eq!(units.normalize("µIU/mL"), "mIU/L");
        assert_eq!(units.normalize("μIU/mL"), "mIU/L");
    }

    #[test]
    fn every_alias_ignores_case_and_padding() {
        let units = UnitAliases::standard();
        for (raw, canonical) in STANDARD_ALIASES {
            for variant in [
                raw.to_string(),
                format!(" {} ", raw.to_uppercase()),
                format!("\t{}\n", raw.to_uppercase()),
            ] {
                assert_eq!(units.normalize(&variant), *canonical, "alias {variant:?}");
            }
        }
    }

    #[test]
    fn canonical_units_are_stable() {
        let units = UnitAliases::standard();
        for (_, canonical) in STANDARD_ALIASES {
            let once = units.normalize(canonical);
            assert_eq!(units.normalize(&once), once);
        }
    }

    #[test]
    fn unknown_tokens_pass_through_lowercased() {
        let units = UnitAliases::standard();
        assert_eq!(units.normalize("MG/DL"), "mg/dl");
        assert_eq!(units.normalize(" Lakhs "), "lakhs");
        assert_eq!(units.normalize("mmHg"), "mmhg");
    }

    #[test]
    fn both_micro_spellings_fold_together() {
        let units = UnitAliases::standard();
        assert_eq!(units.normalize("µmol/L"), units.normalize("μmol/L"));
    }
}
